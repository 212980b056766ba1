use scraper::{Html, Selector};

/// Image URLs containing these are never promoted to a listing image.
const NOISE_IMAGE_MARKERS: &[&str] = &["promo", "banner", "logo", "icon"];

/// Declared width an inline image must exceed to qualify as content.
const MIN_CONTENT_IMAGE_WIDTH: i64 = 300;

/// `<meta property="og:...">` content.
pub fn og(doc: &Html, property: &str) -> Option<String> {
    attr_of(doc, &format!(r#"meta[property="og:{}"]"#, property), "content")
}

/// `<meta name="...">` content.
pub fn meta_named(doc: &Html, name: &str) -> Option<String> {
    attr_of(doc, &format!(r#"meta[name="{}"]"#, name), "content")
}

/// First non-empty text among an ordered list of CSS selector candidates.
pub fn first_text(doc: &Html, selectors: &[&str]) -> Option<String> {
    selectors.iter().find_map(|sel| {
        let selector = Selector::parse(sel).ok()?;
        doc.select(&selector).find_map(|el| {
            let text = el.text().collect::<Vec<_>>().join(" ");
            let text = squash(&text);
            (!text.is_empty()).then_some(text)
        })
    })
}

/// First non-empty attribute among an ordered list of selector candidates.
pub fn first_attr(doc: &Html, selectors: &[&str], attr: &str) -> Option<String> {
    selectors.iter().find_map(|sel| {
        let selector = Selector::parse(sel).ok()?;
        doc.select(&selector).find_map(|el| {
            el.value()
                .attr(attr)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        })
    })
}

/// Last-resort image candidate: the first `<img>` with a declared width
/// beyond the content threshold whose URL is not an obvious promo/chrome
/// asset.
pub fn wide_content_image(doc: &Html) -> Option<String> {
    let selector = Selector::parse("img[src]").ok()?;
    doc.select(&selector).find_map(|img| {
        let src = img.value().attr("src")?.trim();
        if src.is_empty() {
            return None;
        }
        let lower = src.to_lowercase();
        if NOISE_IMAGE_MARKERS.iter().any(|m| lower.contains(m)) {
            return None;
        }
        let width: i64 = img
            .value()
            .attr("width")
            .and_then(|w| w.trim().trim_end_matches("px").parse().ok())?;
        (width > MIN_CONTENT_IMAGE_WIDTH).then(|| src.to_string())
    })
}

/// Full visible text of the page, whitespace-squashed. Used for substring
/// scans (sold-out detection, price fallback).
pub fn page_text(doc: &Html) -> String {
    squash(&doc.root_element().text().collect::<Vec<_>>().join(" "))
}

fn attr_of(doc: &Html, selector: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    doc.select(&selector).find_map(|el| {
        el.value()
            .attr(attr)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    })
}

fn squash(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(html: &str) -> Html {
        Html::parse_document(html)
    }

    #[test]
    fn og_and_named_meta() {
        let d = doc(r#"<html><head>
            <meta property="og:title" content="Wahooo! Waterpark" />
            <meta name="description" content="Indoor waves." />
        </head><body></body></html>"#);
        assert_eq!(og(&d, "title").as_deref(), Some("Wahooo! Waterpark"));
        assert_eq!(meta_named(&d, "description").as_deref(), Some("Indoor waves."));
        assert_eq!(og(&d, "image"), None);
    }

    #[test]
    fn first_text_respects_candidate_order() {
        let d = doc("<html><body><h2>Second</h2><h1>First</h1></body></html>");
        assert_eq!(first_text(&d, &["h1", "h2"]).as_deref(), Some("First"));
        assert_eq!(first_text(&d, &[".missing", "h2"]).as_deref(), Some("Second"));
        assert_eq!(first_text(&d, &[".missing"]), None);
    }

    #[test]
    fn wide_image_skips_chrome_assets_and_narrow_images() {
        let d = doc(r#"<html><body>
            <img src="/img/site-logo.png" width="600" />
            <img src="/img/small.jpg" width="120" />
            <img src="/img/nosize.jpg" />
            <img src="/img/hero.jpg" width="900" />
        </body></html>"#);
        assert_eq!(wide_content_image(&d).as_deref(), Some("/img/hero.jpg"));
    }

    #[test]
    fn page_text_squashes_whitespace() {
        let d = doc("<html><body><p>Tickets\n\n   SOLD   out</p></body></html>");
        assert_eq!(page_text(&d), "Tickets SOLD out");
    }
}

pub mod category;
pub mod meta;
pub mod price;
pub mod slug;

use scraper::Html;

use crate::config::SOURCE_TAG;
use category::Category;

/// Listing kind, derived from the detail URL path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Attraction,
    Tour,
    Event,
}

impl Kind {
    pub fn from_url(url: &str) -> Self {
        if url.contains("/tours/") {
            Kind::Tour
        } else if url.contains("/event-tickets/") {
            Kind::Event
        } else {
            Kind::Attraction
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Attraction => "attraction",
            Kind::Tour => "tour",
            Kind::Event => "event",
        }
    }
}

/// One normalized scrape result, built fresh per detail page and handed to
/// the sink unchanged.
#[derive(Debug, Clone)]
pub struct Listing {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub price: f64,
    pub price_currency: String,
    pub image_url: String,
    pub cover_url: String,
    pub venue: String,
    pub location: String,
    pub category: Category,
    pub kind: Kind,
    pub original_url: String,
    pub affiliate_url: String,
    pub source: &'static str,
    pub is_sold_out: bool,
    pub is_active: bool,
}

const TITLE_SELECTORS: &[&str] = &["h1", ".event-title", ".attraction-title"];
const DESCRIPTION_SELECTORS: &[&str] = &[".event-description p", ".description p", "article p", "p"];
const IMAGE_SELECTORS: &[&str] = &[".event-image img", ".gallery img", ".hero img"];
const PRICE_SELECTORS: &[&str] = &[".price", ".ticket-price", ".from-price", ".event-price"];
const VENUE_SELECTORS: &[&str] = &[".venue-name", ".event-venue", "[itemprop=\"location\"]"];
const LOCATION_SELECTORS: &[&str] = &[".venue-address", ".event-location", "[itemprop=\"address\"]"];

/// Placeholder when a page carries no venue/location information.
const DEFAULT_PLACE: &str = "Bahrain";

/// Build a listing from rendered detail-page HTML. Every field degrades
/// independently to a default; only a missing title skips the page.
pub fn extract_listing(
    html: &str,
    url: &str,
    fragment: &str,
    affiliate_code: &str,
) -> Option<Listing> {
    let doc = Html::parse_document(html);

    let title = meta::og(&doc, "title")
        .or_else(|| meta::first_text(&doc, TITLE_SELECTORS))
        .or_else(|| meta::first_text(&doc, &["title"]).map(|t| strip_site_suffix(&t)))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())?;

    let description = meta::og(&doc, "description")
        .or_else(|| meta::meta_named(&doc, "description"))
        .or_else(|| {
            meta::first_text(&doc, DESCRIPTION_SELECTORS).filter(|t| t.len() > 40)
        })
        .unwrap_or_default();

    let image_url = meta::og(&doc, "image")
        .or_else(|| meta::first_attr(&doc, IMAGE_SELECTORS, "src"))
        .or_else(|| meta::wide_content_image(&doc))
        .unwrap_or_default();

    let venue = meta::first_text(&doc, VENUE_SELECTORS)
        .unwrap_or_else(|| DEFAULT_PLACE.to_string());
    let location = meta::first_text(&doc, LOCATION_SELECTORS)
        .unwrap_or_else(|| DEFAULT_PLACE.to_string());

    let page_text = meta::page_text(&doc);
    let price_text = meta::first_text(&doc, PRICE_SELECTORS).unwrap_or_else(|| page_text.clone());
    let parsed = price::parse_price(&price_text);
    let sold_out = parsed.sold_out || price::is_sold_out(&page_text);

    let category = category::classify(fragment, &title, &description);

    Some(Listing {
        slug: slug::slugify(&title),
        affiliate_url: slug::affiliate_link(url, affiliate_code),
        original_url: url.to_string(),
        kind: Kind::from_url(url),
        price: if sold_out { 0.0 } else { parsed.amount },
        price_currency: parsed.currency.to_string(),
        cover_url: image_url.clone(),
        image_url,
        title,
        description,
        venue,
        location,
        category,
        source: SOURCE_TAG,
        is_sold_out: sold_out,
        is_active: true,
    })
}

/// Titles from `<title>` tags carry a "| Platinumlist" style site suffix.
fn strip_site_suffix(title: &str) -> String {
    title
        .split('|')
        .next()
        .unwrap_or(title)
        .trim()
        .to_string()
}

use std::collections::HashSet;

use scraper::{Html, Selector};
use tracing::{info, warn};
use url::Url;

use crate::browser::PageDriver;
use crate::config::{CategoryPage, SourceSpec};

/// Pagination hard cap per category page.
const MAX_PAGINATION_PAGES: usize = 10;

/// Detail pages sit at least three path segments deep
/// (`/event-tickets/<id>/<slug>`); shallower same-host links are section
/// and navigation pages.
const MIN_DETAIL_SEGMENTS: usize = 3;

/// A detail URL plus the category fragment it was discovered under.
#[derive(Debug, Clone)]
pub struct CollectedUrl {
    pub url: String,
    pub fragment: &'static str,
}

/// Crawl every configured category page (paginated, ascending, capped) and
/// return the de-duplicated union of detail URLs in discovery order. A
/// failing category contributes zero URLs and never aborts the run.
pub async fn collect_detail_urls(driver: &dyn PageDriver, spec: &SourceSpec) -> Vec<CollectedUrl> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out: Vec<CollectedUrl> = Vec::new();

    for category in spec.categories {
        let before = out.len();
        collect_category(driver, spec, category, &mut seen, &mut out).await;
        info!(
            "Category {}: {} new detail URLs ({} total)",
            category.fragment,
            out.len() - before,
            out.len()
        );
    }

    out
}

async fn collect_category(
    driver: &dyn PageDriver,
    spec: &SourceSpec,
    category: &'static CategoryPage,
    seen: &mut HashSet<String>,
    out: &mut Vec<CollectedUrl>,
) {
    for page in 1..=MAX_PAGINATION_PAGES {
        let page_url = paginated(category.url, page);
        let html = match driver.fetch(&page_url).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Failed to load category page {}: {}", page_url, e);
                break;
            }
        };

        let links = extract_detail_links(&html, category.url, spec);
        if links.is_empty() {
            break;
        }

        for link in links {
            if seen.insert(link.clone()) {
                out.push(CollectedUrl {
                    url: link,
                    fragment: category.fragment,
                });
            }
        }
    }
}

fn paginated(base: &str, page: usize) -> String {
    if page == 1 {
        base.to_string()
    } else if base.contains('?') {
        format!("{}&page={}", base, page)
    } else {
        format!("{}?page={}", base, page)
    }
}

/// Anchors on a rendered listing page that look like detail pages:
/// same host, marker path, deep enough, not on the exclusion list.
fn extract_detail_links(html: &str, base: &str, spec: &SourceSpec) -> Vec<String> {
    let Ok(base_url) = Url::parse(base) else {
        return Vec::new();
    };
    let doc = Html::parse_document(html);
    let Ok(anchor) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut page_seen = HashSet::new();
    let mut links = Vec::new();
    for a in doc.select(&anchor) {
        let Some(href) = a.value().attr("href") else {
            continue;
        };
        let Ok(mut resolved) = base_url.join(href.trim()) else {
            continue;
        };
        resolved.set_fragment(None);
        let url = resolved.to_string();

        if !is_detail_link(&resolved, spec) || is_excluded(&url, spec) {
            continue;
        }
        if page_seen.insert(url.clone()) {
            links.push(url);
        }
    }
    links
}

fn is_detail_link(url: &Url, spec: &SourceSpec) -> bool {
    if url.host_str() != Some(spec.host) {
        return false;
    }
    let path = url.path();
    if !spec.detail_markers.iter().any(|m| path.contains(m)) {
        return false;
    }
    url.path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).count() >= MIN_DETAIL_SEGMENTS)
        .unwrap_or(false)
}

fn is_excluded(url: &str, spec: &SourceSpec) -> bool {
    spec.exclude_markers.iter().any(|m| url.contains(m))
}

use std::time::Duration;

/// Source tag written to every persisted row and used by the staleness sweep.
pub const SOURCE_TAG: &str = "platinumlist";

/// Runtime configuration, read once from the environment in `main` and
/// passed down explicitly.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub affiliate_code: String,
    pub nav_timeout: Duration,
    pub settle_delay: Duration,
    pub rate_limit: Duration,
    pub storage: Option<StorageConfig>,
}

/// Object-storage credentials. Absent config disables image processing.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub token: String,
}

impl Config {
    pub fn from_env() -> Self {
        let storage = match (
            std::env::var("STORAGE_ENDPOINT"),
            std::env::var("STORAGE_BUCKET"),
            std::env::var("STORAGE_TOKEN"),
        ) {
            (Ok(endpoint), Ok(bucket), Ok(token)) => Some(StorageConfig {
                endpoint: endpoint.trim_end_matches('/').to_string(),
                bucket,
                token,
            }),
            _ => None,
        };

        Self {
            db_path: std::env::var("PLATINUMLIST_DB")
                .unwrap_or_else(|_| "data/platinumlist.sqlite".into()),
            affiliate_code: std::env::var("AFFILIATE_CODE").unwrap_or_default(),
            nav_timeout: Duration::from_secs(env_u64("NAV_TIMEOUT_SECS", 30)),
            settle_delay: Duration::from_millis(env_u64("SETTLE_DELAY_MS", 2000)),
            rate_limit: Duration::from_millis(env_u64("RATE_LIMIT_MS", 1500)),
            storage,
        }
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Source specs ──

/// One configured listing page plus the URL fragment fed to the classifier.
pub struct CategoryPage {
    pub url: &'static str,
    pub fragment: &'static str,
}

/// A scrape source: the category pages to crawl and the URL shapes that
/// identify (or rule out) detail pages on that host.
pub struct SourceSpec {
    pub name: &'static str,
    pub host: &'static str,
    /// Key namespace for derived images (`processed/<entity>/...`).
    pub entity: &'static str,
    pub categories: &'static [CategoryPage],
    /// A detail link must contain one of these path markers...
    pub detail_markers: &'static [&'static str],
    /// ...and none of these.
    pub exclude_markers: &'static [&'static str],
}

const ATTRACTION_CATEGORIES: &[CategoryPage] = &[
    CategoryPage {
        url: "https://bahrain.platinumlist.net/attractions/water-parks",
        fragment: "water-parks",
    },
    CategoryPage {
        url: "https://bahrain.platinumlist.net/attractions/theme-parks",
        fragment: "theme-parks",
    },
    CategoryPage {
        url: "https://bahrain.platinumlist.net/attractions/museums",
        fragment: "museums",
    },
    CategoryPage {
        url: "https://bahrain.platinumlist.net/attractions/family",
        fragment: "family",
    },
];

const EXPERIENCE_CATEGORIES: &[CategoryPage] = &[
    CategoryPage {
        url: "https://bahrain.platinumlist.net/experiences/cruises",
        fragment: "cruises",
    },
    CategoryPage {
        url: "https://bahrain.platinumlist.net/experiences/tours",
        fragment: "tours",
    },
    CategoryPage {
        url: "https://bahrain.platinumlist.net/event-tickets",
        fragment: "shows",
    },
];

const DETAIL_MARKERS: &[&str] = &[
    "/event-tickets/",
    "/attractions/",
    "/experiences/",
    "/tours/",
];

const EXCLUDE_MARKERS: &[&str] = &[
    "/concerts/",
    "/venues/",
    "/artists/",
    "/news/",
    "/login",
    "/cart",
    "?page=",
];

static SOURCES: &[SourceSpec] = &[
    SourceSpec {
        name: "attractions",
        host: "bahrain.platinumlist.net",
        entity: "attraction",
        categories: ATTRACTION_CATEGORIES,
        detail_markers: DETAIL_MARKERS,
        exclude_markers: EXCLUDE_MARKERS,
    },
    SourceSpec {
        name: "experiences",
        host: "bahrain.platinumlist.net",
        entity: "experience",
        categories: EXPERIENCE_CATEGORIES,
        detail_markers: DETAIL_MARKERS,
        exclude_markers: EXCLUDE_MARKERS,
    },
];

pub fn sources() -> &'static [SourceSpec] {
    SOURCES
}

pub fn find_source(name: &str) -> Option<&'static SourceSpec> {
    SOURCES.iter().find(|s| s.name == name)
}

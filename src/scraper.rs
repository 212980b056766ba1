use std::collections::HashSet;
use std::time::Instant;

use anyhow::{anyhow, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rusqlite::Connection;
use serde::Serialize;
use tracing::{info, warn};

use crate::browser::PageDriver;
use crate::collect::{self, CollectedUrl};
use crate::config::{Config, SourceSpec, SOURCE_TAG};
use crate::db;
use crate::extract::{self, Listing};
use crate::images;
use crate::storage::ObjectStore;

/// Final run report. `success` reflects only the top-level containment
/// boundary; per-URL failures land in `errors` without failing the run.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub success: bool,
    pub total_scraped: usize,
    pub total_upserted: usize,
    pub total_deactivated: usize,
    pub errors: Vec<String>,
    pub duration_secs: f64,
}

impl RunSummary {
    fn new() -> Self {
        Self {
            success: true,
            total_scraped: 0,
            total_upserted: 0,
            total_deactivated: 0,
            errors: Vec::new(),
            duration_secs: 0.0,
        }
    }
}

/// One scrape run over the configured sources. All collaborators are
/// injected; the pipeline owns no global state.
pub struct Pipeline<'a> {
    pub driver: &'a dyn PageDriver,
    pub conn: &'a Connection,
    pub store: Option<&'a dyn ObjectStore>,
    pub http: reqwest::Client,
    pub config: &'a Config,
    pub specs: &'a [&'a SourceSpec],
    pub limit: Option<usize>,
    /// The sweep diffs against every active row for the source tag, so it
    /// only runs when all configured specs were scraped this run.
    pub sweep: bool,
}

impl<'a> Pipeline<'a> {
    /// Collect → scrape each detail page → upsert → staleness sweep.
    /// The single crash-containment boundary: anything that escapes the
    /// inner steps becomes the run's sole error and a failed summary.
    pub async fn run(&self) -> RunSummary {
        let t0 = Instant::now();
        let mut summary = RunSummary::new();
        if let Err(e) = self.run_inner(&mut summary).await {
            warn!("Run failed: {:#}", e);
            summary.success = false;
            summary.errors.push(format!("{:#}", e));
        }
        summary.duration_secs = t0.elapsed().as_secs_f64();
        summary
    }

    async fn run_inner(&self, summary: &mut RunSummary) -> Result<()> {
        let mut targets: Vec<(&SourceSpec, CollectedUrl)> = Vec::new();
        let mut queued: HashSet<String> = HashSet::new();

        for spec in self.specs.iter().copied() {
            info!("Collecting detail URLs for source '{}'", spec.name);
            for collected in collect::collect_detail_urls(self.driver, spec).await {
                if queued.insert(collected.url.clone()) {
                    targets.push((spec, collected));
                }
            }
        }

        if let Some(limit) = self.limit {
            targets.truncate(limit);
        }
        if targets.is_empty() {
            info!("No detail URLs collected; nothing to scrape.");
            return Ok(());
        }

        info!("Scraping {} detail pages", targets.len());
        let pb = ProgressBar::new(targets.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
                .progress_chars("=> "),
        );

        let mut seen_keys: HashSet<String> = HashSet::new();
        for (spec, collected) in &targets {
            match self.scrape_detail(spec, collected).await {
                Ok(listing) => {
                    summary.total_scraped += 1;
                    seen_keys.insert(listing.original_url.clone());
                    match db::upsert_listing(self.conn, &listing) {
                        Ok(()) => summary.total_upserted += 1,
                        Err(e) => {
                            warn!("Upsert failed for {}: {}", listing.slug, e);
                            summary.errors.push(format!("upsert {}: {}", listing.slug, e));
                        }
                    }
                }
                Err(e) => {
                    warn!("Skipping {}: {}", collected.url, e);
                    summary.errors.push(format!("{}: {}", collected.url, e));
                }
            }
            pb.inc(1);
            tokio::time::sleep(self.config.rate_limit).await;
        }
        pb.finish_and_clear();

        if self.sweep {
            match db::deactivate_stale(self.conn, SOURCE_TAG, &seen_keys) {
                Ok(n) => {
                    info!("Staleness sweep deactivated {} listings", n);
                    summary.total_deactivated = n;
                }
                Err(e) => {
                    warn!("Staleness sweep failed: {}", e);
                    summary.errors.push(format!("sweep: {}", e));
                }
            }
        } else {
            info!("Skipping staleness sweep (source-filtered run)");
        }

        Ok(())
    }

    /// Navigate one detail page and build its listing. Failures here are
    /// per-URL: the caller logs, counts, and moves on.
    async fn scrape_detail(&self, spec: &SourceSpec, collected: &CollectedUrl) -> Result<Listing> {
        let html = self.driver.fetch(&collected.url).await?;
        let mut listing = extract::extract_listing(
            &html,
            &collected.url,
            collected.fragment,
            &self.config.affiliate_code,
        )
        .ok_or_else(|| anyhow!("no title on page"))?;

        if let Some(store) = self.store {
            images::attach_images(&self.http, store, &mut listing, spec.entity).await;
        }
        Ok(listing)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::browser::testing::CannedDriver;
    use crate::config::CategoryPage;

    const HOST_BASE: &str = "https://bahrain.platinumlist.net";

    const CATEGORIES: &[CategoryPage] = &[
        CategoryPage {
            url: "https://bahrain.platinumlist.net/attractions/water-parks",
            fragment: "water-parks",
        },
        CategoryPage {
            url: "https://bahrain.platinumlist.net/attractions/museums",
            fragment: "museums",
        },
        CategoryPage {
            url: "https://bahrain.platinumlist.net/experiences/cruises",
            fragment: "cruises",
        },
    ];

    fn spec() -> SourceSpec {
        SourceSpec {
            name: "test",
            host: "bahrain.platinumlist.net",
            entity: "attraction",
            categories: CATEGORIES,
            detail_markers: &["/event-tickets/"],
            exclude_markers: &["/concerts/"],
        }
    }

    fn test_config() -> Config {
        Config {
            db_path: ":memory:".into(),
            affiliate_code: "test".into(),
            nav_timeout: Duration::from_secs(1),
            settle_delay: Duration::ZERO,
            rate_limit: Duration::ZERO,
            storage: None,
        }
    }

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();
        conn
    }

    fn listing_page(title: &str) -> String {
        format!(
            r#"<html><head><meta property="og:title" content="{}" /></head>
            <body><div class="price">BHD 10</div></body></html>"#,
            title
        )
    }

    fn category_page(links: &[&str]) -> String {
        let anchors: String = links
            .iter()
            .map(|l| format!(r#"<a href="{}">x</a>"#, l))
            .collect();
        format!("<html><body>{}</body></html>", anchors)
    }

    fn detail_url(n: usize) -> String {
        format!("{}/event-tickets/{}/listing-{}", HOST_BASE, n, n)
    }

    /// 3 categories, each contributing 2 URLs, one URL shared between two
    /// categories: 5 unique detail pages.
    fn canned_pages() -> Vec<(String, String)> {
        let dupe = detail_url(5);
        let mut pages = vec![
            (
                format!("{}/attractions/water-parks", HOST_BASE),
                category_page(&[&detail_url(1), &detail_url(2)]),
            ),
            (
                format!("{}/attractions/water-parks?page=2", HOST_BASE),
                "<html></html>".to_string(),
            ),
            (
                format!("{}/attractions/museums", HOST_BASE),
                category_page(&[&detail_url(3), &dupe]),
            ),
            (
                format!("{}/attractions/museums?page=2", HOST_BASE),
                "<html></html>".to_string(),
            ),
            (
                format!("{}/experiences/cruises", HOST_BASE),
                category_page(&[&detail_url(4), &dupe]),
            ),
            (
                format!("{}/experiences/cruises?page=2", HOST_BASE),
                "<html></html>".to_string(),
            ),
        ];
        for n in 1..=5 {
            pages.push((detail_url(n), listing_page(&format!("Listing {}", n))));
        }
        pages
    }

    fn driver_from(pages: &[(String, String)]) -> CannedDriver {
        let borrowed: Vec<(&str, &str)> = pages
            .iter()
            .map(|(u, h)| (u.as_str(), h.as_str()))
            .collect();
        CannedDriver::new(&borrowed)
    }

    #[tokio::test]
    async fn end_to_end_scrapes_five_unique_listings() {
        let pages = canned_pages();
        let driver = driver_from(&pages);
        let conn = test_conn();
        let config = test_config();
        let spec = spec();
        let specs: &[&SourceSpec] = &[&spec];

        let pipeline = Pipeline {
            driver: &driver,
            conn: &conn,
            store: None,
            http: reqwest::Client::new(),
            config: &config,
            specs,
            limit: None,
            sweep: true,
        };
        let summary = pipeline.run().await;

        assert!(summary.success, "errors: {:?}", summary.errors);
        assert_eq!(summary.total_scraped, 5);
        assert_eq!(summary.total_upserted, 5);
        assert_eq!(summary.total_deactivated, 0);
        assert!(summary.errors.is_empty());

        let rows: usize = conn
            .query_row("SELECT COUNT(*) FROM listings", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, 5);
    }

    #[tokio::test]
    async fn sweep_deactivates_rows_absent_from_this_run() {
        let pages = canned_pages();
        let driver = driver_from(&pages);
        let conn = test_conn();

        // Three previously-active rows the canned site no longer lists.
        for n in 100..103 {
            let html = listing_page(&format!("Old {}", n));
            let url = detail_url(n);
            let l = extract::extract_listing(&html, &url, "", "test").unwrap();
            db::upsert_listing(&conn, &l).unwrap();
        }

        let config = test_config();
        let spec = spec();
        let specs: &[&SourceSpec] = &[&spec];
        let pipeline = Pipeline {
            driver: &driver,
            conn: &conn,
            store: None,
            http: reqwest::Client::new(),
            config: &config,
            specs,
            limit: None,
            sweep: true,
        };
        let summary = pipeline.run().await;

        assert!(summary.success);
        assert_eq!(summary.total_scraped, 5);
        assert_eq!(summary.total_deactivated, 3);

        let active: usize = conn
            .query_row(
                "SELECT COUNT(*) FROM listings WHERE is_active = 1",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(active, 5);
    }

    #[tokio::test]
    async fn detail_failure_is_counted_but_not_fatal() {
        // Second detail page is not canned, so its fetch fails.
        let mut pages = vec![
            (
                format!("{}/attractions/water-parks", HOST_BASE),
                category_page(&[&detail_url(1), &detail_url(2)]),
            ),
            (
                format!("{}/attractions/water-parks?page=2", HOST_BASE),
                "<html></html>".to_string(),
            ),
            (
                format!("{}/attractions/museums", HOST_BASE),
                "<html></html>".to_string(),
            ),
            (
                format!("{}/experiences/cruises", HOST_BASE),
                "<html></html>".to_string(),
            ),
        ];
        pages.push((detail_url(1), listing_page("Only One")));
        let driver = driver_from(&pages);
        let conn = test_conn();
        let config = test_config();
        let spec = spec();
        let specs: &[&SourceSpec] = &[&spec];

        let pipeline = Pipeline {
            driver: &driver,
            conn: &conn,
            store: None,
            http: reqwest::Client::new(),
            config: &config,
            specs,
            limit: None,
            sweep: true,
        };
        let summary = pipeline.run().await;

        assert!(summary.success);
        assert_eq!(summary.total_scraped, 1);
        assert_eq!(summary.total_upserted, 1);
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].contains(&detail_url(2)));
    }

    #[tokio::test]
    async fn filtered_run_skips_the_sweep() {
        let pages = canned_pages();
        let driver = driver_from(&pages);
        let conn = test_conn();

        let html = listing_page("Old Row");
        let url = detail_url(200);
        let l = extract::extract_listing(&html, &url, "", "test").unwrap();
        db::upsert_listing(&conn, &l).unwrap();

        let config = test_config();
        let spec = spec();
        let specs: &[&SourceSpec] = &[&spec];
        let pipeline = Pipeline {
            driver: &driver,
            conn: &conn,
            store: None,
            http: reqwest::Client::new(),
            config: &config,
            specs,
            limit: None,
            sweep: false,
        };
        let summary = pipeline.run().await;

        assert_eq!(summary.total_deactivated, 0);
        let active: usize = conn
            .query_row(
                "SELECT COUNT(*) FROM listings WHERE is_active = 1",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(active, 6);
    }
}

mod browser;
mod collect;
mod config;
mod db;
mod extract;
mod images;
mod scraper;
mod storage;

use std::time::Instant;

use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::SourceSpec;
use crate::storage::ObjectStore;

#[derive(Parser)]
#[command(
    name = "platinumlist_scraper",
    about = "Platinumlist attraction & experience scraper"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape all configured sources and upsert listings
    Run {
        /// Only scrape one source (attractions, experiences); skips the staleness sweep
        #[arg(short, long)]
        source: Option<String>,
        /// Max detail pages to scrape
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Skip image download/transcode/upload
        #[arg(long)]
        skip_images: bool,
    },
    /// Collect and print detail URLs without scraping them
    Collect {
        /// Only collect for one source
        #[arg(short, long)]
        source: Option<String>,
    },
    /// Show stored listing counts
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let cfg = config::Config::from_env();

    match cli.command {
        Commands::Run {
            source,
            limit,
            skip_images,
        } => {
            let specs = select_sources(source.as_deref())?;
            let sweep = specs.len() == config::sources().len();

            let conn = db::connect(&cfg.db_path)?;
            db::init_schema(&conn)?;
            let driver = browser::ChromeDriver::new(cfg.nav_timeout, cfg.settle_delay)?;
            let http = reqwest::Client::new();

            let store = match (&cfg.storage, skip_images) {
                (Some(sc), false) => Some(storage::HttpObjectStore::new(http.clone(), sc)),
                _ => {
                    info!("Image processing disabled (no storage config or --skip-images)");
                    None
                }
            };
            let store_ref: Option<&dyn ObjectStore> =
                store.as_ref().map(|s| s as &dyn ObjectStore);

            let pipeline = scraper::Pipeline {
                driver: &driver,
                conn: &conn,
                store: store_ref,
                http,
                config: &cfg,
                specs: &specs,
                limit,
                sweep,
            };
            let summary = pipeline.run().await;

            println!(
                "Scraped {} listings ({} upserted, {} deactivated, {} errors).",
                summary.total_scraped,
                summary.total_upserted,
                summary.total_deactivated,
                summary.errors.len()
            );
            println!("{}", serde_json::to_string_pretty(&summary)?);

            print_elapsed(t0);
            if !summary.success {
                std::process::exit(1);
            }
        }
        Commands::Collect { source } => {
            let specs = select_sources(source.as_deref())?;
            let driver = browser::ChromeDriver::new(cfg.nav_timeout, cfg.settle_delay)?;

            let mut total = 0;
            for spec in &specs {
                let urls = collect::collect_detail_urls(&driver, spec).await;
                for collected in &urls {
                    println!("{}\t{}", collected.fragment, collected.url);
                }
                total += urls.len();
            }
            println!("\n{} detail URLs collected", total);
            print_elapsed(t0);
        }
        Commands::Stats => {
            let conn = db::connect(&cfg.db_path)?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Total:    {}", s.total);
            println!("Active:   {}", s.active);
            println!("Inactive: {}", s.total - s.active);
            println!("Sold out: {}", s.sold_out);
            if !s.by_category.is_empty() {
                println!("\n--- Categories ---");
                for (category, count) in &s.by_category {
                    println!("  {:<14} {}", category, count);
                }
            }
        }
    }

    Ok(())
}

fn select_sources(name: Option<&str>) -> anyhow::Result<Vec<&'static SourceSpec>> {
    match name {
        None => Ok(config::sources().iter().collect()),
        Some(n) => config::find_source(n)
            .map(|spec| vec![spec])
            .ok_or_else(|| anyhow::anyhow!("Unknown source '{}'", n)),
    }
}

fn print_elapsed(t0: Instant) {
    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

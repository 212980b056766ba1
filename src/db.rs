use std::collections::HashSet;
use std::path::Path;

use anyhow::Result;
use rusqlite::Connection;
use tracing::warn;

use crate::extract::Listing;

/// Deactivation updates are chunked to respect statement parameter limits.
const DEACTIVATE_BATCH: usize = 100;

pub fn connect(path: &str) -> Result<Connection> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS listings (
            id             INTEGER PRIMARY KEY,
            source         TEXT NOT NULL,
            slug           TEXT NOT NULL,
            title          TEXT NOT NULL,
            description    TEXT NOT NULL DEFAULT '',
            price          REAL NOT NULL DEFAULT 0 CHECK(price >= 0),
            price_currency TEXT NOT NULL DEFAULT 'BHD',
            image_url      TEXT NOT NULL DEFAULT '',
            cover_url      TEXT NOT NULL DEFAULT '',
            venue          TEXT NOT NULL DEFAULT '',
            location       TEXT NOT NULL DEFAULT '',
            category       TEXT NOT NULL,
            kind           TEXT NOT NULL CHECK(kind IN ('attraction','tour','event')),
            original_url   TEXT NOT NULL,
            affiliate_url  TEXT NOT NULL,
            is_sold_out    BOOLEAN NOT NULL DEFAULT 0,
            is_active      BOOLEAN NOT NULL DEFAULT 1,
            created_at     TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at     TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(source, original_url)
        );
        CREATE INDEX IF NOT EXISTS idx_listings_slug ON listings(slug);
        CREATE INDEX IF NOT EXISTS idx_listings_active ON listings(source, is_active);
        CREATE INDEX IF NOT EXISTS idx_listings_category ON listings(category);
        ",
    )?;
    Ok(())
}

// ── Upsert sink ──

/// Insert-or-update keyed by `(source, original_url)`. Rows are never
/// deleted; a re-sighting refreshes every scraped column and reactivates
/// the row.
pub fn upsert_listing(conn: &Connection, l: &Listing) -> Result<()> {
    conn.execute(
        "INSERT INTO listings
         (source, slug, title, description, price, price_currency, image_url,
          cover_url, venue, location, category, kind, original_url,
          affiliate_url, is_sold_out, is_active)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16)
         ON CONFLICT(source, original_url) DO UPDATE SET
            slug = excluded.slug,
            title = excluded.title,
            description = excluded.description,
            price = excluded.price,
            price_currency = excluded.price_currency,
            image_url = excluded.image_url,
            cover_url = excluded.cover_url,
            venue = excluded.venue,
            location = excluded.location,
            category = excluded.category,
            kind = excluded.kind,
            affiliate_url = excluded.affiliate_url,
            is_sold_out = excluded.is_sold_out,
            is_active = excluded.is_active,
            updated_at = datetime('now')",
        rusqlite::params![
            l.source,
            l.slug,
            l.title,
            l.description,
            l.price,
            l.price_currency,
            l.image_url,
            l.cover_url,
            l.venue,
            l.location,
            l.category.as_str(),
            l.kind.as_str(),
            l.original_url,
            l.affiliate_url,
            l.is_sold_out,
            l.is_active,
        ],
    )?;
    Ok(())
}

// ── Staleness sweep ──

pub fn fetch_active_urls(conn: &Connection, source: &str) -> Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT original_url FROM listings WHERE source = ? AND is_active = 1")?;
    let rows = stmt
        .query_map([source], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Flag every active row whose key was not seen this run. Returns the
/// number of rows deactivated.
pub fn deactivate_stale(conn: &Connection, source: &str, seen: &HashSet<String>) -> Result<usize> {
    let missing: Vec<String> = fetch_active_urls(conn, source)?
        .into_iter()
        .filter(|url| !seen.contains(url))
        .collect();
    Ok(deactivate_keys(conn, source, &missing, DEACTIVATE_BATCH))
}

/// Batched `is_active = 0` update. A failed batch is logged and the rest
/// still attempt.
pub fn deactivate_keys(conn: &Connection, source: &str, keys: &[String], batch: usize) -> usize {
    let mut deactivated = 0;
    for chunk in keys.chunks(batch.max(1)) {
        let placeholders = vec!["?"; chunk.len()].join(",");
        let sql = format!(
            "UPDATE listings
             SET is_active = 0, updated_at = datetime('now')
             WHERE source = ? AND is_active = 1 AND original_url IN ({})",
            placeholders
        );
        let params = rusqlite::params_from_iter(
            std::iter::once(source).chain(chunk.iter().map(String::as_str)),
        );
        match conn.execute(&sql, params) {
            Ok(changed) => deactivated += changed,
            Err(e) => warn!("Deactivation batch of {} failed: {}", chunk.len(), e),
        }
    }
    deactivated
}

// ── Stats ──

pub struct Stats {
    pub total: usize,
    pub active: usize,
    pub sold_out: usize,
    pub by_category: Vec<(String, usize)>,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let total: usize = conn.query_row("SELECT COUNT(*) FROM listings", [], |r| r.get(0))?;
    let active: usize = conn.query_row(
        "SELECT COUNT(*) FROM listings WHERE is_active = 1",
        [],
        |r| r.get(0),
    )?;
    let sold_out: usize = conn.query_row(
        "SELECT COUNT(*) FROM listings WHERE is_sold_out = 1",
        [],
        |r| r.get(0),
    )?;

    let mut stmt = conn.prepare(
        "SELECT category, COUNT(*) FROM listings GROUP BY category ORDER BY COUNT(*) DESC",
    )?;
    let by_category = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Stats {
        total,
        active,
        sold_out,
        by_category,
    })
}

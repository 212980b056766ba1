use std::io::Cursor;

use anyhow::{Context, Result};
use image::GenericImageView;
use tracing::{debug, warn};

use crate::extract::Listing;
use crate::storage::ObjectStore;

/// The two derived sizes produced from every source image.
#[derive(Debug, Clone, Copy)]
pub enum Variant {
    Thumbnail,
    Cover,
}

impl Variant {
    fn label(&self) -> &'static str {
        match self {
            Variant::Thumbnail => "thumbnail",
            Variant::Cover => "cover",
        }
    }

    /// Bounding box; resizes preserve aspect ratio and never upscale.
    fn bounds(&self) -> (u32, u32) {
        match self {
            Variant::Thumbnail => (400, 300),
            Variant::Cover => (1200, 800),
        }
    }
}

/// Download source image bytes. Any failure (network, non-2xx, empty body)
/// is reported as `None`; the caller keeps the original URL on the listing.
pub async fn fetch_image(client: &reqwest::Client, url: &str) -> Option<Vec<u8>> {
    let response = client.get(url).send().await.ok()?;
    if !response.status().is_success() {
        return None;
    }
    let bytes = response.bytes().await.ok()?;
    (!bytes.is_empty()).then(|| bytes.to_vec())
}

/// Fetch + transcode + upload both variants, rewriting `image_url` and
/// `cover_url` on success. Every failure path leaves the corresponding
/// field at its prior value.
pub async fn attach_images(
    client: &reqwest::Client,
    store: &dyn ObjectStore,
    listing: &mut Listing,
    entity: &str,
) {
    if listing.image_url.is_empty() {
        return;
    }
    let Some(bytes) = fetch_image(client, &listing.image_url).await else {
        warn!("Image fetch failed for {}, keeping source URL", listing.slug);
        return;
    };
    attach_variants(store, listing, entity, &bytes).await;
}

async fn attach_variants(store: &dyn ObjectStore, listing: &mut Listing, entity: &str, bytes: &[u8]) {
    for variant in [Variant::Thumbnail, Variant::Cover] {
        match upload_variant(store, entity, &listing.slug, variant, bytes).await {
            Ok(url) => {
                debug!("Stored {} {} -> {}", listing.slug, variant.label(), url);
                match variant {
                    Variant::Thumbnail => listing.image_url = url,
                    Variant::Cover => listing.cover_url = url,
                }
            }
            Err(e) => {
                warn!("Image {} failed for {}: {}", variant.label(), listing.slug, e);
            }
        }
    }
}

async fn upload_variant(
    store: &dyn ObjectStore,
    entity: &str,
    slug: &str,
    variant: Variant,
    bytes: &[u8],
) -> Result<String> {
    let encoded = transcode(bytes, variant)?;
    store.put(&object_key(entity, slug, variant), encoded, "image/webp").await
}

/// Decode, fit into the variant's bounding box (aspect-preserving, no
/// upscaling), re-encode as WebP.
fn transcode(bytes: &[u8], variant: Variant) -> Result<Vec<u8>> {
    let img = image::load_from_memory(bytes).context("Failed to decode source image")?;
    let (max_w, max_h) = variant.bounds();
    let (w, h) = img.dimensions();
    let resized = if w > max_w || h > max_h {
        img.thumbnail(max_w, max_h)
    } else {
        img
    };

    let mut out = Cursor::new(Vec::new());
    resized
        .write_to(&mut out, image::ImageFormat::WebP)
        .context("Failed to encode webp")?;
    Ok(out.into_inner())
}

/// `processed/<entity>/<slug>-<variant>-<epoch-ms>.webp`; the timestamp
/// keeps re-runs from colliding on the same key.
fn object_key(entity: &str, slug: &str, variant: Variant) -> String {
    format!(
        "processed/{}/{}-{}-{}.webp",
        entity,
        slug,
        variant.label(),
        chrono::Utc::now().timestamp_millis()
    )
}

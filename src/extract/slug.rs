/// Derive a URL-safe slug from a listing title: lowercase, alphanumerics
/// and hyphens only, whitespace collapsed to single hyphens. Idempotent on
/// already-valid slugs.
pub fn slugify(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if ch.is_whitespace() || ch == '-' {
            if !out.ends_with('-') {
                out.push('-');
            }
        }
        // Everything else (punctuation, symbols, non-ASCII) is dropped.
    }
    out.trim_matches('-').to_string()
}

/// Wrap an outbound listing URL with the affiliate tracking reference.
/// The exact byte layout matters for downstream commission attribution.
pub fn affiliate_link(original_url: &str, code: &str) -> String {
    format!(
        "https://bahrain.platinumlist.net/aff/?ref={}&link={}",
        code,
        urlencoding::encode(original_url)
    )
}

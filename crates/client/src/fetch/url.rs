//! URL resolution against the controlled origin.

use url::Url;

/// Error type for URL resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Resolve a path or absolute URL against `origin`.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Join relative input onto the origin
/// 3. Reject non-http(s) schemes
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn resolve(origin: &Url, input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = origin.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Whether two URLs share scheme, host and port.
pub fn is_same_origin(a: &Url, b: &Url) -> bool {
    a.origin() == b.origin()
}

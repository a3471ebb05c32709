//! URL canonicalization.
//!
//! Counts and cached content are keyed by URL, so every spelling of the same
//! resource has to collapse to one string before it reaches the store.

use tally_core::Error;

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("missing host")]
    MissingHost,

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<UrlError> for Error {
    fn from(err: UrlError) -> Self {
        Error::InvalidUrl(err.to_string())
    }
}

/// Canonicalize a URL string.
///
/// 1. Trim surrounding whitespace
/// 2. Default the scheme to `https://` when none is given
/// 3. Accept only `http` and `https`
/// 4. Lowercase the host and drop a trailing dot
/// 5. Drop the fragment; keep the query string as-is
///
/// Default ports are removed by the parser.
pub fn canonicalize(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let with_scheme = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };
    let mut parsed = url::Url::parse(&with_scheme).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(UrlError::UnsupportedScheme(parsed.scheme().to_string()));
    }

    let host = parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or(UrlError::MissingHost)?;
    let normalized = host.trim_end_matches('.').to_lowercase();
    if normalized != host {
        parsed
            .set_host(Some(&normalized))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

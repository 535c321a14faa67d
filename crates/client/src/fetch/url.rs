//! URL canonicalization and resolution against the application origin.

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Whether requests to this URL may be intercepted (http and https only).
pub fn is_interceptable(url: &url::Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// Canonicalize an absolute URL string so equal requests share a cache key.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to https:// if missing
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn canonicalize(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };

    let mut parsed = url::Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    if !is_interceptable(&parsed) {
        return Err(UrlError::UnsupportedScheme(parsed.scheme().to_string()));
    }

    if let Some(host) = parsed.host_str().map(str::to_lowercase) {
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Resolve a request target against the application origin.
///
/// Paths starting with `/` are joined onto `origin`; anything else is
/// treated as an absolute URL and canonicalized.
pub fn resolve(origin: &url::Url, input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    if trimmed.starts_with('/') && !trimmed.starts_with("//") {
        let mut joined = origin.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
        joined.set_fragment(None);
        return Ok(joined);
    }

    canonicalize(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> url::Url {
        url::Url::parse("https://souk.example").unwrap()
    }

    #[test]
    fn test_canonicalize_basic() {
        let url = canonicalize("https://souk.example").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("souk.example"));
    }

    #[test]
    fn test_canonicalize_default_scheme() {
        let url = canonicalize("souk.example/listings").unwrap();
        assert_eq!(url.as_str(), "https://souk.example/listings");
    }

    #[test]
    fn test_canonicalize_lowercase_host() {
        let url = canonicalize("https://SOUK.EXAMPLE").unwrap();
        assert_eq!(url.host_str(), Some("souk.example"));
    }

    #[test]
    fn test_canonicalize_remove_fragment_keep_query() {
        let url = canonicalize("https://souk.example/search?q=lamp&page=2#results").unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.query(), Some("q=lamp&page=2"));
    }

    #[test]
    fn test_canonicalize_unsupported_scheme() {
        let result = canonicalize("chrome-extension://abc/script.js");
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_canonicalize_empty() {
        assert!(matches!(canonicalize("   "), Err(UrlError::Empty)));
    }

    #[test]
    fn test_resolve_relative_path() {
        let url = resolve(&origin(), "/api/products?page=1").unwrap();
        assert_eq!(url.as_str(), "https://souk.example/api/products?page=1");
    }

    #[test]
    fn test_resolve_absolute_url() {
        let url = resolve(&origin(), "https://cdn.souk.example/img/lamp.png").unwrap();
        assert_eq!(url.host_str(), Some("cdn.souk.example"));
    }

    #[test]
    fn test_is_interceptable() {
        assert!(is_interceptable(&origin()));
        assert!(!is_interceptable(&url::Url::parse("data:text/plain,hello").unwrap()));
    }
}

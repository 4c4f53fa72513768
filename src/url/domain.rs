use crate::{UrlError, UrlResult};
use std::collections::HashSet;
use url::Url;

/// Parses an absolute http(s) URL with a host
///
/// # Returns
///
/// * `Ok(Url)` - The parsed URL
/// * `Err(UrlError)` - Unparseable, not http(s), or missing a host
pub fn parse_http_url(url: &str) -> UrlResult<Url> {
    let parsed = Url::parse(url).map_err(|e| UrlError::Parse(format!("{}: {}", url, e)))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(UrlError::InvalidScheme(other.to_string())),
    }

    if parsed.host_str().is_none() {
        return Err(UrlError::MissingHost(url.to_string()));
    }

    Ok(parsed)
}

/// Returns true when the URL uses the `http` or `https` scheme
///
/// # Examples
///
/// ```
/// use seen::url::is_http_url;
///
/// assert!(is_http_url("https://example.com/"));
/// assert!(is_http_url("HTTP://example.com/"));
/// assert!(!is_http_url("ftp://example.com/"));
/// assert!(!is_http_url("/relative/path"));
/// ```
pub fn is_http_url(url: &str) -> bool {
    let scheme_end = match url.find("://") {
        Some(i) => i,
        None => return false,
    };
    let scheme = &url[..scheme_end];
    scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https")
}

/// Extracts the host component from a URL
///
/// The host is lowercased and keeps an explicit non-default port, so
/// `http://127.0.0.1:8080/` yields `127.0.0.1:8080`.
///
/// # Arguments
///
/// * `url` - The URL to extract the host from
///
/// # Returns
///
/// * `Some(String)` - The host (with port when one is given explicitly)
/// * `None` - If the URL cannot be parsed or has no host
///
/// # Examples
///
/// ```
/// use seen::url::extract_host;
///
/// assert_eq!(extract_host("https://Example.com/path"), Some("example.com".to_string()));
/// assert_eq!(extract_host("http://localhost:3000/"), Some("localhost:3000".to_string()));
/// assert_eq!(extract_host("not a url"), None);
/// ```
pub fn extract_host(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_lowercase();

    match parsed.port() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host),
    }
}

/// Checks a host against the allow-list
///
/// An empty allow-list permits every host. Comparison ignores ASCII case.
pub fn host_allowed(host: &str, url_limit: &HashSet<String>) -> bool {
    url_limit.is_empty()
        || url_limit
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(host))
}

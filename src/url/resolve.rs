/// Resolves a discovered link against the URL of the page it was found on
///
/// # Resolution Rules
///
/// | Link form | Result |
/// |-----------|--------|
/// | `http://…` / `https://…` | unchanged |
/// | `//host/path` | `http:` prefixed |
/// | `/path` | base scheme and host joined with the path |
/// | `path` | base directory (base truncated after its last `/`) joined with the path |
///
/// Links that can never become an http(s) URL are dropped: empty links,
/// fragment-only anchors, and other schemes such as `javascript:`, `mailto:`,
/// `tel:` or `data:`. A base that is not an absolute http(s) URL resolves
/// nothing but absolute links.
///
/// # Arguments
///
/// * `link` - The raw link as it appeared in the markup
/// * `base` - The URL of the page the link was found on
///
/// # Returns
///
/// * `Some(String)` - The absolute URL
/// * `None` - The link was dropped
///
/// # Examples
///
/// ```
/// use seen::url::resolve_url;
///
/// let base = "https://test.com/testFolder/test.html";
/// assert_eq!(resolve_url("/test?id=1", base).as_deref(), Some("https://test.com/test?id=1"));
/// assert_eq!(resolve_url("test?id=2", base).as_deref(), Some("https://test.com/testFolder/test?id=2"));
/// assert_eq!(resolve_url("//cdn.x.com/a.png", base).as_deref(), Some("http://cdn.x.com/a.png"));
/// ```
pub fn resolve_url(link: &str, base: &str) -> Option<String> {
    let link = link.trim();

    if link.is_empty() || link.starts_with('#') {
        return None;
    }

    if super::is_http_url(link) {
        return Some(link.to_string());
    }

    if link.starts_with("//") {
        return Some(format!("http:{}", link));
    }

    if has_scheme(link) {
        return None;
    }

    if !super::is_http_url(base) {
        return None;
    }

    let origin = origin_of(base);
    if link.starts_with('/') {
        return Some(format!("{}{}", origin, link));
    }

    Some(format!("{}{}", directory_of(base, origin.len()), link))
}

/// Returns true when the link starts with an RFC 3986 scheme (`name:`)
fn has_scheme(link: &str) -> bool {
    let end = match link.find(|c| matches!(c, ':' | '/' | '?' | '#')) {
        Some(i) if link[i..].starts_with(':') => i,
        _ => return false,
    };

    let scheme = &link[..end];
    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => chars
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')),
        _ => false,
    }
}

/// `scheme://host[:port]` of an absolute URL
fn origin_of(base: &str) -> &str {
    let authority_start = base.find("://").map(|i| i + 3).unwrap_or(0);
    let authority_end = base[authority_start..]
        .find(|c| matches!(c, '/' | '?' | '#'))
        .map(|i| authority_start + i)
        .unwrap_or(base.len());
    &base[..authority_end]
}

/// Base truncated after the last `/` of its path, ignoring query and fragment
fn directory_of(base: &str, origin_len: usize) -> String {
    let path_end = base[origin_len..]
        .find(|c| matches!(c, '?' | '#'))
        .map(|i| origin_len + i)
        .unwrap_or(base.len());
    let path = &base[origin_len..path_end];

    match path.rfind('/') {
        Some(i) => base[..origin_len + i + 1].to_string(),
        None => format!("{}/", &base[..origin_len]),
    }
}

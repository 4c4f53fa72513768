//! Fetched responses
//!
//! A [`Response`] is produced once per successful fetch attempt, by either
//! fetch strategy, and is only read afterwards.

use encoding_rs::{Encoding, UTF_8};
use std::collections::HashMap;
use std::fmt;

/// Markup of the sentinel page returned when a rendered page is unusable
pub const EMPTY_PAGE_HTML: &str = "<html><head></head><body></body></html>";

/// The result of one successful fetch
#[derive(Clone)]
pub struct Response {
    /// Final URL of the response (after redirects or in-page navigation)
    pub url: String,

    /// HTTP status code (200 for rendered pages)
    pub status: u16,

    /// Response headers, lowercase names
    pub headers: HashMap<String, String>,

    /// Cookies set by the response as `(name, value)` pairs
    pub cookies: Vec<(String, String)>,

    /// Charset declared by the response, if any
    pub encoding: Option<String>,

    body: Vec<u8>,
    text: String,
    sentinel: bool,
}

impl Response {
    /// Creates a response from raw body bytes, decoded as UTF-8
    pub fn new(url: impl Into<String>, status: u16, body: Vec<u8>) -> Self {
        let text = decode(&body, None);
        Self {
            url: url.into(),
            status,
            headers: HashMap::new(),
            cookies: Vec::new(),
            encoding: None,
            body,
            text,
            sentinel: false,
        }
    }

    /// Creates a 200 response carrying markup
    pub fn from_html(url: impl Into<String>, html: impl Into<String>) -> Self {
        let text = html.into();
        Self {
            url: url.into(),
            status: 200,
            headers: HashMap::new(),
            cookies: Vec::new(),
            encoding: Some("utf-8".to_string()),
            body: text.clone().into_bytes(),
            text,
            sentinel: false,
        }
    }

    /// The sentinel response for a page that could not be rendered
    ///
    /// Keeps the URL, has an empty HTML body and no cookies.
    pub fn empty_page(url: impl Into<String>) -> Self {
        Self {
            sentinel: true,
            ..Self::from_html(url, EMPTY_PAGE_HTML)
        }
    }

    /// Attaches headers and re-decodes the body with the declared charset
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.encoding = headers.get("content-type").and_then(|ct| charset_of(ct));
        self.text = decode(&self.body, self.encoding.as_deref());
        self.headers = headers;
        self
    }

    pub fn with_cookies(mut self, cookies: Vec<(String, String)>) -> Self {
        self.cookies = cookies;
        self
    }

    /// Body decoded as text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Raw body bytes
    pub fn content(&self) -> &[u8] {
        &self.body
    }

    /// Returns true when this is the sentinel built by [`Response::empty_page`]
    ///
    /// A fetched body that happens to equal [`EMPTY_PAGE_HTML`] is not the
    /// sentinel.
    pub fn is_empty_page(&self) -> bool {
        self.sentinel
    }

    /// Returns true for 2xx status codes
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Response [{}] {}>", self.status, self.url)
    }
}

/// Decodes a body with the given charset label
///
/// Unknown or missing labels fall back to UTF-8. Malformed sequences become
/// U+FFFD.
fn decode(body: &[u8], charset: Option<&str>) -> String {
    let encoding = charset
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);
    let (text, _, _) = encoding.decode(body);
    text.into_owned()
}

/// Extracts the `charset` parameter of a Content-Type value
fn charset_of(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("charset"))
        .map(|(_, value)| value.trim().trim_matches('"').to_lowercase())
}

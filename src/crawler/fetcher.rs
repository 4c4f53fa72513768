//! Fetch adapter
//!
//! This module performs single fetch attempts, using one of two strategies
//! chosen once per session:
//! - **Direct**: an HTTP request through `reqwest` with the configured method,
//!   headers, cookies and per-attempt timeout
//! - **Browser**: navigation of a fresh headless browser page (requires the
//!   `browser` feature)
//!
//! Retrying is the worker's job; a fetch attempt only reports what happened.
//! Transport failures come back as a [`FetchFailure`] value, never as a panic
//! or a propagated error.

use crate::config::{HttpMethod, SpiderConfig};
use crate::crawler::Response;
use crate::SeenError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, COOKIE, SET_COOKIE};
use reqwest::Client;
use std::collections::HashMap;
use thiserror::Error;

/// A failed fetch attempt
#[derive(Debug, Clone, Error)]
#[error("{error_info}")]
pub struct FetchFailure {
    /// The URL that was requested
    pub url: String,

    /// HTTP status code, when the failure happened after a status was received
    pub code: Option<u16>,

    /// Description of what went wrong
    pub error_info: String,
}

/// Outcome of one fetch attempt
pub type FetchResult = std::result::Result<Response, FetchFailure>;

/// The fetch strategy of a session
pub enum Fetcher {
    Direct(DirectFetcher),
    #[cfg(feature = "browser")]
    Browser(super::browser::BrowserFetcher),
}

impl Fetcher {
    /// Sets up the strategy selected by `use_browser`
    ///
    /// # Returns
    ///
    /// * `Ok(Fetcher)` - Ready to fetch
    /// * `Err(SeenError::SessionSetup)` - The HTTP client could not be built or
    ///   the browser could not be launched
    pub async fn start(config: &SpiderConfig) -> Result<Self, SeenError> {
        if config.use_browser {
            return Self::start_browser(config).await;
        }
        Ok(Self::Direct(DirectFetcher::new(config)?))
    }

    #[cfg(feature = "browser")]
    async fn start_browser(config: &SpiderConfig) -> Result<Self, SeenError> {
        Ok(Self::Browser(
            super::browser::BrowserFetcher::launch(config).await?,
        ))
    }

    #[cfg(not(feature = "browser"))]
    async fn start_browser(_config: &SpiderConfig) -> Result<Self, SeenError> {
        Err(SeenError::SessionSetup(
            "use_browser is set but browser support is not compiled in (enable the `browser` feature)"
                .to_string(),
        ))
    }

    /// Performs one fetch attempt
    pub async fn fetch(&self, url: &str) -> FetchResult {
        match self {
            Self::Direct(direct) => direct.fetch(url).await,
            #[cfg(feature = "browser")]
            Self::Browser(browser) => Ok(browser.fetch(url).await),
        }
    }

    /// Releases the strategy's resources
    pub async fn close(self) {
        match self {
            Self::Direct(_) => {}
            #[cfg(feature = "browser")]
            Self::Browser(browser) => browser.close().await,
        }
    }
}

/// Direct HTTP fetch strategy
pub struct DirectFetcher {
    client: Client,
    method: HttpMethod,
    body: Option<String>,
}

impl DirectFetcher {
    pub fn new(config: &SpiderConfig) -> Result<Self, SeenError> {
        Ok(Self {
            client: build_http_client(config)?,
            method: config.method,
            body: config.body.clone(),
        })
    }

    /// Sends one request and reads the whole body
    pub async fn fetch(&self, url: &str) -> FetchResult {
        let request = match self.method {
            HttpMethod::Get => self.client.get(url),
            HttpMethod::Post => self
                .client
                .post(url)
                .body(self.body.clone().unwrap_or_default()),
        };

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return Err(failure(url, &e)),
        };

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers = collect_headers(response.headers());
        let cookies = collect_cookies(response.headers());

        match response.bytes().await {
            Ok(body) => Ok(Response::new(final_url, status, body.to_vec())
                .with_headers(headers)
                .with_cookies(cookies)),
            Err(e) => Err(failure(url, &e)),
        }
    }
}

/// Builds an HTTP client carrying the session's headers, cookies and timeout
///
/// # Example
///
/// ```no_run
/// use seen::config::SpiderConfig;
/// use seen::crawler::build_http_client;
///
/// let config = SpiderConfig::with_roots(["https://www.v2ex.com"]);
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &SpiderConfig) -> Result<Client, SeenError> {
    let mut headers = HeaderMap::new();

    for (name, value) in &config.headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            SeenError::SessionSetup(format!("Invalid header name '{}': {}", name, e))
        })?;
        let value = HeaderValue::from_str(value).map_err(|e| {
            SeenError::SessionSetup(format!("Invalid value for header '{}': {}", name, e))
        })?;
        headers.insert(name, value);
    }

    if !config.cookies.is_empty() {
        let cookie = config
            .cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ");
        let value = HeaderValue::from_str(&cookie)
            .map_err(|e| SeenError::SessionSetup(format!("Invalid cookie value: {}", e)))?;
        headers.insert(COOKIE, value);
    }

    Client::builder()
        .default_headers(headers)
        .timeout(config.timeout_duration())
        .gzip(true)
        .brotli(true)
        .build()
        .map_err(|e| SeenError::SessionSetup(format!("Failed to build HTTP client: {}", e)))
}

/// Normalizes a transport error into a failure value
fn failure(url: &str, error: &reqwest::Error) -> FetchFailure {
    let error_info = if error.is_timeout() {
        "Request timeout".to_string()
    } else if error.is_connect() {
        format!("Connection failed: {}", error)
    } else {
        error.to_string()
    };

    FetchFailure {
        url: url.to_string(),
        code: error.status().map(|s| s.as_u16()),
        error_info,
    }
}

fn collect_headers(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

/// `(name, value)` pairs of every Set-Cookie header
fn collect_cookies(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| {
            let pair = value.split(';').next()?;
            let (name, value) = pair.split_once('=')?;
            Some((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config() -> SpiderConfig {
        SpiderConfig::with_roots(["http://localhost/"])
    }

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client(&config()).is_ok());
    }

    #[test]
    fn test_invalid_header_is_setup_failure() {
        let mut config = config();
        config
            .headers
            .insert("Bad Header".to_string(), "x".to_string());
        assert!(matches!(
            build_http_client(&config),
            Err(SeenError::SessionSetup(_))
        ));
    }

    #[test]
    fn test_collect_cookies() {
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("a=1; Path=/"));
        headers.append(SET_COOKIE, HeaderValue::from_static("b = 2"));
        headers.append(SET_COOKIE, HeaderValue::from_static("malformed"));
        assert_eq!(
            collect_cookies(&headers),
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_fetch_success_with_headers_and_cookies() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .and(header("x-test", "yes"))
            .and(header("cookie", "session=abc"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<title>hi</title>", "text/html; charset=utf-8")
                    .insert_header("set-cookie", "token=xyz; HttpOnly"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut config = config();
        config.headers.insert("x-test".to_string(), "yes".to_string());
        config
            .cookies
            .insert("session".to_string(), "abc".to_string());
        let fetcher = DirectFetcher::new(&config).unwrap();

        let url = format!("{}/page", server.uri());
        let response = fetcher.fetch(&url).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.url, url);
        assert_eq!(response.text(), "<title>hi</title>");
        assert_eq!(response.encoding.as_deref(), Some("utf-8"));
        assert_eq!(
            response.cookies,
            vec![("token".to_string(), "xyz".to_string())]
        );
    }

    #[tokio::test]
    async fn test_fetch_decodes_declared_charset() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/latin1"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                b"<title>caf\xe9</title>".to_vec(),
                "text/html; charset=iso-8859-1",
            ))
            .mount(&server)
            .await;

        let fetcher = DirectFetcher::new(&config()).unwrap();
        let response = fetcher
            .fetch(&format!("{}/latin1", server.uri()))
            .await
            .unwrap();

        assert_eq!(response.encoding.as_deref(), Some("iso-8859-1"));
        assert_eq!(
            crate::item::Selector::css("title").unwrap().extract(response.text()),
            Some(crate::item::FieldValue::Text("caf\u{e9}".to_string()))
        );
    }

    #[tokio::test]
    async fn test_sentinel_markup_from_server_is_not_empty_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(crate::crawler::EMPTY_PAGE_HTML, "text/html"),
            )
            .mount(&server)
            .await;

        let fetcher = DirectFetcher::new(&config()).unwrap();
        let response = fetcher.fetch(&format!("{}/", server.uri())).await.unwrap();

        assert!(!response.is_empty_page());
    }

    #[tokio::test]
    async fn test_http_error_status_is_a_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
            .mount(&server)
            .await;

        let fetcher = DirectFetcher::new(&config()).unwrap();
        let response = fetcher.fetch(&format!("{}/x", server.uri())).await.unwrap();

        assert_eq!(response.status, 404);
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn test_post_sends_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/form"))
            .and(body_string("a=1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = config();
        config.method = HttpMethod::Post;
        config.body = Some("a=1".to_string());
        let fetcher = DirectFetcher::new(&config).unwrap();

        let response = fetcher
            .fetch(&format!("{}/form", server.uri()))
            .await
            .unwrap();
        assert_eq!(response.text(), "ok");
    }

    #[tokio::test]
    async fn test_timeout_is_a_failure_value() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let mut config = config();
        config.timeout = 0.05;
        let fetcher = DirectFetcher::new(&config).unwrap();
        let url = format!("{}/slow", server.uri());

        let failure = fetcher.fetch(&url).await.unwrap_err();

        assert_eq!(failure.url, url);
        assert_eq!(failure.error_info, "Request timeout");
    }

    #[tokio::test]
    async fn test_connection_refused_is_a_failure_value() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let fetcher = DirectFetcher::new(&config()).unwrap();
        let result = fetcher.fetch(&format!("http://127.0.0.1:{}/", port)).await;

        assert!(result.is_err());
    }

    #[cfg(not(feature = "browser"))]
    #[tokio::test]
    async fn test_browser_strategy_without_feature() {
        let mut config = config();
        config.use_browser = true;
        let result = Fetcher::start(&config).await;
        assert!(matches!(result, Err(SeenError::SessionSetup(_))));
    }
}

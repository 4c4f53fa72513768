//! Headless browser fetch strategy
//!
//! One browser instance is launched per session and shared by every worker.
//! Each fetch opens its own page, navigates, reads the rendered markup and
//! cookies, and closes the page again whatever the outcome.

use crate::config::SpiderConfig;
use crate::crawler::Response;
use crate::SeenError;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Closes the page in the background if a fetch is dropped before it could
/// close the page itself
struct OpenPage(Option<Page>);

impl Drop for OpenPage {
    fn drop(&mut self) {
        if let Some(page) = self.0.take() {
            if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                runtime.spawn(async move {
                    if let Err(e) = page.close().await {
                        debug!("Failed to close abandoned page: {}", e);
                    }
                });
            }
        }
    }
}

pub struct BrowserFetcher {
    browser: Mutex<Browser>,
    handler: JoinHandle<()>,
    timeout: Duration,
}

impl BrowserFetcher {
    /// Launches the shared browser and drives its event handler in the background
    pub async fn launch(config: &SpiderConfig) -> Result<Self, SeenError> {
        let timeout = config.timeout_duration();
        let browser_config = BrowserConfig::builder()
            .request_timeout(timeout)
            .build()
            .map_err(|e| SeenError::SessionSetup(format!("Failed to build browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| SeenError::SessionSetup(format!("Failed to launch browser: {}", e)))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    error!("Browser handler error: {:?}", e);
                }
            }
            debug!("Browser event handler task completed");
        });

        Ok(Self {
            browser: Mutex::new(browser),
            handler,
            timeout,
        })
    }

    /// Renders `url` in a fresh page
    ///
    /// Navigation errors degrade to whatever the page holds at that point. A
    /// page that cannot be opened or read yields the empty page for `url`.
    pub async fn fetch(&self, url: &str) -> Response {
        let page = {
            let browser = self.browser.lock().await;
            browser.new_page("about:blank").await
        };
        let page = match page {
            Ok(page) => page,
            Err(e) => {
                warn!("Failed to create page for {}: {}", url, e);
                return Response::empty_page(url);
            }
        };

        let mut guard = OpenPage(Some(page.clone()));
        let response = self.render(&page, url).await;

        if let Err(e) = page.close().await {
            debug!("Failed to close page for {}: {}", url, e);
        }
        guard.0 = None;
        response
    }

    async fn render(&self, page: &Page, url: &str) -> Response {
        match tokio::time::timeout(self.timeout, page.goto(url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!("Navigation failed for {}: {}", url, e),
            Err(_) => warn!("Navigation timed out for {}", url),
        }

        let final_url = page
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| url.to_string());

        let html = match page.content().await {
            Ok(html) => html,
            Err(e) => {
                warn!("Failed to read content of {}: {}", url, e);
                return Response::empty_page(url);
            }
        };

        let cookies = match page.get_cookies().await {
            Ok(cookies) => cookies
                .into_iter()
                .map(|cookie| (cookie.name, cookie.value))
                .collect(),
            Err(e) => {
                debug!("Failed to read cookies of {}: {}", url, e);
                Vec::new()
            }
        };

        Response::from_html(final_url, html).with_cookies(cookies)
    }

    /// Shuts the browser down and stops the handler task
    pub async fn close(self) {
        let mut browser = self.browser.into_inner();
        if let Err(e) = browser.close().await {
            warn!("Failed to close browser: {}", e);
        }
        if let Err(e) = browser.wait().await {
            debug!("Failed to wait for browser exit: {}", e);
        }
        self.handler.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    #[ignore = "needs a local Chrome or Chromium"]
    async fn test_cancelled_fetch_closes_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<title>slow</title>", "text/html")
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let mut config = SpiderConfig::with_roots([format!("{}/", server.uri())]);
        config.timeout = 10.0;
        let fetcher = BrowserFetcher::launch(&config).await.unwrap();
        let before = fetcher.browser.lock().await.pages().await.unwrap().len();

        let url = format!("{}/slow", server.uri());
        let abandoned = tokio::time::timeout(Duration::from_millis(500), fetcher.fetch(&url)).await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_millis(500)).await;
        let after = fetcher.browser.lock().await.pages().await.unwrap().len();
        assert_eq!(after, before);

        fetcher.close().await;
    }
}

//! Crawl controller
//!
//! This module contains the [`Spider`], which owns a session's configuration
//! and parsers and runs one crawl at a time:
//! - Validating the configuration and setting up the fetch strategy
//! - Seeding the roots into a fresh session
//! - Running the worker pool until the frontier drains or the user interrupts
//! - Tearing the fetch strategy down and summarizing the run

use crate::config::{validate_spider_config, SpiderConfig};
use crate::crawler::scheduler::{FailedUrl, UrlFailedHandler, Worker};
use crate::crawler::{Fetcher, Parser, Session};
use crate::output::CrawlSummary;
use crate::SeenError;
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// A configured crawler
///
/// # Example
///
/// ```no_run
/// use seen::config::SpiderConfig;
/// use seen::item::{ItemSpec, SaveStep, Selector};
/// use seen::{Parser, Spider};
///
/// # async fn run() -> seen::Result<()> {
/// let config = SpiderConfig::with_roots(["https://www.v2ex.com"]);
/// let post = ItemSpec::new("post", SaveStep::blocking(|item, _| {
///     println!("{:?}", item.result);
///     Ok(())
/// }))
/// .field("title", Selector::css("title")?);
///
/// let summary = Spider::new(config)
///     .parser(Parser::with_item(post).contains("topic"))
///     .crawl()
///     .await?;
/// println!("Error urls: {}", summary.failed);
/// # Ok(())
/// # }
/// ```
pub struct Spider {
    config: SpiderConfig,
    parsers: Vec<Parser>,
    on_url_failed: Option<UrlFailedHandler>,
    config_hash: Option<String>,
}

impl Spider {
    pub fn new(config: SpiderConfig) -> Self {
        Self {
            config,
            parsers: Vec::new(),
            on_url_failed: None,
            config_hash: None,
        }
    }

    /// Appends a parser; parsers run in the order they were added
    pub fn parser(mut self, parser: Parser) -> Self {
        self.parsers.push(parser);
        self
    }

    pub fn parsers(mut self, parsers: impl IntoIterator<Item = Parser>) -> Self {
        self.parsers.extend(parsers);
        self
    }

    /// Sets the hook called once for each URL that exhausts its retries
    pub fn on_url_failed<F>(mut self, handler: F) -> Self
    where
        F: Fn(&FailedUrl) + Send + Sync + 'static,
    {
        self.on_url_failed = Some(Arc::new(handler));
        self
    }

    /// Records the configuration hash reported in the summary
    pub fn config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }

    pub fn config(&self) -> &SpiderConfig {
        &self.config
    }

    /// Runs a crawl until the frontier drains or Ctrl-C is pressed
    pub async fn crawl(&self) -> Result<CrawlSummary, SeenError> {
        self.crawl_with_shutdown(ctrl_c()).await
    }

    /// Runs a crawl until the frontier drains or `shutdown` completes
    ///
    /// Every call starts a new session: the frontier, the dedup and error
    /// sets and the spider state are never shared between crawls.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlSummary)` - The crawl ran to completion or was interrupted
    /// * `Err(SeenError)` - The configuration is invalid or the fetch strategy
    ///   could not be set up
    pub async fn crawl_with_shutdown<F>(&self, shutdown: F) -> Result<CrawlSummary, SeenError>
    where
        F: Future<Output = ()>,
    {
        validate_spider_config(&self.config)?;

        let started_at = Utc::now();
        let fetcher = match Fetcher::start(&self.config).await {
            Ok(fetcher) => Arc::new(fetcher),
            Err(e) => {
                error!("Failed to start session: {}", e);
                return Err(e);
            }
        };

        info!("Spider start.");
        if let Some(hash) = &self.config_hash {
            info!("Config hash: {}", hash);
        }

        let session = Session::new(self.config.clone());
        session.seed_roots();

        let parsers: Arc<[Parser]> = if self.parsers.is_empty() {
            vec![Parser::new()].into()
        } else {
            self.parsers.clone().into()
        };

        let cancel = CancellationToken::new();
        let workers: Vec<_> = (0..self.config.concurrency)
            .map(|id| {
                let worker = Worker::new(
                    id,
                    session.clone(),
                    Arc::clone(&fetcher),
                    Arc::clone(&parsers),
                    self.on_url_failed.clone(),
                    cancel.child_token(),
                );
                tokio::spawn(worker.run())
            })
            .collect();

        let interrupted = tokio::select! {
            _ = session.frontier().join() => false,
            _ = shutdown => {
                warn!("Interrupted, stopping workers");
                true
            }
        };

        cancel.cancel();
        for handle in workers {
            if let Err(e) = handle.await {
                error!("Worker task failed: {}", e);
            }
        }

        match Arc::try_unwrap(fetcher) {
            Ok(fetcher) => fetcher.close().await,
            Err(_) => warn!("Fetch strategy still in use, skipping close"),
        }

        let crawl_state = session.crawl_state();
        let summary = CrawlSummary {
            processed: crawl_state.seen_count(),
            failed: crawl_state.failed_count(),
            failed_urls: crawl_state.failed_urls(),
            started_at,
            finished_at: Utc::now(),
            config_hash: self.config_hash.clone(),
            interrupted,
        };

        info!("Error urls: {}", summary.failed);
        info!("Spider finished.");

        Ok(summary)
    }
}

/// Resolves on Ctrl-C; never resolves if the signal cannot be installed
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConfigError;
    use std::future;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let spider = Spider::new(SpiderConfig::default());
        let result = spider.crawl_with_shutdown(future::pending()).await;
        assert!(matches!(
            result,
            Err(SeenError::Config(ConfigError::Validation(_)))
        ));
    }

    #[tokio::test]
    async fn test_crawl_without_parsers_follows_links() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"<a href="/a">a</a>"#))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(ResponseTemplate::new(200).set_body_string("leaf"))
            .expect(1)
            .mount(&server)
            .await;

        let spider = Spider::new(SpiderConfig::with_roots([format!("{}/", server.uri())]))
            .config_hash("abc");
        let summary = spider.crawl_with_shutdown(future::pending()).await.unwrap();

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.failed, 0);
        assert!(!summary.interrupted);
        assert_eq!(summary.config_hash.as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_crawl() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
            .mount(&server)
            .await;

        let mut config = SpiderConfig::with_roots([format!("{}/", server.uri())]);
        config.timeout = 30.0;
        let spider = Spider::new(config);

        let summary = tokio::time::timeout(
            Duration::from_secs(5),
            spider.crawl_with_shutdown(tokio::time::sleep(Duration::from_millis(100))),
        )
        .await
        .expect("crawl did not stop")
        .unwrap();

        assert!(summary.interrupted);
        assert_eq!(summary.processed, 0);
    }

    #[tokio::test]
    async fn test_sessions_start_fresh() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("done"))
            .expect(2)
            .mount(&server)
            .await;

        let spider = Spider::new(SpiderConfig::with_roots([format!("{}/", server.uri())]));
        let first = spider.crawl_with_shutdown(future::pending()).await.unwrap();
        let second = spider.crawl_with_shutdown(future::pending()).await.unwrap();

        assert_eq!(first.processed, 1);
        assert_eq!(second.processed, 1);
    }
}

//! Worker loops for processing the shared frontier
//!
//! Each worker repeatedly:
//! 1. Dequeues a URL (or stops when cancelled)
//! 2. Drops it without fetching if it was already seen, is not http(s), or
//!    falls outside the host allow-list
//! 3. Fetches it with retries
//! 4. Runs every parser over the response and enqueues the discovered URLs
//! 5. Records the URL in the dedup set or the error set
//! 6. Marks the frontier entry done and sleeps for the configured interval
//!
//! Cancellation is observed while waiting on the frontier, during a fetch
//! attempt, and during the interval delay.

use crate::crawler::{FetchFailure, FetchResult, Fetcher, Frontier, Parser, Response, Session};
use crate::url::{extract_host, host_allowed, is_http_url};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// A URL that exhausted its fetch attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedUrl {
    pub url: String,

    /// Number of attempts made
    pub attempts: u32,

    /// Detail of the last failed attempt
    pub last_error: String,
}

impl fmt::Display for FailedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failed after {} attempts: {}",
            self.url, self.attempts, self.last_error
        )
    }
}

/// Hook invoked once for every URL that exhausts its retries
pub type UrlFailedHandler = Arc<dyn Fn(&FailedUrl) + Send + Sync>;

/// Result of the retry loop for one URL
enum Attempts {
    Fetched(Response),
    Exhausted(FailedUrl),
    Cancelled,
}

/// Splits an attempt into a usable response or the detail of why it is retried
///
/// Only the sentinel built by the browser strategy counts as an empty page; a
/// fetched body is used as is.
fn usable(result: FetchResult) -> Result<Response, String> {
    match result {
        Ok(response) if response.is_empty_page() => Err("empty page".to_string()),
        Ok(response) => Ok(response),
        Err(FetchFailure { error_info, .. }) => Err(error_info),
    }
}

/// Marks a dequeued URL done when dropped, even if processing unwinds
struct MarkDone<'a>(&'a Frontier);

impl Drop for MarkDone<'_> {
    fn drop(&mut self) {
        self.0.mark_done();
    }
}

/// One worker loop bound to a session
pub(crate) struct Worker {
    id: usize,
    session: Session,
    fetcher: Arc<Fetcher>,
    parsers: Arc<[Parser]>,
    on_url_failed: Option<UrlFailedHandler>,
    cancel: CancellationToken,
}

impl Worker {
    pub(crate) fn new(
        id: usize,
        session: Session,
        fetcher: Arc<Fetcher>,
        parsers: Arc<[Parser]>,
        on_url_failed: Option<UrlFailedHandler>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            session,
            fetcher,
            parsers,
            on_url_failed,
            cancel,
        }
    }

    /// Runs until the cancellation token fires
    pub(crate) async fn run(self) {
        let frontier = self.session.frontier().clone();
        let interval = self.session.config().interval_duration();

        loop {
            let url = tokio::select! {
                _ = self.cancel.cancelled() => break,
                url = frontier.dequeue() => match url {
                    Some(url) => url,
                    None => break,
                },
            };

            {
                let _done = MarkDone(&frontier);
                self.process(&url).await;
            }

            if !interval.is_zero() {
                tokio::select! {
                    _ = self.cancel.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
            }
        }

        debug!("Worker {} stopped", self.id);
    }

    async fn process(&self, url: &str) {
        let crawl_state = self.session.crawl_state();

        if crawl_state.is_seen(url) {
            debug!("Skipping already processed URL: {}", url);
            return;
        }

        if !is_http_url(url) {
            info!("This is an invalid URL: {}", url);
            return;
        }

        let url_limit = &self.session.config().url_limit;
        if !url_limit.is_empty() {
            match extract_host(url) {
                Some(host) if host_allowed(&host, url_limit) => {}
                Some(host) => {
                    info!("Skipping {}: host {} is not in url-limit", url, host);
                    return;
                }
                None => {
                    info!("Skipping {}: no host", url);
                    return;
                }
            }
        }

        info!("Requesting {}", url);

        let response = match self.fetch_with_retry(url).await {
            Attempts::Fetched(response) => Arc::new(response),
            Attempts::Exhausted(failed) => {
                error!("{}", failed);
                if !crawl_state.mark_failed(url) {
                    debug!("{} was processed by another worker meanwhile", url);
                    return;
                }
                if let Some(handler) = &self.on_url_failed {
                    handler(&failed);
                }
                return;
            }
            Attempts::Cancelled => {
                debug!("Fetch of {} cancelled", url);
                return;
            }
        };

        let discovered = self.run_parsers(&response).await;

        let frontier = self.session.frontier();
        for link in discovered {
            frontier.enqueue(link);
        }

        crawl_state.mark_seen(url);
        info!("url {} has finished.", url);
    }

    async fn fetch_with_retry(&self, url: &str) -> Attempts {
        let max_tries = self.session.config().max_tries.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_tries {
            let result = tokio::select! {
                _ = self.cancel.cancelled() => return Attempts::Cancelled,
                result = self.fetcher.fetch(url) => result,
            };

            match usable(result) {
                Ok(response) => return Attempts::Fetched(response),
                Err(error_info) => last_error = error_info,
            }

            warn!(
                "Fetch attempt {}/{} for {} failed: {}",
                attempt, max_tries, url, last_error
            );
        }

        Attempts::Exhausted(FailedUrl {
            url: url.to_string(),
            attempts: max_tries,
            last_error,
        })
    }

    /// Runs every parser; a failing parser does not stop the others
    async fn run_parsers(&self, response: &Arc<Response>) -> HashSet<String> {
        let mut discovered = HashSet::new();

        for parser in self.parsers.iter() {
            match parser.analyze(response, &self.session).await {
                Ok(urls) => discovered.extend(urls),
                Err(e) => error!("Parser failed on {}: {}", response.url, e),
            }
        }

        discovered
    }
}

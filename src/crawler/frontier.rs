//! The frontier: a FIFO work queue of pending URLs with join semantics
//!
//! Enqueueing never blocks and performs no deduplication; duplicates are
//! dropped when they are dequeued. Every enqueued URL counts as outstanding
//! until a worker marks it done, and [`Frontier::join`] waits for the
//! outstanding count to reach zero, including URLs enqueued while others were
//! being processed.

use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};

/// Shared pending-work queue
#[derive(Clone)]
pub struct Frontier {
    inner: Arc<FrontierInner>,
}

struct FrontierInner {
    sender: mpsc::UnboundedSender<String>,
    receiver: Mutex<mpsc::UnboundedReceiver<String>>,
    outstanding: watch::Sender<usize>,
}

impl Frontier {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (outstanding, _) = watch::channel(0);

        Self {
            inner: Arc::new(FrontierInner {
                sender,
                receiver: Mutex::new(receiver),
                outstanding,
            }),
        }
    }

    /// Adds a URL to the back of the queue
    pub fn enqueue(&self, url: impl Into<String>) {
        self.inner.outstanding.send_modify(|n| *n += 1);
        if self.inner.sender.send(url.into()).is_err() {
            // The receiver lives as long as `inner`, so this cannot happen.
            self.mark_done();
        }
    }

    /// Takes the next URL, waiting until one is available
    ///
    /// Cancel safe: a dequeue abandoned inside `tokio::select!` loses no URL.
    /// Returns `None` only if the queue has been closed.
    pub async fn dequeue(&self) -> Option<String> {
        self.inner.receiver.lock().await.recv().await
    }

    /// Marks one dequeued URL as fully processed
    pub fn mark_done(&self) {
        self.inner
            .outstanding
            .send_modify(|n| *n = n.saturating_sub(1));
    }

    /// Number of URLs enqueued but not yet marked done
    pub fn outstanding(&self) -> usize {
        *self.inner.outstanding.borrow()
    }

    /// Waits until every enqueued URL has been marked done
    pub async fn join(&self) {
        let mut outstanding = self.inner.outstanding.subscribe();
        let _ = outstanding.wait_for(|n| *n == 0).await;
    }
}

impl Default for Frontier {
    fn default() -> Self {
        Self::new()
    }
}

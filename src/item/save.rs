use super::Item;
use crate::crawler::Session;
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Future returned by a suspending save step
pub type SaveFuture = BoxFuture<'static, anyhow::Result<()>>;

type BlockingFn = dyn Fn(&Item, &Session) -> anyhow::Result<()> + Send + Sync;
type SuspendingFn = dyn Fn(Item, Session) -> SaveFuture + Send + Sync;

/// What to do with an extracted item
///
/// The caller picks the capability when declaring the item: a blocking step
/// runs inline on the worker, a suspending step is awaited.
#[derive(Clone)]
pub enum SaveStep {
    Blocking(Arc<BlockingFn>),
    Suspending(Arc<SuspendingFn>),
}

impl SaveStep {
    /// Wraps an immediate save operation
    pub fn blocking<F>(f: F) -> Self
    where
        F: Fn(&Item, &Session) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::Blocking(Arc::new(f))
    }

    /// Wraps a save operation that suspends
    ///
    /// # Example
    ///
    /// ```
    /// use seen::item::SaveStep;
    ///
    /// let save = SaveStep::suspending(|item, _session| async move {
    ///     tokio::task::yield_now().await;
    ///     println!("saved {}", item.name);
    ///     Ok(())
    /// });
    /// assert!(save.is_suspending());
    /// ```
    pub fn suspending<F, Fut>(f: F) -> Self
    where
        F: Fn(Item, Session) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self::Suspending(Arc::new(move |item: Item, session: Session| -> SaveFuture {
            Box::pin(f(item, session))
        }))
    }

    pub fn is_suspending(&self) -> bool {
        matches!(self, Self::Suspending(_))
    }

    /// Runs the save step
    pub async fn run(&self, item: Item, session: &Session) -> anyhow::Result<()> {
        match self {
            Self::Blocking(f) => f(&item, session),
            Self::Suspending(f) => f(item, session.clone()).await,
        }
    }
}

impl fmt::Debug for SaveStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blocking(_) => f.write_str("SaveStep::Blocking"),
            Self::Suspending(_) => f.write_str("SaveStep::Suspending"),
        }
    }
}

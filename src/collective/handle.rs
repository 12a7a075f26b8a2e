use crate::error::{GradixError, Result};
use std::future::Future;
use tokio::task::JoinHandle;

/// A handle to a non-blocking collective operation.
///
/// The collective runs in a spawned task so the caller can overlap
/// computation (or other parameters' reductions) with communication. Call
/// [`wait`](Self::wait) to suspend until it completes, or poll
/// [`is_finished`](Self::is_finished).
///
/// If dropped without calling `wait()`, the background task is aborted so a
/// half-finished collective never writes into a buffer the caller has
/// already repurposed.
pub struct CollectiveHandle<T> {
    inner: Option<JoinHandle<Result<T>>>,
}

impl<T: Send + 'static> CollectiveHandle<T> {
    /// Spawn a future as a non-blocking collective and return a handle.
    pub(crate) fn spawn(fut: impl Future<Output = Result<T>> + Send + 'static) -> Self {
        Self {
            inner: Some(tokio::spawn(fut)),
        }
    }

    /// Wait for the collective to complete and return its result.
    /// Waiting a second time is an error.
    pub async fn wait(&mut self) -> Result<T> {
        let handle = self
            .inner
            .take()
            .ok_or_else(|| GradixError::transport("collective handle already waited"))?;
        handle
            .await
            .map_err(|e| GradixError::transport(format!("collective task panicked: {e}")))?
    }

    /// Whether the collective has finished (successfully or not).
    pub fn is_finished(&self) -> bool {
        self.inner.as_ref().map_or(true, |h| h.is_finished())
    }
}

impl<T> Drop for CollectiveHandle<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.inner.take() {
            handle.abort();
        }
    }
}

use crate::error::{ChatdeskError, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Default number of fetches allowed in flight at once.
pub const DEFAULT_MAX_CONCURRENCY: usize = 5;

/// Caps how many fetch tasks run at the same time.
///
/// Submissions beyond the limit wait for a permit. Tokio's semaphore hands
/// permits out in request order, so queued tasks start FIFO. A failing task
/// only fails its own `submit` call; siblings keep running.
pub struct BoundedDispatcher {
    permits: Arc<Semaphore>,
    limit: usize,
}

impl BoundedDispatcher {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            permits: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Permits not currently held by a running task.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run `task` once a slot is free and hand back its result.
    pub async fn submit<T, F, Fut>(&self, task: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| ChatdeskError::DispatcherClosed)?;
        task().await
    }

    /// Refuse new work. Queued submissions fail with `DispatcherClosed`;
    /// tasks already running finish normally.
    pub fn close(&self) {
        self.permits.close();
    }
}

impl Default for BoundedDispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENCY)
    }
}

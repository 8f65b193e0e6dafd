use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Collapses bursts of triggers into one delayed callback.
///
/// Each `trigger` restarts the countdown and supersedes the callback that was
/// waiting. Only the last trigger inside a `delay`-wide quiet window fires.
/// A callback that already started keeps running. Dropping the debouncer
/// cancels whatever is still waiting.
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<CancellationToken>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Must be called from within a tokio runtime.
    pub fn trigger<F, Fut>(&self, callback: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        if let Ok(mut pending) = self.pending.lock()
            && let Some(previous) = pending.replace(token.clone())
        {
            previous.cancel();
        }

        let delay = self.delay;
        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {
                    tracing::trace!("debounced callback superseded");
                }
                () = tokio::time::sleep(delay) => callback().await,
            }
        });
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Ok(mut pending) = self.pending.lock()
            && let Some(token) = pending.take()
        {
            token.cancel();
        }
    }
}

//! Trailing-edge debouncing of async work.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;

/// Runs only the last of a burst of calls, `delay` after it was made.
///
/// Each [`call`](Debouncer::call) cancels the previously scheduled one.
/// Dropping the debouncer cancels whatever is still pending.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    /// Schedule `task`, replacing any call that has not fired yet.
    ///
    /// Must be called from within a tokio runtime.
    pub fn call<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let delay = self.delay;
        let mut slot = self.slot();
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        *slot = Some(tokio::spawn(async move {
            sleep(delay).await;
            task.await;
        }));
    }

    /// Cancel the pending call, if any.
    pub fn cancel(&self) {
        if let Some(previous) = self.slot().take() {
            previous.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.slot().as_ref().is_some_and(|h| !h.is_finished())
    }

    fn slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counter_task(counter: &Arc<AtomicUsize>, value: usize) -> impl Future<Output = ()> {
        let counter = counter.clone();
        async move {
            counter.store(value, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_last_call_runs() {
        let debouncer = Debouncer::new(Duration::from_millis(50));
        let fired = Arc::new(AtomicUsize::new(0));

        debouncer.call(counter_task(&fired, 1));
        debouncer.call(counter_task(&fired, 2));
        debouncer.call(counter_task(&fired, 3));
        assert!(debouncer.is_pending());

        sleep(Duration::from_millis(60)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 3);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_runs_before_delay() {
        let debouncer = Debouncer::new(Duration::from_millis(50));
        let fired = Arc::new(AtomicUsize::new(0));

        debouncer.call(counter_task(&fired, 1));
        sleep(Duration::from_millis(20)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel() {
        let debouncer = Debouncer::new(Duration::from_millis(50));
        let fired = Arc::new(AtomicUsize::new(0));

        debouncer.call(counter_task(&fired, 1));
        debouncer.cancel();
        assert!(!debouncer.is_pending());

        sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}

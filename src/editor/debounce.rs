//! Trailing-edge debouncer
//!
//! Every [`Debouncer::trigger`] cancels the pending run and schedules a new
//! one `window` later. Only the sleep is cancellable: once the action has
//! started it runs to completion, and runs never overlap.

use crate::error::Result;
use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

type ActionFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;
type Action = Arc<dyn Fn() -> ActionFuture + Send + Sync>;

/// Wrap `action` so bursts of triggers collapse into one run
pub fn debounce<F, Fut>(action: F, window: Duration) -> Debouncer
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Debouncer::new(window, action)
}

pub struct Debouncer {
    window: Duration,
    action: Action,
    /// The one scheduled sleep, if any
    pending: Mutex<Option<JoinHandle<()>>>,
    /// Held for the duration of each run
    running: Arc<tokio::sync::Mutex<()>>,
    runs: Arc<AtomicU64>,
}

impl Debouncer {
    pub fn new<F, Fut>(window: Duration, action: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            window,
            action: Arc::new(move || Box::pin(action()) as ActionFuture),
            pending: Mutex::new(None),
            running: Arc::new(tokio::sync::Mutex::new(())),
            runs: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Schedule the action `window` from now, replacing any pending schedule
    ///
    /// Must be called from within a tokio runtime.
    pub fn trigger(&self) {
        let mut pending = self.pending.lock();
        if let Some(handle) = pending.take() {
            handle.abort();
            debug!("Debounce: rescheduled pending run");
        }

        let window = self.window;
        let action = Arc::clone(&self.action);
        let running = Arc::clone(&self.running);
        let runs = Arc::clone(&self.runs);

        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            // Detached so a later trigger cannot abort a run in flight
            tokio::spawn(async move {
                let _guard = running.lock().await;
                runs.fetch_add(1, Ordering::SeqCst);
                debug!("Debounce: firing after {:?} quiet period", window);
                if let Err(e) = action().await {
                    warn!("Debounced action failed: {}", e);
                }
            });
        }));
    }

    /// Drop the pending schedule without running it
    pub fn cancel(&self) {
        if let Some(handle) = self.pending.lock().take() {
            handle.abort();
            debug!("Debounce: cancelled pending run");
        }
    }

    /// Whether a run is scheduled but has not started
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// How many times the action has started
    pub fn run_count(&self) -> u64 {
        self.runs.load(Ordering::SeqCst)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.get_mut().take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("window", &self.window)
            .field("runs", &self.run_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TexnoteError;
    use std::sync::atomic::AtomicUsize;
    use tokio::time::{sleep, Instant};

    fn counting(window_ms: u64) -> (Debouncer, Arc<AtomicUsize>, Arc<Mutex<Vec<Instant>>>) {
        let count = Arc::new(AtomicUsize::new(0));
        let times = Arc::new(Mutex::new(Vec::new()));
        let (c, t) = (Arc::clone(&count), Arc::clone(&times));
        let debouncer = debounce(
            move || {
                let c = Arc::clone(&c);
                let t = Arc::clone(&t);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    t.lock().push(Instant::now());
                    Ok(())
                }
            },
            Duration::from_millis(window_ms),
        );
        (debouncer, count, times)
    }

    async fn settle() {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_collapses_to_one_run() {
        let (debouncer, count, times) = counting(500);

        for _ in 0..5 {
            debouncer.trigger();
            sleep(Duration::from_millis(100)).await;
        }
        let last_trigger = Instant::now() - Duration::from_millis(100);

        sleep(Duration::from_millis(390)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(debouncer.is_pending());

        sleep(Duration::from_millis(20)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(debouncer.run_count(), 1);

        let fired_at = times.lock()[0];
        assert_eq!(fired_at - last_trigger, Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_quiet_periods_run_separately() {
        let (debouncer, count, _) = counting(200);

        debouncer.trigger();
        sleep(Duration::from_millis(250)).await;
        settle().await;
        debouncer.trigger();
        sleep(Duration::from_millis(250)).await;
        settle().await;

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_run() {
        let (debouncer, count, _) = counting(100);

        debouncer.trigger();
        debouncer.cancel();
        assert!(!debouncer.is_pending());
        sleep(Duration::from_millis(500)).await;
        settle().await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_action_error_is_swallowed() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let a = Arc::clone(&attempts);
        let debouncer = Debouncer::new(Duration::from_millis(50), move || {
            let a = Arc::clone(&a);
            async move {
                a.fetch_add(1, Ordering::SeqCst);
                Err(TexnoteError::collaborator("notes", "offline"))
            }
        });

        debouncer.trigger();
        sleep(Duration::from_millis(60)).await;
        settle().await;
        debouncer.trigger();
        sleep(Duration::from_millis(60)).await;
        settle().await;

        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending() {
        let (debouncer, count, _) = counting(100);
        debouncer.trigger();
        drop(debouncer);

        sleep(Duration::from_millis(500)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}

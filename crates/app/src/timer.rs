//! Cancellable repeating task
//!
//! Runs a callback every `period` on the tokio runtime until the callback
//! breaks, `stop` is called, or the handle is dropped. Stopping is idempotent.

use std::ops::ControlFlow;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

pub struct RepeatingTask {
    handle: Option<JoinHandle<()>>,
}

impl RepeatingTask {
    /// Spawn on the current runtime. Returns `None` outside a runtime.
    pub fn spawn<F>(period: Duration, mut on_tick: F) -> Option<Self>
    where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
    {
        let runtime = Handle::try_current().ok()?;
        let handle = runtime.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if on_tick().is_break() {
                    debug!("Repeating task finished");
                    break;
                }
            }
        });
        Some(Self {
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for RepeatingTask {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn no_runtime_no_task() {
        assert!(RepeatingTask::spawn(Duration::from_secs(1), || ControlFlow::Continue(())).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_until_stopped() {
        let count = Arc::new(AtomicU32::new(0));
        let counter = count.clone();
        let mut task = RepeatingTask::spawn(Duration::from_secs(1), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            ControlFlow::Continue(())
        })
        .unwrap();

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        task.stop();
        task.stop();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert!(!task.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn break_ends_the_task() {
        let count = Arc::new(AtomicU32::new(0));
        let counter = count.clone();
        let task = RepeatingTask::spawn(Duration::from_secs(1), move || {
            if counter.fetch_add(1, Ordering::SeqCst) + 1 == 2 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .unwrap();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(!task.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn drop_cancels() {
        let count = Arc::new(AtomicU32::new(0));
        let counter = count.clone();
        let task = RepeatingTask::spawn(Duration::from_secs(1), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            ControlFlow::Continue(())
        })
        .unwrap();
        drop(task);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}

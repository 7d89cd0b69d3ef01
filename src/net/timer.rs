//! Cancellable delayed and periodic tasks

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Handle to a timer task
///
/// Dropping the handle cancels the timer. Cancelling a timer that already
/// fired is a no-op.
#[derive(Debug)]
pub struct TimerHandle {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl TimerHandle {
    /// Run `task` once after `delay`
    pub fn after<F>(delay: Duration, task: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let child = token.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                () = child.cancelled() => {}
                () = tokio::time::sleep(delay) => task.await,
            }
        });
        Self { token, handle }
    }

    /// Run `tick` every `period`, starting immediately
    ///
    /// A slow tick delays the next one instead of bursting to catch up.
    pub fn every<F, Fut>(period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let child = token.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = child.cancelled() => break,
                    _ = interval.tick() => tick().await,
                }
            }
        });
        Self { token, handle }
    }

    /// Cancel the timer
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Check whether the timer was cancelled
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Check whether the underlying task has exited
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

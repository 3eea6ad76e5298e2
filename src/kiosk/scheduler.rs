//! One-shot deferred actions

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Action run once when a timer fires
pub type ReloadAction = Box<dyn FnOnce() + Send + 'static>;

/// Host scheduler for one-shot deferred callbacks
pub trait Scheduler {
    /// Handle to the scheduled timer
    type Handle;

    /// Run `action` once after roughly `delay`. Timing is best-effort.
    fn schedule_once(&self, delay: Duration, action: ReloadAction) -> Self::Handle;
}

/// Scheduler backed by a tokio runtime: each timer is a task that sleeps
/// and then runs its action
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    runtime: Handle,
}

impl TokioScheduler {
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Scheduler for the runtime we are currently running on, if any
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl Scheduler for TokioScheduler {
    type Handle = JoinHandle<()>;

    fn schedule_once(&self, delay: Duration, action: ReloadAction) -> JoinHandle<()> {
        self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            action();
        })
    }
}

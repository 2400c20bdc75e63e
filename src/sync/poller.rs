//! sync::poller
//!
//! Background fetch loop.
//!
//! One loop per coordinator. Each tick skips entirely while a guarded
//! operation is running or when the project has no remote; otherwise it
//! fetches and then lets [`SyncCoordinator::auto_sync_if_safe`] decide
//! whether to pull.
//!
//! The task holds only a weak reference, so dropping the last
//! `Arc<SyncCoordinator>` ends it as well.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

use super::coordinator::{lock, SyncCoordinator};

impl SyncCoordinator {
    /// Start polling the remote every `period`, replacing any running poller.
    ///
    /// The first tick fires one full `period` after the call.
    pub fn start_background_fetch(self: &Arc<Self>, period: Duration) {
        let period = period.max(Duration::from_millis(1));
        let weak = Arc::downgrade(self);
        let handle = tokio::spawn(poll_loop(weak, period));

        if let Some(previous) = lock(&self.poller).replace(handle) {
            previous.abort();
        }
        debug!(?period, "background fetch started");
    }

    /// Stop the poller, if any.
    pub fn stop_background_fetch(&self) {
        if let Some(handle) = lock(&self.poller).take() {
            handle.abort();
            debug!("background fetch stopped");
        }
    }

    /// Whether a poller is active.
    pub fn is_polling(&self) -> bool {
        lock(&self.poller)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// One poller tick.
    pub async fn poll_once(&self) {
        if self.is_closed() || self.is_operation_running() || !self.state().has_remote() {
            return;
        }
        self.fetch().await;
        self.auto_sync_if_safe().await;
    }
}

async fn poll_loop(coordinator: Weak<SyncCoordinator>, period: Duration) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let Some(coordinator) = coordinator.upgrade() else {
            break;
        };
        if coordinator.is_closed() {
            break;
        }
        coordinator.poll_once().await;
    }
}

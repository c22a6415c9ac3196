//! Cancellable timer-driven tasks. At most one live task exists per
//! `(workspace, kind)`; starting another cancels the previous one first.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::model::WorkspaceId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PollKind {
    Lifecycle,
    Logs,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PollKey {
    pub workspace: WorkspaceId,
    pub kind: PollKind,
}

impl PollKey {
    pub fn new(workspace: WorkspaceId, kind: PollKind) -> Self {
        Self { workspace, kind }
    }
}

/// Ownership token for one running poll. Stopping (or dropping) it cancels
/// the task; a fetch already in flight finishes but its result is discarded.
#[derive(Debug)]
pub struct PollHandle {
    key: PollKey,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    pub fn key(&self) -> &PollKey {
        &self.key
    }

    pub fn stop(&self) {
        if !self.cancel.is_cancelled() {
            debug!(workspace = %self.key.workspace, kind = ?self.key.kind, "stopping poll");
            self.cancel.cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled() && self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Waits for the task to exit without cancelling it.
    pub async fn join(mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[derive(Clone, Default)]
pub struct PollRegistry {
    live: Arc<Mutex<HashMap<PollKey, CancellationToken>>>,
}

impl PollRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels any poll registered under `key`, then spawns `body`.
    pub fn spawn<F, Fut>(&self, key: PollKey, body: F) -> PollHandle
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        {
            let mut live = self.live.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(prev) = live.insert(key.clone(), cancel.clone()) {
                debug!(workspace = %key.workspace, kind = ?key.kind, "replacing existing poll");
                prev.cancel();
            }
            live.retain(|_, token| !token.is_cancelled());
        }

        let fut = body(cancel.clone());
        // The token is cancelled when the task exits, so finished polls are
        // pruned on the next registration.
        let guard = cancel.clone().drop_guard();
        let task = tokio::spawn(async move {
            let _guard = guard;
            fut.await;
        });

        PollHandle {
            key,
            cancel,
            task: Some(task),
        }
    }

    pub fn cancel(&self, key: &PollKey) -> bool {
        let mut live = self.live.lock().unwrap_or_else(PoisonError::into_inner);
        match live.remove(key) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_live(&self, key: &PollKey) -> bool {
        let live = self.live.lock().unwrap_or_else(PoisonError::into_inner);
        live.get(key).is_some_and(|token| !token.is_cancelled())
    }

    pub fn live_count(&self) -> usize {
        let live = self.live.lock().unwrap_or_else(PoisonError::into_inner);
        live.values().filter(|token| !token.is_cancelled()).count()
    }

    /// Teardown: cancels every registered poll.
    pub fn cancel_all(&self) {
        let mut live = self.live.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, token) in live.drain() {
            token.cancel();
        }
    }
}

/// Fixed-rate ticker. Ticks that come due while the previous fetch is still
/// pending are skipped rather than queued.
pub fn ticker(period: Duration, immediate: bool) -> Interval {
    let start = if immediate {
        Instant::now()
    } else {
        Instant::now() + period
    };
    let mut interval = tokio::time::interval_at(start, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

/// Waits for the next tick; `false` means the poll was cancelled.
pub async fn next_tick(interval: &mut Interval, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = interval.tick() => true,
    }
}

#[cfg(test)]
#[path = "tests/poll_tests.rs"]
mod tests;

//! Log tailing: polls a workspace's log endpoint on its own clock and merges
//! new lines into a locally held sequence without repeating what it holds.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::LogFetchError;
use crate::model::{LogLine, WorkspaceId};
use crate::poll::{PollHandle, PollKey, PollKind, PollRegistry, next_tick, ticker};
use crate::remote::Gateway;

mod merge;
mod parse;

pub use self::merge::merge_log_lines;
pub use self::parse::{parse_batch, parse_log_line, parse_log_line_at};

/// What a tail currently shows.
#[derive(Clone, Debug, Default)]
pub struct LogView {
    pub lines: Vec<LogLine>,
    /// Set once fetches have failed `log_failure_threshold` times in a row.
    pub advisory: Option<Arc<LogFetchError>>,
    pub consecutive_failures: u32,
}

pub struct LogTailer {
    gateway: Arc<Gateway>,
    polls: PollRegistry,
    interval: Duration,
    failure_threshold: u32,
}

impl LogTailer {
    pub fn new(gateway: Arc<Gateway>, polls: PollRegistry) -> Self {
        let cfg = gateway.config();
        let interval = cfg.log_poll_interval;
        let failure_threshold = cfg.log_failure_threshold.max(1);
        Self {
            gateway,
            polls,
            interval,
            failure_threshold,
        }
    }

    /// One-shot fetch, parsed but not merged.
    pub async fn fetch(&self, id: &WorkspaceId) -> Result<Vec<LogLine>, LogFetchError> {
        let raw = fetch_raw(&self.gateway, id).await?;
        Ok(parse_batch(&raw, &[]))
    }

    /// Starts tailing `id`, replacing any tail already running for it.
    pub fn tail(&self, id: &WorkspaceId) -> LogTail {
        let (tx, rx) = watch::channel(LogView::default());
        let gateway = self.gateway.clone();
        let workspace = id.clone();
        let interval = self.interval;
        let threshold = self.failure_threshold;

        let handle = self
            .polls
            .spawn(PollKey::new(id.clone(), PollKind::Logs), move |cancel| {
                run_tail(gateway, workspace, interval, threshold, tx, cancel)
            });

        LogTail { handle, view: rx }
    }
}

async fn fetch_raw(gateway: &Gateway, id: &WorkspaceId) -> Result<Vec<String>, LogFetchError> {
    gateway
        .workspace_logs(id)
        .await
        .map_err(LogFetchError::Transient)
}

async fn run_tail(
    gateway: Arc<Gateway>,
    id: WorkspaceId,
    interval: Duration,
    threshold: u32,
    view: watch::Sender<LogView>,
    cancel: CancellationToken,
) {
    let mut ticks = ticker(interval, true);
    while next_tick(&mut ticks, &cancel).await {
        let result = fetch_raw(&gateway, &id).await;
        if cancel.is_cancelled() {
            debug!(workspace = %id, "discarding log batch for cancelled tail");
            break;
        }

        match result {
            Ok(raw) => {
                view.send_if_modified(|v| {
                    let batch = parse_batch(&raw, &v.lines);
                    let appended = merge_log_lines(&mut v.lines, batch);
                    let recovered = v.advisory.take().is_some();
                    v.consecutive_failures = 0;
                    if appended > 0 {
                        debug!(workspace = %id, appended, "merged log lines");
                    }
                    appended > 0 || recovered
                });
            }
            Err(err) => {
                warn!(workspace = %id, error = %err, "log fetch failed; retrying next tick");
                view.send_if_modified(|v| {
                    v.consecutive_failures += 1;
                    if v.consecutive_failures >= threshold && v.advisory.is_none() {
                        v.advisory = Some(Arc::new(err));
                        return true;
                    }
                    false
                });
            }
        }
    }
}

/// A running tail. Dropping it stops polling.
pub struct LogTail {
    handle: PollHandle,
    view: watch::Receiver<LogView>,
}

impl LogTail {
    pub fn handle(&self) -> &PollHandle {
        &self.handle
    }

    pub fn stop(&self) {
        self.handle.stop();
    }

    pub fn snapshot(&self) -> LogView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LogView> {
        self.view.clone()
    }

    /// Waits for new lines or an advisory change. `false` once the tail has stopped.
    pub async fn changed(&mut self) -> bool {
        self.view.changed().await.is_ok()
    }
}

#[cfg(test)]
#[path = "tests/logs_tests.rs"]
mod tests;

//! Workspace lifecycle controller: request/response actions plus the startup
//! poll that waits for a container to come up and opens it exactly once.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::WorkspaceError;
use crate::model::{
    ContainerStatus, GitTemplate, NewWorkspace, ResourceClass, Workspace, WorkspaceId,
};
use crate::poll::{PollHandle, PollKey, PollKind, PollRegistry, next_tick, ticker};
use crate::remote::Gateway;

mod opener;
pub use self::opener::{PrintOpener, RecordingOpener, SystemBrowser, UrlOpener};

type Launched = Arc<Mutex<HashSet<WorkspaceId>>>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StartupPhase {
    Waiting(ContainerStatus),
    /// Container is running. `opened` is false when there was no URL or it
    /// had already been opened.
    Ready { opened: bool },
    Failed,
    NotFound,
    SessionExpired,
    TimedOut,
    Abandoned,
}

impl StartupPhase {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StartupPhase::Waiting(_))
    }
}

#[derive(Clone, Debug)]
pub struct StartupView {
    pub phase: StartupPhase,
    pub workspace: Option<Workspace>,
    pub polls: u32,
}

impl Default for StartupView {
    fn default() -> Self {
        Self {
            phase: StartupPhase::Waiting(ContainerStatus::Starting),
            workspace: None,
            polls: 0,
        }
    }
}

/// Result of the workspace-page entry flow.
#[derive(Debug)]
pub enum OpenOutcome {
    Running { workspace: Workspace, opened: bool },
    Starting(StartupWatch),
    Idle(Workspace),
}

pub struct WorkspaceController {
    gateway: Arc<Gateway>,
    opener: Arc<dyn UrlOpener>,
    polls: PollRegistry,
    launched: Launched,
    poll_interval: Duration,
    max_polls: Option<u32>,
}

impl WorkspaceController {
    pub fn new(gateway: Arc<Gateway>, opener: Arc<dyn UrlOpener>, polls: PollRegistry) -> Self {
        let poll_interval = gateway.config().lifecycle_poll_interval;
        let max_polls = gateway.config().max_startup_polls;
        Self {
            gateway,
            opener,
            polls,
            launched: Arc::default(),
            poll_interval,
            max_polls,
        }
    }

    pub async fn list(&self) -> Result<Vec<Workspace>, WorkspaceError> {
        self.gateway
            .list_workspaces()
            .await
            .map_err(WorkspaceError::FetchFailed)
    }

    pub async fn get(&self, id: &WorkspaceId) -> Result<Workspace, WorkspaceError> {
        self.gateway
            .get_workspace(id)
            .await
            .map_err(|err| WorkspaceError::from_fetch(id, err))
    }

    pub async fn create(&self, new: &NewWorkspace) -> Result<Workspace, WorkspaceError> {
        let ws = self
            .gateway
            .create_workspace(new)
            .await
            .map_err(WorkspaceError::CreateFailed)?;
        info!(workspace = %ws.id, name = %ws.name, "workspace created");
        Ok(ws)
    }

    /// Asks the backend to start the container, then watches it come up.
    /// A failed start leaves nothing running.
    pub async fn start(&self, id: &WorkspaceId) -> Result<StartupWatch, WorkspaceError> {
        self.gateway
            .start_workspace(id)
            .await
            .map_err(WorkspaceError::StartFailed)?;
        info!(workspace = %id, "start requested");
        Ok(self.watch(id, true))
    }

    /// A rejected stop leaves any startup watch running.
    pub async fn stop(&self, id: &WorkspaceId) -> Result<(), WorkspaceError> {
        self.gateway
            .stop_workspace(id)
            .await
            .map_err(WorkspaceError::StopFailed)?;
        self.polls
            .cancel(&PollKey::new(id.clone(), PollKind::Lifecycle));
        self.forget_launch(id);
        info!(workspace = %id, "workspace stopped");
        Ok(())
    }

    pub async fn delete(&self, id: &WorkspaceId) -> Result<(), WorkspaceError> {
        self.gateway
            .delete_workspace(id)
            .await
            .map_err(WorkspaceError::DeleteFailed)?;
        for kind in [PollKind::Lifecycle, PollKind::Logs] {
            self.polls.cancel(&PollKey::new(id.clone(), kind));
        }
        self.forget_launch(id);
        info!(workspace = %id, "workspace deleted");
        Ok(())
    }

    pub async fn templates(&self) -> Result<Vec<GitTemplate>, WorkspaceError> {
        self.gateway
            .templates()
            .await
            .map_err(WorkspaceError::FetchFailed)
    }

    pub async fn resources(&self) -> Result<Vec<ResourceClass>, WorkspaceError> {
        self.gateway
            .resources()
            .await
            .map_err(WorkspaceError::FetchFailed)
    }

    /// Loads `id`; a `starting` container is watched, a `running` one is
    /// opened (at most once per controller until it is stopped or restarted).
    pub async fn open(&self, id: &WorkspaceId) -> Result<OpenOutcome, WorkspaceError> {
        let ws = self.get(id).await?;
        match ws.container_status {
            ContainerStatus::Starting => Ok(OpenOutcome::Starting(self.watch(id, false))),
            ContainerStatus::Running => {
                let opened = launch_once(&self.launched, self.opener.as_ref(), &ws, None);
                Ok(OpenOutcome::Running {
                    workspace: ws,
                    opened,
                })
            }
            _ => Ok(OpenOutcome::Idle(ws)),
        }
    }

    /// Whether the URL of `id` has already been handed to the opener.
    pub fn was_launched(&self, id: &WorkspaceId) -> bool {
        self.launched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(id)
    }

    fn forget_launch(&self, id: &WorkspaceId) {
        self.launched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
    }

    fn watch(&self, id: &WorkspaceId, fresh_start: bool) -> StartupWatch {
        let (view_tx, view_rx) = watch::channel(StartupView::default());
        let (done_tx, done_rx) = oneshot::channel();
        let poll = StartupPoll {
            gateway: self.gateway.clone(),
            opener: self.opener.clone(),
            launched: self.launched.clone(),
            id: id.clone(),
            interval: self.poll_interval,
            max_polls: self.max_polls,
            view: view_tx,
        };

        // Replacing the previous poll and resetting the launch flag happen
        // under the same lock the poll takes before opening.
        let mut launched = self.launched.lock().unwrap_or_else(PoisonError::into_inner);
        let handle = self
            .polls
            .spawn(PollKey::new(id.clone(), PollKind::Lifecycle), move |cancel| {
                poll.run(cancel, done_tx)
            });
        if fresh_start {
            launched.remove(id);
        }
        drop(launched);
        debug!(workspace = %id, "watching startup");

        StartupWatch {
            id: id.clone(),
            handle,
            view: view_rx,
            outcome: done_rx,
        }
    }
}

/// Opens the workspace URL unless it was opened before or the owning poll
/// has been cancelled. Returns whether the opener was invoked successfully.
fn launch_once(
    launched: &Mutex<HashSet<WorkspaceId>>,
    opener: &dyn UrlOpener,
    ws: &Workspace,
    cancel: Option<&CancellationToken>,
) -> bool {
    let Some(url) = ws.launch_url() else {
        debug!(workspace = %ws.id, "running without a url; nothing to open");
        return false;
    };

    let mut launched = launched.lock().unwrap_or_else(PoisonError::into_inner);
    if cancel.is_some_and(CancellationToken::is_cancelled) {
        return false;
    }
    if !launched.insert(ws.id.clone()) {
        debug!(workspace = %ws.id, "already opened");
        return false;
    }
    match opener.open(url) {
        Ok(()) => {
            info!(workspace = %ws.id, url, "opened workspace");
            true
        }
        Err(err) => {
            warn!(workspace = %ws.id, error = %format!("{err:#}"), "failed to open workspace url");
            false
        }
    }
}

struct StartupPoll {
    gateway: Arc<Gateway>,
    opener: Arc<dyn UrlOpener>,
    launched: Launched,
    id: WorkspaceId,
    interval: Duration,
    max_polls: Option<u32>,
    view: watch::Sender<StartupView>,
}

impl StartupPoll {
    async fn run(
        self,
        cancel: CancellationToken,
        done: oneshot::Sender<Result<Workspace, WorkspaceError>>,
    ) {
        let mut ticks = ticker(self.interval, false);
        let mut polls = 0u32;

        let outcome = loop {
            if !next_tick(&mut ticks, &cancel).await {
                break None;
            }
            polls += 1;
            let result = self.gateway.get_workspace(&self.id).await;
            if cancel.is_cancelled() {
                debug!(workspace = %self.id, "discarding status for cancelled poll");
                break None;
            }

            match result {
                Ok(ws) => match ws.container_status {
                    ContainerStatus::Running => {
                        let opened =
                            launch_once(&self.launched, self.opener.as_ref(), &ws, Some(&cancel));
                        self.publish(StartupPhase::Ready { opened }, Some(&ws), polls);
                        break Some(Ok(ws));
                    }
                    ContainerStatus::Failed => {
                        warn!(workspace = %self.id, "container failed to start");
                        self.publish(StartupPhase::Failed, Some(&ws), polls);
                        break Some(Err(WorkspaceError::ContainerFailed(self.id.clone())));
                    }
                    status => {
                        debug!(workspace = %self.id, %status, polls, "not ready yet");
                        self.publish(StartupPhase::Waiting(status), Some(&ws), polls);
                    }
                },
                Err(err) if err.is_not_found() => {
                    self.publish(StartupPhase::NotFound, None, polls);
                    break Some(Err(WorkspaceError::NotFound(self.id.clone())));
                }
                Err(err) if err.is_session_invalid() => {
                    self.publish(StartupPhase::SessionExpired, None, polls);
                    break Some(Err(WorkspaceError::FetchFailed(err)));
                }
                Err(err) => {
                    warn!(workspace = %self.id, error = %err, "status poll failed; retrying next tick");
                    self.view.send_modify(|v| v.polls = polls);
                }
            }

            if let Some(max) = self.max_polls
                && polls >= max
            {
                warn!(workspace = %self.id, polls, "gave up waiting for workspace");
                self.publish(StartupPhase::TimedOut, None, polls);
                break Some(Err(WorkspaceError::StartupTimedOut {
                    id: self.id.clone(),
                    polls,
                }));
            }
        };

        match outcome {
            Some(result) => {
                let _ = done.send(result);
            }
            None => self.view.send_modify(|v| v.phase = StartupPhase::Abandoned),
        }
    }

    fn publish(&self, phase: StartupPhase, ws: Option<&Workspace>, polls: u32) {
        self.view.send_modify(|v| {
            v.phase = phase;
            if let Some(ws) = ws {
                v.workspace = Some(ws.clone());
            }
            v.polls = polls;
        });
    }
}

/// A running startup poll. Dropping it cancels the poll.
#[derive(Debug)]
pub struct StartupWatch {
    id: WorkspaceId,
    handle: PollHandle,
    view: watch::Receiver<StartupView>,
    outcome: oneshot::Receiver<Result<Workspace, WorkspaceError>>,
}

impl StartupWatch {
    pub fn id(&self) -> &WorkspaceId {
        &self.id
    }

    pub fn handle(&self) -> &PollHandle {
        &self.handle
    }

    pub fn stop(&self) {
        self.handle.stop();
    }

    pub fn snapshot(&self) -> StartupView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<StartupView> {
        self.view.clone()
    }

    /// Waits for the next view update. `false` once the poll has exited.
    pub async fn changed(&mut self) -> bool {
        self.view.changed().await.is_ok()
    }

    /// Resolves to the running workspace, or to why it never got there.
    pub async fn wait(self) -> Result<Workspace, WorkspaceError> {
        let StartupWatch {
            id,
            handle: _handle,
            outcome,
            ..
        } = self;
        match outcome.await {
            Ok(result) => result,
            Err(_) => Err(WorkspaceError::Abandoned(id)),
        }
    }
}

#[cfg(test)]
#[path = "tests/lifecycle_tests.rs"]
mod tests;

//! Composition root: everything a front end needs, built once per process.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::ClientConfig;
use crate::lifecycle::{SystemBrowser, UrlOpener, WorkspaceController};
use crate::logs::LogTailer;
use crate::poll::PollRegistry;
use crate::remote::Gateway;
use crate::session::SessionManager;
use crate::store::{FileTokenStore, TokenStore};

pub struct DevspaceContext {
    pub gateway: Arc<Gateway>,
    pub session: SessionManager,
    pub workspaces: WorkspaceController,
    pub logs: LogTailer,
    polls: PollRegistry,
}

impl DevspaceContext {
    /// File-backed tokens in the configured state dir, system browser opener.
    pub fn open(config: ClientConfig) -> Result<Self> {
        let store = FileTokenStore::open(&config.state_dir)?;
        Self::new(config, Arc::new(store), Arc::new(SystemBrowser))
    }

    pub fn new(
        config: ClientConfig,
        store: Arc<dyn TokenStore>,
        opener: Arc<dyn UrlOpener>,
    ) -> Result<Self> {
        let gateway = Arc::new(Gateway::new(config, store).context("build http client")?);
        let polls = PollRegistry::new();
        Ok(Self {
            session: SessionManager::new(gateway.clone()),
            workspaces: WorkspaceController::new(gateway.clone(), opener, polls.clone()),
            logs: LogTailer::new(gateway.clone(), polls.clone()),
            gateway,
            polls,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        self.gateway.config()
    }

    pub fn polls(&self) -> &PollRegistry {
        &self.polls
    }

    /// Cancels every poll this context started.
    pub fn shutdown(&self) {
        self.polls.cancel_all();
    }
}

impl Drop for DevspaceContext {
    fn drop(&mut self) {
        self.polls.cancel_all();
    }
}

//! HTTP gateway to the workspace backend: bearer attachment, the
//! 401 -> refresh -> retry protocol, and typed endpoint calls.

use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::GatewayError;
use crate::model::SessionState;
use crate::store::{TokenKey, TokenStore, read_token};

mod http_client;
use self::http_client::RefreshFlight;

mod types;
pub use self::types::*;
mod identity;
mod operations;

pub const LOGIN_PATH: &str = "/api/jwt/login/";
pub const REFRESH_PATH: &str = "/api/jwt/token/refresh/";
pub const ME_PATH: &str = "/api/jwt/me/";
pub const LOGOUT_PATH: &str = "/api/users/logout/";
pub const REGISTER_PATH: &str = "/api/users/register/";
pub const WORKSPACES_PATH: &str = "/api/workspaces/";
pub const TEMPLATES_PATH: &str = "/api/workspaces/templates/";
pub const RESOURCES_PATH: &str = "/api/workspaces/resources/";

/// A replayable description of one backend call.
#[derive(Clone, Debug)]
pub struct ApiRequest {
    method: Method,
    path: String,
    body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn json(mut self, body: &impl serde::Serialize) -> Result<Self, GatewayError> {
        self.body = Some(serde_json::to_value(body).map_err(GatewayError::Encode)?);
        Ok(self)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Login and refresh failures must never trigger a refresh themselves.
    pub fn is_auth_endpoint(&self) -> bool {
        self.path == LOGIN_PATH || self.path == REFRESH_PATH
    }
}

pub struct Gateway {
    config: ClientConfig,
    client: reqwest::Client,
    store: Arc<dyn TokenStore>,
    session: watch::Sender<SessionState>,
    refresh: Mutex<RefreshFlight>,
    epoch: AtomicU64,
}

impl Gateway {
    pub fn new(config: ClientConfig, store: Arc<dyn TokenStore>) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("devspace/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let (session, _) = watch::channel(SessionState::Anonymous);
        Ok(Self {
            config,
            client,
            store,
            session,
            refresh: Mutex::new(RefreshFlight::default()),
            epoch: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    pub fn access_token(&self) -> Option<String> {
        read_token(self.store.as_ref(), TokenKey::Access)
    }

    pub fn refresh_token(&self) -> Option<String> {
        read_token(self.store.as_ref(), TokenKey::Refresh)
    }

    pub fn subscribe_session(&self) -> watch::Receiver<SessionState> {
        self.session.subscribe()
    }

    pub(crate) fn session_state(&self) -> &watch::Sender<SessionState> {
        &self.session
    }

    pub(crate) fn url(&self, path: &str) -> String {
        self.config.url(path)
    }

    /// Sends `request` and decodes a JSON body.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
    ) -> Result<T, GatewayError> {
        let resp = self.send(request).await?;
        decode_json(resp).await
    }

    /// Sends `request` and discards the body.
    pub async fn send_empty(&self, request: &ApiRequest) -> Result<(), GatewayError> {
        self.send(request).await?;
        Ok(())
    }
}

pub(crate) async fn decode_json<T: DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, GatewayError> {
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|err| GatewayError::Decode(err.to_string()))
}

/// Turns a non-success response into `GatewayError::Status`, pulling the
/// backend's `error` / `detail` message when there is one.
pub(crate) async fn ensure_ok(resp: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(GatewayError::Status {
        status,
        message: error_message(status, &body),
    })
}

pub(crate) fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(body) {
        for field in ["error", "detail", "message"] {
            if let Some(msg) = v.get(field).and_then(|x| x.as_str()) {
                return msg.to_string();
            }
        }
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() && trimmed.len() <= 200 {
        return trimmed.to_string();
    }
    status
        .canonical_reason()
        .unwrap_or("unexpected status")
        .to_string()
}

#[cfg(test)]
#[path = "tests/remote_tests.rs"]
mod tests;

//! Typed failures for every operation family. The gateway decides which
//! variant applies; callers never inspect response shapes themselves.

use reqwest::StatusCode;
use thiserror::Error;

use crate::model::WorkspaceId;

/// Failure of a single call through the HTTP gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server returned {status}: {message}")]
    Status { status: StatusCode, message: String },

    /// The refresh token was rejected; local credentials have been cleared.
    #[error("session is no longer valid")]
    SessionInvalid,

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("encode request body: {0}")]
    Encode(#[source] serde_json::Error),
}

impl GatewayError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            GatewayError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    pub fn is_session_invalid(&self) -> bool {
        matches!(self, GatewayError::SessionInvalid)
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("could not complete authentication: {0}")]
    NetworkFailure(#[source] GatewayError),

    #[error("session expired; log in again")]
    SessionExpired,

    #[error("registration failed: {0}")]
    RegistrationFailed(#[source] GatewayError),
}

impl AuthError {
    /// Maps a failed login/profile call onto the auth taxonomy.
    pub(crate) fn from_login(err: GatewayError) -> Self {
        match err {
            GatewayError::SessionInvalid => AuthError::SessionExpired,
            GatewayError::Status { status, .. }
                if status == StatusCode::UNAUTHORIZED || status == StatusCode::BAD_REQUEST =>
            {
                AuthError::InvalidCredentials
            }
            other => AuthError::NetworkFailure(other),
        }
    }
}

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("failed to create workspace: {0}")]
    CreateFailed(#[source] GatewayError),

    #[error("failed to start workspace: {0}")]
    StartFailed(#[source] GatewayError),

    #[error("failed to stop workspace: {0}")]
    StopFailed(#[source] GatewayError),

    #[error("failed to delete workspace: {0}")]
    DeleteFailed(#[source] GatewayError),

    #[error("workspace {0} not found")]
    NotFound(WorkspaceId),

    #[error("workspace {0} failed to start")]
    ContainerFailed(WorkspaceId),

    #[error("failed to load workspaces: {0}")]
    FetchFailed(#[source] GatewayError),

    #[error("workspace {id} still not running after {polls} polls")]
    StartupTimedOut { id: WorkspaceId, polls: u32 },

    #[error("stopped watching workspace {0}")]
    Abandoned(WorkspaceId),
}

impl WorkspaceError {
    /// Read failures on a single workspace: a 404 becomes `NotFound`.
    pub(crate) fn from_fetch(id: &WorkspaceId, err: GatewayError) -> Self {
        if err.is_not_found() {
            WorkspaceError::NotFound(id.clone())
        } else {
            WorkspaceError::FetchFailed(err)
        }
    }

    pub fn gateway_error(&self) -> Option<&GatewayError> {
        match self {
            WorkspaceError::CreateFailed(err)
            | WorkspaceError::StartFailed(err)
            | WorkspaceError::StopFailed(err)
            | WorkspaceError::DeleteFailed(err)
            | WorkspaceError::FetchFailed(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_session_expired(&self) -> bool {
        self.gateway_error()
            .is_some_and(GatewayError::is_session_invalid)
    }
}

#[derive(Debug, Error)]
pub enum LogFetchError {
    #[error("failed to fetch logs: {0}")]
    Transient(#[source] GatewayError),
}

#[cfg(test)]
#[path = "tests/error_tests.rs"]
mod tests;

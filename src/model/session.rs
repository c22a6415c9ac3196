use std::fmt;

use serde::{Deserialize, Serialize};

/// An authenticated user together with the credentials backing it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    pub access_token: String,

    #[serde(default)]
    pub refresh_token: Option<String>,
}

// Tokens stay out of logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("is_admin", &self.is_admin)
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Where the session manager currently is.
///
/// `Anonymous -> Authenticating -> Authenticated -> (Expired | LoggingOut) -> Anonymous`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticating,
    Authenticated(Session),
    /// Refresh was rejected by the backend; credentials are gone.
    Expired,
    LoggingOut,
}

impl SessionState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    pub fn is_admin(&self) -> bool {
        self.session().is_some_and(|s| s.is_admin)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Anonymous => "anonymous",
            SessionState::Authenticating => "authenticating",
            SessionState::Authenticated(_) => "authenticated",
            SessionState::Expired => "expired",
            SessionState::LoggingOut => "logging-out",
        }
    }
}

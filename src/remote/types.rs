//! DTOs and payload types for backend API requests/responses.

#[derive(Debug, serde::Serialize)]
pub(super) struct LoginRequest<'a> {
    pub(super) username: &'a str,
    pub(super) password: &'a str,
}

/// `POST /api/jwt/login/`. Every field is optional on the wire; the session
/// manager rejects responses missing what it needs.
#[derive(Debug, Default, serde::Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub access: Option<String>,
    #[serde(default)]
    pub refresh: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub(super) struct RefreshRequest {
    pub(super) refresh: String,
}

#[derive(Debug, serde::Deserialize)]
pub(super) struct RefreshResponse {
    #[serde(default)]
    pub(super) access: String,
    #[serde(default)]
    pub(super) refresh: Option<String>,
}

/// `GET /api/jwt/me/`.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct UserProfile {
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Debug, serde::Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Log endpoint payload: a bare array, or `{"logs": ...}` holding either an
/// array or the container's raw output as one newline-separated string.
#[derive(Debug, serde::Deserialize)]
#[serde(untagged)]
pub(super) enum LogsPayload {
    Lines(Vec<String>),
    Wrapped {
        #[serde(default)]
        logs: LogsBody,
    },
}

#[derive(Debug, serde::Deserialize)]
#[serde(untagged)]
pub(super) enum LogsBody {
    Lines(Vec<String>),
    Text(String),
}

impl Default for LogsBody {
    fn default() -> Self {
        LogsBody::Lines(Vec::new())
    }
}

impl LogsPayload {
    pub(super) fn into_lines(self) -> Vec<String> {
        match self {
            LogsPayload::Lines(lines) => lines,
            LogsPayload::Wrapped {
                logs: LogsBody::Lines(lines),
            } => lines,
            LogsPayload::Wrapped {
                logs: LogsBody::Text(text),
            } => text.lines().map(str::to_string).collect(),
        }
    }
}

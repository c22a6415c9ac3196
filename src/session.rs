//! Session lifecycle: login, logout, and process-start bootstrap.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::{AuthError, GatewayError};
use crate::model::{Session, SessionState};
use crate::remote::{Gateway, LoginResponse, RegisterRequest};
use crate::store::{TokenKey, clear_tokens, write_token};

pub struct SessionManager {
    gateway: Arc<Gateway>,
}

impl SessionManager {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    pub fn current(&self) -> SessionState {
        self.gateway.session_state().borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.gateway.subscribe_session()
    }

    pub fn is_authenticated(&self) -> bool {
        self.gateway.session_state().borrow().is_authenticated()
    }

    pub fn is_admin(&self) -> bool {
        self.gateway.session_state().borrow().is_admin()
    }

    fn transition(&self, next: SessionState) {
        let prev = self.gateway.session_state().send_replace(next);
        let now = self.gateway.session_state().borrow().label();
        if prev.label() != now {
            info!(from = prev.label(), to = now, "session state changed");
        }
    }

    /// Restores a session from stored credentials. Runs once per process start.
    pub async fn bootstrap(&self) -> SessionState {
        let Some(access) = self.gateway.access_token() else {
            self.transition(SessionState::Anonymous);
            return SessionState::Anonymous;
        };

        self.transition(SessionState::Authenticating);
        match self.gateway.me().await {
            Ok(profile) => {
                // The profile call may have refreshed the access token.
                let session = Session {
                    username: profile.username,
                    email: profile.email,
                    is_admin: profile.is_admin,
                    access_token: self.gateway.access_token().unwrap_or(access),
                    refresh_token: self.gateway.refresh_token(),
                };
                let state = SessionState::Authenticated(session);
                self.transition(state.clone());
                state
            }
            Err(err) => {
                warn!(error = %err, "stored session could not be restored");
                clear_tokens(self.gateway.store().as_ref());
                self.gateway.reset_refresh().await;
                self.transition(SessionState::Anonymous);
                SessionState::Anonymous
            }
        }
    }

    /// Authenticates and populates the profile. If the profile fetch fails the
    /// whole login fails and the freshly stored tokens are removed again.
    ///
    /// A rejected attempt leaves an existing session as it was.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, AuthError> {
        let previous = self.current();
        self.transition(SessionState::Authenticating);

        let resp = match self.gateway.login_request(username, password).await {
            Ok(resp) => resp,
            Err(err) => {
                warn!(user = username, error = %err, "login failed");
                self.settle_failed_login(previous).await;
                return Err(AuthError::from_login(err));
            }
        };

        let Some(mut session) = session_from_login(resp) else {
            warn!(user = username, "login response missing required fields");
            self.settle_failed_login(previous).await;
            return Err(AuthError::NetworkFailure(GatewayError::Decode(
                "login response missing access token, username, or email".to_string(),
            )));
        };

        let store = self.gateway.store().as_ref();
        write_token(store, TokenKey::Access, &session.access_token);
        match &session.refresh_token {
            Some(refresh) => write_token(store, TokenKey::Refresh, refresh),
            None => {
                if let Err(err) = store.clear(TokenKey::Refresh) {
                    warn!(error = %format!("{err:#}"), "failed to clear stale refresh token");
                }
            }
        }
        self.gateway.reset_refresh().await;
        self.transition(SessionState::Authenticated(session.clone()));

        match self.gateway.me().await {
            Ok(profile) => {
                session.is_admin = profile.is_admin;
                if !profile.email.is_empty() {
                    session.email = profile.email;
                }
                if let Some(access) = self.gateway.access_token() {
                    session.access_token = access;
                }
                self.transition(SessionState::Authenticated(session.clone()));
                info!(user = %session.username, admin = session.is_admin, "logged in");
                Ok(session)
            }
            Err(err) => {
                warn!(user = username, error = %err, "profile fetch after login failed");
                clear_tokens(store);
                self.gateway.reset_refresh().await;
                self.transition(SessionState::Anonymous);
                Err(match err {
                    GatewayError::SessionInvalid => AuthError::SessionExpired,
                    other => AuthError::NetworkFailure(other),
                })
            }
        }
    }

    /// Puts back the session a failed login interrupted. Without one, any
    /// stored tokens are dropped to match the anonymous state.
    async fn settle_failed_login(&self, previous: SessionState) {
        if previous.is_authenticated() && self.gateway.access_token().is_some() {
            self.transition(previous);
            return;
        }
        if self.gateway.access_token().is_some() || self.gateway.refresh_token().is_some() {
            clear_tokens(self.gateway.store().as_ref());
            self.gateway.reset_refresh().await;
        }
        self.transition(SessionState::Anonymous);
    }

    /// Best-effort remote invalidation; local credentials are always cleared.
    pub async fn logout(&self) {
        self.transition(SessionState::LoggingOut);
        if self.gateway.access_token().is_some()
            && let Err(err) = self.gateway.logout_request().await
        {
            warn!(error = %err, "remote logout failed; clearing local session anyway");
        }
        clear_tokens(self.gateway.store().as_ref());
        self.gateway.reset_refresh().await;
        self.transition(SessionState::Anonymous);
        info!("logged out");
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(), AuthError> {
        let payload = RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        self.gateway
            .register(&payload)
            .await
            .map_err(AuthError::RegistrationFailed)?;
        info!(user = username, "registered");
        Ok(())
    }
}

fn session_from_login(resp: LoginResponse) -> Option<Session> {
    let access = resp.access.filter(|a| !a.is_empty())?;
    let username = resp.username.filter(|u| !u.is_empty())?;
    let email = resp.email.filter(|e| !e.is_empty())?;
    Some(Session {
        username,
        email,
        is_admin: false,
        access_token: access,
        refresh_token: resp.refresh.filter(|r| !r.is_empty()),
    })
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;

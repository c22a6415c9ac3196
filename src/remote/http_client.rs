use std::sync::atomic::Ordering;

use super::*;
use crate::store::{clear_tokens, write_token};

/// Why a refresh did not produce a new access token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum RefreshFailure {
    /// Backend answered 401: the refresh token is dead.
    Rejected,
    /// Network error or unexpected status; credentials are left alone.
    Unavailable,
    NoRefreshToken,
}

/// Outcome of the most recent refresh, shared by every request that failed
/// while it was in flight.
#[derive(Debug, Default)]
pub(super) struct RefreshFlight {
    last: Option<Result<String, RefreshFailure>>,
}

impl Gateway {
    /// Sends `request` with the current bearer token.
    ///
    /// A 401 on anything but the login/refresh endpoints triggers at most one
    /// refresh (shared with concurrent callers) and at most one replay.
    pub async fn send(&self, request: &ApiRequest) -> Result<reqwest::Response, GatewayError> {
        let epoch = self.epoch.load(Ordering::Acquire);
        let token = self.access_token();
        let resp = self.dispatch(request, token.as_deref()).await?;

        if resp.status() != StatusCode::UNAUTHORIZED
            || request.is_auth_endpoint()
            || self.refresh_token().is_none()
        {
            return ensure_ok(resp).await;
        }

        debug!(path = %request.path(), "request unauthorized; refreshing access token");
        let fresh = match self.refresh_after(epoch).await {
            Ok(token) => token,
            Err(RefreshFailure::Rejected) => return Err(GatewayError::SessionInvalid),
            Err(RefreshFailure::Unavailable | RefreshFailure::NoRefreshToken) => {
                return ensure_ok(resp).await;
            }
        };

        let retried = self.dispatch(request, Some(&fresh)).await?;
        ensure_ok(retried).await
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> Result<reqwest::Response, GatewayError> {
        debug!(method = %request.method, path = %request.path, "sending request");
        let mut builder = self
            .client
            .request(request.method.clone(), self.url(&request.path));
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        Ok(builder.send().await?)
    }

    /// Single-flight refresh. `seen_epoch` is the epoch the failing request was
    /// sent under; if a refresh has finished since then its outcome is reused.
    async fn refresh_after(&self, seen_epoch: u64) -> Result<String, RefreshFailure> {
        let mut flight = self.refresh.lock().await;

        if self.epoch.load(Ordering::Acquire) != seen_epoch
            && let Some(outcome) = flight.last.clone()
        {
            debug!("reusing outcome of concurrent token refresh");
            return outcome;
        }

        let outcome = match self.refresh_token() {
            Some(refresh) => self.exchange_refresh(&refresh).await,
            None => Err(RefreshFailure::NoRefreshToken),
        };

        match &outcome {
            Ok(access) => {
                write_token(self.store.as_ref(), TokenKey::Access, access);
                self.session.send_if_modified(|state| match state {
                    SessionState::Authenticated(session) => {
                        session.access_token = access.clone();
                        true
                    }
                    _ => false,
                });
                info!("access token refreshed");
            }
            Err(RefreshFailure::Rejected) => {
                clear_tokens(self.store.as_ref());
                self.session.send_replace(SessionState::Expired);
                warn!("refresh token rejected; session expired");
            }
            Err(failure) => {
                warn!(?failure, "token refresh unavailable");
            }
        }

        flight.last = Some(outcome.clone());
        self.epoch.fetch_add(1, Ordering::AcqRel);
        outcome
    }

    async fn exchange_refresh(&self, refresh: &str) -> Result<String, RefreshFailure> {
        let resp = self
            .client
            .post(self.url(REFRESH_PATH))
            .json(&RefreshRequest {
                refresh: refresh.to_string(),
            })
            .send()
            .await
            .map_err(|err| {
                warn!(error = %err, "refresh request failed");
                RefreshFailure::Unavailable
            })?;

        match resp.status() {
            StatusCode::UNAUTHORIZED => Err(RefreshFailure::Rejected),
            status if !status.is_success() => {
                warn!(%status, "refresh endpoint returned unexpected status");
                Err(RefreshFailure::Unavailable)
            }
            _ => {
                let body: RefreshResponse = decode_json(resp)
                    .await
                    .map_err(|_| RefreshFailure::Unavailable)?;
                if body.access.is_empty() {
                    return Err(RefreshFailure::Unavailable);
                }
                // Rotating backends hand out a new refresh token as well.
                if let Some(rotated) = body.refresh.filter(|r| !r.is_empty()) {
                    write_token(self.store.as_ref(), TokenKey::Refresh, &rotated);
                    self.session.send_if_modified(|state| match state {
                        SessionState::Authenticated(session) => {
                            session.refresh_token = Some(rotated.clone());
                            true
                        }
                        _ => false,
                    });
                }
                Ok(body.access)
            }
        }
    }

    /// Forgets any remembered refresh outcome. Called when credentials are
    /// replaced wholesale (login, logout).
    pub(crate) async fn reset_refresh(&self) {
        let mut flight = self.refresh.lock().await;
        flight.last = None;
        self.epoch.fetch_add(1, Ordering::AcqRel);
    }
}

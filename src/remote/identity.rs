//! Login, profile, logout, and registration calls.

use super::*;

impl Gateway {
    pub async fn login_request(
        &self,
        username: &str,
        password: &str,
    ) -> Result<LoginResponse, GatewayError> {
        let request = ApiRequest::post(LOGIN_PATH).json(&LoginRequest { username, password })?;
        self.send_json(&request).await
    }

    pub async fn me(&self) -> Result<UserProfile, GatewayError> {
        self.send_json(&ApiRequest::get(ME_PATH)).await
    }

    pub async fn logout_request(&self) -> Result<(), GatewayError> {
        let request = ApiRequest::post(LOGOUT_PATH).json(&serde_json::json!({}))?;
        self.send_empty(&request).await
    }

    pub async fn register(&self, payload: &RegisterRequest) -> Result<(), GatewayError> {
        let request = ApiRequest::post(REGISTER_PATH).json(payload)?;
        self.send_empty(&request).await
    }
}

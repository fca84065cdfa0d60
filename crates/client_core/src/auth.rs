use reqwest::Method;
use shared::protocol::{LoginRequest, TokenResponse};
use tracing::info;

use crate::{error::ClientError, session::Session, ApiClient};

/// Client for `POST /auth/login`.
#[derive(Debug, Clone)]
pub struct AuthClient {
    api: ApiClient,
}

impl AuthClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Exchanges credentials for a [`Session`]. The caller decides where the
    /// session lives; usually it is passed to [`ApiClient::with_session`].
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        let request = self
            .api
            .anonymous(Method::POST, &["auth", "login"])?
            .json(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            });
        let body = self.api.execute(request).await?;

        // A bare JWT may come back unquoted as text/plain.
        let token = serde_json::from_str::<TokenResponse>(&body)
            .map(TokenResponse::into_token)
            .unwrap_or_else(|_| body.trim().to_string());
        let session = Session::from_token(token)?;
        info!(
            email = %session.principal().email,
            admin = session.principal().is_admin(),
            "login succeeded"
        );
        Ok(session)
    }
}

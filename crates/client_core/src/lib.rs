//! Typed REST clients for the BINET administration backend.
//!
//! There is one client per backend resource. They all share an [`ApiClient`],
//! which owns the HTTP connection pool, the base URL and the operator's
//! [`Session`].

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use shared::{
    domain::UserId,
    protocol::{NewUser, User, UserUpdate},
};
use tracing::{info, warn};
use url::Url;

pub mod auth;
pub mod categories;
pub mod config;
pub mod email;
pub mod error;
pub mod publications;
pub mod reports;
pub mod session;
pub mod users;

pub use auth::AuthClient;
pub use categories::CategoryClient;
pub use config::{load_settings, Settings};
pub use email::{EmailClient, EmailOutcome};
pub use error::ClientError;
pub use publications::PublicationClient;
pub use reports::ReportClient;
pub use session::{Principal, Session};
pub use users::UserClient;

/// The user directory as the list controller sees it.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn list_users(&self) -> Result<Vec<User>, ClientError>;
    async fn get_user(&self, id: &UserId) -> Result<User, ClientError>;
    async fn create_user(&self, new_user: &NewUser) -> Result<User, ClientError>;
    async fn update_user(&self, id: &UserId, update: &UserUpdate) -> Result<User, ClientError>;
    async fn delete_user(&self, id: &UserId) -> Result<(), ClientError>;
}

#[async_trait]
impl<T> UserDirectory for Arc<T>
where
    T: UserDirectory + ?Sized,
{
    async fn list_users(&self) -> Result<Vec<User>, ClientError> {
        (**self).list_users().await
    }

    async fn get_user(&self, id: &UserId) -> Result<User, ClientError> {
        (**self).get_user(id).await
    }

    async fn create_user(&self, new_user: &NewUser) -> Result<User, ClientError> {
        (**self).create_user(new_user).await
    }

    async fn update_user(&self, id: &UserId, update: &UserUpdate) -> Result<User, ClientError> {
        (**self).update_user(id, update).await
    }

    async fn delete_user(&self, id: &UserId) -> Result<(), ClientError> {
        (**self).delete_user(id).await
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    session: Option<Arc<Session>>,
}

impl ApiClient {
    pub fn new(settings: &Settings) -> Result<Self, ClientError> {
        let base_url = settings.base_url()?;
        let http = Client::builder()
            .timeout(settings.request_timeout())
            .build()?;
        Ok(Self {
            http,
            base_url,
            session: None,
        })
    }

    pub fn with_session(mut self, session: Session) -> Self {
        info!(email = %session.principal().email, "session opened");
        self.session = Some(Arc::new(session));
        self
    }

    pub fn logout(&mut self) {
        if let Some(session) = self.session.take() {
            info!(email = %session.principal().email, "session closed");
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_deref()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn users(&self) -> UserClient {
        UserClient::new(self.clone())
    }

    pub fn categories(&self) -> CategoryClient {
        CategoryClient::new(self.clone())
    }

    pub fn publications(&self) -> PublicationClient {
        PublicationClient::new(self.clone())
    }

    pub fn reports(&self) -> ReportClient {
        ReportClient::new(self.clone())
    }

    /// Path segments are percent-encoded individually, so identifiers may
    /// contain any character.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub(crate) fn anonymous(
        &self,
        method: Method,
        segments: &[&str],
    ) -> Result<RequestBuilder, ClientError> {
        Ok(self.http.request(method, self.endpoint(segments)?))
    }

    pub(crate) fn authorized(
        &self,
        method: Method,
        segments: &[&str],
    ) -> Result<RequestBuilder, ClientError> {
        let session = self.session().ok_or_else(ClientError::missing_session)?;
        if session.is_expired() {
            return Err(ClientError::Authentication {
                status: None,
                reason: "session expired".to_string(),
            });
        }
        Ok(self.anonymous(method, segments)?.bearer_auth(session.bearer()))
    }

    pub(crate) async fn execute(&self, request: RequestBuilder) -> Result<String, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        let path = response.url().path().to_string();
        let body = response.text().await?;
        if !status.is_success() {
            warn!(%status, path = %path, "backend request failed");
            return Err(ClientError::from_status(status, &path, &body));
        }
        Ok(body)
    }

    pub(crate) async fn execute_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ClientError> {
        let body = self.execute(request).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

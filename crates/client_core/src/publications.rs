use reqwest::Method;
use shared::{
    domain::{PublicationId, PublicationStatus},
    protocol::{Publication, PublicationUpdate},
};
use tracing::info;

use crate::{error::ClientError, ApiClient};

/// Client for `/api/publications`, including moderation.
#[derive(Debug, Clone)]
pub struct PublicationClient {
    api: ApiClient,
}

impl PublicationClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn list(&self) -> Result<Vec<Publication>, ClientError> {
        self.api
            .execute_json(self.api.authorized(Method::GET, &["api", "publications"])?)
            .await
    }

    pub async fn get(&self, id: &PublicationId) -> Result<Publication, ClientError> {
        self.api
            .execute_json(
                self.api
                    .authorized(Method::GET, &["api", "publications", id.as_str()])?,
            )
            .await
    }

    pub async fn update(
        &self,
        id: &PublicationId,
        update: &PublicationUpdate,
    ) -> Result<Publication, ClientError> {
        let request = self
            .api
            .authorized(Method::PUT, &["api", "publications", id.as_str()])?
            .json(update);
        self.api.execute_json(request).await
    }

    pub async fn approve(&self, id: &PublicationId) -> Result<Publication, ClientError> {
        self.moderate(id, PublicationStatus::Approved).await
    }

    pub async fn reject(&self, id: &PublicationId) -> Result<Publication, ClientError> {
        self.moderate(id, PublicationStatus::Rejected).await
    }

    async fn moderate(
        &self,
        id: &PublicationId,
        status: PublicationStatus,
    ) -> Result<Publication, ClientError> {
        let update = PublicationUpdate {
            status: Some(status),
            ..PublicationUpdate::default()
        };
        let publication = self.update(id, &update).await?;
        info!(publication_id = %id, ?status, "moderated publication");
        Ok(publication)
    }

    pub async fn delete(&self, id: &PublicationId) -> Result<(), ClientError> {
        self.api
            .execute(
                self.api
                    .authorized(Method::DELETE, &["api", "publications", id.as_str()])?,
            )
            .await?;
        info!(publication_id = %id, "deleted publication");
        Ok(())
    }
}

use reqwest::Method;
use shared::{
    domain::CategoryId,
    protocol::{Category, CategoryDraft},
};
use tracing::info;

use crate::{error::ClientError, ApiClient};

#[derive(Debug, Clone)]
pub struct CategoryClient {
    api: ApiClient,
}

impl CategoryClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn list(&self) -> Result<Vec<Category>, ClientError> {
        self.api
            .execute_json(self.api.authorized(Method::GET, &["api", "categories"])?)
            .await
    }

    pub async fn get(&self, id: &CategoryId) -> Result<Category, ClientError> {
        self.api
            .execute_json(
                self.api
                    .authorized(Method::GET, &["api", "categories", id.as_str()])?,
            )
            .await
    }

    pub async fn create(&self, draft: &CategoryDraft) -> Result<Category, ClientError> {
        let request = self
            .api
            .authorized(Method::POST, &["api", "categories"])?
            .json(draft);
        let created: Category = self.api.execute_json(request).await?;
        info!(category_id = %created.id, name = %created.name, "created category");
        Ok(created)
    }

    pub async fn update(
        &self,
        id: &CategoryId,
        draft: &CategoryDraft,
    ) -> Result<Category, ClientError> {
        let request = self
            .api
            .authorized(Method::PUT, &["api", "categories", id.as_str()])?
            .json(draft);
        self.api.execute_json(request).await
    }

    pub async fn delete(&self, id: &CategoryId) -> Result<(), ClientError> {
        self.api
            .execute(
                self.api
                    .authorized(Method::DELETE, &["api", "categories", id.as_str()])?,
            )
            .await?;
        info!(category_id = %id, "deleted category");
        Ok(())
    }
}

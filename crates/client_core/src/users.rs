use async_trait::async_trait;
use reqwest::Method;
use shared::{
    domain::UserId,
    protocol::{NewUser, User, UserUpdate},
};
use tracing::{debug, info};

use crate::{error::ClientError, ApiClient, UserDirectory};

/// Client for the `/users` resource.
#[derive(Debug, Clone)]
pub struct UserClient {
    api: ApiClient,
}

impl UserClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl UserDirectory for UserClient {
    async fn list_users(&self) -> Result<Vec<User>, ClientError> {
        let users: Vec<User> = self
            .api
            .execute_json(self.api.authorized(Method::GET, &["users"])?)
            .await?;
        debug!(count = users.len(), "fetched user directory");
        Ok(users)
    }

    async fn get_user(&self, id: &UserId) -> Result<User, ClientError> {
        self.api
            .execute_json(self.api.authorized(Method::GET, &["users", id.as_str()])?)
            .await
    }

    async fn create_user(&self, new_user: &NewUser) -> Result<User, ClientError> {
        new_user.validate()?;
        let request = self.api.authorized(Method::POST, &["users"])?.json(new_user);
        let created: User = self.api.execute_json(request).await?;
        info!(user_id = %created.id, kind = %created.kind(), "created user");
        Ok(created)
    }

    async fn update_user(&self, id: &UserId, update: &UserUpdate) -> Result<User, ClientError> {
        update.validate()?;
        let request = self
            .api
            .authorized(Method::PUT, &["users", id.as_str()])?
            .json(update);
        let updated: User = self.api.execute_json(request).await?;
        info!(user_id = %id, "updated user");
        Ok(updated)
    }

    async fn delete_user(&self, id: &UserId) -> Result<(), ClientError> {
        self.api
            .execute(self.api.authorized(Method::DELETE, &["users", id.as_str()])?)
            .await?;
        info!(user_id = %id, "deleted user");
        Ok(())
    }
}

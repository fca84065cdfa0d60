use reqwest::Method;
use shared::{
    domain::{ReportId, ReportStatus},
    protocol::{Report, ReportStatusUpdate},
};
use tracing::info;

use crate::{error::ClientError, ApiClient};

#[derive(Debug, Clone)]
pub struct ReportClient {
    api: ApiClient,
}

impl ReportClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn list(&self) -> Result<Vec<Report>, ClientError> {
        self.api
            .execute_json(self.api.authorized(Method::GET, &["api", "reports"])?)
            .await
    }

    pub async fn get(&self, id: &ReportId) -> Result<Report, ClientError> {
        self.api
            .execute_json(
                self.api
                    .authorized(Method::GET, &["api", "reports", id.as_str()])?,
            )
            .await
    }

    pub async fn update_status(
        &self,
        id: &ReportId,
        status: ReportStatus,
    ) -> Result<Report, ClientError> {
        let request = self
            .api
            .authorized(Method::PUT, &["api", "reports", id.as_str(), "status"])?
            .json(&ReportStatusUpdate { status });
        let report: Report = self.api.execute_json(request).await?;
        info!(report_id = %id, ?status, "updated report status");
        Ok(report)
    }

    pub async fn resolve(&self, id: &ReportId) -> Result<Report, ClientError> {
        self.update_status(id, ReportStatus::Resolved).await
    }

    pub async fn dismiss(&self, id: &ReportId) -> Result<Report, ClientError> {
        self.update_status(id, ReportStatus::Dismissed).await
    }

    pub async fn delete(&self, id: &ReportId) -> Result<(), ClientError> {
        self.api
            .execute(
                self.api
                    .authorized(Method::DELETE, &["api", "reports", id.as_str()])?,
            )
            .await?;
        info!(report_id = %id, "deleted report");
        Ok(())
    }
}

use super::core::BackendClient;
use crate::error::Result;
use crate::insights::InsightsReport;

impl BackendClient {
    /// Persist a computed report via `POST /ml/insights`.
    pub async fn store_report(&self, report: &InsightsReport) -> Result<()> {
        let url = self.endpoint(&["ml", "insights"])?;
        let request = self.auth_request(self.client.post(url).json(report));

        Self::ensure_success(request.send().await?, "store insights").await?;
        Ok(())
    }
}

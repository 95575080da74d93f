use std::time::Duration;

use futures::{stream, StreamExt};
use log::{debug, info, warn};

use super::client::{BackendClient, DefectFilter};
use super::types::{AuditEvent, Defect};
use crate::auth::Token;
use crate::error::Result;

/// Defects and their audit trails fetched for one report generation.
#[derive(Debug, Default)]
pub struct DefectSnapshot {
    pub defects: Vec<Defect>,
    pub events: Vec<AuditEvent>,
}

pub struct DefectTracker {
    pub client: BackendClient,
    audit_concurrency: usize,
}

impl DefectTracker {
    pub fn new(
        base_url: &str,
        token: Option<Token>,
        timeout: Duration,
        audit_concurrency: usize,
    ) -> Result<Self> {
        let client = BackendClient::new(base_url, token, timeout)?;

        Ok(Self {
            client,
            audit_concurrency: audit_concurrency.max(1),
        })
    }

    pub async fn fetch_defects(&self, filter: &DefectFilter) -> Result<Vec<Defect>> {
        let defects: Vec<Defect> = self
            .client
            .fetch_defects(filter)
            .await?
            .into_iter()
            .map(Defect::from)
            .collect();

        info!("Fetched {} defects", defects.len());
        Ok(defects)
    }

    /// Audit events for every defect, in defect order. A defect whose
    /// detail cannot be fetched contributes no events.
    pub async fn fetch_audit_events(&self, defects: &[Defect]) -> Vec<AuditEvent> {
        let ids: Vec<String> = defects.iter().map(|d| d.id.clone()).collect();
        let per_defect: Vec<Vec<AuditEvent>> = stream::iter(ids)
            .map(|id| async move { self.fetch_defect_events(&id).await })
            .buffered(self.audit_concurrency)
            .collect()
            .await;

        let events: Vec<AuditEvent> = per_defect.into_iter().flatten().collect();
        info!(
            "Fetched {} audit events for {} defects",
            events.len(),
            defects.len()
        );
        events
    }

    async fn fetch_defect_events(&self, defect_id: &str) -> Vec<AuditEvent> {
        let detail = match self.client.fetch_defect_detail(defect_id).await {
            Ok(detail) => detail,
            Err(e) => {
                warn!("Skipping audit events for defect {defect_id}: {e}");
                return Vec::new();
            }
        };

        detail
            .audit_events
            .unwrap_or_default()
            .into_iter()
            .filter_map(|raw| match AuditEvent::from_raw(defect_id, raw) {
                Ok(event) => Some(event),
                Err(e) => {
                    debug!("Skipping malformed audit event for defect {defect_id}: {e}");
                    None
                }
            })
            .collect()
    }

    /// Fetch the defect list and, when it is non-empty, the audit trail of
    /// each defect in it.
    pub async fn snapshot(&self, filter: &DefectFilter) -> Result<DefectSnapshot> {
        let defects = self.fetch_defects(filter).await?;

        if defects.is_empty() {
            return Ok(DefectSnapshot::default());
        }

        let events = self.fetch_audit_events(&defects).await;
        Ok(DefectSnapshot { defects, events })
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;
    use serde_json::json;

    use super::*;
    use crate::backend::types::AuditEventKind;
    use crate::error::InsightsError;

    fn tracker(url: &str, concurrency: usize) -> DefectTracker {
        DefectTracker::new(url, None, Duration::from_secs(5), concurrency).unwrap()
    }

    async fn mock_list(server: &mut mockito::ServerGuard, ids: &[&str]) -> mockito::Mock {
        let body: Vec<_> = ids
            .iter()
            .map(|id| json!({"id": id, "status": "OPEN", "createdAt": "2024-01-01T00:00:00Z"}))
            .collect();

        server
            .mock("GET", "/defects")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!(body).to_string())
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_snapshot_tags_events_with_defect_id() {
        let mut server = mockito::Server::new_async().await;
        mock_list(&mut server, &["a", "b"]).await;
        server
            .mock("GET", "/defects/a")
            .with_status(200)
            .with_body(
                json!({"auditEvents": [
                    {"type": "STATUS_CHANGE", "newValue": "{\"status\":\"RESOLVED\"}", "createdAt": "2024-01-02T00:00:00Z"},
                    {"type": "COMMENT", "newValue": "hello"}
                ]})
                .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("GET", "/defects/b")
            .with_status(200)
            .with_body(json!({"auditEvents": [{"type": "STATUS_CHANGE", "newValue": "{\"status\":\"REOPENED\"}"}]}).to_string())
            .create_async()
            .await;

        let snapshot = tracker(&server.url(), 1)
            .snapshot(&DefectFilter::default())
            .await
            .unwrap();

        assert_eq!(snapshot.defects.len(), 2);
        let tagged: Vec<_> = snapshot
            .events
            .iter()
            .map(|e| (e.defect_id.as_str(), e.kind.clone()))
            .collect();
        assert_eq!(
            tagged,
            vec![
                ("a", AuditEventKind::StatusChange),
                ("a", AuditEventKind::Other("COMMENT".to_string())),
                ("b", AuditEventKind::StatusChange),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_detail_fetch_is_isolated() {
        let mut server = mockito::Server::new_async().await;
        mock_list(&mut server, &["a", "b"]).await;
        server
            .mock("GET", "/defects/a")
            .with_status(500)
            .create_async()
            .await;
        server
            .mock("GET", "/defects/b")
            .with_status(200)
            .with_body(json!({"auditEvents": [{"type": "STATUS_CHANGE", "newValue": "{}"}]}).to_string())
            .create_async()
            .await;

        let snapshot = tracker(&server.url(), 4)
            .snapshot(&DefectFilter::default())
            .await
            .unwrap();

        assert_eq!(snapshot.defects.len(), 2);
        assert_eq!(snapshot.events.len(), 1);
        assert_eq!(snapshot.events[0].defect_id, "b");
    }

    #[tokio::test]
    async fn test_undecodable_detail_body_is_isolated() {
        let mut server = mockito::Server::new_async().await;
        mock_list(&mut server, &["a"]).await;
        server
            .mock("GET", "/defects/a")
            .with_status(200)
            .with_body("<html>oops</html>")
            .create_async()
            .await;

        let snapshot = tracker(&server.url(), 1)
            .snapshot(&DefectFilter::default())
            .await
            .unwrap();

        assert_eq!(snapshot.defects.len(), 1);
        assert!(snapshot.events.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_events_are_skipped() {
        let mut server = mockito::Server::new_async().await;
        mock_list(&mut server, &["a"]).await;
        server
            .mock("GET", "/defects/a")
            .with_status(200)
            .with_body(
                json!({"auditEvents": [
                    {"newValue": "{\"status\":\"REOPENED\"}"},
                    "not an object",
                    {"type": "STATUS_CHANGE", "newValue": "{\"status\":\"REOPENED\"}"}
                ]})
                .to_string(),
            )
            .create_async()
            .await;

        let snapshot = tracker(&server.url(), 1)
            .snapshot(&DefectFilter::default())
            .await
            .unwrap();

        assert_eq!(snapshot.events.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_list_skips_detail_fetches() {
        let mut server = mockito::Server::new_async().await;
        mock_list(&mut server, &[]).await;
        let detail = server
            .mock("GET", Matcher::Regex(r"^/defects/.+".to_string()))
            .expect(0)
            .create_async()
            .await;

        let snapshot = tracker(&server.url(), 1)
            .snapshot(&DefectFilter::default())
            .await
            .unwrap();

        detail.assert_async().await;
        assert!(snapshot.defects.is_empty());
        assert!(snapshot.events.is_empty());
    }

    #[tokio::test]
    async fn test_list_failure_aborts_snapshot() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/defects")
            .match_query(Matcher::Any)
            .with_status(401)
            .create_async()
            .await;

        let result = tracker(&server.url(), 1)
            .snapshot(&DefectFilter::default())
            .await;

        assert!(matches!(result, Err(InsightsError::Api(_))));
    }
}

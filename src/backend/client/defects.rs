use serde::Serialize;

use super::core::BackendClient;
use crate::backend::types::{DefectDetailDto, DefectDto};
use crate::error::Result;

/// Query parameters for `GET /defects`. Unset filters are left out of
/// the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DefectFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

impl BackendClient {
    /// Fetch the defect list. Any transport, status or schema problem
    /// fails the whole call.
    pub async fn fetch_defects(&self, filter: &DefectFilter) -> Result<Vec<DefectDto>> {
        let url = self.endpoint(&["defects"])?;
        let request = self.auth_request(self.client.get(url).query(filter));

        let response = Self::ensure_success(request.send().await?, "fetch defects").await?;
        let body = response.text().await?;
        let defects = serde_json::from_str::<Vec<DefectDto>>(&body)?;
        Ok(defects)
    }

    /// Fetch a single defect with its embedded audit trail.
    pub async fn fetch_defect_detail(&self, defect_id: &str) -> Result<DefectDetailDto> {
        let url = self.endpoint(&["defects", defect_id])?;
        let request = self.auth_request(self.client.get(url));

        let response =
            Self::ensure_success(request.send().await?, &format!("fetch defect {defect_id}"))
                .await?;
        let body = response.text().await?;
        let detail = serde_json::from_str::<DefectDetailDto>(&body)?;
        Ok(detail)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mockito::Matcher;
    use serde_json::json;

    use super::*;
    use crate::auth::Token;
    use crate::error::InsightsError;

    fn client(url: &str, token: Option<&str>) -> BackendClient {
        BackendClient::new(url, token.map(Token::from), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_filter_serializes_only_present_fields() {
        let filter = DefectFilter {
            assigned_to_id: Some("u-1".to_string()),
            start_date: None,
            end_date: Some("2024-02-01".to_string()),
        };

        let value = serde_json::to_value(&filter).unwrap();

        assert_eq!(value, json!({"assignedToId": "u-1", "endDate": "2024-02-01"}));
    }

    #[tokio::test]
    async fn test_fetch_defects_sends_filters_and_auth() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/defects")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("assignedToId".into(), "u-1".into()),
                Matcher::UrlEncoded("startDate".into(), "2024-01-01".into()),
            ]))
            .match_header("authorization", "Bearer secret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!([{
                    "id": "d-1",
                    "status": "OPEN",
                    "createdAt": "2024-01-01T00:00:00Z"
                }])
                .to_string(),
            )
            .create_async()
            .await;

        let filter = DefectFilter {
            assigned_to_id: Some("u-1".to_string()),
            start_date: Some("2024-01-01".to_string()),
            end_date: None,
        };
        let defects = client(&server.url(), Some("secret"))
            .fetch_defects(&filter)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(defects.len(), 1);
        assert_eq!(defects[0].id, "d-1");
    }

    #[tokio::test]
    async fn test_fetch_defects_without_token_sends_no_auth_header() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/defects")
            .match_query(Matcher::Any)
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let defects = client(&server.url(), None)
            .fetch_defects(&DefectFilter::default())
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(defects.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_defects_error_status_is_api_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/defects")
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("maintenance")
            .create_async()
            .await;

        let result = client(&server.url(), None)
            .fetch_defects(&DefectFilter::default())
            .await;

        match result {
            Err(InsightsError::Api(message)) => {
                assert!(message.contains("503"));
                assert!(message.contains("maintenance"));
            }
            other => panic!("expected API error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_defects_schema_violation_is_json_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/defects")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!([{"id": "d-1", "status": "OPEN"}]).to_string())
            .create_async()
            .await;

        let result = client(&server.url(), None)
            .fetch_defects(&DefectFilter::default())
            .await;

        assert!(matches!(result, Err(InsightsError::Json(_))));
    }

    #[tokio::test]
    async fn test_fetch_defect_detail_reads_audit_events() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/defects/d-7")
            .with_status(200)
            .with_body(
                json!({
                    "id": "d-7",
                    "status": "OPEN",
                    "auditEvents": [{"type": "STATUS_CHANGE", "newValue": "{\"status\":\"OPEN\"}"}]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let detail = client(&server.url(), None)
            .fetch_defect_detail("d-7")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(detail.audit_events.map(|events| events.len()), Some(1));
    }

    #[tokio::test]
    async fn test_fetch_defect_detail_without_events() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/defects/d-8")
            .with_status(200)
            .with_body(json!({"id": "d-8", "auditEvents": null}).to_string())
            .create_async()
            .await;

        let detail = client(&server.url(), None)
            .fetch_defect_detail("d-8")
            .await
            .unwrap();

        assert!(detail.audit_events.is_none());
    }
}

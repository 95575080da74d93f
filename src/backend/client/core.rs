use std::time::Duration;

use reqwest::{Client, Response};
use url::Url;

use crate::auth::Token;
use crate::error::{InsightsError, Result};

pub struct BackendClient {
    pub client: Client,
    pub base_url: Url,
    pub token: Option<Token>,
}

impl BackendClient {
    pub fn new(base_url: &str, token: Option<Token>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("defect-insights/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| InsightsError::Config(format!("Failed to create HTTP client: {e}")))?;

        let base_url = Url::parse(base_url)
            .map_err(|e| InsightsError::Config(format!("Invalid backend URL: {e}")))?;

        if base_url.cannot_be_a_base() {
            return Err(InsightsError::Config(format!(
                "Backend URL cannot be used as a base: {base_url}"
            )));
        }

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    pub fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = &self.token {
            request.bearer_auth(token.as_str())
        } else {
            request
        }
    }

    /// Appends percent-encoded path segments to the base URL, keeping any
    /// path prefix the base already carries.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| InsightsError::Config(format!("Invalid backend URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Turns a non-success response into an API error carrying the body.
    pub async fn ensure_success(response: Response, action: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(InsightsError::Api(format!("Failed to {action}: {status} - {body}")))
    }
}

//! Scene director HTTP client

use anyhow::{Result, anyhow};
use std::time::Duration;
use tracing::{debug, info};

use super::types::HealthResponse;

/// HTTP client for the director service's plain endpoints
pub struct DirectorRestClient {
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl DirectorRestClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            client: reqwest::Client::new(),
        }
    }

    /// Query the root endpoint the director exposes as a liveness check
    pub async fn health(&self) -> Result<HealthResponse> {
        let url = format!("{}/", self.base_url);

        debug!("Checking director health at: {}", url);

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to send HTTP request: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("HTTP error {}: {}", status, body));
        }

        let health: HealthResponse = response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse health response: {}", e))?;

        info!("Director at {} answered: {}", self.base_url, health.message);

        Ok(health)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_health_ok() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "message": "Agent is running!" })),
            )
            .mount(&server)
            .await;

        let client = DirectorRestClient::new(server.uri(), Duration::from_secs(5));
        let health = client.health().await.unwrap();
        assert_eq!(health.message, "Agent is running!");
    }

    #[tokio::test]
    async fn test_health_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(503).set_body_string("starting"))
            .mount(&server)
            .await;

        let client = DirectorRestClient::new(format!("{}/", server.uri()), Duration::from_secs(5));
        let err = client.health().await.unwrap_err();
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_health_unexpected_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let client = DirectorRestClient::new(server.uri(), Duration::from_secs(5));
        assert!(client.health().await.is_err());
    }
}

//! Snapshot service client.
//!
//! POSTs the canonical URL, plus any configured request parameters, to the
//! rendering service and unwraps its `{code, content}` envelope.

use crate::config::ClientConfig;
use crate::error::{PrerenderError, Result};
use crate::snapshot::SnapshotResult;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Anything that can turn a canonical URL into a snapshot.
#[async_trait]
pub trait SnapshotFetcher: Send + Sync {
    /// Fetch the snapshot for `url`.
    async fn fetch(&self, url: &str) -> Result<SnapshotResult>;
}

/// Response envelope from the rendering service.
#[derive(Debug, Deserialize)]
struct Envelope {
    code: String,
    #[serde(default)]
    content: Value,
}

/// HTTP client for the rendering service.
pub struct SnapshotClient {
    http: Client,
    config: ClientConfig,
}

impl SnapshotClient {
    /// Create a client from configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(PrerenderError::connection)?;
        Ok(Self { http, config })
    }

    /// Request body: the configured parameters with `url` set.
    fn request_body(&self, url: &str) -> Value {
        let mut body = self.config.parameters.clone();
        body.insert("url".to_string(), Value::String(url.to_string()));
        Value::Object(body)
    }
}

#[async_trait]
impl SnapshotFetcher for SnapshotClient {
    async fn fetch(&self, url: &str) -> Result<SnapshotResult> {
        debug!(api_url = %self.config.api_url, url = %url, "Requesting snapshot");

        let response = self
            .http
            .post(&self.config.api_url)
            .basic_auth(&self.config.email, Some(&self.config.key))
            .json(&self.request_body(url))
            .send()
            .await
            .map_err(PrerenderError::connection)?;

        let envelope: Envelope = response.json().await.map_err(PrerenderError::connection)?;
        parse_envelope(envelope)
    }
}

fn parse_envelope(envelope: Envelope) -> Result<SnapshotResult> {
    match envelope.code.as_str() {
        "success" => serde_json::from_value(envelope.content).map_err(|e| {
            PrerenderError::UnknownCode {
                code: "success".to_string(),
                errors: Value::String(format!("malformed snapshot content: {e}")),
            }
        }),
        "validation_error" => Err(PrerenderError::Validation {
            errors: envelope.content,
        }),
        "system_error" => Err(PrerenderError::System {
            errors: envelope.content,
        }),
        other => Err(PrerenderError::UnknownCode {
            code: other.to_string(),
            errors: envelope.content,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> SnapshotClient {
        let mut parameters = serde_json::Map::new();
        parameters.insert("width".to_string(), json!(1024));
        SnapshotClient::new(ClientConfig {
            api_url: format!("{}/api/v1/robot", server.uri()),
            email: "demo@example.com".to_string(),
            key: "secret".to_string(),
            timeout_seconds: 5,
            parameters,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/robot"))
            .and(header_exists("authorization"))
            .and(body_json(json!({"width": 1024, "url": "http://example.com/#!/a"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": "success",
                "content": {
                    "status": 200,
                    "headers": [{"name": "Content-Type", "value": "text/html"}],
                    "html": "<html>snap</html>"
                }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let snapshot = client.fetch("http://example.com/#!/a").await.unwrap();
        assert_eq!(snapshot.status, 200);
        assert_eq!(snapshot.html, "<html>snap</html>");
    }

    #[tokio::test]
    async fn test_validation_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": "validation_error",
                "content": "some validation object from the API"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.fetch("http://example.com/").await.unwrap_err();
        assert!(matches!(err, PrerenderError::Validation { .. }));
        assert_eq!(err.errors(), Some(&json!("some validation object from the API")));
    }

    #[tokio::test]
    async fn test_system_and_unknown_codes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": "system_error",
                "content": "down"
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": "weird",
                "content": null
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert!(matches!(
            client.fetch("http://example.com/").await,
            Err(PrerenderError::System { .. })
        ));
        assert!(matches!(
            client.fetch("http://example.com/").await,
            Err(PrerenderError::UnknownCode { .. })
        ));
    }

    #[tokio::test]
    async fn test_connection_error() {
        let client = SnapshotClient::new(ClientConfig {
            api_url: "http://127.0.0.1:1/api".to_string(),
            timeout_seconds: 1,
            ..Default::default()
        })
        .unwrap();

        let err = client.fetch("http://example.com/").await.unwrap_err();
        assert!(matches!(err, PrerenderError::Connection { .. }));
        assert!(err.is_fallthrough());
    }

    #[test]
    fn test_request_body_sets_url() {
        let mut parameters = serde_json::Map::new();
        parameters.insert("url".to_string(), json!("stale"));
        let client = SnapshotClient::new(ClientConfig {
            parameters,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(client.request_body("http://a/"), json!({"url": "http://a/"}));
    }
}

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{PathwayError, Result};

/// Default request timeout when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the Pathway backend that brokers every provider call.
///
/// Every request carries the backend's own bearer token, which is distinct from
/// the provider credentials sent in request bodies.
#[derive(Clone)]
pub struct BackendClient {
    base_url: String,
    token: String,
    http: Client,
}

impl BackendClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        Self::with_timeout(base_url, token, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_http_client(base_url, token, http))
    }

    /// Create a client with a custom reqwest::Client (useful for testing).
    pub fn with_http_client(base_url: &str, token: &str, http: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            http,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// POST a JSON body and return the decoded success envelope.
    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value> {
        let url = self.url(path);
        debug!(url = %url, "POST backend");
        self.send(self.http.post(&url).json(body), path).await
    }

    pub async fn get(&self, path: &str) -> Result<Value> {
        let url = self.url(path);
        debug!(url = %url, "GET backend");
        self.send(self.http.get(&url), path).await
    }

    async fn send(&self, request: RequestBuilder, path: &str) -> Result<Value> {
        let response = request.bearer_auth(&self.token).send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(status = %status, path = %path, "Backend request failed");
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| error_message(&v))
                .unwrap_or_else(|| format!("request to {path} failed with status {status}"));
            return Err(PathwayError::Upstream {
                status: Some(status.as_u16()),
                message,
            });
        }

        let value: Value = serde_json::from_str(&body).map_err(|e| {
            PathwayError::Serialization(format!("failed to parse response from {path}: {e}"))
        })?;

        if value.get("status").and_then(Value::as_str) == Some("error") {
            let message = error_message(&value)
                .unwrap_or_else(|| format!("request to {path} reported an error"));
            warn!(path = %path, message = %message, "Backend reported error");
            return Err(PathwayError::Upstream {
                status: Some(status.as_u16()),
                message,
            });
        }

        Ok(value)
    }
}

/// Best available human message in an error body: `error`, then `message`.
fn error_message(value: &Value) -> Option<String> {
    ["error", "message"]
        .iter()
        .filter_map(|key| value.get(*key))
        .find_map(|v| match v {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Object(obj) => obj
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        })
}

//! HTTP client for the hosted sync functions

use std::time::Duration;

use async_trait::async_trait;
use pledge_types::Operation;
use pledge_workspace::CloudConfig;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::SyncError;
use crate::remote::{PullResponse, PushResponse, RemoteLedger};

/// [`RemoteLedger`] over HTTP: `POST {endpoint}/sync-push` and
/// `POST {endpoint}/sync-pull`.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: Client,
    base_url: String,
    workspace_id: String,
    token: Option<String>,
}

#[derive(Serialize)]
struct PushRequest<'a> {
    workspace_id: &'a str,
    client_id: &'a str,
    operations: &'a [Operation],
    cursor: Option<&'a str>,
}

#[derive(Serialize)]
struct PullRequest<'a> {
    workspace_id: &'a str,
    client_id: &'a str,
    cursor: Option<&'a str>,
    limit: u32,
}

impl HttpRemote {
    pub fn new(
        endpoint: &str,
        workspace_id: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, SyncError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: endpoint.trim_end_matches('/').to_string(),
            workspace_id: workspace_id.into(),
            token,
        })
    }

    pub fn from_config(cloud: &CloudConfig, token: Option<String>) -> Result<Self, SyncError> {
        Self::new(
            &cloud.endpoint,
            cloud.workspace_id.clone(),
            token,
            Duration::from_secs(cloud.timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, SyncError> {
        if self.workspace_id.is_empty() {
            return Err(SyncError::Remote {
                status: None,
                message: "No workspace ID specified".into(),
            });
        }

        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.post(&url).json(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        let status = response.status();
        debug!(%url, status = status.as_u16(), "sync request");

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SyncError::Remote {
                status: Some(status.as_u16()),
                message: error_message(&text).unwrap_or(text),
            });
        }

        let value: Value = response.json().await?;
        if let Some(message) = value.get("error").and_then(error_text) {
            return Err(SyncError::Remote {
                status: Some(status.as_u16()),
                message,
            });
        }
        Ok(serde_json::from_value(value)?)
    }
}

/// The `error` field of a JSON error body, if the text is one.
fn error_message(text: &str) -> Option<String> {
    let value: Value = serde_json::from_str(text).ok()?;
    value.get("error").and_then(error_text)
}

fn error_text(error: &Value) -> Option<String> {
    match error {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| Some(error.to_string())),
        other => Some(other.to_string()),
    }
}

#[async_trait]
impl RemoteLedger for HttpRemote {
    async fn push_operations(
        &self,
        ops: &[Operation],
        cursor: Option<&str>,
        client_id: &str,
    ) -> Result<PushResponse, SyncError> {
        let body = PushRequest {
            workspace_id: &self.workspace_id,
            client_id,
            operations: ops,
            cursor,
        };
        self.post("/sync-push", &body).await
    }

    async fn pull_operations(
        &self,
        cursor: Option<&str>,
        client_id: &str,
        limit: u32,
    ) -> Result<PullResponse, SyncError> {
        let body = PullRequest {
            workspace_id: &self.workspace_id,
            client_id,
            cursor,
            limit,
        };
        self.post("/sync-pull", &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_is_normalized() {
        let remote = HttpRemote::new(
            "https://sync.example.com/functions/v1/",
            "ws-1",
            None,
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(remote.base_url(), "https://sync.example.com/functions/v1");
    }

    #[test]
    fn error_bodies() {
        assert_eq!(error_message(r#"{"error":"bad cursor"}"#).as_deref(), Some("bad cursor"));
        assert_eq!(
            error_message(r#"{"error":{"message":"expired token"}}"#).as_deref(),
            Some("expired token")
        );
        assert_eq!(error_message(r#"{"error":null}"#), None);
        assert_eq!(error_message("gateway timeout"), None);
    }
}

use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("resource request failed: {0}")]
    Transport(String),
    #[error("resource returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("resource body is not valid json: {0}")]
    Body(String),
    #[error("resource request timed out after {0}s")]
    Timeout(u64),
}

/// Bearer-authenticated JSON client for the protected API.
#[derive(Clone)]
pub struct ResourceClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl ResourceClient {
    pub fn new(timeout: Duration) -> Result<Self, ResourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ResourceError::Transport(err.to_string()))?;
        Ok(Self { client, timeout })
    }

    pub async fn get_json(&self, uri: &str, access_token: &str) -> Result<Value, ResourceError> {
        let response = self
            .client
            .get(uri)
            .header(AUTHORIZATION, format!("Bearer {access_token}"))
            .send()
            .await
            .map_err(|err| self.transport_error(&err))?;
        let status = response.status();
        debug!(event = "resource_response", uri, status = status.as_u16());
        let body = response
            .text()
            .await
            .map_err(|err| self.transport_error(&err))?;
        if !status.is_success() {
            return Err(ResourceError::Status { status, body });
        }
        serde_json::from_str(&body).map_err(|err| ResourceError::Body(err.to_string()))
    }

    fn transport_error(&self, err: &reqwest::Error) -> ResourceError {
        if err.is_timeout() {
            ResourceError::Timeout(self.timeout.as_secs())
        } else {
            ResourceError::Transport(err.to_string())
        }
    }
}

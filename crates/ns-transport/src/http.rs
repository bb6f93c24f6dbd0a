//! HTTP RPC transport
//!
//! Every command is a `POST {api}/api/v0/{name}?{args}`. Successful responses
//! carry JSON (identity, peers) or raw bytes (content); failures carry a
//! `{"Message", "Code"}` body which is surfaced as a structured node error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

use ns_core::config::SessionConfig;
use ns_core::{CommandTransport, NodeCommand, TransportError};

use crate::response::error_from_response;

/// `CommandTransport` backed by a node's HTTP RPC API
pub struct HttpTransport {
    client: reqwest::Client,
    api_base: String,
    request_timeout: Duration,
    started: AtomicBool,
}

impl HttpTransport {
    /// Create a transport for the given API base URL (e.g. `http://127.0.0.1:5001`)
    pub fn new(api_address: &str, request_timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| TransportError::Other(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: api_address.trim_end_matches('/').to_string(),
            request_timeout,
            started: AtomicBool::new(false),
        })
    }

    /// Create a transport from session configuration
    pub fn from_config(config: &SessionConfig) -> Result<Self, TransportError> {
        Self::new(&config.api_address, config.request_timeout)
    }

    /// API base URL without a trailing slash
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn endpoint(&self, command: &NodeCommand) -> String {
        format!("{}/api/v0/{}", self.api_base, command.name())
    }

    fn map_request_error(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(self.request_timeout)
        } else {
            TransportError::Other(err.to_string())
        }
    }

    async fn execute(&self, command: &NodeCommand) -> Result<Bytes, TransportError> {
        let url = self.endpoint(command);
        tracing::debug!("POST {} ({})", url, command);

        let response = self
            .client
            .post(&url)
            .query(&command.args())
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| self.map_request_error(e))?;

        if !status.is_success() {
            let err = error_from_response(status.as_u16(), &body);
            tracing::debug!("Command {} failed: {}", command, err);
            return Err(err);
        }

        tracing::trace!("Command {} returned {} bytes", command, body.len());
        Ok(body)
    }

    fn ensure_started(&self) -> Result<(), TransportError> {
        if self.started.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(TransportError::NotStarted)
        }
    }
}

#[async_trait]
impl CommandTransport for HttpTransport {
    async fn start(&self) -> Result<(), TransportError> {
        let body = self.execute(&NodeCommand::Version).await?;
        let version = serde_json::from_slice::<Value>(&body)
            .ok()
            .and_then(|v| v.get("Version").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| "unknown".to_string());

        tracing::info!("Node at {} is up (version {})", self.api_base, version);
        self.started.store(true, Ordering::Release);
        Ok(())
    }

    async fn command_json(&self, command: &NodeCommand) -> Result<Value, TransportError> {
        self.ensure_started()?;
        let body = self.execute(command).await?;
        serde_json::from_slice(&body).map_err(|e| {
            TransportError::InvalidResponse(format!("{} returned invalid JSON: {}", command, e))
        })
    }

    async fn command_raw(&self, command: &NodeCommand) -> Result<Bytes, TransportError> {
        self.ensure_started()?;
        self.execute(command).await
    }
}

use std::time::Duration;

use async_trait::async_trait;
use galsim_core::{
    DialogueRequest, DialogueResponse, SessionInfo, StartRequest, StartResponse, TransportError,
    API_PREFIX,
};
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};

/// The two calls the session state machine needs from the service.
#[async_trait]
pub trait DialogueTransport: Send + Sync {
    async fn start(&self, request: &StartRequest) -> Result<StartResponse, TransportError>;

    async fn advance(&self, request: &DialogueRequest)
        -> Result<DialogueResponse, TransportError>;
}

/// Bound for calls made outside the session driver (health, session info).
pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    client: Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
            timeout: DEFAULT_CHECK_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `false` when the service is unreachable, unhealthy or silent past the timeout.
    pub async fn health_check(&self) -> bool {
        match self
            .client
            .get(format!("{}/health", self.base_url))
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                log::debug!("Health check failed: {}", e);
                false
            }
        }
    }

    pub async fn session_info(&self, session_id: &str) -> Result<SessionInfo, TransportError> {
        let response = self
            .client
            .get(format!(
                "{}{}/session/{}",
                self.base_url, API_PREFIX, session_id
            ))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(network_error)?;

        read_json(response).await
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, TransportError>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}{}{}", self.base_url, API_PREFIX, path);
        log::debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(network_error)?;

        read_json(response).await
    }
}

#[async_trait]
impl DialogueTransport for HttpTransport {
    async fn start(&self, request: &StartRequest) -> Result<StartResponse, TransportError> {
        self.post_json("/start", request).await
    }

    async fn advance(
        &self,
        request: &DialogueRequest,
    ) -> Result<DialogueResponse, TransportError> {
        self.post_json("/dialogue", request).await
    }
}

fn network_error(e: reqwest::Error) -> TransportError {
    TransportError::Network(e.to_string())
}

async fn read_json<R: DeserializeOwned>(response: reqwest::Response) -> Result<R, TransportError> {
    let status = response.status();
    if !status.is_success() {
        // The body is only logged; callers see the status alone.
        if let Ok(text) = response.text().await {
            log::warn!("Request failed with {}: {}", status, text);
        }
        return Err(TransportError::Status {
            status: status.as_u16(),
        });
    }

    let bytes = response.bytes().await.map_err(network_error)?;
    serde_json::from_slice(&bytes).map_err(|e| TransportError::Decode(e.to_string()))
}

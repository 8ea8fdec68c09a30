use std::time::Duration;

use anyhow::{Context, Result};
use tracing::debug;

use crate::chat::{ChatRequest, ChatResponse};

pub struct ChatClient {
    client: reqwest::Client,
    base_url: String,
}

impl ChatClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    pub fn from_env() -> Result<Self> {
        let base_url = dotenv::var("TOA_BACKEND_URL")
            .unwrap_or_else(|_| "http://localhost:5000".to_string());
        let timeout_secs = dotenv::var("TOA_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(120);

        Self::new(&base_url, Duration::from_secs(timeout_secs))
    }

    /// Resolve the chat endpoint from the base URL.
    pub fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/chat") {
            base.to_string()
        } else {
            format!("{}/chat", base)
        }
    }

    /// Post one message. Transport errors, timeouts, non-2xx statuses and
    /// non-JSON bodies all surface as errors.
    pub async fn send(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let resp = self
            .client
            .post(self.endpoint())
            .json(request)
            .send()
            .await
            .context("Chat request failed")?
            .error_for_status()
            .context("Chat backend returned an error status")?;

        let text = resp.text().await.context("Failed to read chat response")?;
        let json: serde_json::Value =
            serde_json::from_str(&text).context("Failed to parse chat JSON")?;

        debug!(bytes = text.len(), "Chat response received");
        Ok(ChatResponse::from_value(json))
    }
}

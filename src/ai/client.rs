// =============================================================================
// Generative-model client — chat-completion round trips
// =============================================================================
//
// One endpoint, two models: the cheap screener and the stricter authorizer
// are both reached through the same chat-completion surface, so the client
// takes the model name per call.  A single blocking round trip, no internal
// retry; run-level deadlines live with the caller.
//
// SECURITY: the API key travels in the Authorization header only and never
// reaches the logs or the Debug output.
// =============================================================================

use anyhow::{Context, Result};
use serde_json::json;
use tracing::{debug, instrument};

/// Sampling temperature for both stages; low on purpose, the prompts ask for
/// structured JSON, not prose.
const TEMPERATURE: f64 = 0.2;

/// Chat-completion HTTP client.
#[derive(Clone)]
pub struct AiClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl AiClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(45))
            .build()
            .expect("failed to build reqwest client");

        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            client,
        }
    }

    /// POST `/v1/chat/completions` — send `prompt` to `model` and return the
    /// assistant's raw text.  The text is expected to contain embedded JSON,
    /// but extraction is the caller's concern.
    #[instrument(skip(self, prompt), name = "ai::complete", fields(prompt_len = prompt.len()))]
    pub async fn complete(&self, model: &str, prompt: &str) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let payload = json!({
            "model": model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": TEMPERATURE,
        });

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .context("chat-completion request failed")?;

        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse chat-completion response")?;

        if !status.is_success() {
            anyhow::bail!("model endpoint returned {status}: {body}");
        }

        let text = body["choices"][0]["message"]["content"]
            .as_str()
            .context("chat-completion response missing message content")?
            .to_string();

        debug!(model, response_len = text.len(), "model round trip complete");
        Ok(text)
    }
}

impl std::fmt::Debug for AiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_credentials() {
        let client = AiClient::new("https://ai.example.com", "sk-secret");
        let dbg = format!("{client:?}");
        assert!(!dbg.contains("sk-secret"));
        assert!(dbg.contains("<redacted>"));
    }
}

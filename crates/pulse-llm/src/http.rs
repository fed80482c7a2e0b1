use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::{debug, instrument};

use pulse_core::client::{ChatOptions, InferenceClient};
use pulse_core::errors::InferenceError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Chat-completions client for OpenAI-compatible endpoints (OpenAI, Ollama,
/// llama.cpp server, vLLM, ...).
pub struct HttpChatClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<SecretString>,
}

impl HttpChatClient {
    /// `base_url` is the API root, e.g. `http://localhost:11434/v1`.
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        api_key: Option<SecretString>,
    ) -> Result<Self, InferenceError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| InferenceError::Client(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: completions_url(base_url),
            model: model.into(),
            api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

fn completions_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

/// Request body for a single non-streaming completion.
pub fn build_request_body(model: &str, prompt: &str, options: &ChatOptions) -> Value {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = &options.system_prompt {
        messages.push(json!({ "role": "system", "content": system }));
    }
    messages.push(json!({ "role": "user", "content": prompt }));

    json!({
        "model": model,
        "messages": messages,
        "stream": false,
    })
}

/// Pull the assistant text out of a chat-completions response body.
pub fn extract_content(body: &Value) -> Result<String, InferenceError> {
    let content = body
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            InferenceError::MalformedPayload("missing choices[0].message.content".into())
        })?;

    if content.trim().is_empty() {
        return Err(InferenceError::EmptyResponse);
    }
    Ok(content.to_string())
}

#[async_trait]
impl InferenceClient for HttpChatClient {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self, prompt, options), fields(model = %self.model, prompt_len = prompt.len()))]
    async fn chat(&self, prompt: &str, options: &ChatOptions) -> Result<String, InferenceError> {
        let body = build_request_body(&self.model, prompt, options);

        let mut req = self
            .client
            .post(&self.endpoint)
            .header("accept", "application/json")
            .json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key.expose_secret());
        }
        if let Some(timeout) = options.timeout {
            req = req.timeout(timeout);
        }

        let resp = req.send().await.map_err(|e| {
            if e.is_timeout() {
                InferenceError::Timeout(options.timeout.unwrap_or_default())
            } else {
                InferenceError::Client(e.to_string())
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(InferenceError::from_status(status.as_u16(), body));
        }

        let payload: Value = resp
            .json()
            .await
            .map_err(|e| InferenceError::MalformedPayload(format!("response body: {e}")))?;

        let content = extract_content(&payload)?;
        debug!(reply_len = content.len(), "chat completion received");
        Ok(content)
    }
}

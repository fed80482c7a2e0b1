use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use pulse_core::client::{ChatOptions, InferenceClient};
use pulse_core::errors::InferenceError;

/// Pre-programmed replies for deterministic testing without a backend.
#[derive(Clone, Debug)]
pub enum MockResponse {
    /// Return this text.
    Text(String),
    /// Fail with this error.
    Error(InferenceError),
    /// Wait a duration, then resolve the inner response.
    Delay(Duration, Box<MockResponse>),
}

impl MockResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// A well-formed JSON payload with the given summary.
    pub fn payload(summary: &str, confidence: f64, actions: &[&str]) -> Self {
        Self::Text(
            serde_json::json!({
                "summary": summary,
                "confidence": confidence,
                "actions": actions,
            })
            .to_string(),
        )
    }

    pub fn delayed(delay: Duration, inner: MockResponse) -> Self {
        Self::Delay(delay, Box::new(inner))
    }
}

/// Mock client that replays responses in order. Calls past the end fail.
pub struct MockClient {
    responses: Vec<MockResponse>,
    call_count: AtomicUsize,
    prompts: Mutex<Vec<(String, ChatOptions)>>,
}

impl MockClient {
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            responses,
            call_count: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Every prompt received so far, with its options.
    pub fn prompts(&self) -> Vec<(String, ChatOptions)> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl InferenceClient for MockClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn chat(&self, prompt: &str, options: &ChatOptions) -> Result<String, InferenceError> {
        let idx = self.call_count.fetch_add(1, Ordering::Relaxed);
        self.prompts.lock().push((prompt.to_string(), options.clone()));

        let Some(response) = self.responses.get(idx) else {
            return Err(InferenceError::Client(format!(
                "MockClient: no response configured for call {idx}"
            )));
        };

        resolve_response(response).await
    }
}

/// Unrolls nested delays iteratively to avoid recursive async.
async fn resolve_response(response: &MockResponse) -> Result<String, InferenceError> {
    let mut current = response;
    loop {
        match current {
            MockResponse::Text(text) => return Ok(text.clone()),
            MockResponse::Error(e) => return Err(e.clone()),
            MockResponse::Delay(duration, inner) => {
                tokio::time::sleep(*duration).await;
                current = inner;
            }
        }
    }
}

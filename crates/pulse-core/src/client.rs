use std::time::Duration;

use async_trait::async_trait;

use crate::errors::InferenceError;

/// Options for a single chat call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChatOptions {
    /// Replaces the backend's default system prompt when set.
    pub system_prompt: Option<String>,
    /// Upper bound for the call. Clients should honour it; the analyzer enforces it regardless.
    pub timeout: Option<Duration>,
}

impl ChatOptions {
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// An inference backend: HTTP endpoint, local CLI, or a test double.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    fn name(&self) -> &str;

    async fn chat(&self, prompt: &str, options: &ChatOptions) -> Result<String, InferenceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl InferenceClient for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn chat(&self, prompt: &str, options: &ChatOptions) -> Result<String, InferenceError> {
            match &options.system_prompt {
                Some(system) => Ok(format!("{system}|{prompt}")),
                None => Ok(prompt.to_string()),
            }
        }
    }

    #[test]
    fn chat_options_defaults() {
        let opts = ChatOptions::default();
        assert!(opts.system_prompt.is_none());
        assert!(opts.timeout.is_none());
    }

    #[test]
    fn chat_options_builders() {
        let opts = ChatOptions::default()
            .with_system_prompt("be terse")
            .with_timeout(Duration::from_secs(5));
        assert_eq!(opts.system_prompt.as_deref(), Some("be terse"));
        assert_eq!(opts.timeout, Some(Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn trait_object_dispatch() {
        let client: Box<dyn InferenceClient> = Box::new(Echo);
        let opts = ChatOptions::default().with_system_prompt("sys");
        assert_eq!(client.chat("hi", &opts).await.unwrap(), "sys|hi");
        assert_eq!(client.name(), "echo");
    }
}

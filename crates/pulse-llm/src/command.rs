use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument};

use pulse_core::client::{ChatOptions, InferenceClient};
use pulse_core::errors::InferenceError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
const MAX_STDERR_CHARS: usize = 500;

/// Runs a local CLI per request: prompt on stdin, reply on stdout.
///
/// When a system prompt is set it is written first, separated from the
/// prompt by a blank line.
pub struct CommandClient {
    program: String,
    args: Vec<String>,
}

impl CommandClient {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    async fn run(&self, input: String) -> Result<std::process::Output, InferenceError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| InferenceError::Client(format!("failed to spawn {}: {e}", self.program)))?;

        if let Some(mut stdin) = child.stdin.take() {
            // A child that exits without reading stdin is judged by its exit status.
            if let Err(e) = stdin.write_all(input.as_bytes()).await {
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(InferenceError::Client(format!("failed to write prompt: {e}")));
                }
            }
            // Dropping stdin closes the pipe so the child sees EOF.
        }

        child
            .wait_with_output()
            .await
            .map_err(|e| InferenceError::Client(format!("failed to wait for {}: {e}", self.program)))
    }
}

fn compose_input(prompt: &str, options: &ChatOptions) -> String {
    match &options.system_prompt {
        Some(system) => format!("{system}\n\n{prompt}"),
        None => prompt.to_string(),
    }
}

#[async_trait]
impl InferenceClient for CommandClient {
    fn name(&self) -> &str {
        "command"
    }

    #[instrument(skip(self, prompt, options), fields(program = %self.program))]
    async fn chat(&self, prompt: &str, options: &ChatOptions) -> Result<String, InferenceError> {
        let timeout = options.timeout.unwrap_or(DEFAULT_TIMEOUT);
        let input = compose_input(prompt, options);

        let output = tokio::time::timeout(timeout, self.run(input))
            .await
            .map_err(|_| InferenceError::Timeout(timeout))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr: String = stderr.trim().chars().take(MAX_STDERR_CHARS).collect();
            return Err(InferenceError::Client(format!(
                "{} exited with {}: {stderr}",
                self.program, output.status
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if stdout.is_empty() {
            return Err(InferenceError::EmptyResponse);
        }

        debug!(reply_len = stdout.len(), "command reply received");
        Ok(stdout)
    }
}

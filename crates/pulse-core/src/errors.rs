use std::time::Duration;

/// Every way the inference path can fail.
/// All variants are recovered by the orchestrator into a fallback insight.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum InferenceError {
    // Transport / client
    #[error("inference client failed: {0}")]
    Client(String),
    #[error("backend returned {status}: {body}")]
    Http { status: u16, body: String },
    #[error("inference timed out after {0:?}")]
    Timeout(Duration),

    // Payload
    #[error("inference backend returned an empty response")]
    EmptyResponse,
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("schema violation: {0}")]
    SchemaViolation(String),
}

impl InferenceError {
    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Client(_) => "client",
            Self::Http { .. } => "http",
            Self::Timeout(_) => "timeout",
            Self::EmptyResponse => "empty_response",
            Self::MalformedPayload(_) => "malformed_payload",
            Self::SchemaViolation(_) => "schema_violation",
        }
    }

    /// True when the backend answered but the answer was unusable.
    pub fn is_payload_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyResponse | Self::MalformedPayload(_) | Self::SchemaViolation(_)
        )
    }

    /// Wrap a non-success HTTP status. 408 and 504 included.
    pub fn from_status(status: u16, body: String) -> Self {
        Self::Http {
            status,
            body: body.trim().to_string(),
        }
    }
}

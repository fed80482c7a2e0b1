use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// What the developer did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    DocumentOpen,
    DocumentChange,
    DocumentSave,
    SelectionChange,
    ExternalCommand,
    AnalysisRequest,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DocumentOpen => "document_open",
            Self::DocumentChange => "document_change",
            Self::DocumentSave => "document_save",
            Self::SelectionChange => "selection_change",
            Self::ExternalCommand => "external_command",
            Self::AnalysisRequest => "analysis_request",
        }
    }
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single captured editor event. Immutable once emitted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEvent {
    pub kind: ActivityKind,
    pub resource: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Map<String, Value>>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl ActivityEvent {
    /// New event stamped with the current time.
    pub fn new(kind: ActivityKind, resource: impl Into<String>) -> Self {
        Self {
            kind,
            resource: resource.into(),
            language_tag: None,
            details: None,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language_tag = Some(language.into());
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn at(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }
}

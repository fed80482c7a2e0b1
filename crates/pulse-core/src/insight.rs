use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::InsightId;
use crate::request::TriggerReason;

pub const MIN_CONFIDENCE: f64 = 0.05;
pub const MAX_CONFIDENCE: f64 = 0.99;
pub const MAX_ACTIONS: usize = 4;

/// Round to two decimal places.
pub fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Clamp into `[MIN_CONFIDENCE, MAX_CONFIDENCE]` and round to two decimals.
/// Non-finite input yields `None`.
pub fn normalize_confidence(value: f64) -> Option<f64> {
    if !value.is_finite() {
        return None;
    }
    Some(round_to_hundredths(value.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)))
}

/// Which generator produced an insight.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InsightSource {
    Inference,
    InferenceFallback,
    #[default]
    LocalFallback,
}

impl InsightSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inference => "inference",
            Self::InferenceFallback => "inference-fallback",
            Self::LocalFallback => "local-fallback",
        }
    }

    pub fn is_fallback(&self) -> bool {
        !matches!(self, Self::Inference)
    }
}

impl std::fmt::Display for InsightSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provenance and diagnostics attached to an insight.
///
/// `raw_response` and full `files` paths never leave the process; see the
/// store's export view.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightMetadata {
    #[serde(default)]
    pub source: InsightSource,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<TriggerReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// Keys written by other producers, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InsightMetadata {
    pub fn new(source: InsightSource) -> Self {
        Self {
            source,
            ..Default::default()
        }
    }
}

/// The system's output artifact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategicInsight {
    pub id: InsightId,
    pub summary: String,
    pub confidence: f64,
    pub actions: Vec<String>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(default)]
    pub metadata: InsightMetadata,
}

impl StrategicInsight {
    /// Build a fresh insight. Confidence is normalized and actions capped at
    /// [`MAX_ACTIONS`].
    pub fn new(
        summary: impl Into<String>,
        confidence: f64,
        mut actions: Vec<String>,
        metadata: InsightMetadata,
    ) -> Self {
        actions.truncate(MAX_ACTIONS);
        Self {
            id: InsightId::new(),
            summary: summary.into(),
            confidence: normalize_confidence(confidence).unwrap_or(MIN_CONFIDENCE),
            actions,
            timestamp: Utc::now().timestamp_millis(),
            metadata,
        }
    }

    pub fn source(&self) -> InsightSource {
        self.metadata.source
    }
}

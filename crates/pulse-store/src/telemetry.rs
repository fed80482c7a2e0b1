use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use pulse_core::insight::{InsightSource, StrategicInsight};
use pulse_core::paths::extension_of;
use pulse_core::request::TriggerReason;

/// Privacy-reduced record kept per insight for trend analysis.
/// Holds no file paths and no free text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySnapshot {
    pub timestamp: i64,
    pub language_count: usize,
    pub file_extensions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_count: Option<u32>,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<TriggerReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<InsightSource>,
}

impl TelemetrySnapshot {
    pub fn from_insight(insight: &StrategicInsight) -> Self {
        let metadata = &insight.metadata;
        Self {
            timestamp: insight.timestamp,
            language_count: metadata.languages.len(),
            file_extensions: rank_extensions(&metadata.files),
            change_count: metadata.change_count,
            save_count: metadata.save_count,
            confidence: insight.confidence,
            reason: metadata.reason,
            source: Some(metadata.source),
        }
    }
}

/// Distinct extensions, most frequent first, ties broken alphabetically.
pub fn rank_extensions(files: &[String]) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for file in files {
        *counts.entry(extension_of(file)).or_default() += 1;
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().map(|(ext, _)| ext).collect()
}

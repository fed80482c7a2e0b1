use chrono::Utc;
use serde::{Deserialize, Serialize};

use pulse_core::insight::StrategicInsight;

use pulse_core::paths::final_segment;
use crate::telemetry::TelemetrySnapshot;

/// Everything the process is willing to hand out about its history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSnapshot {
    /// RFC 3339 timestamp of when the export was built.
    pub generated_at: String,
    pub insight_count: usize,
    pub telemetry_count: usize,
    pub insights: Vec<StrategicInsight>,
    pub telemetry: Vec<TelemetrySnapshot>,
}

impl ExportSnapshot {
    pub fn build(insights: &[StrategicInsight], telemetry: &[TelemetrySnapshot]) -> Self {
        let insights: Vec<StrategicInsight> = insights.iter().map(sanitize_insight).collect();
        Self {
            generated_at: Utc::now().to_rfc3339(),
            insight_count: insights.len(),
            telemetry_count: telemetry.len(),
            insights,
            telemetry: telemetry.to_vec(),
        }
    }
}

/// Drop the raw backend response and reduce file paths to bare file names.
pub fn sanitize_insight(insight: &StrategicInsight) -> StrategicInsight {
    let mut clean = insight.clone();
    clean.metadata.raw_response = None;
    clean.metadata.extra.remove("rawResponse");
    clean.metadata.files = clean
        .metadata
        .files
        .iter()
        .map(|file| final_segment(file))
        .collect();
    clean
}

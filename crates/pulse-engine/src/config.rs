use std::time::Duration;

pub const DEFAULT_MAX_RECENT_LINES: usize = 25;
pub const DEFAULT_FALLBACK_CONFIDENCE_BASE: f64 = 0.55;
pub const DEFAULT_INFERENCE_TIMEOUT: Duration = Duration::from_secs(60);

/// Tuning for a single analysis cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisConfig {
    /// Recent-event lines kept in the digest and the prompt.
    pub max_recent_lines: usize,
    /// Starting confidence for heuristic insights.
    pub fallback_confidence_base: f64,
    /// Upper bound on a single inference call.
    pub timeout: Duration,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_recent_lines: DEFAULT_MAX_RECENT_LINES,
            fallback_confidence_base: DEFAULT_FALLBACK_CONFIDENCE_BASE,
            timeout: DEFAULT_INFERENCE_TIMEOUT,
        }
    }
}

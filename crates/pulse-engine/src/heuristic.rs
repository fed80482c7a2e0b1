use sha2::{Digest, Sha256};
use tracing::debug;

use pulse_core::insight::{round_to_hundredths, InsightMetadata, InsightSource, StrategicInsight};
use pulse_core::paths::final_segment;
use pulse_core::request::TriggerReason;

use crate::actions::heuristic_actions;
use crate::digest::{ActivityDigest, AnalysisContext};
use crate::truncate::truncate_chars;

/// Used when no objectives are configured.
pub const DEFAULT_OBJECTIVE: &str = "Keep the current change set small, tested and shippable.";
/// Objective text budget inside a summary.
pub const OBJECTIVE_SUMMARY_CHARS: usize = 140;

const CONFIDENCE_CEILING: f64 = 0.9;
const ACTIVITY_BONUS_CAP: f64 = 0.35;
const ACTIVITY_BONUS_PER_EVENT: f64 = 0.03;

/// Deterministic, offline insight generator. Never fails.
#[derive(Clone, Debug)]
pub struct HeuristicAnalyzer {
    fallback_confidence_base: f64,
}

impl HeuristicAnalyzer {
    pub fn new(fallback_confidence_base: f64) -> Self {
        Self {
            fallback_confidence_base,
        }
    }

    /// Build an insight from the digest alone. `error_message` is recorded
    /// when this runs because the inference path just failed.
    pub fn analyze(
        &self,
        ctx: &AnalysisContext<'_>,
        source: InsightSource,
        error_message: Option<String>,
    ) -> StrategicInsight {
        let digest = ctx.digest;
        let objective = select_objective(ctx.objectives, digest);

        let summary = [
            reason_clause(ctx.reason),
            file_clause(digest),
            language_clause(digest),
            cadence_clause(digest),
            objective_clause(objective),
        ]
        .join(" ");

        let actions = heuristic_actions(digest, objective);
        let confidence = self.confidence(digest);

        let mut metadata = InsightMetadata::new(source);
        metadata.files = digest.files.iter().cloned().collect();
        metadata.languages = digest.languages.iter().cloned().collect();
        metadata.event_count = Some(digest.event_count);
        metadata.reason = Some(ctx.reason);
        metadata.change_count = Some(digest.change_count);
        metadata.save_count = Some(digest.save_count);
        metadata.objective = Some(objective.to_string());
        metadata.error_message = error_message;

        debug!(%source, confidence, actions = actions.len(), "heuristic insight built");
        StrategicInsight::new(summary, confidence, actions, metadata)
    }

    fn confidence(&self, digest: &ActivityDigest) -> f64 {
        let activity = f64::from(digest.change_count + digest.save_count);
        let bonus = (activity * ACTIVITY_BONUS_PER_EVENT).min(ACTIVITY_BONUS_CAP);
        round_to_hundredths((self.fallback_confidence_base + bonus).min(CONFIDENCE_CEILING))
    }
}

/// Pick the objective to reinforce. Identical digests always pick the same one.
pub fn select_objective<'a>(objectives: &'a [String], digest: &ActivityDigest) -> &'a str {
    if objectives.is_empty() {
        return DEFAULT_OBJECTIVE;
    }

    let mut hasher = Sha256::new();
    for file in &digest.files {
        hasher.update(file.as_bytes());
        hasher.update([0]);
    }
    hasher.update([0xff]);
    for language in &digest.languages {
        hasher.update(language.as_bytes());
        hasher.update([0]);
    }
    hasher.update(digest.change_count.to_le_bytes());
    hasher.update(digest.save_count.to_le_bytes());
    hasher.update((digest.event_count as u64).to_le_bytes());
    let hash = hasher.finalize();

    let mut head = [0u8; 8];
    head.copy_from_slice(&hash[..8]);
    let index = u64::from_be_bytes(head) % objectives.len() as u64;
    &objectives[index as usize]
}

fn reason_clause(reason: TriggerReason) -> String {
    match reason {
        TriggerReason::Manual => "Manual check-in requested.",
        TriggerReason::Autosave => "Autosave checkpoint review.",
        TriggerReason::Other => "Periodic review.",
    }
    .to_string()
}

fn file_clause(digest: &ActivityDigest) -> String {
    let names: Vec<String> = digest.files.iter().map(|f| final_segment(f)).collect();
    match names.as_slice() {
        [] => "No files were touched in this window.".to_string(),
        [only] => format!("Focus stayed on {only}."),
        [a, b] => format!("Work was split between {a} and {b}."),
        [first, ..] => format!(
            "Activity spread across {} files, including {first}.",
            names.len()
        ),
    }
}

fn language_clause(digest: &ActivityDigest) -> String {
    let languages: Vec<&str> = digest.languages.iter().map(String::as_str).collect();
    match languages.as_slice() {
        [] => "No language signal was captured.".to_string(),
        [only] => format!("All changes were in {only}."),
        many => format!(
            "The session spans {} languages ({}).",
            many.len(),
            many.join(", ")
        ),
    }
}

fn cadence_clause(digest: &ActivityDigest) -> String {
    let pace = match digest.change_count {
        c if c > 10 => "very rapid",
        c if c > 4 => "brisk",
        _ => "measured",
    };
    let checkpoints = match digest.save_count {
        0 => "no checkpoints",
        s if s > 3 => "regular checkpoints",
        _ => "few checkpoints",
    };
    format!(
        "Edit pace is {pace} ({} changes) with {checkpoints} ({} saves).",
        digest.change_count, digest.save_count
    )
}

fn objective_clause(objective: &str) -> String {
    format!(
        "Keep steering toward: {}",
        truncate_chars(objective, OBJECTIVE_SUMMARY_CHARS)
    )
}

use std::fmt::Write;

use crate::digest::AnalysisContext;

pub const SYSTEM_PREAMBLE: &str = "You are a pragmatic staff engineer reviewing a developer's recent editor activity. \
Assess whether the work is moving toward the stated objectives and recommend concrete next steps. \
Be brief and specific; refer to files and languages by name when it helps.";

const RESPONSE_CONTRACT: &str = r#"Respond with a single JSON object and nothing else:
{"summary": string (required), "confidence": number between 0 and 1, "actions": array of at most 4 short strings, "reasoning": string (optional)}"#;

/// Render the full user prompt for one analysis.
pub fn build_prompt(ctx: &AnalysisContext<'_>) -> String {
    let digest = ctx.digest;
    let mut prompt = String::with_capacity(2048);

    prompt.push_str(SYSTEM_PREAMBLE);
    prompt.push_str("\n\n## Objectives\n");
    if ctx.objectives.is_empty() {
        prompt.push_str("- (no objectives configured)\n");
    } else {
        for (i, objective) in ctx.objectives.iter().enumerate() {
            let _ = writeln!(prompt, "{}. {objective}", i + 1);
        }
    }

    prompt.push_str("\n## Recent activity (most recent first)\n");
    if digest.recent_event_lines.is_empty() {
        prompt.push_str("- (no recent activity)\n");
    } else {
        for line in &digest.recent_event_lines {
            prompt.push_str(line);
            prompt.push('\n');
        }
    }

    prompt.push_str("\n## Metrics\n");
    let _ = writeln!(prompt, "- files touched: {}", digest.file_count());
    let languages: Vec<&str> = digest.languages.iter().map(String::as_str).collect();
    if languages.is_empty() {
        let _ = writeln!(prompt, "- languages: 0");
    } else {
        let _ = writeln!(prompt, "- languages: {} ({})", languages.len(), languages.join(", "));
    }
    let _ = writeln!(prompt, "- changes: {}", digest.change_count);
    let _ = writeln!(prompt, "- saves: {}", digest.save_count);
    let _ = writeln!(prompt, "- trigger: {}", ctx.reason);

    prompt.push_str("\n## Response format\n");
    prompt.push_str(RESPONSE_CONTRACT);
    prompt.push('\n');
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::ActivityDigest;
    use pulse_core::activity::{ActivityEvent, ActivityKind};
    use pulse_core::request::{AnalysisRequest, TriggerReason};

    #[test]
    fn sections_with_data() {
        let request = AnalysisRequest::new(
            vec![
                ActivityEvent::new(ActivityKind::DocumentChange, "src/lib.rs").with_language("rust"),
                ActivityEvent::new(ActivityKind::DocumentSave, "src/lib.rs").with_language("rust"),
            ],
            TriggerReason::Autosave,
        );
        let digest = ActivityDigest::build(&request, 25);
        let objectives = vec!["Cut release 1.4".to_string(), "Fix flaky tests".to_string()];
        let prompt = build_prompt(&AnalysisContext {
            digest: &digest,
            objectives: &objectives,
            reason: request.reason,
        });

        assert!(prompt.starts_with(SYSTEM_PREAMBLE));
        assert!(prompt.contains("1. Cut release 1.4\n2. Fix flaky tests\n"));
        assert!(prompt.contains("1. [document_save]"));
        assert!(prompt.contains("- files touched: 1\n"));
        assert!(prompt.contains("- languages: 1 (rust)\n"));
        assert!(prompt.contains("- changes: 1\n- saves: 1\n- trigger: autosave\n"));
        assert!(prompt.contains("\"summary\": string (required)"));
    }

    #[test]
    fn placeholders_when_empty() {
        let digest = ActivityDigest::default();
        let prompt = build_prompt(&AnalysisContext {
            digest: &digest,
            objectives: &[],
            reason: TriggerReason::Manual,
        });
        assert!(prompt.contains("- (no objectives configured)"));
        assert!(prompt.contains("- (no recent activity)"));
        assert!(prompt.contains("- languages: 0\n"));
    }
}

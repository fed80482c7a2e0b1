//! Rule-based action suggestions shared by both analyzers.

use pulse_core::paths::final_segment;

use crate::digest::ActivityDigest;
use crate::truncate::truncate_chars;

/// Most files a review suggestion will name.
const REVIEW_FILE_LIMIT: usize = 3;
/// Objective text budget inside an action.
const ACTION_OBJECTIVE_CHARS: usize = 140;

/// Full heuristic rule set: review, interface sync, checkpoint, else objective check.
pub fn heuristic_actions(digest: &ActivityDigest, objective: &str) -> Vec<String> {
    let mut actions = Vec::new();

    let file_count = digest.file_count();
    if (1..=REVIEW_FILE_LIMIT).contains(&file_count) {
        let names: Vec<String> = digest.files.iter().map(|f| final_segment(f)).collect();
        actions.push(format!(
            "Review the recent edits in {} before moving on.",
            names.join(", ")
        ));
    }

    if digest.language_count() > 1 {
        let languages: Vec<&str> = digest.languages.iter().map(String::as_str).collect();
        actions.push(format!(
            "Check that the interfaces between {} are still in sync.",
            languages.join(" and ")
        ));
    }

    actions.extend(checkpoint_action(digest));

    if actions.is_empty() {
        actions.push(objective_check(objective));
    }
    actions
}

/// Cadence rule only, for when the backend produced no usable actions.
pub fn cadence_actions(digest: &ActivityDigest, objective: &str) -> Vec<String> {
    match checkpoint_action(digest) {
        Some(action) => vec![action],
        None => vec![objective_check(objective)],
    }
}

fn checkpoint_action(digest: &ActivityDigest) -> Option<String> {
    (digest.change_count > 8 && digest.save_count < 2).then(|| {
        format!(
            "Save and checkpoint: {} edits with only {} save(s) since the last snapshot.",
            digest.change_count, digest.save_count
        )
    })
}

fn objective_check(objective: &str) -> String {
    format!(
        "Confirm the current work still advances: {}",
        truncate_chars(objective, ACTION_OBJECTIVE_CHARS)
    )
}

use std::collections::BTreeSet;

use chrono::{DateTime, SecondsFormat};
use serde_json::{Map, Value};

use pulse_core::activity::{ActivityEvent, ActivityKind};
use pulse_core::request::{AnalysisRequest, TriggerReason};

use crate::truncate::truncate_chars;

/// Character budget for the details excerpt on each recent-event line.
pub const DETAIL_EXCERPT_CHARS: usize = 180;

/// Statistical summary of one activity batch. Rebuilt on every analysis.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActivityDigest {
    pub files: BTreeSet<String>,
    pub languages: BTreeSet<String>,
    pub change_count: u32,
    pub save_count: u32,
    pub event_count: usize,
    /// Most recent first.
    pub recent_event_lines: Vec<String>,
}

impl ActivityDigest {
    pub fn build(request: &AnalysisRequest, max_recent_lines: usize) -> Self {
        let mut digest = Self {
            event_count: request.events.len(),
            ..Self::default()
        };

        for event in &request.events {
            if !event.resource.is_empty() {
                digest.files.insert(event.resource.clone());
            }
            if let Some(language) = event.language_tag.as_deref().filter(|l| !l.is_empty()) {
                digest.languages.insert(language.to_string());
            }
            match event.kind {
                ActivityKind::DocumentChange => digest.change_count += 1,
                ActivityKind::DocumentSave => digest.save_count += 1,
                _ => {}
            }
        }

        let skip = request.events.len().saturating_sub(max_recent_lines);
        digest.recent_event_lines = request.events[skip..]
            .iter()
            .rev()
            .enumerate()
            .map(|(i, event)| render_line(i + 1, event))
            .collect();

        digest
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn language_count(&self) -> usize {
        self.languages.len()
    }
}

/// Everything an analyzer needs for one request, with objectives already resolved.
#[derive(Clone, Copy, Debug)]
pub struct AnalysisContext<'a> {
    pub digest: &'a ActivityDigest,
    pub objectives: &'a [String],
    pub reason: TriggerReason,
}

fn render_line(ordinal: usize, event: &ActivityEvent) -> String {
    let mut line = format!("{ordinal}. [{}] {}", event.kind, iso_timestamp(event.timestamp));
    if let Some(language) = &event.language_tag {
        line.push_str(&format!(" ({language})"));
    }
    line.push(' ');
    line.push_str(&event.resource);
    if let Some(details) = event.details.as_ref().filter(|d| !d.is_empty()) {
        line.push_str(" :: ");
        line.push_str(&truncate_chars(&details_text(details), DETAIL_EXCERPT_CHARS));
    }
    line
}

fn iso_timestamp(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| millis.to_string())
}

fn details_text(details: &Map<String, Value>) -> String {
    serde_json::to_string(details).unwrap_or_default()
}

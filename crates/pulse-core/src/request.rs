use serde::{Deserialize, Serialize};

use crate::activity::ActivityEvent;

/// Why an analysis was triggered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerReason {
    #[default]
    Manual,
    Autosave,
    Other,
}

impl TriggerReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Autosave => "autosave",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TriggerReason {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(Self::Manual),
            "autosave" => Ok(Self::Autosave),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown trigger reason: {other}")),
        }
    }
}

/// One batch of activity to analyse.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub events: Vec<ActivityEvent>,
    #[serde(default)]
    pub objectives: Vec<String>,
    #[serde(default)]
    pub reason: TriggerReason,
}

impl AnalysisRequest {
    pub fn new(events: Vec<ActivityEvent>, reason: TriggerReason) -> Self {
        Self {
            events,
            objectives: Vec::new(),
            reason,
        }
    }

    pub fn with_objectives(mut self, objectives: Vec<String>) -> Self {
        self.objectives = objectives;
        self
    }
}

//! Settings type definitions.
//!
//! All types use camelCase JSON and implement [`Default`] with production
//! values; `#[serde(default)]` lets a settings file name only what it changes.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root settings type.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PulseSettings {
    pub history: HistorySettings,
    pub analysis: AnalysisSettings,
    pub inference: InferenceSettings,
    pub storage: StorageSettings,
    pub logging: LoggingSettings,
}

/// Retention caps for the insight history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistorySettings {
    pub max_history_items: usize,
    pub max_telemetry_items: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            max_history_items: 20,
            max_telemetry_items: 100,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisSettings {
    /// Recent-event lines included in the prompt.
    pub max_recent_lines: usize,
    /// Base confidence of heuristic insights.
    pub fallback_confidence_base: f64,
    /// Inference call timeout in milliseconds.
    pub timeout_ms: u64,
    /// Objectives used when a request brings none.
    pub objectives: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            max_recent_lines: 25,
            fallback_confidence_base: 0.55,
            timeout_ms: 60_000,
            objectives: Vec::new(),
            system_prompt: None,
        }
    }
}

/// Which inference backend to attach at startup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InferenceBackend {
    /// Heuristic insights only.
    #[default]
    None,
    Http,
    Command,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InferenceSettings {
    pub backend: InferenceBackend,
    pub http: HttpBackendSettings,
    pub command: CommandBackendSettings,
}

/// OpenAI-compatible chat-completions endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpBackendSettings {
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key. The key itself
    /// is never written to the settings file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

impl Default for HttpBackendSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434/v1".to_string(),
            model: "llama3.1".to_string(),
            api_key_env: None,
        }
    }
}

/// Local CLI that reads a prompt on stdin and answers on stdout.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommandBackendSettings {
    pub program: String,
    pub args: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageSettings {
    /// `~` expands to `$HOME`.
    pub database_path: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_path: "~/.pulse/database/pulse.db".to_string(),
        }
    }
}

impl StorageSettings {
    pub fn resolved_database_path(&self) -> PathBuf {
        expand_home(&self.database_path)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    pub level: String,
    /// JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

fn home_dir() -> String {
    std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string())
}

pub(crate) fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => PathBuf::from(home_dir()).join(rest),
        None if path == "~" => PathBuf::from(home_dir()),
        None => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = PulseSettings::default();
        assert_eq!(settings.history.max_history_items, 20);
        assert_eq!(settings.history.max_telemetry_items, 100);
        assert_eq!(settings.analysis.max_recent_lines, 25);
        assert_eq!(settings.analysis.fallback_confidence_base, 0.55);
        assert_eq!(settings.analysis.timeout_ms, 60_000);
        assert_eq!(settings.inference.backend, InferenceBackend::None);
        assert_eq!(settings.logging.level, "info");
        assert!(!settings.logging.json);
    }

    #[test]
    fn camel_case_wire_format() {
        let json = serde_json::to_value(PulseSettings::default()).unwrap();
        assert_eq!(json["history"]["maxHistoryItems"], 20);
        assert_eq!(json["analysis"]["fallbackConfidenceBase"], 0.55);
        assert_eq!(json["inference"]["backend"], "none");
        assert_eq!(json["storage"]["databasePath"], "~/.pulse/database/pulse.db");
        assert!(json["analysis"].get("systemPrompt").is_none());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let settings: PulseSettings =
            serde_json::from_str(r#"{"inference": {"backend": "command", "command": {"program": "llm"}}}"#).unwrap();
        assert_eq!(settings.inference.backend, InferenceBackend::Command);
        assert_eq!(settings.inference.command.program, "llm");
        assert!(settings.inference.command.args.is_empty());
        assert_eq!(settings.inference.http.model, "llama3.1");
    }

    #[test]
    fn absolute_paths_are_untouched() {
        assert_eq!(expand_home("/var/lib/pulse.db"), PathBuf::from("/var/lib/pulse.db"));
        assert!(expand_home("~/x.db").ends_with("x.db"));
        assert!(!expand_home("~/x.db").starts_with("~"));
    }
}

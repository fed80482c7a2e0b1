//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`PulseSettings::default()`]
//! 2. If the settings file exists, deep-merge user values over defaults
//! 3. Apply `PULSE_*` environment variable overrides (highest priority)
//! 4. Validate

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::{expand_home, InferenceBackend, PulseSettings};

/// `~/.pulse/settings.json`.
pub fn settings_path() -> PathBuf {
    expand_home("~/.pulse/settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<PulseSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<PulseSettings> {
    let mut settings = read_settings_file(path)?;
    apply_env_overrides(&mut settings);
    validate(&settings)?;
    Ok(settings)
}

fn read_settings_file(path: &Path) -> Result<PulseSettings> {
    let defaults = serde_json::to_value(PulseSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `PULSE_*` overrides. Invalid values are logged and ignored.
pub fn apply_env_overrides(settings: &mut PulseSettings) {
    if let Some(v) = read_env_usize("PULSE_MAX_HISTORY", 1, 10_000) {
        settings.history.max_history_items = v;
    }
    if let Some(v) = read_env_usize("PULSE_MAX_TELEMETRY", 1, 100_000) {
        settings.history.max_telemetry_items = v;
    }
    if let Some(v) = read_env_u64("PULSE_TIMEOUT_MS", 100, 3_600_000) {
        settings.analysis.timeout_ms = v;
    }
    if let Some(v) = read_env_string("PULSE_DB_PATH") {
        settings.storage.database_path = v;
    }
    if let Some(v) = read_env_string("PULSE_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read_env_string("PULSE_BACKEND") {
        match parse_backend(&v) {
            Some(backend) => settings.inference.backend = backend,
            None => warn!(key = "PULSE_BACKEND", value = %v, "invalid backend env var, ignoring"),
        }
    }
}

/// Reject values that deserialize but cannot work.
pub fn validate(settings: &PulseSettings) -> Result<()> {
    let base = settings.analysis.fallback_confidence_base;
    if !base.is_finite() || !(0.0..=1.0).contains(&base) {
        return Err(SettingsError::InvalidValue(format!(
            "analysis.fallbackConfidenceBase must be within [0, 1], got {base}"
        )));
    }
    if settings.analysis.timeout_ms == 0 {
        return Err(SettingsError::InvalidValue(
            "analysis.timeoutMs must be positive".into(),
        ));
    }
    if settings.history.max_history_items == 0 || settings.history.max_telemetry_items == 0 {
        return Err(SettingsError::InvalidValue(
            "history caps must be at least 1".into(),
        ));
    }
    Ok(())
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

pub fn parse_backend(val: &str) -> Option<InferenceBackend> {
    serde_json::from_value(Value::String(val.trim().to_lowercase())).ok()
}

pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers ─────────────────────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    let val = std::env::var(name).ok()?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        warn!(key = name, value = %val, "invalid u64 env var, ignoring");
    }
    result
}

fn read_env_usize(name: &str, min: usize, max: usize) -> Option<usize> {
    let val = std::env::var(name).ok()?;
    let result = parse_usize_range(&val, min, max);
    if result.is_none() {
        warn!(key = name, value = %val, "invalid usize env var, ignoring");
    }
    result
}

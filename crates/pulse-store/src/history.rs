use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use pulse_core::ids::InsightId;
use pulse_core::insight::{normalize_confidence, InsightMetadata, StrategicInsight, MAX_ACTIONS};

use crate::error::StoreError;
use crate::export::ExportSnapshot;
use crate::kv::KeyValueStore;
use crate::telemetry::TelemetrySnapshot;

pub const HISTORY_KEY: &str = "pulse.insightHistory";
pub const TELEMETRY_KEY: &str = "pulse.telemetryHistory";

const UPDATE_CHANNEL_CAPACITY: usize = 16;

/// Retention limits for the history store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryConfig {
    pub max_history_items: usize,
    pub max_telemetry_items: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_history_items: 20,
            max_telemetry_items: 100,
        }
    }
}

#[derive(Default)]
struct HistoryState {
    /// Most recent first.
    insights: Vec<StrategicInsight>,
    /// Most recent first.
    telemetry: Vec<TelemetrySnapshot>,
}

/// Bounded, most-recent-first insight history with derived telemetry.
///
/// Mutation, persistence and notification happen under one lock, so writes
/// to each storage key land in mutation order. Storage failures are logged
/// and the in-memory lists stay authoritative.
pub struct InsightHistoryStore {
    state: Mutex<HistoryState>,
    storage: Option<Arc<dyn KeyValueStore>>,
    config: HistoryConfig,
    updates: broadcast::Sender<Vec<StrategicInsight>>,
}

impl InsightHistoryStore {
    /// Create a store, restoring both lists from `storage` when present.
    pub fn new(config: HistoryConfig, storage: Option<Arc<dyn KeyValueStore>>) -> Self {
        let state = match &storage {
            Some(kv) => HistoryState {
                insights: restore_list(kv.as_ref(), HISTORY_KEY, config.max_history_items, decode_insight),
                telemetry: restore_list(
                    kv.as_ref(),
                    TELEMETRY_KEY,
                    config.max_telemetry_items,
                    |v| serde_json::from_value::<TelemetrySnapshot>(v).ok(),
                ),
            },
            None => HistoryState::default(),
        };

        debug!(
            insights = state.insights.len(),
            telemetry = state.telemetry.len(),
            persistent = storage.is_some(),
            "insight history initialised"
        );

        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            state: Mutex::new(state),
            storage,
            config,
            updates,
        }
    }

    /// A store that never touches durable storage.
    pub fn in_memory(config: HistoryConfig) -> Self {
        Self::new(config, None)
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Receives the full history after every mutation.
    pub fn subscribe(&self) -> broadcast::Receiver<Vec<StrategicInsight>> {
        self.updates.subscribe()
    }

    /// Record a new insight as the latest one.
    pub fn set_latest(&self, insight: StrategicInsight) {
        let snapshot = TelemetrySnapshot::from_insight(&insight);

        let mut state = self.state.lock();
        state.insights.insert(0, insight);
        state.insights.truncate(self.config.max_history_items);
        state.telemetry.insert(0, snapshot);
        state.telemetry.truncate(self.config.max_telemetry_items);

        self.persist(&state);
        self.notify(state.insights.clone());
    }

    pub fn latest(&self) -> Option<StrategicInsight> {
        self.state.lock().insights.first().cloned()
    }

    pub fn history(&self) -> Vec<StrategicInsight> {
        self.state.lock().insights.clone()
    }

    pub fn history_count(&self) -> usize {
        self.state.lock().insights.len()
    }

    pub fn telemetry_history(&self) -> Vec<TelemetrySnapshot> {
        self.state.lock().telemetry.clone()
    }

    /// Sanitized view safe to hand outside the process.
    pub fn export_snapshot(&self) -> ExportSnapshot {
        let state = self.state.lock();
        ExportSnapshot::build(&state.insights, &state.telemetry)
    }

    /// Empty both lists in memory and in storage.
    pub fn clear_history(&self) {
        let mut state = self.state.lock();
        state.insights.clear();
        state.telemetry.clear();

        self.persist(&state);
        self.notify(Vec::new());
    }

    fn persist(&self, state: &HistoryState) {
        let Some(kv) = &self.storage else {
            return;
        };
        if let Err(e) = write_list(kv.as_ref(), HISTORY_KEY, &state.insights) {
            warn!(key = HISTORY_KEY, error = %e, "failed to persist insight history");
        }
        if let Err(e) = write_list(kv.as_ref(), TELEMETRY_KEY, &state.telemetry) {
            warn!(key = TELEMETRY_KEY, error = %e, "failed to persist telemetry history");
        }
    }

    fn notify(&self, history: Vec<StrategicInsight>) {
        if self.updates.send(history).is_err() {
            debug!("no history subscribers");
        }
    }
}

fn write_list<T: serde::Serialize>(
    kv: &dyn KeyValueStore,
    key: &str,
    items: &[T],
) -> Result<(), StoreError> {
    let value = serde_json::to_value(items)?;
    kv.set(key, &value)
}

fn restore_list<T>(
    kv: &dyn KeyValueStore,
    key: &str,
    cap: usize,
    decode: impl Fn(Value) -> Option<T>,
) -> Vec<T> {
    let entries = match kv.get(key) {
        Ok(Some(Value::Array(entries))) => entries,
        Ok(Some(_)) => {
            warn!(key, "stored value is not a list, ignoring");
            return Vec::new();
        }
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!(key, error = %e, "failed to read stored history, starting empty");
            return Vec::new();
        }
    };

    let total = entries.len();
    let mut restored: Vec<T> = entries.into_iter().filter_map(&decode).collect();
    let dropped = total - restored.len();
    if dropped > 0 {
        warn!(key, dropped, kept = restored.len(), "dropped malformed entries on restore");
    }
    restored.truncate(cap);
    restored
}

/// The fields a stored insight must carry, correctly typed, to be trusted.
#[derive(Deserialize)]
struct StoredInsight {
    id: InsightId,
    summary: String,
    confidence: f64,
    actions: Vec<String>,
    timestamp: i64,
    #[serde(default)]
    metadata: Value,
}

fn decode_insight(value: Value) -> Option<StrategicInsight> {
    let mut stored: StoredInsight = decode(value)?;
    let confidence = normalize_confidence(stored.confidence)?;
    stored.actions.truncate(MAX_ACTIONS);
    let metadata = if stored.metadata.is_null() {
        InsightMetadata::default()
    } else {
        serde_json::from_value(stored.metadata).unwrap_or_else(|e| {
            debug!(id = %stored.id, error = %e, "unreadable insight metadata, using defaults");
            InsightMetadata::default()
        })
    };

    Some(StrategicInsight {
        id: stored.id,
        summary: stored.summary,
        confidence,
        actions: stored.actions,
        timestamp: stored.timestamp,
        metadata,
    })
}

fn decode<T: DeserializeOwned>(value: Value) -> Option<T> {
    serde_json::from_value(value).ok()
}

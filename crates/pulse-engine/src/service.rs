use std::sync::Arc;

use tracing::info;

use pulse_core::insight::StrategicInsight;
use pulse_core::request::AnalysisRequest;
use pulse_store::InsightHistoryStore;

use crate::orchestrator::AnalysisOrchestrator;

/// Runs analyses and records every result in the history store.
#[derive(Clone)]
pub struct InsightService {
    orchestrator: Arc<AnalysisOrchestrator>,
    store: Arc<InsightHistoryStore>,
}

impl InsightService {
    pub fn new(orchestrator: Arc<AnalysisOrchestrator>, store: Arc<InsightHistoryStore>) -> Self {
        Self { orchestrator, store }
    }

    pub fn orchestrator(&self) -> &Arc<AnalysisOrchestrator> {
        &self.orchestrator
    }

    pub fn store(&self) -> &Arc<InsightHistoryStore> {
        &self.store
    }

    pub async fn analyze(&self, request: &AnalysisRequest) -> StrategicInsight {
        let insight = self.orchestrator.run(request).await;
        info!(
            id = %insight.id,
            source = %insight.source(),
            confidence = insight.confidence,
            "insight recorded"
        );
        self.store.set_latest(insight.clone());
        insight
    }
}

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use pulse_core::client::InferenceClient;
use pulse_core::errors::InferenceError;
use pulse_core::insight::{InsightSource, StrategicInsight};
use pulse_core::request::AnalysisRequest;

use crate::config::AnalysisConfig;
use crate::digest::{ActivityDigest, AnalysisContext};
use crate::heuristic::HeuristicAnalyzer;
use crate::inference::InferenceAnalyzer;

/// Health of the inference path, for status indicators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceStatus {
    /// No client attached; every insight is a local fallback.
    Disabled,
    Healthy,
    /// A call failed; inference stays off until a client is re-attached.
    Unhealthy,
}

impl InferenceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Healthy => "healthy",
            Self::Unhealthy => "unhealthy",
        }
    }
}

impl std::fmt::Display for InferenceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone)]
struct AttachedClient {
    client: Arc<dyn InferenceClient>,
    generation: u64,
}

struct OrchestratorState {
    client: Option<AttachedClient>,
    healthy: bool,
    generation: u64,
    objectives: Vec<String>,
    system_prompt: Option<String>,
}

enum Route {
    Local,
    Unhealthy,
    Inference(AttachedClient),
}

/// Routes each request to inference or the heuristic fallback.
///
/// The health flag is a latch: one failed inference call disables the path
/// until [`attach_client`](Self::attach_client) is called again. `run` never
/// fails. State is locked only between awaits.
pub struct AnalysisOrchestrator {
    config: AnalysisConfig,
    heuristic: HeuristicAnalyzer,
    inference: InferenceAnalyzer,
    state: Mutex<OrchestratorState>,
}

impl AnalysisOrchestrator {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            heuristic: HeuristicAnalyzer::new(config.fallback_confidence_base),
            inference: InferenceAnalyzer::new(config.timeout),
            config,
            state: Mutex::new(OrchestratorState {
                client: None,
                healthy: false,
                generation: 0,
                objectives: Vec::new(),
                system_prompt: None,
            }),
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Replace the inference client. Attaching always resets health;
    /// detaching (`None`) disables inference.
    pub fn attach_client(&self, client: Option<Arc<dyn InferenceClient>>) {
        let mut state = self.state.lock();
        state.generation += 1;
        match client {
            Some(client) => {
                info!(client = client.name(), generation = state.generation, "inference client attached");
                state.client = Some(AttachedClient {
                    client,
                    generation: state.generation,
                });
                state.healthy = true;
            }
            None => {
                if state.client.is_some() {
                    info!("inference client detached");
                }
                state.client = None;
                state.healthy = false;
            }
        }
    }

    /// Objectives used when a request carries none of its own.
    pub fn update_objectives(&self, objectives: Vec<String>) {
        self.state.lock().objectives = objectives;
    }

    pub fn objectives(&self) -> Vec<String> {
        self.state.lock().objectives.clone()
    }

    pub fn update_system_prompt(&self, system_prompt: Option<String>) {
        self.state.lock().system_prompt = system_prompt;
    }

    pub fn status(&self) -> InferenceStatus {
        let state = self.state.lock();
        match (&state.client, state.healthy) {
            (None, _) => InferenceStatus::Disabled,
            (Some(_), true) => InferenceStatus::Healthy,
            (Some(_), false) => InferenceStatus::Unhealthy,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status() == InferenceStatus::Healthy
    }

    /// Name of the attached client, if any.
    pub fn client_name(&self) -> Option<String> {
        self.state
            .lock()
            .client
            .as_ref()
            .map(|attached| attached.client.name().to_string())
    }

    /// Produce an insight for `request`. Always succeeds.
    #[instrument(skip_all, fields(events = request.events.len(), reason = %request.reason))]
    pub async fn run(&self, request: &AnalysisRequest) -> StrategicInsight {
        let digest = ActivityDigest::build(request, self.config.max_recent_lines);

        let (route, objectives, system_prompt) = {
            let state = self.state.lock();
            let route = match &state.client {
                None => Route::Local,
                Some(_) if !state.healthy => Route::Unhealthy,
                Some(attached) => Route::Inference(attached.clone()),
            };
            let objectives = if request.objectives.is_empty() {
                state.objectives.clone()
            } else {
                request.objectives.clone()
            };
            (route, objectives, state.system_prompt.clone())
        };

        let ctx = AnalysisContext {
            digest: &digest,
            objectives: &objectives,
            reason: request.reason,
        };

        match route {
            Route::Local => {
                debug!("no inference client, using local fallback");
                self.heuristic.analyze(&ctx, InsightSource::LocalFallback, None)
            }
            Route::Unhealthy => {
                debug!("inference unhealthy, skipping backend");
                self.heuristic.analyze(&ctx, InsightSource::InferenceFallback, None)
            }
            Route::Inference(attached) => {
                debug!(client = attached.client.name(), "routing to inference");
                match self
                    .inference
                    .analyze(attached.client.as_ref(), &ctx, system_prompt.as_deref())
                    .await
                {
                    Ok(insight) => insight,
                    Err(e) => {
                        self.mark_unhealthy(attached.generation, &e);
                        self.heuristic.analyze(
                            &ctx,
                            InsightSource::InferenceFallback,
                            Some(e.to_string()),
                        )
                    }
                }
            }
        }
    }

    fn mark_unhealthy(&self, generation: u64, error: &InferenceError) {
        let mut state = self.state.lock();
        let current = state.client.as_ref().map(|attached| attached.generation);
        if current != Some(generation) {
            debug!(
                generation,
                kind = error.error_kind(),
                "ignoring failure from a replaced client"
            );
            return;
        }
        if state.healthy {
            warn!(
                kind = error.error_kind(),
                payload = error.is_payload_error(),
                error = %error,
                "inference failed, falling back until a client is re-attached"
            );
        }
        state.healthy = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use pulse_core::activity::{ActivityEvent, ActivityKind};
    use pulse_core::insight::{MAX_ACTIONS, MAX_CONFIDENCE, MIN_CONFIDENCE};
    use pulse_core::request::TriggerReason;
    use pulse_llm::{MockClient, MockResponse};

    fn request() -> AnalysisRequest {
        AnalysisRequest::new(
            vec![
                ActivityEvent::new(ActivityKind::DocumentChange, "src/main.rs").with_language("rust"),
                ActivityEvent::new(ActivityKind::DocumentSave, "src/main.rs").with_language("rust"),
            ],
            TriggerReason::Manual,
        )
    }

    fn orchestrator() -> AnalysisOrchestrator {
        AnalysisOrchestrator::new(AnalysisConfig::default())
    }

    fn attach(orch: &AnalysisOrchestrator, client: &Arc<MockClient>) {
        orch.attach_client(Some(client.clone() as Arc<dyn InferenceClient>));
    }

    fn failure() -> MockResponse {
        MockResponse::Error(InferenceError::Client("backend offline".into()))
    }

    #[tokio::test]
    async fn no_client_is_local_fallback() {
        let orch = orchestrator();
        assert_eq!(orch.status(), InferenceStatus::Disabled);

        let insight = orch.run(&request()).await;
        assert_eq!(insight.source(), InsightSource::LocalFallback);
        assert!(insight.metadata.error_message.is_none());
    }

    #[tokio::test]
    async fn healthy_client_result_is_returned_untouched() {
        let orch = orchestrator();
        let client = Arc::new(MockClient::new(vec![MockResponse::payload("On track", 0.8, &["Ship it"])]));
        attach(&orch, &client);
        assert!(orch.is_healthy());

        let insight = orch.run(&request()).await;
        assert_eq!(insight.source(), InsightSource::Inference);
        assert_eq!(insight.summary, "On track");
        assert_eq!(insight.actions, vec!["Ship it"]);
        assert!(orch.is_healthy());
    }

    #[tokio::test]
    async fn single_failure_latches_until_reattach() {
        let orch = orchestrator();
        let client = Arc::new(MockClient::new(vec![
            failure(),
            MockResponse::payload("recovered", 0.8, &[]),
            MockResponse::payload("recovered", 0.8, &[]),
        ]));
        attach(&orch, &client);

        let first = orch.run(&request()).await;
        assert_eq!(first.source(), InsightSource::InferenceFallback);
        assert_eq!(
            first.metadata.error_message.as_deref(),
            Some("inference client failed: backend offline")
        );
        assert_eq!(orch.status(), InferenceStatus::Unhealthy);

        // The backend would succeed now, but the latch keeps it off.
        let second = orch.run(&request()).await;
        assert_eq!(second.source(), InsightSource::InferenceFallback);
        assert!(second.metadata.error_message.is_none());
        assert_eq!(client.call_count(), 1);

        attach(&orch, &client);
        let third = orch.run(&request()).await;
        assert_eq!(third.source(), InsightSource::Inference);
        assert_eq!(third.summary, "recovered");
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn malformed_payload_trips_latch() {
        let orch = orchestrator();
        let client = Arc::new(MockClient::new(vec![MockResponse::text("I think you're doing great!")]));
        attach(&orch, &client);

        let insight = orch.run(&request()).await;
        assert_eq!(insight.source(), InsightSource::InferenceFallback);
        assert!(insight
            .metadata
            .error_message
            .as_deref()
            .unwrap()
            .starts_with("malformed payload"));
        assert!(!orch.is_healthy());
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_is_treated_as_failure() {
        let orch = AnalysisOrchestrator::new(AnalysisConfig {
            timeout: Duration::from_secs(2),
            ..AnalysisConfig::default()
        });
        let client = Arc::new(MockClient::new(vec![MockResponse::delayed(
            Duration::from_secs(30),
            MockResponse::payload("late", 0.9, &[]),
        )]));
        attach(&orch, &client);

        let insight = orch.run(&request()).await;
        assert_eq!(insight.source(), InsightSource::InferenceFallback);
        assert!(insight.metadata.error_message.unwrap().contains("timed out"));
        assert_eq!(orch.status(), InferenceStatus::Unhealthy);
    }

    #[tokio::test]
    async fn detach_disables_inference() {
        let orch = orchestrator();
        let client = Arc::new(MockClient::new(vec![MockResponse::payload("x", 0.8, &[])]));
        attach(&orch, &client);
        orch.attach_client(None);

        assert_eq!(orch.status(), InferenceStatus::Disabled);
        assert!(orch.client_name().is_none());
        let insight = orch.run(&request()).await;
        assert_eq!(insight.source(), InsightSource::LocalFallback);
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn stale_failure_does_not_poison_new_client() {
        let orch = orchestrator();
        let old = Arc::new(MockClient::new(vec![]));
        attach(&orch, &old);
        let stale_generation = orch.state.lock().client.as_ref().unwrap().generation;

        let fresh = Arc::new(MockClient::new(vec![MockResponse::payload("fresh", 0.8, &[])]));
        attach(&orch, &fresh);

        orch.mark_unhealthy(stale_generation, &InferenceError::Client("late failure".into()));
        assert!(orch.is_healthy());
        assert_eq!(orch.run(&request()).await.source(), InsightSource::Inference);
    }

    #[tokio::test]
    async fn request_objectives_override_configured_ones() {
        let orch = orchestrator();
        orch.update_objectives(vec!["Configured objective".into()]);

        let insight = orch.run(&request()).await;
        assert_eq!(insight.metadata.objective.as_deref(), Some("Configured objective"));

        let req = request().with_objectives(vec!["Request objective".into()]);
        let insight = orch.run(&req).await;
        assert_eq!(insight.metadata.objective.as_deref(), Some("Request objective"));
    }

    #[tokio::test]
    async fn system_prompt_is_forwarded() {
        let orch = orchestrator();
        let client = Arc::new(MockClient::new(vec![
            MockResponse::payload("a", 0.8, &[]),
            MockResponse::payload("b", 0.8, &[]),
        ]));
        attach(&orch, &client);

        orch.update_system_prompt(Some("Answer in JSON only.".into()));
        orch.run(&request()).await;
        orch.update_system_prompt(None);
        orch.run(&request()).await;

        let prompts = client.prompts();
        assert_eq!(prompts[0].1.system_prompt.as_deref(), Some("Answer in JSON only."));
        assert!(prompts[1].1.system_prompt.is_none());
    }

    #[tokio::test]
    async fn every_route_respects_insight_invariants() {
        let orch = orchestrator();
        let busy: Vec<ActivityEvent> = (0..40)
            .map(|i| {
                ActivityEvent::new(ActivityKind::DocumentChange, format!("src/f{}.rs", i % 3))
                    .with_language(if i % 2 == 0 { "rust" } else { "toml" })
            })
            .collect();
        let requests = vec![
            AnalysisRequest::default(),
            request(),
            AnalysisRequest::new(busy, TriggerReason::Autosave),
        ];

        let client = Arc::new(MockClient::new(vec![
            MockResponse::text(r#"{"summary":"s","confidence":42,"actions":["1","2","3","4","5","6"]}"#),
            MockResponse::text(r#"{"summary":"s","confidence":-1}"#),
            failure(),
        ]));

        let mut insights = Vec::new();
        for req in &requests {
            insights.push(orch.run(req).await);
        }
        attach(&orch, &client);
        for req in &requests {
            insights.push(orch.run(req).await);
        }

        for insight in insights {
            assert!((MIN_CONFIDENCE..=MAX_CONFIDENCE).contains(&insight.confidence));
            assert!(insight.actions.len() <= MAX_ACTIONS);
        }
    }
}

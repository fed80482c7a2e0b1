pub mod payload;
pub mod prompt;

use std::time::Duration;

use tracing::{debug, instrument};

use pulse_core::client::{ChatOptions, InferenceClient};
use pulse_core::errors::InferenceError;
use pulse_core::insight::{InsightMetadata, InsightSource, StrategicInsight};

use crate::actions::cadence_actions;
use crate::digest::AnalysisContext;
use crate::heuristic::select_objective;

pub use payload::{parse_payload, PayloadParse, ValidatedPayload};
pub use prompt::build_prompt;

/// Turns a digest into a prompt, calls the backend, and validates the reply.
#[derive(Clone, Debug)]
pub struct InferenceAnalyzer {
    timeout: Duration,
}

impl InferenceAnalyzer {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// One inference round trip. No retries here; the caller decides what a
    /// failure means.
    #[instrument(skip_all, fields(client = client.name(), events = ctx.digest.event_count))]
    pub async fn analyze(
        &self,
        client: &dyn InferenceClient,
        ctx: &AnalysisContext<'_>,
        system_prompt: Option<&str>,
    ) -> Result<StrategicInsight, InferenceError> {
        let prompt = build_prompt(ctx);
        let mut options = ChatOptions::default().with_timeout(self.timeout);
        if let Some(system) = system_prompt {
            options = options.with_system_prompt(system);
        }

        let response = tokio::time::timeout(self.timeout, client.chat(&prompt, &options))
            .await
            .map_err(|_| InferenceError::Timeout(self.timeout))??;

        if response.trim().is_empty() {
            return Err(InferenceError::EmptyResponse);
        }

        let payload = parse_payload(&response).into_result()?;
        debug!(
            confidence = payload.confidence,
            actions = payload.actions.len(),
            "inference payload accepted"
        );

        let digest = ctx.digest;
        let actions = if payload.actions.is_empty() {
            cadence_actions(digest, select_objective(ctx.objectives, digest))
        } else {
            payload.actions
        };

        let mut metadata = InsightMetadata::new(InsightSource::Inference);
        metadata.files = digest.files.iter().cloned().collect();
        metadata.languages = digest.languages.iter().cloned().collect();
        metadata.event_count = Some(digest.event_count);
        metadata.reason = Some(ctx.reason);
        metadata.change_count = Some(digest.change_count);
        metadata.save_count = Some(digest.save_count);
        metadata.raw_response = Some(response);
        metadata.reasoning = payload.reasoning;

        Ok(StrategicInsight::new(
            payload.summary,
            payload.confidence,
            actions,
            metadata,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::ActivityDigest;
    use pulse_core::activity::{ActivityEvent, ActivityKind};
    use pulse_core::request::{AnalysisRequest, TriggerReason};
    use pulse_llm::{MockClient, MockResponse};

    fn digest(changes: usize, saves: usize) -> ActivityDigest {
        let mut events = Vec::new();
        for _ in 0..changes {
            events.push(ActivityEvent::new(ActivityKind::DocumentChange, "src/app.ts").with_language("typescript"));
        }
        for _ in 0..saves {
            events.push(ActivityEvent::new(ActivityKind::DocumentSave, "src/app.ts").with_language("typescript"));
        }
        ActivityDigest::build(&AnalysisRequest::new(events, TriggerReason::Manual), 25)
    }

    async fn analyze_with(
        client: &MockClient,
        digest: &ActivityDigest,
        system_prompt: Option<&str>,
    ) -> Result<StrategicInsight, InferenceError> {
        let objectives = vec!["Ship onboarding".to_string()];
        let ctx = AnalysisContext {
            digest,
            objectives: &objectives,
            reason: TriggerReason::Manual,
        };
        InferenceAnalyzer::new(Duration::from_secs(60))
            .analyze(client, &ctx, system_prompt)
            .await
    }

    #[tokio::test]
    async fn success_maps_payload_to_insight() {
        let raw = r#"Here you go: {"summary":"Good momentum","confidence":0.81,"actions":[" Write tests "],"reasoning":"steady saves"}"#;
        let client = MockClient::new(vec![MockResponse::text(raw)]);
        let insight = analyze_with(&client, &digest(3, 1), Some("be terse")).await.unwrap();

        assert_eq!(insight.summary, "Good momentum");
        assert_eq!(insight.confidence, 0.81);
        assert_eq!(insight.actions, vec!["Write tests"]);
        assert_eq!(insight.metadata.source, InsightSource::Inference);
        assert_eq!(insight.metadata.raw_response.as_deref(), Some(raw));
        assert_eq!(insight.metadata.reasoning.as_deref(), Some("steady saves"));
        assert_eq!(insight.metadata.files, vec!["src/app.ts"]);
        assert_eq!(insight.metadata.event_count, Some(4));

        let prompts = client.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].0.contains("1. Ship onboarding"));
        assert_eq!(prompts[0].1.system_prompt.as_deref(), Some("be terse"));
        assert_eq!(prompts[0].1.timeout, Some(Duration::from_secs(60)));
    }

    #[tokio::test]
    async fn confidence_out_of_range_and_garbage() {
        let client = MockClient::new(vec![
            MockResponse::text(r#"{"summary":"x","confidence":5}"#),
            MockResponse::text(r#"{"summary":"x","confidence":"abc"}"#),
        ]);
        let d = digest(1, 1);
        assert_eq!(analyze_with(&client, &d, None).await.unwrap().confidence, 0.99);
        assert_eq!(analyze_with(&client, &d, None).await.unwrap().confidence, 0.7);
    }

    #[tokio::test]
    async fn empty_actions_fall_back_to_cadence_rule() {
        let client = MockClient::new(vec![
            MockResponse::text(r#"{"summary":"x","actions":["", "  "]}"#),
            MockResponse::text(r#"{"summary":"x"}"#),
        ]);
        let busy = analyze_with(&client, &digest(9, 1), None).await.unwrap();
        assert_eq!(busy.actions.len(), 1);
        assert!(busy.actions[0].starts_with("Save and checkpoint"));

        let calm = analyze_with(&client, &digest(2, 2), None).await.unwrap();
        assert_eq!(
            calm.actions,
            vec!["Confirm the current work still advances: Ship onboarding"]
        );
    }

    #[tokio::test]
    async fn failures_are_classified() {
        let client = MockClient::new(vec![
            MockResponse::Error(InferenceError::Client("spawn failed".into())),
            MockResponse::text("   \n"),
            MockResponse::text("no json at all"),
            MockResponse::text(r#"{"confidence":0.9}"#),
        ]);
        let d = digest(1, 0);
        assert!(matches!(analyze_with(&client, &d, None).await, Err(InferenceError::Client(_))));
        assert!(matches!(analyze_with(&client, &d, None).await, Err(InferenceError::EmptyResponse)));
        assert!(matches!(
            analyze_with(&client, &d, None).await,
            Err(InferenceError::MalformedPayload(_))
        ));
        assert!(matches!(
            analyze_with(&client, &d, None).await,
            Err(InferenceError::SchemaViolation(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_backend_times_out() {
        let client = MockClient::new(vec![MockResponse::delayed(
            Duration::from_secs(600),
            MockResponse::payload("late", 0.9, &[]),
        )]);
        let d = digest(1, 0);
        let ctx = AnalysisContext {
            digest: &d,
            objectives: &[],
            reason: TriggerReason::Autosave,
        };
        let result = InferenceAnalyzer::new(Duration::from_secs(5))
            .analyze(&client, &ctx, None)
            .await;
        assert_eq!(result, Err(InferenceError::Timeout(Duration::from_secs(5))));
    }
}

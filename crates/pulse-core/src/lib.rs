pub mod activity;
pub mod client;
pub mod errors;
pub mod ids;
pub mod insight;
pub mod paths;
pub mod request;

pub use activity::{ActivityEvent, ActivityKind};
pub use client::{ChatOptions, InferenceClient};
pub use errors::InferenceError;
pub use ids::InsightId;
pub use insight::{InsightMetadata, InsightSource, StrategicInsight};
pub use request::{AnalysisRequest, TriggerReason};

pub mod actions;
pub mod buffer;
pub mod config;
pub mod digest;
pub mod heuristic;
pub mod inference;
pub mod orchestrator;
pub mod service;
pub mod truncate;

pub use buffer::ActivityBuffer;
pub use config::AnalysisConfig;
pub use digest::{ActivityDigest, AnalysisContext};
pub use heuristic::HeuristicAnalyzer;
pub use inference::{InferenceAnalyzer, PayloadParse, ValidatedPayload};
pub use orchestrator::{AnalysisOrchestrator, InferenceStatus};
pub use service::InsightService;

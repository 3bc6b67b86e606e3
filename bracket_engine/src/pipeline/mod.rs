//! Multi-stage pipelines: ordered stages where the top finishers of one
//! stage seed the next.

pub mod models;
pub mod orchestrator;

pub use models::{
    AdvancementRule, NewPipeline, NewPipelineStage, Pipeline, PipelineStage, PipelineStatus,
};
pub use orchestrator::{AdvanceOutcome, PipelineOrchestrator, advancing_participants};

//! Stages: the aggregate that owns seeds and a generated bracket.

pub mod manager;
pub mod models;
pub mod views;

pub use manager::StageManager;
pub use models::{NewStage, StageConfig, StageState};
pub use views::{
    BracketView, GroupView, GroupsView, MatchView, NodeView, ParticipantRef, PipelineStageView,
    PipelineView, StandingView,
};

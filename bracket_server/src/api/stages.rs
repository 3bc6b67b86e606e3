//! Stage lifecycle handlers: creation, seeding, generation and read projections.
//!
//! # Examples
//!
//! Create a single elimination stage:
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/stages \
//!   -H "x-actor-role: operator" -H "Content-Type: application/json" \
//!   -d '{"tournament_id": 1, "name": "Main event", "format": "single_elim"}'
//! ```
//!
//! Read its bracket:
//! ```bash
//! curl http://localhost:6969/api/v1/stages/1/bracket
//! ```

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
};
use bracket_engine::groups::GroupConfig;
use bracket_engine::stage::{BracketView, GroupsView, NewStage, StageState};
use bracket_engine::{
    Actor, EngineError, ParticipantId, Registrant, StageId, TournamentId, TransitionOutcome,
};
use serde::{Deserialize, Serialize};

use super::AppState;
use super::error::ApiError;
use crate::metrics;

#[derive(Debug, Deserialize)]
pub struct SeedOrderRequest {
    pub participant_ids: Vec<ParticipantId>,
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub from_index: usize,
    pub to_index: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SeedsResponse {
    pub stage_id: StageId,
    pub participant_ids: Vec<ParticipantId>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResetRequest {
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransitionResponse {
    pub outcome: TransitionOutcome,
}

impl TransitionResponse {
    pub(crate) fn counted(action: &'static str, outcome: TransitionOutcome) -> Json<Self> {
        let label = match outcome {
            TransitionOutcome::Applied => "applied",
            TransitionOutcome::Unchanged => "unchanged",
        };
        metrics::engine_actions_total(action, label);
        Json(Self { outcome })
    }
}

async fn seeds_of(state: &AppState, stage_id: StageId) -> Result<Json<SeedsResponse>, ApiError> {
    let stage = state.stages.stage(stage_id).await?;
    Ok(Json(SeedsResponse {
        stage_id,
        participant_ids: stage.seeds.ordered_ids(),
    }))
}

/// Create a stage.
///
/// # Errors
///
/// - `400 Bad Request`: invalid group settings
/// - `403 Forbidden`: caller is not an operator
pub async fn create_stage(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<NewStage>,
) -> Result<(StatusCode, Json<StageState>), ApiError> {
    let stage = state.stages.create_stage(&actor, request).await?;
    metrics::engine_actions_total("create_stage", "applied");
    Ok((StatusCode::CREATED, Json(stage)))
}

/// Full state of a stage, seeds and bracket included.
pub async fn get_stage(
    State(state): State<AppState>,
    Path(stage_id): Path<StageId>,
) -> Result<Json<StageState>, ApiError> {
    Ok(Json(state.stages.stage(stage_id).await?))
}

/// Stages of a tournament, oldest first.
pub async fn list_stages(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<Vec<StageState>>, ApiError> {
    Ok(Json(state.stages.stages_for_tournament(tournament_id).await?))
}

pub async fn get_seeds(
    State(state): State<AppState>,
    Path(stage_id): Path<StageId>,
) -> Result<Json<SeedsResponse>, ApiError> {
    seeds_of(&state, stage_id).await
}

/// Replace the seed order; unlisted registrants keep their relative order after it.
///
/// # Errors
///
/// - `400 Bad Request`: duplicate or unregistered participants
/// - `409 Conflict`: the bracket is published
pub async fn save_seed_order(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(stage_id): Path<StageId>,
    Json(request): Json<SeedOrderRequest>,
) -> Result<Json<SeedsResponse>, ApiError> {
    state
        .stages
        .save_seed_order(&actor, stage_id, request.participant_ids)
        .await?;
    metrics::engine_actions_total("save_seed_order", "applied");
    seeds_of(&state, stage_id).await
}

/// Move one seed to another position.
pub async fn reorder_seed(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(stage_id): Path<StageId>,
    Json(request): Json<ReorderRequest>,
) -> Result<Json<SeedsResponse>, ApiError> {
    state
        .stages
        .reorder_seed(&actor, stage_id, request.from_index, request.to_index)
        .await?;
    metrics::engine_actions_total("reorder_seed", "applied");
    seeds_of(&state, stage_id).await
}

/// Replace the round robin settings of an ungenerated stage.
pub async fn configure_groups(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(stage_id): Path<StageId>,
    Json(config): Json<GroupConfig>,
) -> Result<StatusCode, ApiError> {
    state.stages.configure_groups(&actor, stage_id, config).await?;
    metrics::engine_actions_total("configure_groups", "applied");
    Ok(StatusCode::NO_CONTENT)
}

/// Generate the bracket or groups of a stage.
///
/// # Errors
///
/// - `409 Conflict`: `already_generated` when the stage already has a bracket
/// - `400 Bad Request`: fewer than two participants
pub async fn generate(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(stage_id): Path<StageId>,
) -> Result<Json<BracketView>, ApiError> {
    let view = state.stages.generate(&actor, stage_id).await?;
    metrics::engine_actions_total("generate", "applied");
    Ok(Json(view))
}

/// Draw groups and schedule a round robin stage.
pub async fn draw_groups(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(stage_id): Path<StageId>,
) -> Result<Json<GroupsView>, ApiError> {
    let view = state.stages.draw_groups(&actor, stage_id).await?;
    metrics::engine_actions_total("draw_groups", "applied");
    Ok(Json(view))
}

/// Discard the generated bracket. Published brackets need `{"force": true}` from an admin.
pub async fn reset(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(stage_id): Path<StageId>,
    request: Option<Json<ResetRequest>>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let force = request.map(|Json(r)| r.force).unwrap_or_default();
    let outcome = state.stages.reset(&actor, stage_id, force).await?;
    Ok(TransitionResponse::counted("reset", outcome))
}

/// Publish the bracket, locking its seeds.
pub async fn publish(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(stage_id): Path<StageId>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let outcome = state.stages.publish(&actor, stage_id).await?;
    Ok(TransitionResponse::counted("publish", outcome))
}

/// `GET bracket(stage_id)`
pub async fn bracket_view(
    State(state): State<AppState>,
    Path(stage_id): Path<StageId>,
) -> Result<Json<BracketView>, ApiError> {
    Ok(Json(state.stages.bracket_view(stage_id).await?))
}

/// `GET groups(stage_id)`
pub async fn groups_view(
    State(state): State<AppState>,
    Path(stage_id): Path<StageId>,
) -> Result<Json<GroupsView>, ApiError> {
    Ok(Json(state.stages.groups_view(stage_id).await?))
}

/// Upload the finalized roster of a stage.
///
/// Only routed with in-memory storage, where there is no registration
/// database to read finalized participants from.
pub async fn set_registrants(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(stage_id): Path<StageId>,
    Json(registrants): Json<Vec<Registrant>>,
) -> Result<StatusCode, ApiError> {
    if !actor.is_operator() {
        return Err(EngineError::Forbidden {
            action: "upload registrants",
        }
        .into());
    }
    // Surfaces NotFound for unknown stages
    state.stages.stage(stage_id).await?;

    let Some(roster) = state.roster.as_ref() else {
        return Err(EngineError::InvalidInput(
            "registrants come from the registration database".to_string(),
        )
        .into());
    };
    roster.set_roster(stage_id, registrants).await;
    Ok(StatusCode::NO_CONTENT)
}

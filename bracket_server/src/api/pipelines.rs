//! Pipeline handlers: chaining stages and advancing participants between them.
//!
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/pipelines/1/stages/0/advance \
//!   -H "x-actor-role: operator"
//! ```

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
};
use bracket_engine::pipeline::{AdvanceOutcome, NewPipeline, Pipeline};
use bracket_engine::stage::PipelineView;
use bracket_engine::{Actor, PipelineId, TournamentId};

use super::AppState;
use super::error::ApiError;
use crate::metrics;

/// Create a pipeline over existing stages of one tournament.
///
/// # Errors
///
/// - `404 Not Found`: a listed stage does not exist
/// - `400 Bad Request`: a stage belongs to another tournament, or the list is empty
pub async fn create_pipeline(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<NewPipeline>,
) -> Result<(StatusCode, Json<Pipeline>), ApiError> {
    let pipeline = state.pipelines.create_pipeline(&actor, request).await?;
    metrics::engine_actions_total("create_pipeline", "applied");
    Ok((StatusCode::CREATED, Json(pipeline)))
}

/// Delete a pipeline; its stages are left untouched.
pub async fn delete_pipeline(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(pipeline_id): Path<PipelineId>,
) -> Result<StatusCode, ApiError> {
    state.pipelines.delete_pipeline(&actor, pipeline_id).await?;
    metrics::engine_actions_total("delete_pipeline", "applied");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_pipeline(
    State(state): State<AppState>,
    Path(pipeline_id): Path<PipelineId>,
) -> Result<Json<PipelineView>, ApiError> {
    Ok(Json(state.pipelines.pipeline_view(pipeline_id).await?))
}

/// `GET pipelines(tournament_id)`
pub async fn list_pipelines(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<Vec<PipelineView>>, ApiError> {
    Ok(Json(state.pipelines.pipelines_view(tournament_id).await?))
}

/// Advance the finished stage at `index` into the next one.
///
/// # Errors
///
/// - `409 Conflict`: `stage_incomplete` while matches are open,
///   `already_generated` once the next stage has a bracket
/// - `400 Bad Request`: `index` is outside the pipeline
pub async fn advance_stage(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path((pipeline_id, index)): Path<(PipelineId, usize)>,
) -> Result<Json<AdvanceOutcome>, ApiError> {
    let outcome = state
        .pipelines
        .advance_stage(&actor, pipeline_id, index)
        .await?;
    metrics::pipeline_advances_total(&outcome.pipeline_status.to_string());
    Ok(Json(outcome))
}

//! Per-match handlers.
//!
//! Every action is routed twice, under `/stages/{stage_id}/matches/{id}` and
//! `/stages/{stage_id}/nodes/{id}`; a [`TargetKind`] extension set on each
//! nested router tells the handler which one it serves. Addressing by node
//! fails with `incomplete_node` until both participants are known.
//!
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/stages/1/matches/0/report \
//!   -H "x-actor-role: participant" -H "x-participant-id: 7" \
//!   -H "Content-Type: application/json" \
//!   -d '{"participant1_score": 2, "participant2_score": 1}'
//! ```

use axum::{
    Json,
    extract::{Extension, Path, State},
};
use bracket_engine::bracket::ResultReport;
use bracket_engine::{Actor, MatchTarget, ParticipantId, StageId};
use serde::Deserialize;

use super::AppState;
use super::error::ApiError;
use super::stages::TransitionResponse;

/// Whether the path id is a match id or a node id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Match,
    Node,
}

impl TargetKind {
    fn target(self, id: u32) -> MatchTarget {
        match self {
            TargetKind::Match => MatchTarget::Match(id),
            TargetKind::Node => MatchTarget::Node(id),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DisputeRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct ForfeitRequest {
    pub participant_id: ParticipantId,
}

#[derive(Debug, Deserialize)]
pub struct OutcomeRequest {
    pub winner_id: ParticipantId,
}

type TargetPath = Path<(StageId, u32)>;
type ActionResult = Result<Json<TransitionResponse>, ApiError>;

pub async fn start_match(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(kind): Extension<TargetKind>,
    Path((stage_id, id)): TargetPath,
) -> ActionResult {
    let outcome = state
        .stages
        .start_match(&actor, stage_id, kind.target(id))
        .await?;
    Ok(TransitionResponse::counted("start_match", outcome))
}

/// Claim a result; the match waits in `pending_result` for confirmation
/// whoever reports. Operators use `record` for a final result.
pub async fn report_result(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(kind): Extension<TargetKind>,
    Path((stage_id, id)): TargetPath,
    Json(report): Json<ResultReport>,
) -> ActionResult {
    let outcome = state
        .stages
        .report_result(&actor, stage_id, kind.target(id), report)
        .await?;
    Ok(TransitionResponse::counted("report_result", outcome))
}

/// Opponent confirmation of a pending claim. Repeats are accepted unchanged.
pub async fn confirm_result(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(kind): Extension<TargetKind>,
    Path((stage_id, id)): TargetPath,
) -> ActionResult {
    let outcome = state
        .stages
        .confirm_result(&actor, stage_id, kind.target(id))
        .await?;
    Ok(TransitionResponse::counted("confirm_result", outcome))
}

/// Operator records a final result directly.
///
/// # Errors
///
/// - `409 Conflict`: `invalid_transition` when a different result is already final
pub async fn record_result(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(kind): Extension<TargetKind>,
    Path((stage_id, id)): TargetPath,
    Json(report): Json<ResultReport>,
) -> ActionResult {
    let outcome = state
        .stages
        .record_result(&actor, stage_id, kind.target(id), report)
        .await?;
    Ok(TransitionResponse::counted("record_result", outcome))
}

pub async fn dispute(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(kind): Extension<TargetKind>,
    Path((stage_id, id)): TargetPath,
    Json(request): Json<DisputeRequest>,
) -> ActionResult {
    let outcome = state
        .stages
        .dispute(&actor, stage_id, kind.target(id), request.reason)
        .await?;
    Ok(TransitionResponse::counted("dispute", outcome))
}

/// Admin settles a disputed match with a final result.
pub async fn resolve_dispute(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(kind): Extension<TargetKind>,
    Path((stage_id, id)): TargetPath,
    Json(report): Json<ResultReport>,
) -> ActionResult {
    let outcome = state
        .stages
        .resolve_dispute(&actor, stage_id, kind.target(id), report)
        .await?;
    Ok(TransitionResponse::counted("resolve_dispute", outcome))
}

pub async fn forfeit(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(kind): Extension<TargetKind>,
    Path((stage_id, id)): TargetPath,
    Json(request): Json<ForfeitRequest>,
) -> ActionResult {
    let outcome = state
        .stages
        .forfeit(&actor, stage_id, kind.target(id), request.participant_id)
        .await?;
    Ok(TransitionResponse::counted("forfeit", outcome))
}

pub async fn cancel(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(kind): Extension<TargetKind>,
    Path((stage_id, id)): TargetPath,
) -> ActionResult {
    let outcome = state
        .stages
        .cancel(&actor, stage_id, kind.target(id))
        .await?;
    Ok(TransitionResponse::counted("cancel", outcome))
}

/// Admin names the winner of a voided node; only routed under `/nodes`.
pub async fn assign_outcome(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path((stage_id, node_id)): TargetPath,
    Json(request): Json<OutcomeRequest>,
) -> ActionResult {
    let outcome = state
        .stages
        .assign_outcome(&actor, stage_id, node_id, request.winner_id)
        .await?;
    Ok(TransitionResponse::counted("assign_outcome", outcome))
}

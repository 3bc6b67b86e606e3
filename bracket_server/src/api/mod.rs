//! HTTP API for the bracket engine.
//!
//! # Modules
//!
//! - [`stages`]: stage lifecycle, seeding, generation and read projections
//! - [`matches`]: per-match result reporting and administration
//! - [`pipelines`]: stage chaining and advancement
//! - [`middleware`]: actor extraction for mutations, route metrics
//! - [`request_id`]: request correlation
//! - [`error`]: engine error to HTTP mapping
//!
//! # Endpoints Overview
//!
//! Reads need no actor; every mutation requires the `x-actor-role` header
//! (and `x-participant-id` for participants).
//!
//! ```text
//! GET    /health
//! POST   /api/v1/stages
//! GET    /api/v1/stages/{stage_id}
//! GET    /api/v1/tournaments/{tournament_id}/stages
//! GET    /api/v1/stages/{stage_id}/seeds
//! PUT    /api/v1/stages/{stage_id}/seeds
//! POST   /api/v1/stages/{stage_id}/seeds/reorder
//! PUT    /api/v1/stages/{stage_id}/groups/config
//! POST   /api/v1/stages/{stage_id}/groups/draw
//! POST   /api/v1/stages/{stage_id}/generate
//! POST   /api/v1/stages/{stage_id}/reset
//! POST   /api/v1/stages/{stage_id}/publish
//! GET    /api/v1/stages/{stage_id}/bracket
//! GET    /api/v1/stages/{stage_id}/groups
//! PUT    /api/v1/stages/{stage_id}/registrants       (memory storage only)
//! POST   /api/v1/stages/{stage_id}/matches/{match_id}/{action}
//! POST   /api/v1/stages/{stage_id}/nodes/{node_id}/{action}
//! POST   /api/v1/stages/{stage_id}/nodes/{node_id}/outcome
//! POST   /api/v1/pipelines
//! GET    /api/v1/pipelines/{pipeline_id}
//! DELETE /api/v1/pipelines/{pipeline_id}
//! POST   /api/v1/pipelines/{pipeline_id}/stages/{index}/advance
//! GET    /api/v1/tournaments/{tournament_id}/pipelines
//! ```
//!
//! Match actions are `start`, `report`, `confirm`, `record`, `dispute`,
//! `resolve`, `forfeit` and `cancel`.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use bracket_server::api::{AppState, create_router};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let app = create_router(AppState::in_memory());
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:6969").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod matches;
pub mod middleware;
pub mod pipelines;
pub mod request_id;
pub mod stages;

use axum::{
    Extension, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post, put},
};
use bracket_engine::db::{Database, MemoryRepository, PgRepository};
use bracket_engine::{PgParticipantSource, PipelineOrchestrator, StageManager, StaticRoster};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use matches::TargetKind;

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request; the managers only hold `Arc`s.
#[derive(Clone)]
pub struct AppState {
    pub stages: StageManager,
    pub pipelines: PipelineOrchestrator,
    /// In-memory roster; set only with memory storage
    pub roster: Option<StaticRoster>,
    /// Database handle for health checks; set only with postgres storage
    pub database: Option<Database>,
}

impl AppState {
    /// State backed by the in-memory repository and roster
    pub fn in_memory() -> Self {
        let repo = Arc::new(MemoryRepository::new());
        let roster = StaticRoster::new();
        Self {
            stages: StageManager::new(repo.clone(), Arc::new(roster.clone())),
            pipelines: PipelineOrchestrator::new(repo.clone(), repo),
            roster: Some(roster),
            database: None,
        }
    }

    /// State backed by PostgreSQL; finalized participants come from `stage_registrations`
    pub fn postgres(database: Database) -> Self {
        let repo = Arc::new(PgRepository::new(database.pool().clone()));
        let source = Arc::new(PgParticipantSource::new(database.pool().clone()));
        Self {
            stages: StageManager::new(repo.clone(), source),
            pipelines: PipelineOrchestrator::new(repo.clone(), repo),
            roster: None,
            database: Some(database),
        }
    }

    fn storage_name(&self) -> &'static str {
        if self.database.is_some() {
            "postgres"
        } else {
            "memory"
        }
    }
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    let v1_routes = create_v1_router(&state);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", v1_routes)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Match actions, shared by the `/matches` and `/nodes` routers
fn target_routes() -> Router<AppState> {
    Router::new()
        .route("/{id}/start", post(matches::start_match))
        .route("/{id}/report", post(matches::report_result))
        .route("/{id}/confirm", post(matches::confirm_result))
        .route("/{id}/record", post(matches::record_result))
        .route("/{id}/dispute", post(matches::dispute))
        .route("/{id}/resolve", post(matches::resolve_dispute))
        .route("/{id}/forfeit", post(matches::forfeit))
        .route("/{id}/cancel", post(matches::cancel))
}

/// Create API v1 router with all versioned endpoints.
fn create_v1_router(state: &AppState) -> Router<AppState> {
    let public_routes = Router::new()
        .route("/stages/{stage_id}", get(stages::get_stage))
        .route("/stages/{stage_id}/seeds", get(stages::get_seeds))
        .route("/stages/{stage_id}/bracket", get(stages::bracket_view))
        .route("/stages/{stage_id}/groups", get(stages::groups_view))
        .route("/tournaments/{tournament_id}/stages", get(stages::list_stages))
        .route("/tournaments/{tournament_id}/pipelines", get(pipelines::list_pipelines))
        .route("/pipelines/{pipeline_id}", get(pipelines::get_pipeline));

    let mut protected_routes = Router::new()
        .route("/stages", post(stages::create_stage))
        .route("/stages/{stage_id}/seeds", put(stages::save_seed_order))
        .route("/stages/{stage_id}/seeds/reorder", post(stages::reorder_seed))
        .route("/stages/{stage_id}/groups/config", put(stages::configure_groups))
        .route("/stages/{stage_id}/groups/draw", post(stages::draw_groups))
        .route("/stages/{stage_id}/generate", post(stages::generate))
        .route("/stages/{stage_id}/reset", post(stages::reset))
        .route("/stages/{stage_id}/publish", post(stages::publish))
        .nest(
            "/stages/{stage_id}/matches",
            target_routes().layer(Extension(TargetKind::Match)),
        )
        .nest(
            "/stages/{stage_id}/nodes",
            target_routes()
                .route("/{id}/outcome", post(matches::assign_outcome))
                .layer(Extension(TargetKind::Node)),
        )
        .route("/pipelines", post(pipelines::create_pipeline))
        .route("/pipelines/{pipeline_id}", axum::routing::delete(pipelines::delete_pipeline))
        .route(
            "/pipelines/{pipeline_id}/stages/{index}/advance",
            post(pipelines::advance_stage),
        );

    if state.roster.is_some() {
        protected_routes =
            protected_routes.route("/stages/{stage_id}/registrants", put(stages::set_registrants));
    }

    let protected_routes =
        protected_routes.layer(axum::middleware::from_fn(middleware::actor_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .route_layer(axum::middleware::from_fn(middleware::track_metrics))
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when storage is reachable, `503 Service Unavailable` otherwise.
///
/// ```bash
/// curl http://localhost:6969/health
/// # {"status":"healthy","storage":"memory","database":null,"version":"0.1.0","timestamp":"..."}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = match &state.database {
        Some(db) => Some(db.health_check().await.is_ok()),
        None => None,
    };
    let healthy = database.unwrap_or(true);

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if healthy { "healthy" } else { "unhealthy" },
        "storage": state.storage_name(),
        "database": database,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}

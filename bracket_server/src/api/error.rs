//! Mapping of engine errors to HTTP responses.
//!
//! The body always carries the machine-readable kind and, when there is one,
//! the entity the failure is about:
//!
//! ```json
//! {"error": "stage_incomplete", "message": "stage 3 still has 2 unfinished matches",
//!  "entity": {"type": "stage", "id": 3}}
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bracket_engine::{EngineError, EntityRef, ErrorKind};
use serde::{Deserialize, Serialize};

use crate::{logging, metrics};

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorKind,
    pub message: String,
    pub entity: Option<EntityRef>,
}

/// Engine error returned from a handler
#[derive(Debug)]
pub struct ApiError(pub EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

/// HTTP status for an error kind
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidState
        | ErrorKind::AlreadyGenerated
        | ErrorKind::Finalized
        | ErrorKind::IncompleteNode
        | ErrorKind::InvalidTransition
        | ErrorKind::StageIncomplete => StatusCode::CONFLICT,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = status_for(kind);
        let kind_name = kind.to_string();

        // Full error for the log, sanitized one for the client
        logging::log_rejected_action(
            &kind_name,
            &self.0.to_string(),
            status.is_server_error(),
        );
        metrics::engine_errors_total(&kind_name);

        let body = ErrorResponse {
            error: kind,
            message: self.0.client_message(),
            entity: self.0.entity(),
        };
        (status, Json(body)).into_response()
    }
}

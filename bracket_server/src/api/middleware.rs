//! Actor and metrics middleware.
//!
//! Identity is established upstream of this service; requests arrive with the
//! caller's role in `x-actor-role` (`participant`, `operator` or `admin`) and,
//! for participants, their id in `x-participant-id`. The middleware turns these
//! into an [`Actor`] in the request extensions:
//!
//! ```rust,no_run
//! use axum::extract::Extension;
//! use bracket_engine::Actor;
//!
//! async fn handler(Extension(actor): Extension<Actor>) -> String {
//!     format!("Acting as {:?}", actor)
//! }
//! # let _ = handler;
//! ```

use axum::{
    extract::{MatchedPath, Request},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use bracket_engine::Actor;
use std::time::Instant;

use crate::metrics;

pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";
pub const PARTICIPANT_ID_HEADER: &str = "x-participant-id";

/// Read the acting party from request headers
pub fn actor_from_headers(headers: &HeaderMap) -> Option<Actor> {
    let header = |name: &str| headers.get(name).and_then(|value| value.to_str().ok());

    match header(ACTOR_ROLE_HEADER)?.trim().to_lowercase().as_str() {
        "operator" => Some(Actor::Operator),
        "admin" => Some(Actor::Admin),
        "participant" => header(PARTICIPANT_ID_HEADER)?
            .trim()
            .parse()
            .ok()
            .map(Actor::Participant),
        _ => None,
    }
}

/// Require an actor on mutation routes
///
/// - **Success**: injects `Actor` into request extensions and calls the next handler
/// - **Missing or malformed headers**: `401 Unauthorized`
pub async fn actor_middleware(mut request: Request, next: Next) -> Result<Response, StatusCode> {
    let Some(actor) = actor_from_headers(request.headers()) else {
        return Err(StatusCode::UNAUTHORIZED);
    };
    request.extensions_mut().insert(actor);
    Ok(next.run(request).await)
}

/// Record request count and latency by matched route
///
/// Applied with `route_layer` so the route template, not the raw path, is the label.
pub async fn track_metrics(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let response = next.run(request).await;

    metrics::http_requests_total(&method, &path, response.status().as_u16());
    metrics::http_request_duration_ms(&method, &path, started.elapsed().as_secs_f64() * 1000.0);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_roles() {
        assert_eq!(
            actor_from_headers(&headers(&[(ACTOR_ROLE_HEADER, "Operator")])),
            Some(Actor::Operator)
        );
        assert_eq!(
            actor_from_headers(&headers(&[(ACTOR_ROLE_HEADER, "admin")])),
            Some(Actor::Admin)
        );
        assert_eq!(
            actor_from_headers(&headers(&[
                (ACTOR_ROLE_HEADER, "participant"),
                (PARTICIPANT_ID_HEADER, "42"),
            ])),
            Some(Actor::Participant(42))
        );
    }

    #[test]
    fn test_rejects_incomplete_identity() {
        assert_eq!(actor_from_headers(&HeaderMap::new()), None);
        assert_eq!(
            actor_from_headers(&headers(&[(ACTOR_ROLE_HEADER, "participant")])),
            None
        );
        assert_eq!(
            actor_from_headers(&headers(&[
                (ACTOR_ROLE_HEADER, "participant"),
                (PARTICIPANT_ID_HEADER, "abc"),
            ])),
            None
        );
        assert_eq!(
            actor_from_headers(&headers(&[(ACTOR_ROLE_HEADER, "spectator")])),
            None
        );
    }
}

//! Integration tests for the HTTP surface, driven through the router with
//! in-memory storage.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use bracket_server::api::{AppState, create_router};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt; // For `oneshot` method

const OPERATOR: Who = Who::Role("operator");
const ADMIN: Who = Who::Role("admin");

#[derive(Clone, Copy)]
enum Who {
    Anonymous,
    Role(&'static str),
    Participant(i64),
}

fn create_test_server() -> Router {
    create_router(AppState::in_memory())
}

/// Send one request; the body is parsed as JSON when there is one
async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    who: Who,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    builder = match who {
        Who::Anonymous => builder,
        Who::Role(role) => builder.header("x-actor-role", role),
        Who::Participant(id) => builder
            .header("x-actor-role", "participant")
            .header("x-participant-id", id.to_string()),
    };
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create_stage(app: &Router, name: &str, format: &str, groups: Option<Value>) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/api/v1/stages",
        OPERATOR,
        Some(json!({
            "tournament_id": 1,
            "name": name,
            "format": format,
            "groups": groups,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["config"]["id"].as_i64().unwrap()
}

async fn upload_teams(app: &Router, stage_id: i64, count: i64) {
    let registrants: Vec<Value> = (1..=count)
        .map(|id| json!({"participant_id": id, "display_name": format!("Team {id}")}))
        .collect();
    let (status, _) = send(
        app,
        "PUT",
        &format!("/api/v1/stages/{stage_id}/registrants"),
        OPERATOR,
        Some(Value::Array(registrants)),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

/// Four teams, generated: match 0 is 1 vs 4, match 1 is 2 vs 3, node 2 the final
async fn four_team_bracket(app: &Router) -> i64 {
    let stage_id = create_stage(app, "Playoffs", "single_elim", None).await;
    upload_teams(app, stage_id, 4).await;
    let (status, view) = send(
        app,
        "POST",
        &format!("/api/v1/stages/{stage_id}/generate"),
        OPERATOR,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["exists"], true);
    stage_id
}

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check_endpoint() {
    let app = create_test_server();

    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "health-check-1")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "health-check-1"
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"], "memory");
    assert!(body["database"].is_null());

    // A request id is generated when the client sends none
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}

// ============================================================================
// Actor Tests
// ============================================================================

#[tokio::test]
async fn test_mutations_require_actor() {
    let app = create_test_server();
    let request = json!({"tournament_id": 1, "name": "Main", "format": "single_elim"});

    let (status, _) = send(&app, "POST", "/api/v1/stages", Who::Anonymous, Some(request.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, "POST", "/api/v1/stages", Who::Participant(1), Some(request)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn test_unknown_stage_is_not_found() {
    let app = create_test_server();

    let (status, body) = send(&app, "GET", "/api/v1/stages/99/bracket", Who::Anonymous, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
    assert_eq!(body["entity"], json!({"type": "stage", "id": 99}));
}

// ============================================================================
// Stage And Match Tests
// ============================================================================

#[tokio::test]
async fn test_single_elimination_flow() {
    let app = create_test_server();
    let stage_id = create_stage(&app, "Playoffs", "single_elim", None).await;
    let stage = |path: &str| format!("/api/v1/stages/{stage_id}{path}");

    let (status, view) = send(&app, "GET", &stage("/bracket"), Who::Anonymous, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["exists"], false);

    upload_teams(&app, stage_id, 4).await;
    let (status, view) = send(&app, "POST", &stage("/generate"), OPERATOR, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["nodes"][0]["participant1"]["id"], 1);
    assert_eq!(view["nodes"][0]["participant2"]["id"], 4);
    assert_eq!(view["nodes"][0]["participant1"]["display_name"], "Team 1");
    assert_eq!(view["nodes"][0]["match"]["state"], "scheduled");

    let (status, body) = send(&app, "POST", &stage("/generate"), OPERATOR, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "already_generated");

    // Team 1 claims, team 4 confirms
    let score = json!({"participant1_score": 2, "participant2_score": 0});
    let (status, body) = send(&app, "POST", &stage("/matches/0/report"), Who::Participant(1), Some(score)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "applied");

    let (status, _) = send(&app, "POST", &stage("/matches/0/confirm"), Who::Participant(1), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = send(&app, "POST", &stage("/matches/0/confirm"), Who::Participant(4), None).await;
    assert_eq!(body["outcome"], "applied");
    let (status, body) = send(&app, "POST", &stage("/matches/0/confirm"), Who::Participant(4), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "unchanged");

    // The final is not addressable until both semi-finals are decided
    let (status, body) = send(&app, "POST", &stage("/nodes/2/start"), OPERATOR, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "incomplete_node");
    assert_eq!(body["entity"], json!({"type": "node", "stage": stage_id, "id": 2}));

    let upset = json!({"participant1_score": 0, "participant2_score": 3});
    let (_, body) = send(&app, "POST", &stage("/matches/1/record"), OPERATOR, Some(upset)).await;
    assert_eq!(body["outcome"], "applied");

    let (status, body) = send(
        &app,
        "POST",
        &stage("/matches/1/record"),
        OPERATOR,
        Some(json!({"participant1_score": 3, "participant2_score": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_transition");

    let (status, _) = send(
        &app,
        "POST",
        &stage("/nodes/2/record"),
        OPERATOR,
        Some(json!({"participant1_score": 1, "participant2_score": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, view) = send(&app, "GET", &stage("/bracket"), Who::Anonymous, None).await;
    assert_eq!(view["champion"]["id"], 3);
    assert_eq!(view["champion"]["display_name"], "Team 3");
}

#[tokio::test]
async fn test_operator_report_waits_for_confirmation() {
    let app = create_test_server();
    let stage_id = four_team_bracket(&app).await;
    let stage = |path: &str| format!("/api/v1/stages/{stage_id}{path}");

    let score = json!({"participant1_score": 2, "participant2_score": 1});
    let (status, body) = send(&app, "POST", &stage("/matches/0/report"), OPERATOR, Some(score)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "applied");

    let (_, view) = send(&app, "GET", &stage("/bracket"), Who::Anonymous, None).await;
    assert_eq!(view["nodes"][0]["match"]["state"], "pending_result");
    assert!(view["nodes"][0]["winner_id"].is_null());

    let (status, body) = send(&app, "POST", &stage("/matches/0/confirm"), OPERATOR, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "applied");

    let (_, view) = send(&app, "GET", &stage("/bracket"), Who::Anonymous, None).await;
    assert_eq!(view["nodes"][0]["match"]["state"], "completed");
    assert_eq!(view["nodes"][2]["participant1"]["id"], 1);
}

#[tokio::test]
async fn test_seed_order_and_forced_reset() {
    let app = create_test_server();
    let stage_id = create_stage(&app, "Playoffs", "single_elim", None).await;
    let stage = |path: &str| format!("/api/v1/stages/{stage_id}{path}");
    upload_teams(&app, stage_id, 4).await;

    let (status, body) = send(
        &app,
        "PUT",
        &stage("/seeds"),
        OPERATOR,
        Some(json!({"participant_ids": [4, 9]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_input");

    let (status, body) = send(
        &app,
        "PUT",
        &stage("/seeds"),
        OPERATOR,
        Some(json!({"participant_ids": [4, 3, 2, 1]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["participant_ids"], json!([4, 3, 2, 1]));

    let (_, body) = send(
        &app,
        "POST",
        &stage("/seeds/reorder"),
        OPERATOR,
        Some(json!({"from_index": 3, "to_index": 0})),
    )
    .await;
    assert_eq!(body["participant_ids"], json!([1, 4, 3, 2]));

    // Top seed meets the fourth
    let (_, view) = send(&app, "POST", &stage("/generate"), OPERATOR, None).await;
    assert_eq!(view["nodes"][0]["participant1"]["id"], 1);
    assert_eq!(view["nodes"][0]["participant2"]["id"], 2);

    let (_, body) = send(&app, "POST", &stage("/publish"), OPERATOR, None).await;
    assert_eq!(body["outcome"], "applied");

    let (status, body) = send(&app, "POST", &stage("/reset"), OPERATOR, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "finalized");

    let force = json!({"force": true});
    let (status, _) = send(&app, "POST", &stage("/reset"), OPERATOR, Some(force.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, "POST", &stage("/reset"), ADMIN, Some(force)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "applied");

    let (_, view) = send(&app, "GET", &stage("/bracket"), Who::Anonymous, None).await;
    assert_eq!(view["exists"], false);
}

#[tokio::test]
async fn test_dispute_and_resolution() {
    let app = create_test_server();
    let stage_id = four_team_bracket(&app).await;
    let stage = |path: &str| format!("/api/v1/stages/{stage_id}{path}");

    send(
        &app,
        "POST",
        &stage("/matches/0/record"),
        OPERATOR,
        Some(json!({"participant1_score": 2, "participant2_score": 1})),
    )
    .await;

    let (status, body) = send(
        &app,
        "POST",
        &stage("/matches/0/dispute"),
        Who::Participant(4),
        Some(json!({"reason": "score misreported"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "applied");

    let resolution = json!({"participant1_score": 2, "participant2_score": 1});
    let (status, _) = send(&app, "POST", &stage("/matches/0/resolve"), OPERATOR, Some(resolution.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "POST", &stage("/matches/0/resolve"), ADMIN, Some(resolution)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, view) = send(&app, "GET", &stage("/bracket"), Who::Anonymous, None).await;
    assert_eq!(view["nodes"][0]["match"]["state"], "completed");
    assert_eq!(view["nodes"][2]["participant1"]["id"], 1);
}

#[tokio::test]
async fn test_forfeit_and_cancelled_node_outcome() {
    let app = create_test_server();
    let stage_id = four_team_bracket(&app).await;
    let stage = |path: &str| format!("/api/v1/stages/{stage_id}{path}");

    let (status, _) = send(
        &app,
        "POST",
        &stage("/matches/0/forfeit"),
        Who::Participant(4),
        Some(json!({"participant_id": 4})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "POST", &stage("/nodes/1/cancel"), OPERATOR, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        "POST",
        &stage("/nodes/1/outcome"),
        OPERATOR,
        Some(json!({"winner_id": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        "POST",
        &stage("/nodes/1/outcome"),
        ADMIN,
        Some(json!({"winner_id": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, view) = send(&app, "GET", &stage("/bracket"), Who::Anonymous, None).await;
    assert_eq!(view["nodes"][0]["match"]["state"], "forfeit");
    assert_eq!(view["nodes"][2]["participant1"]["id"], 1);
    assert_eq!(view["nodes"][2]["participant2"]["id"], 2);
}

// ============================================================================
// Pipeline Tests
// ============================================================================

#[tokio::test]
async fn test_groups_to_playoffs_pipeline() {
    let app = create_test_server();
    let groups = create_stage(&app, "Group stage", "round_robin", Some(json!({"group_count": 2}))).await;
    let playoffs = create_stage(&app, "Playoffs", "single_elim", None).await;
    upload_teams(&app, groups, 8).await;

    let (status, view) = send(
        &app,
        "POST",
        &format!("/api/v1/stages/{groups}/groups/draw"),
        OPERATOR,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["groups"].as_array().unwrap().len(), 2);
    assert_eq!(view["groups"][0]["name"], "Group A");

    let (status, pipeline) = send(
        &app,
        "POST",
        "/api/v1/pipelines",
        OPERATOR,
        Some(json!({
            "tournament_id": 1,
            "name": "Groups to playoffs",
            "stages": [
                {"stage_id": groups, "advancement_rule": {"rule": "top_per_group", "count": 2}},
                {"stage_id": playoffs, "advancement_rule": {"rule": "top_overall", "count": 1}, "auto_generate": true},
            ],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(pipeline["status"], "pending");
    let pipeline_id = pipeline["id"].as_i64().unwrap();
    let advance = format!("/api/v1/pipelines/{pipeline_id}/stages/0/advance");

    let (status, body) = send(&app, "POST", &advance, OPERATOR, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "stage_incomplete");

    // Lower id wins every group match
    let (_, stage) = send(&app, "GET", &format!("/api/v1/stages/{groups}"), Who::Anonymous, None).await;
    for m in stage["bracket"]["matches"].as_array().unwrap() {
        let (p1, p2) = (m["participant1_id"].as_i64().unwrap(), m["participant2_id"].as_i64().unwrap());
        let score = if p1 < p2 {
            json!({"participant1_score": 2, "participant2_score": 0})
        } else {
            json!({"participant1_score": 0, "participant2_score": 2})
        };
        let uri = format!("/api/v1/stages/{groups}/matches/{}/record", m["id"]);
        let (status, _) = send(&app, "POST", &uri, OPERATOR, Some(score)).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, standings) = send(&app, "GET", &format!("/api/v1/stages/{groups}/groups"), Who::Anonymous, None).await;
    assert_eq!(standings["groups"][0]["standings"].as_array().unwrap().len(), 4);

    let (status, outcome) = send(&app, "POST", &advance, OPERATOR, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["advancing"], json!([1, 2, 3, 4]));
    assert_eq!(outcome["next_stage_id"], playoffs);
    assert_eq!(outcome["pipeline_status"], "running");
    assert_eq!(outcome["generated"], true);

    let (_, view) = send(&app, "GET", &format!("/api/v1/stages/{playoffs}/bracket"), Who::Anonymous, None).await;
    assert_eq!(view["exists"], true);
    assert_eq!(view["nodes"][0]["participant1"]["display_name"], "Team 1");

    let (_, listed) = send(&app, "GET", "/api/v1/tournaments/1/pipelines", Who::Anonymous, None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["status"], "running");
    assert_eq!(listed[0]["stages"][0]["advanced"], true);

    let pipeline_uri = format!("/api/v1/pipelines/{pipeline_id}");
    let (status, _) = send(&app, "DELETE", &pipeline_uri, Who::Participant(1), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, "DELETE", &pipeline_uri, OPERATOR, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "GET", &pipeline_uri, Who::Anonymous, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

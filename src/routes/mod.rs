//! Router assembly: user/progression endpoints, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;

/// Build the application router with:
/// - user records, profile, and activity events under `/api/users/...`
/// - enrollment ledger at `/api/users/courses`
/// - CORS (allow any origin/method/headers); tighten for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(http::http_health))
        .route("/api/users", post(http::http_create_user).get(http::http_get_user))
        .route("/api/users/profile", get(http::http_get_profile).patch(http::http_patch_profile))
        .route("/api/users/submission", post(http::http_post_submission))
        .route("/api/users/ai-score", post(http::http_post_ai_score).get(http::http_get_ai_score))
        .route("/api/users/course", post(http::http_post_course))
        .route(
            "/api/users/achievements",
            get(http::http_get_achievements).post(http::http_post_achievements),
        )
        .route(
            "/api/users/courses",
            get(http::http_get_courses)
                .post(http::http_post_courses)
                .patch(http::http_patch_courses),
        )
        .route("/api/active-students", get(http::http_active_students))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::ServiceConfig;

    fn app() -> Router {
        build_router(Arc::new(AppState::in_memory(ServiceConfig::default())))
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(b) => builder
                .header("content-type", "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, value)
    }

    async fn register(app: &Router, ocid: &str) {
        let (status, body) = call(app, Method::POST, "/api/users", Some(json!({ "OCId": ocid }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (status, body) = call(&app(), Method::GET, "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn create_get_and_duplicate() {
        let app = app();
        register(&app, "alice.edu").await;

        let (status, body) = call(&app, Method::GET, "/api/users?OCId=alice.edu", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["data"]["OCId"], "alice.edu");
        assert_eq!(body["user"]["data"]["Level"], 0);

        let (status, body) = call(&app, Method::POST, "/api/users", Some(json!({ "OCId": "alice.edu" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "User already exists");
    }

    #[tokio::test]
    async fn missing_ocid_is_rejected_before_store_access() {
        let app = app();
        let (status, body) = call(&app, Method::POST, "/api/users/submission", Some(json!({ "isAccepted": true }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "OCId is required");

        let (status, _) = call(&app, Method::GET, "/api/users/profile", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let app = app();
        let (status, body) =
            call(&app, Method::POST, "/api/users/submission", Some(json!({ "OCId": "ghost" }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "User not found");

        let (status, _) = call(&app, Method::GET, "/api/users/achievements?OCId=ghost", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn submission_reports_level_and_achievements() {
        let app = app();
        register(&app, "bob").await;
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/users/submission",
            Some(json!({ "OCId": "bob", "isAccepted": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["levelUpdated"], false);
        assert_eq!(body["newLevel"], 0);
        assert_eq!(body["newAchievements"], json!([]));

        let (_, body) = call(
            &app,
            Method::POST,
            "/api/users/submission",
            Some(json!({ "OCId": "bob", "isAccepted": true })),
        )
        .await;
        // score = 2 + 4 = 6
        assert_eq!(body["levelUpdated"], true);
        assert_eq!(body["newLevel"], 1);
    }

    #[tokio::test]
    async fn ai_score_flow_and_stats() {
        let app = app();
        register(&app, "carol").await;
        let (status, body) =
            call(&app, Method::POST, "/api/users/ai-score", Some(json!({ "OCId": "carol", "score": 95 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["averageScore"], 95.0);
        assert_eq!(body["totalScores"], 1);
        assert_eq!(body["newAchievements"], json!(["AI Prodigy"]));

        let (status, body) =
            call(&app, Method::POST, "/api/users/ai-score", Some(json!({ "OCId": "carol", "score": 140 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (status, body) = call(&app, Method::GET, "/api/users/ai-score?OCId=carol", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["totalScores"], 1);
        assert_eq!(body["data"]["highestScore"], 95.0);
    }

    #[tokio::test]
    async fn course_completion_twice() {
        let app = app();
        register(&app, "dave").await;
        let payload = json!({ "OCId": "dave", "courseId": "solidity-101", "course": { "title": "Basics" } });

        let (status, body) = call(&app, Method::POST, "/api/users/course", Some(payload.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["newLevel"], 1);
        assert!(body.get("alreadyCompleted").is_none());

        let (status, body) = call(&app, Method::POST, "/api/users/course", Some(payload)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["alreadyCompleted"], true);
        assert!(body.get("newLevel").is_none());

        let (_, body) = call(&app, Method::GET, "/api/users/profile?OCId=dave", None).await;
        assert_eq!(body["profile"]["courseCompleted"], 1);
        assert_eq!(body["profile"]["acceptanceRate"], 0);
        assert!(body["profile"]["memberSince"].is_string());

        let (_, body) = call(&app, Method::GET, "/api/users/courses?OCId=dave", None).await;
        assert_eq!(body["courses"][0]["courseId"], "solidity-101");
        assert_eq!(body["courses"][0]["completed"], true);
    }

    #[tokio::test]
    async fn mistyped_body_fields_render_as_json_errors() {
        let app = app();
        register(&app, "pm").await;
        let (status, body) =
            call(&app, Method::POST, "/api/users/ai-score", Some(json!({ "OCId": "pm", "score": "abc" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("score"));

        let (_, body) = call(&app, Method::GET, "/api/users/ai-score?OCId=pm", None).await;
        assert_eq!(body["data"]["totalScores"], 0);
    }

    #[tokio::test]
    async fn unparseable_body_renders_as_json_error() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/users/submission")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn course_completion_for_unknown_user_is_not_found() {
        let app = app();
        let payload = json!({ "OCId": "ghost", "courseId": "solidity-101" });
        let (status, body) = call(&app, Method::POST, "/api/users/course", Some(payload)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "User not found");

        let (_, body) = call(&app, Method::GET, "/api/users/courses?OCId=ghost", None).await;
        assert_eq!(body["courses"], json!([]));
    }

    #[tokio::test]
    async fn course_completion_needs_course_id() {
        let app = app();
        register(&app, "erin").await;
        let (status, body) = call(&app, Method::POST, "/api/users/course", Some(json!({ "OCId": "erin" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Course ID is required");
    }

    #[tokio::test]
    async fn achievements_listing_and_manual_check() {
        let app = app();
        register(&app, "frank").await;
        let (status, body) = call(&app, Method::GET, "/api/users/achievements?OCId=frank", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["achievements"]["total"], 5);
        assert_eq!(body["achievements"]["progress"][4]["id"], "AI Prodigy");
        assert_eq!(body["achievements"]["progress"][4]["progress"], 0.0);

        let (status, body) =
            call(&app, Method::POST, "/api/users/achievements", Some(json!({ "OCId": "frank" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["newAchievements"], json!([]));
        assert_eq!(body["totalAchievements"], 0);
    }

    #[tokio::test]
    async fn enrollment_and_nft_minting() {
        let app = app();
        let enroll = json!({ "OCId": "gina", "courseId": "c1", "completed": false });
        let (status, body) = call(&app, Method::POST, "/api/users/courses", Some(enroll)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Course enrolled and status updated successfully");

        let mint = json!({ "OCId": "gina", "courseId": "c1" });
        let (status, _) = call(&app, Method::PATCH, "/api/users/courses", Some(mint.clone())).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = call(&app, Method::PATCH, "/api/users/courses", Some(mint)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "NFT has already been minted for this course");

        let (status, _) =
            call(&app, Method::PATCH, "/api/users/courses", Some(json!({ "OCId": "gina", "courseId": "nope" }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn profile_patch_and_active_students() {
        let app = app();
        let (status, _) = call(&app, Method::GET, "/api/active-students", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        register(&app, "hana").await;
        let (status, body) = call(
            &app,
            Method::PATCH,
            "/api/users/profile",
            Some(json!({ "OCId": "hana", "image": "avatar.png" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["updatedFields"], json!(["image"]));

        let (status, body) = call(&app, Method::GET, "/api/active-students", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["activeStudents"], 1);
    }
}

use axum::http::{header, Method, StatusCode};
use axum::Router;
use serde_json::json;
use tower::ServiceExt;

use crate::core::{config::Settings, state::AppState};
use crate::services::evaluation::EvaluationClient;
use crate::test_support::{self, StubModel};

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(test_support::json_request(method, uri, body))
        .await
        .expect("response");
    let status = response.status();
    (status, test_support::read_json(response).await)
}

async fn seed_class(app: &Router) {
    for roll in ["101", "102"] {
        let response = app
            .clone()
            .oneshot(test_support::upload_request(roll, &format!("{roll}.pdf"), b"%PDF-1.7 answers"))
            .await
            .expect("upload");
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    for (id, question) in [("Q1", "Explain TCP handshakes."), ("Q2", "Compare TCP and UDP.")] {
        let (status, _) = send(
            app,
            Method::POST,
            "/api/v1/rubric/questions",
            Some(json!({"question_id": id, "question": question, "standard_answer": "See notes"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, _) = send(
        app,
        Method::POST,
        "/api/v1/rubric/criteria",
        Some(json!({"title": "Content Understanding", "explanation": "Shows grasp of concepts"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(app, Method::POST, "/api/v1/rubric", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn readiness_blocks_evaluation_until_session_is_complete() {
    let ctx = test_support::setup_test_context().await;

    let (status, readiness) = send(&ctx.app, Method::GET, "/api/v1/evaluations/readiness", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(readiness["ready"], false);
    assert_eq!(readiness["missing"], json!(["students", "questions", "criteria", "saved_rubric"]));

    let (status, body) = send(&ctx.app, Method::POST, "/api/v1/evaluations/run", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["detail"].as_str().unwrap_or_default().contains("saved rubric"));
    assert_eq!(ctx.model.calls(), 0);
}

#[tokio::test]
async fn evaluate_correct_summarize_and_export() {
    let ctx = test_support::setup_test_context().await;
    seed_class(&ctx.app).await;

    let (status, report) = send(&ctx.app, Method::POST, "/api/v1/evaluations/run", None).await;
    assert_eq!(status, StatusCode::OK, "report: {report}");
    assert_eq!(report["evaluated"], 2);
    assert_eq!(report["students"][0]["status"], "completed");
    assert_eq!(ctx.model.calls(), 2);

    let (status, result) = send(&ctx.app, Method::GET, "/api/v1/results/101", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["scores"]["Q1"], 8.0);
    assert_eq!(result["feedback"]["Q2"], "Feedback for Q2");
    assert_eq!(result["raw_response"]["results"][0]["question"], "Explain TCP handshakes.");
    assert!(result.get("error").is_none());

    for (question, score) in [("Q1", 5.0), ("Q2", 9.0)] {
        let (status, _) = send(
            &ctx.app,
            Method::PATCH,
            &format!("/api/v1/results/102/questions/{question}"),
            Some(json!({"score": score})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, summary) = send(&ctx.app, Method::GET, "/api/v1/results/summary", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["evaluated_students"], 2);
    assert_eq!(summary["questions"][0]["question_id"], "Q1");
    assert_eq!(summary["questions"][0]["average"], 6.5);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::GET, "/api/v1/exports/pivot", None))
        .await
        .expect("pivot");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"evalease_pivot_results.csv\""
    );
    let pivot = test_support::read_text(response).await;
    let lines: Vec<&str> = pivot.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[0],
        "Student Name,Roll Number,Overall Feedback,Score_Q1,Feedback_Q1,Score_Q2,Feedback_Q2"
    );
    assert!(lines[2].starts_with("Student-102,102,Consistent answers overall,5,"));

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::GET, "/api/v1/exports/detailed", None))
        .await
        .expect("detailed");
    assert!(response.headers()[header::CONTENT_TYPE].to_str().unwrap_or_default().starts_with("text/csv"));
    let detailed = test_support::read_text(response).await;
    assert_eq!(detailed.lines().filter(|line| line.contains("OVERALL_FEEDBACK")).count(), 2);

    let (status, exported) = send(&ctx.app, Method::GET, "/api/v1/exports/json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(exported[1]["student"]["roll_number"], "102");
    assert_eq!(exported[1]["evaluations"][1]["score"], 9.0);
}

#[tokio::test]
async fn corrections_are_validated() {
    let ctx = test_support::setup_test_context().await;
    seed_class(&ctx.app).await;
    send(&ctx.app, Method::POST, "/api/v1/evaluations/run", None).await;

    let (status, _) = send(
        &ctx.app,
        Method::PATCH,
        "/api/v1/results/101/questions/Q1",
        Some(json!({"score": 11.0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &ctx.app,
        Method::PATCH,
        "/api/v1/results/101/questions/Q1",
        Some(json!({"score": 7.25})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) =
        send(&ctx.app, Method::PATCH, "/api/v1/results/101/questions/Q1", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &ctx.app,
        Method::PATCH,
        "/api/v1/results/101/questions/Q7",
        Some(json!({"feedback": "n/a"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &ctx.app,
        Method::PATCH,
        "/api/v1/results/999/questions/Q1",
        Some(json!({"score": 5.0})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn failed_evaluations_are_visible_and_excluded_from_summary() {
    let ctx = test_support::setup_test_context_with(StubModel::failing()).await;
    seed_class(&ctx.app).await;

    let (status, report) = send(&ctx.app, Method::POST, "/api/v1/evaluations/run/101", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["failed"], 1);
    assert_eq!(report["students"][0]["status"], "failed");

    let (_, result) = send(&ctx.app, Method::GET, "/api/v1/results/101", None).await;
    assert_eq!(result["overall_feedback"], "Error occurred during evaluation.");
    assert!(result["error"].as_str().unwrap_or_default().contains("503"));
    assert_eq!(result["scores"], json!({}));

    let (_, summary) = send(&ctx.app, Method::GET, "/api/v1/results/summary", None).await;
    assert_eq!(summary["failed_students"], 1);
    assert_eq!(summary["questions"], json!([]));

    let (status, _) = send(&ctx.app, Method::POST, "/api/v1/evaluations/run/404", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn raw_model_replies_keep_only_rubric_questions() {
    let raw = r#"{"question_evaluations":[{"question_id":"Q1","score":"7"},{"question_id":"Q9","score":4,"feedback":"stray"}]}"#;
    let ctx = test_support::setup_test_context_with(StubModel::raw(raw)).await;
    seed_class(&ctx.app).await;

    send(&ctx.app, Method::POST, "/api/v1/evaluations/run", None).await;

    let (_, result) = send(&ctx.app, Method::GET, "/api/v1/results/101", None).await;
    assert_eq!(result["scores"], json!({"Q1": 0.0}));
    assert_eq!(result["feedback"], json!({"Q1": ""}));
    assert_eq!(result["overall_feedback"], "");
}

#[tokio::test]
async fn missing_api_key_degrades_health_and_fails_evaluations() {
    let guard = test_support::env_lock().await;
    test_support::set_test_env();
    std::env::remove_var("GEMINI_API_KEY");

    let settings = Settings::load().expect("settings");
    let evaluator = EvaluationClient::from_settings(&settings).expect("evaluator");
    assert!(!evaluator.is_configured());
    let state = AppState::new(settings, evaluator);
    let app = crate::api::router::router(state.clone());

    let (status, health) = send(&app, Method::GET, "/api/v1/healthz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "degraded");

    seed_class(&app).await;
    let (status, report) = send(&app, Method::POST, "/api/v1/evaluations/run", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["failed"], 2);
    assert_eq!(report["students"][0]["error"], "GEMINI_API_KEY not set in environment.");

    drop(guard);
}

#[tokio::test]
async fn exports_require_results_and_reset_clears_session() {
    let ctx = test_support::setup_test_context().await;

    let (status, _) = send(&ctx.app, Method::GET, "/api/v1/exports/json", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    seed_class(&ctx.app).await;
    send(&ctx.app, Method::POST, "/api/v1/evaluations/run", None).await;

    let (status, body) = send(&ctx.app, Method::DELETE, "/api/v1/session", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Session reset");

    let (_, students) = send(&ctx.app, Method::GET, "/api/v1/students", None).await;
    assert_eq!(students, json!([]));
    let (_, results) = send(&ctx.app, Method::GET, "/api/v1/results", None).await;
    assert_eq!(results, json!([]));
    let (status, _) = send(&ctx.app, Method::GET, "/api/v1/rubric", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

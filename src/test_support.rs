use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request},
    Router,
};
use tokio::sync::{Mutex, OwnedMutexGuard, Semaphore};

use crate::api;
use crate::core::{config::Settings, state::AppState};
use crate::services::evaluation::{
    EvaluationClient, EvaluationError, GenerateRequest, GenerativeModel,
};
use crate::services::normalizer::{EvaluationPayload, ModelReply, QuestionEvaluation};

const MULTIPART_BOUNDARY: &str = "evalease-test-boundary";

pub(crate) struct TestContext {
    pub(crate) state: AppState,
    pub(crate) app: Router,
    pub(crate) model: Arc<StubModel>,
    _guard: OwnedMutexGuard<()>,
}

fn env_mutex() -> Arc<Mutex<()>> {
    static LOCK: OnceLock<Arc<Mutex<()>>> = OnceLock::new();
    LOCK.get_or_init(|| Arc::new(Mutex::new(()))).clone()
}

pub(crate) async fn env_lock() -> OwnedMutexGuard<()> {
    env_mutex().lock_owned().await
}

/// For synchronous tests; must not be called from inside a runtime.
pub(crate) fn env_lock_blocking() -> OwnedMutexGuard<()> {
    env_mutex().blocking_lock_owned()
}

pub(crate) fn set_test_env() {
    std::env::set_var("EVALEASE_ENV", "test");
    std::env::set_var("EVALEASE_HOST", "127.0.0.1");
    std::env::set_var("EVALEASE_PORT", "8000");
    std::env::set_var("PROMETHEUS_ENABLED", "0");
    std::env::set_var("GEMINI_API_KEY", "test-key");
    for key in [
        "PROJECT_NAME",
        "VERSION",
        "API_V1_STR",
        "BACKEND_CORS_ORIGINS",
        "GEMINI_BASE_URL",
        "AI_MODEL",
        "AI_TEMPERATURE",
        "AI_REQUEST_TIMEOUT",
        "MAX_UPLOAD_SIZE_MB",
        "EXPORT_FILE_PREFIX",
        "EVALEASE_LOG_JSON",
    ] {
        std::env::remove_var(key);
    }
}

pub(crate) async fn setup_test_context() -> TestContext {
    setup_test_context_with(StubModel::scoring(&[("Q1", 8.0), ("Q2", 6.0)])).await
}

pub(crate) async fn setup_test_context_with(model: StubModel) -> TestContext {
    let guard = env_lock().await;
    set_test_env();

    let settings = Settings::load().expect("settings");
    let model = Arc::new(model);
    let evaluator = EvaluationClient::with_model(model.clone());
    let state = AppState::new(settings, evaluator);
    let app = api::router::router(state.clone());

    TestContext { state, app, model, _guard: guard }
}

enum StubBehavior {
    Scores(Vec<(String, f64)>),
    Raw(String),
    Fail,
}

/// Canned [`GenerativeModel`] that counts its calls. With a gate, each call
/// waits for a permit after being counted.
pub(crate) struct StubModel {
    behavior: StubBehavior,
    calls: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
}

impl StubModel {
    pub(crate) fn scoring(scores: &[(&str, f64)]) -> Self {
        let scores = scores.iter().map(|(id, score)| (id.to_string(), *score)).collect();
        Self { behavior: StubBehavior::Scores(scores), calls: AtomicUsize::new(0), gate: None }
    }

    pub(crate) fn raw(text: &str) -> Self {
        Self { behavior: StubBehavior::Raw(text.to_string()), calls: AtomicUsize::new(0), gate: None }
    }

    pub(crate) fn failing() -> Self {
        Self { behavior: StubBehavior::Fail, calls: AtomicUsize::new(0), gate: None }
    }

    pub(crate) fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerativeModel for StubModel {
    fn name(&self) -> &str {
        "stub-model"
    }

    async fn generate(&self, _request: GenerateRequest<'_>) -> Result<ModelReply, EvaluationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate open").forget();
        }
        match &self.behavior {
            StubBehavior::Scores(scores) => Ok(ModelReply::Structured(EvaluationPayload {
                question_evaluations: scores
                    .iter()
                    .map(|(question_id, score)| QuestionEvaluation {
                        question_id: question_id.clone(),
                        score: *score,
                        feedback: format!("Feedback for {question_id}"),
                    })
                    .collect(),
                overall_feedback: "Consistent answers overall".to_string(),
            })),
            StubBehavior::Raw(text) => Ok(ModelReply::RawText(text.clone())),
            StubBehavior::Fail => Err(EvaluationError::Status {
                status: 503,
                body: "model overloaded".to_string(),
            }),
        }
    }
}

pub(crate) fn json_request(
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);

    if let Some(body) = body {
        let bytes = serde_json::to_vec(&body).expect("serialize body");
        builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(bytes))
            .expect("request body")
    } else {
        builder.body(Body::empty()).expect("request body")
    }
}

pub(crate) fn upload_request(roll_number: &str, filename: &str, pdf: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"roll_number\"\r\n\r\n{roll_number}\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(
        format!(
            "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(pdf);
    body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/api/v1/students")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"))
        .body(Body::from(body))
        .expect("upload request")
}

pub(crate) async fn read_json(response: axum::response::Response<Body>) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("response body");
    serde_json::from_slice(&body).unwrap_or_else(|err| {
        let body_text = String::from_utf8_lossy(&body);
        panic!("json parse: {err}; body: {body_text}");
    })
}

pub(crate) async fn read_text(response: axum::response::Response<Body>) -> String {
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("response body");
    String::from_utf8(body.to_vec()).expect("utf-8 body")
}

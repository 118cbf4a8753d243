use axum::{
    extract::{Path, State},
    routing::{get, patch},
    Json, Router,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::schemas::result::{EvaluationResultResponse, ResultCorrection, SummaryResponse};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_results))
        .route("/summary", get(summary))
        .route("/:roll_number", get(get_result))
        .route("/:roll_number/questions/:question_id", patch(correct_result))
}

async fn list_results(State(state): State<AppState>) -> Json<Vec<EvaluationResultResponse>> {
    let session = state.session().lock().await;
    Json(session.results().iter().map(EvaluationResultResponse::from).collect())
}

async fn get_result(
    Path(roll_number): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<EvaluationResultResponse>, ApiError> {
    let session = state.session().lock().await;
    let result = session
        .result(&roll_number)
        .ok_or_else(|| ApiError::NotFound(format!("No evaluation result for student {roll_number}")))?;
    Ok(Json(EvaluationResultResponse::from(result)))
}

async fn correct_result(
    Path((roll_number, question_id)): Path<(String, String)>,
    State(state): State<AppState>,
    Json(payload): Json<ResultCorrection>,
) -> Result<Json<EvaluationResultResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    if payload.score.is_none() && payload.feedback.is_none() {
        return Err(ApiError::BadRequest("Provide a score or feedback to update".to_string()));
    }

    let mut session = state.session().lock().await;
    let result =
        session.correct_result(&roll_number, &question_id, payload.score, payload.feedback)?;
    Ok(Json(EvaluationResultResponse::from(result)))
}

async fn summary(State(state): State<AppState>) -> Json<SummaryResponse> {
    let session = state.session().lock().await;
    let failed_students = session.results().iter().filter(|result| result.error().is_some()).count();
    Json(SummaryResponse {
        evaluated_students: session.results().len() - failed_students,
        failed_students,
        questions: session.summary(),
    })
}

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::session::{EvaluationScope, Readiness};
use crate::tasks::evaluation::{run_evaluation, RunReport};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/readiness", get(readiness))
        .route("/run", post(run_all))
        .route("/run/:roll_number", post(run_one))
}

async fn readiness(State(state): State<AppState>) -> Json<Readiness> {
    Json(state.session().lock().await.readiness())
}

async fn run_all(State(state): State<AppState>) -> Result<Json<RunReport>, ApiError> {
    Ok(Json(run_evaluation(&state, EvaluationScope::All).await?))
}

async fn run_one(
    Path(roll_number): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<RunReport>, ApiError> {
    Ok(Json(run_evaluation(&state, EvaluationScope::Student(roll_number)).await?))
}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::models::criteria_by_id;
use crate::schemas::rubric::{
    CriterionResponse, CriterionUpsert, QuestionResponse, QuestionUpsert, QuestionUpsertResponse,
    RubricResponse,
};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_rubric).post(save_rubric))
        .route("/questions", get(list_questions).post(upsert_question))
        .route("/questions/:question_id", delete(delete_question))
        .route("/criteria", get(list_criteria).post(upsert_criterion))
        .route("/criteria/:criterion_id", delete(delete_criterion))
}

async fn list_questions(State(state): State<AppState>) -> Json<Vec<QuestionResponse>> {
    let session = state.session().lock().await;
    Json(session.questions().iter().map(|(id, rubric)| QuestionResponse::new(id, rubric)).collect())
}

async fn upsert_question(
    State(state): State<AppState>,
    Json(payload): Json<QuestionUpsert>,
) -> Result<Json<QuestionUpsertResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let mut session = state.session().lock().await;
    let replaced =
        session.upsert_question(&payload.question_id, &payload.question, &payload.standard_answer)?;

    let question_id = payload.question_id.trim();
    let rubric = session
        .questions()
        .get(question_id)
        .ok_or_else(|| ApiError::internal(question_id, "Question missing after upsert"))?;
    tracing::info!(question_id, replaced, "Rubric question saved");

    Ok(Json(QuestionUpsertResponse { question: QuestionResponse::new(question_id, rubric), replaced }))
}

async fn delete_question(
    Path(question_id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    state.session().lock().await.delete_question(&question_id)?;
    tracing::info!(question_id = %question_id, "Rubric question deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn list_criteria(State(state): State<AppState>) -> Json<Vec<CriterionResponse>> {
    let session = state.session().lock().await;
    Json(
        criteria_by_id(session.criteria())
            .into_iter()
            .map(|(id, criterion)| CriterionResponse::new(id, criterion))
            .collect(),
    )
}

async fn upsert_criterion(
    State(state): State<AppState>,
    Json(payload): Json<CriterionUpsert>,
) -> Result<Json<CriterionResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let mut session = state.session().lock().await;
    let criterion_id = session.upsert_criterion(
        payload.criterion_id.as_deref(),
        &payload.title,
        &payload.explanation,
    )?;
    let criteria = criteria_by_id(session.criteria());
    let criterion = criteria
        .get(&criterion_id)
        .ok_or_else(|| ApiError::internal(&criterion_id, "Criterion missing after upsert"))?;
    tracing::info!(criterion_id = %criterion_id, "Rubric criterion saved");

    Ok(Json(CriterionResponse::new(criterion_id.clone(), criterion)))
}

async fn delete_criterion(
    Path(criterion_id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    state.session().lock().await.delete_criterion(&criterion_id)?;
    tracing::info!(criterion_id = %criterion_id, "Rubric criterion deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn get_rubric(State(state): State<AppState>) -> Result<Json<RubricResponse>, ApiError> {
    let session = state.session().lock().await;
    let rubric =
        session.rubric().ok_or_else(|| ApiError::NotFound("Rubric has not been saved".to_string()))?;
    Ok(Json(RubricResponse::from(rubric)))
}

async fn save_rubric(State(state): State<AppState>) -> Result<Json<RubricResponse>, ApiError> {
    let mut session = state.session().lock().await;
    let rubric = session.save_rubric()?;
    tracing::info!(
        questions = rubric.questions().len(),
        criteria = rubric.criteria().len(),
        "Rubric saved"
    );
    Ok(Json(RubricResponse::from(rubric)))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::test_support;

    #[tokio::test]
    async fn questions_upsert_list_and_delete() {
        let ctx = test_support::setup_test_context().await;

        for (id, text) in [("Q1", "What is DNS?"), ("Q2", "What is ARP?"), ("Q1", "Explain DNS.")] {
            let response = ctx
                .app
                .clone()
                .oneshot(test_support::json_request(
                    Method::POST,
                    "/api/v1/rubric/questions",
                    Some(json!({"question_id": id, "question": text, "standard_answer": "..."})),
                ))
                .await
                .expect("upsert");
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(Method::GET, "/api/v1/rubric/questions", None))
            .await
            .expect("list");
        let listed = test_support::read_json(response).await;
        assert_eq!(listed[0]["question_id"], "Q1");
        assert_eq!(listed[0]["question"], "Explain DNS.");
        assert_eq!(listed[1]["question_id"], "Q2");

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(Method::DELETE, "/api/v1/rubric/questions/Q1", None))
            .await
            .expect("delete");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = ctx
            .app
            .oneshot(test_support::json_request(Method::DELETE, "/api/v1/rubric/questions/Q1", None))
            .await
            .expect("delete again");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn blank_question_fields_are_rejected() {
        let ctx = test_support::setup_test_context().await;

        let response = ctx
            .app
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/rubric/questions",
                Some(json!({"question_id": "Q1", "question": "", "standard_answer": "x"})),
            ))
            .await
            .expect("upsert");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn criteria_renumber_after_delete() {
        let ctx = test_support::setup_test_context().await;

        for title in ["Accuracy", "Clarity", "Depth"] {
            let response = ctx
                .app
                .clone()
                .oneshot(test_support::json_request(
                    Method::POST,
                    "/api/v1/rubric/criteria",
                    Some(json!({"title": title, "explanation": format!("{title} matters")})),
                ))
                .await
                .expect("add criterion");
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(Method::DELETE, "/api/v1/rubric/criteria/R1", None))
            .await
            .expect("delete");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(Method::GET, "/api/v1/rubric/criteria", None))
            .await
            .expect("list");
        let listed = test_support::read_json(response).await;
        assert_eq!(listed[0]["criterion_id"], "R1");
        assert_eq!(listed[0]["title"], "Clarity");
        assert_eq!(listed[1]["criterion_id"], "R2");

        let response = ctx
            .app
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/rubric/criteria",
                Some(json!({"criterion_id": "R2", "title": "Insight", "explanation": "Goes deep"})),
            ))
            .await
            .expect("replace");
        let replaced = test_support::read_json(response).await;
        assert_eq!(replaced["criterion_id"], "R2");
        assert_eq!(replaced["title"], "Insight");
    }

    #[tokio::test]
    async fn rubric_save_requires_content_and_returns_snapshot() {
        let ctx = test_support::setup_test_context().await;

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(Method::POST, "/api/v1/rubric", None))
            .await
            .expect("save empty");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(Method::GET, "/api/v1/rubric", None))
            .await
            .expect("get unsaved");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        {
            let mut session = ctx.state.session().lock().await;
            session.upsert_question("Q1", "What is a socket?", "An endpoint").expect("Q1");
            session.upsert_criterion(None, "Accuracy", "Correct").expect("R1");
        }

        let response = ctx
            .app
            .oneshot(test_support::json_request(Method::POST, "/api/v1/rubric", None))
            .await
            .expect("save");
        assert_eq!(response.status(), StatusCode::OK);
        let rubric = test_support::read_json(response).await;
        assert_eq!(rubric["questions"]["Q1"]["standard_answer"], "An endpoint");
        assert_eq!(rubric["criteria"]["R1"]["title"], "Accuracy");
    }
}

use axum::{extract::State, routing::delete, Json, Router};

use crate::core::state::AppState;
use crate::schemas::MessageResponse;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", delete(reset_session))
}

async fn reset_session(State(state): State<AppState>) -> Json<MessageResponse> {
    let mut session = state.session().lock().await;
    let students = session.students().len();
    let results = session.results().len();
    session.reset();
    drop(session);

    tracing::info!(students, results, "Session reset");
    Json(MessageResponse { message: "Session reset".to_string() })
}

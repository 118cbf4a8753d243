use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::services::export::ExportFormat;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/detailed", get(export_detailed))
        .route("/pivot", get(export_pivot))
        .route("/json", get(export_json))
}

async fn export_detailed(State(state): State<AppState>) -> Result<Response, ApiError> {
    download(&state, ExportFormat::Detailed).await
}

async fn export_pivot(State(state): State<AppState>) -> Result<Response, ApiError> {
    download(&state, ExportFormat::Pivot).await
}

async fn export_json(State(state): State<AppState>) -> Result<Response, ApiError> {
    download(&state, ExportFormat::Json).await
}

async fn download(state: &AppState, format: ExportFormat) -> Result<Response, ApiError> {
    let session = state.session().lock().await;
    if session.results().is_empty() {
        return Err(ApiError::NotFound("No evaluation results to export".to_string()));
    }
    let body = format
        .render(session.results())
        .map_err(|e| ApiError::internal(e, "Failed to render export"))?;
    let rows = session.results().len();
    drop(session);

    let file_name = format.file_name(&state.settings().export().file_prefix);
    metrics::counter!("exports_total", "format" => format.as_str()).increment(1);
    tracing::info!(format = format.as_str(), students = rows, file_name = %file_name, "Export rendered");

    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{file_name}\"")),
        ],
        body,
    )
        .into_response())
}

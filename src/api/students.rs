use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use bytes::{Bytes, BytesMut};

use crate::api::errors::ApiError;
use crate::api::validation::{sanitized_filename, validate_pdf_upload};
use crate::core::state::AppState;
use crate::schemas::student::StudentResponse;

/// Multipart framing overhead allowed on top of the file size limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub(crate) fn router(max_upload_bytes: u64) -> Router<AppState> {
    let body_limit = usize::try_from(max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/", get(list_students).post(upload_student))
        .layer(DefaultBodyLimit::max(body_limit))
}

async fn list_students(State(state): State<AppState>) -> Json<Vec<StudentResponse>> {
    let session = state.session().lock().await;
    Json(session.students().iter().map(StudentResponse::from).collect())
}

async fn upload_student(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<StudentResponse>), ApiError> {
    let max_mb = state.settings().storage().max_upload_size_mb;
    let max_bytes = state.settings().storage().max_upload_bytes();

    let mut file_bytes: Option<Bytes> = None;
    let mut filename: Option<String> = None;
    let mut roll_number: Option<String> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Invalid multipart data".to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == "file" {
            filename = field.file_name().map(|s| s.to_string());
            let mut bytes = BytesMut::new();
            while let Some(chunk) = field
                .chunk()
                .await
                .map_err(|_| ApiError::BadRequest("Failed to read file".to_string()))?
            {
                let next_size = bytes.len() as u64 + chunk.len() as u64;
                if next_size > max_bytes {
                    return Err(ApiError::BadRequest(format!(
                        "File size exceeds {max_mb}MB limit"
                    )));
                }
                bytes.extend_from_slice(&chunk);
            }
            file_bytes = Some(bytes.freeze());
        } else if name == "roll_number" {
            let text = field
                .text()
                .await
                .map_err(|_| ApiError::BadRequest("Invalid roll number".to_string()))?;
            roll_number = Some(text);
        }
    }

    let file_bytes =
        file_bytes.ok_or_else(|| ApiError::BadRequest("File is required".to_string()))?;
    let roll_number =
        roll_number.ok_or_else(|| ApiError::BadRequest("roll_number is required".to_string()))?;
    let filename = sanitized_filename(filename.as_deref().unwrap_or(""));

    validate_pdf_upload(&filename, file_bytes.len())?;

    let mut session = state.session().lock().await;
    let student = session.add_student(&roll_number, &filename, file_bytes)?;
    let response = StudentResponse::from(student);
    drop(session);

    tracing::info!(
        roll_number = %response.roll_number,
        pdf_filename = %response.pdf_filename,
        pdf_size = response.pdf_size,
        "Student submission uploaded"
    );

    Ok((StatusCode::CREATED, Json(response)))
}

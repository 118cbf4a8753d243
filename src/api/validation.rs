use std::path::Path;

use crate::api::errors::ApiError;

/// Accepts files with a `.pdf` extension and a non-empty body.
pub(crate) fn validate_pdf_upload(filename: &str, size: usize) -> Result<(), ApiError> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .ok_or_else(|| ApiError::BadRequest("File must have a .pdf extension".to_string()))?;

    if extension != "pdf" {
        return Err(ApiError::BadRequest(format!(
            "File extension '{extension}' is not allowed; upload a PDF"
        )));
    }

    if size == 0 {
        return Err(ApiError::BadRequest("Uploaded file is empty".to_string()));
    }

    Ok(())
}

/// Keeps the final path component and drops characters that break headers.
pub(crate) fn sanitized_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let cleaned: String =
        base.chars().filter(|ch| !ch.is_control() && *ch != '"').collect::<String>();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        "submission.pdf".to_string()
    } else {
        cleaned.to_string()
    }
}

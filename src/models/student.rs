use bytes::Bytes;
use serde::Serialize;

/// A student submission. The PDF payload is reference counted, so results can
/// hold the student without copying the upload.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct Student {
    pub(crate) name: String,
    pub(crate) roll_number: String,
    pub(crate) pdf_filename: String,
    #[serde(skip)]
    pub(crate) pdf_bytes: Bytes,
}

impl Student {
    pub(crate) fn new(roll_number: String, pdf_filename: String, pdf_bytes: Bytes) -> Self {
        Self { name: format!("Student-{roll_number}"), roll_number, pdf_filename, pdf_bytes }
    }

    pub(crate) fn pdf_size(&self) -> usize {
        self.pdf_bytes.len()
    }
}

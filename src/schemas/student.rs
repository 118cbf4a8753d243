use serde::Serialize;

use crate::models::Student;

#[derive(Debug, Clone, Serialize)]
pub(crate) struct StudentResponse {
    pub(crate) name: String,
    pub(crate) roll_number: String,
    pub(crate) pdf_filename: String,
    pub(crate) pdf_size: usize,
}

impl From<&Student> for StudentResponse {
    fn from(student: &Student) -> Self {
        Self {
            name: student.name.clone(),
            roll_number: student.roll_number.clone(),
            pdf_filename: student.pdf_filename.clone(),
            pdf_size: student.pdf_size(),
        }
    }
}

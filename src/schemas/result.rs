use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_offset;
use crate::models::{EvaluationOutcome, EvaluationResult};
use crate::schemas::student::StudentResponse;
use crate::session::QuestionSummary;

#[derive(Debug, Serialize)]
pub(crate) struct EvaluationResultResponse {
    pub(crate) student: StudentResponse,
    pub(crate) scores: IndexMap<String, f64>,
    pub(crate) feedback: IndexMap<String, String>,
    pub(crate) overall_feedback: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<String>,
    pub(crate) raw_response: EvaluationOutcome,
    pub(crate) evaluated_at: String,
}

impl From<&EvaluationResult> for EvaluationResultResponse {
    fn from(result: &EvaluationResult) -> Self {
        Self {
            student: StudentResponse::from(result.student()),
            scores: result.grades().map(|(id, grade)| (id.to_string(), grade.score)).collect(),
            feedback: result
                .grades()
                .map(|(id, grade)| (id.to_string(), grade.feedback.clone()))
                .collect(),
            overall_feedback: result.overall_feedback().to_string(),
            error: result.error().map(str::to_string),
            raw_response: result.raw_response().clone(),
            evaluated_at: format_offset(result.evaluated_at()),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ResultCorrection {
    #[serde(default)]
    #[validate(range(min = 0.0, max = 10.0, message = "score must be between 0 and 10"))]
    pub(crate) score: Option<f64>,
    #[serde(default)]
    pub(crate) feedback: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SummaryResponse {
    pub(crate) evaluated_students: usize,
    pub(crate) failed_students: usize,
    pub(crate) questions: Vec<QuestionSummary>,
}

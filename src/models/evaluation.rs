use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::models::Student;

pub(crate) const UNKNOWN_QUESTION: &str = "Unknown question";
pub(crate) const EVALUATION_FAILED_FEEDBACK: &str = "Error occurred during evaluation.";

/// One normalized per-question entry of an evaluation outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct EvaluatedQuestion {
    pub(crate) question_id: String,
    pub(crate) question: String,
    pub(crate) score: f64,
    pub(crate) feedback: String,
}

/// Normalized result of one AI evaluation call, independent of the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct EvaluationOutcome {
    pub(crate) results: Vec<EvaluatedQuestion>,
    pub(crate) overall_feedback: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<String>,
}

impl EvaluationOutcome {
    pub(crate) fn failed(error: impl Into<String>) -> Self {
        Self {
            results: Vec::new(),
            overall_feedback: EVALUATION_FAILED_FEEDBACK.to_string(),
            error: Some(error.into()),
        }
    }

    pub(crate) fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct QuestionGrade {
    pub(crate) score: f64,
    pub(crate) feedback: String,
}

/// Evaluation of one student. Score and feedback share a single entry per
/// question, so every graded question always has both.
#[derive(Debug, Clone)]
pub(crate) struct EvaluationResult {
    student: Student,
    grades: IndexMap<String, QuestionGrade>,
    overall_feedback: String,
    raw_response: EvaluationOutcome,
    evaluated_at: OffsetDateTime,
}

impl EvaluationResult {
    pub(crate) fn from_outcome(
        student: Student,
        outcome: EvaluationOutcome,
        evaluated_at: OffsetDateTime,
    ) -> Self {
        let mut grades = IndexMap::new();
        for entry in &outcome.results {
            if entry.question_id.is_empty() {
                continue;
            }
            grades.insert(
                entry.question_id.clone(),
                QuestionGrade { score: entry.score, feedback: entry.feedback.clone() },
            );
        }

        Self {
            student,
            grades,
            overall_feedback: outcome.overall_feedback.clone(),
            raw_response: outcome,
            evaluated_at,
        }
    }

    pub(crate) fn student(&self) -> &Student {
        &self.student
    }

    pub(crate) fn roll_number(&self) -> &str {
        &self.student.roll_number
    }

    pub(crate) fn grades(&self) -> impl Iterator<Item = (&str, &QuestionGrade)> {
        self.grades.iter().map(|(id, grade)| (id.as_str(), grade))
    }

    pub(crate) fn grade(&self, question_id: &str) -> Option<&QuestionGrade> {
        self.grades.get(question_id)
    }

    pub(crate) fn question_count(&self) -> usize {
        self.grades.len()
    }

    pub(crate) fn overall_feedback(&self) -> &str {
        &self.overall_feedback
    }

    pub(crate) fn error(&self) -> Option<&str> {
        self.raw_response.error.as_deref()
    }

    pub(crate) fn raw_response(&self) -> &EvaluationOutcome {
        &self.raw_response
    }

    pub(crate) fn evaluated_at(&self) -> OffsetDateTime {
        self.evaluated_at
    }

    /// Applies a reviewer correction to an already graded question.
    /// Returns `false` when the question was not part of this evaluation.
    pub(crate) fn correct(
        &mut self,
        question_id: &str,
        score: Option<f64>,
        feedback: Option<String>,
    ) -> bool {
        let Some(grade) = self.grades.get_mut(question_id) else {
            return false;
        };
        if let Some(score) = score {
            grade.score = score;
        }
        if let Some(feedback) = feedback {
            grade.feedback = feedback;
        }
        true
    }
}

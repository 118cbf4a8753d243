use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{criteria_by_id, QuestionRubric, Rubric, RubricCriteria};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuestionUpsert {
    #[serde(alias = "questionId")]
    #[validate(length(min = 1, max = 64, message = "question_id must be 1-64 characters"))]
    pub(crate) question_id: String,
    #[validate(length(min = 1, message = "question must not be empty"))]
    pub(crate) question: String,
    #[serde(alias = "standardAnswer")]
    #[validate(length(min = 1, message = "standard_answer must not be empty"))]
    pub(crate) standard_answer: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionResponse {
    pub(crate) question_id: String,
    pub(crate) question: String,
    pub(crate) standard_answer: String,
}

impl QuestionResponse {
    pub(crate) fn new(question_id: &str, rubric: &QuestionRubric) -> Self {
        Self {
            question_id: question_id.to_string(),
            question: rubric.question.clone(),
            standard_answer: rubric.standard_answer.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionUpsertResponse {
    #[serde(flatten)]
    pub(crate) question: QuestionResponse,
    pub(crate) replaced: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CriterionUpsert {
    #[serde(default)]
    #[serde(alias = "criterionId")]
    pub(crate) criterion_id: Option<String>,
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: String,
    #[validate(length(min = 1, message = "explanation must not be empty"))]
    pub(crate) explanation: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct CriterionResponse {
    pub(crate) criterion_id: String,
    pub(crate) title: String,
    pub(crate) explanation: String,
}

impl CriterionResponse {
    pub(crate) fn new(criterion_id: String, criterion: &RubricCriteria) -> Self {
        Self {
            criterion_id,
            title: criterion.title.clone(),
            explanation: criterion.explanation.clone(),
        }
    }
}

/// Saved rubric with questions keyed by id and criteria keyed by display id.
#[derive(Debug, Serialize)]
pub(crate) struct RubricResponse {
    pub(crate) questions: IndexMap<String, QuestionRubric>,
    pub(crate) criteria: IndexMap<String, RubricCriteria>,
}

impl From<&Rubric> for RubricResponse {
    fn from(rubric: &Rubric) -> Self {
        Self {
            questions: rubric.questions().clone(),
            criteria: criteria_by_id(rubric.criteria())
                .into_iter()
                .map(|(id, criterion)| (id, criterion.clone()))
                .collect(),
        }
    }
}

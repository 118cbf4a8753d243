//! In-memory grading session: uploaded students, the rubric being edited,
//! the saved rubric snapshot and evaluation results.

use bytes::Bytes;
use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;

use crate::models::{
    criterion_id, criterion_position, EvaluationResult, QuestionMap, QuestionRubric, Rubric,
    RubricCriteria, Student,
};


pub(crate) const MAX_SCORE: f64 = 10.0;

#[derive(Debug, Error)]
pub(crate) enum SessionError {
    #[error("{0}")]
    Invalid(String),
    #[error("Student with roll number {0} already uploaded")]
    DuplicateStudent(String),
    #[error("Student {0} not found")]
    StudentNotFound(String),
    #[error("Question {0} not found")]
    QuestionNotFound(String),
    #[error("Criterion {0} not found")]
    CriterionNotFound(String),
    #[error("No evaluation result for student {0}")]
    ResultNotFound(String),
    #[error("Session is not ready for evaluation; missing: {}", join_missing(.0))]
    NotReady(Vec<MissingItem>),
    #[error("An evaluation run is already in progress")]
    EvaluationInProgress,
}

fn join_missing(items: &[MissingItem]) -> String {
    items.iter().map(|item| item.label()).collect::<Vec<_>>().join(", ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum MissingItem {
    Students,
    Questions,
    Criteria,
    SavedRubric,
}

impl MissingItem {
    pub(crate) fn label(self) -> &'static str {
        match self {
            MissingItem::Students => "student submissions",
            MissingItem::Questions => "rubric questions",
            MissingItem::Criteria => "rubric criteria",
            MissingItem::SavedRubric => "saved rubric",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct Readiness {
    pub(crate) ready: bool,
    pub(crate) missing: Vec<MissingItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EvaluationScope {
    All,
    Student(String),
}

/// Everything one evaluation run needs, copied out so the lock can be released.
#[derive(Debug, Clone)]
pub(crate) struct EvaluationPlan {
    pub(crate) epoch: u64,
    pub(crate) rubric: Rubric,
    pub(crate) students: Vec<Student>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct QuestionSummary {
    pub(crate) question_id: String,
    pub(crate) average: f64,
    pub(crate) min: f64,
    pub(crate) max: f64,
    pub(crate) count: usize,
}

#[derive(Debug, Default)]
pub(crate) struct Session {
    epoch: u64,
    students: Vec<Student>,
    questions: QuestionMap,
    criteria: Vec<RubricCriteria>,
    rubric: Option<Rubric>,
    results: Vec<EvaluationResult>,
}

impl Session {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Bumped on every reset so runs started before it can detect it.
    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    pub(crate) fn add_student(
        &mut self,
        roll_number: &str,
        pdf_filename: &str,
        pdf_bytes: Bytes,
    ) -> Result<&Student, SessionError> {
        let roll_number = roll_number.trim();
        if roll_number.is_empty() {
            return Err(SessionError::Invalid("Roll number is required".to_string()));
        }
        if pdf_bytes.is_empty() {
            return Err(SessionError::Invalid("Uploaded PDF is empty".to_string()));
        }
        if self.student(roll_number).is_some() {
            return Err(SessionError::DuplicateStudent(roll_number.to_string()));
        }

        self.students.push(Student::new(roll_number.to_string(), pdf_filename.to_string(), pdf_bytes));
        let index = self.students.len() - 1;
        Ok(&self.students[index])
    }

    pub(crate) fn students(&self) -> &[Student] {
        &self.students
    }

    pub(crate) fn student(&self, roll_number: &str) -> Option<&Student> {
        self.students.iter().find(|student| student.roll_number == roll_number)
    }

    /// Returns `true` when an existing question was replaced.
    pub(crate) fn upsert_question(
        &mut self,
        question_id: &str,
        question: &str,
        standard_answer: &str,
    ) -> Result<bool, SessionError> {
        let question_id = question_id.trim();
        if question_id.is_empty() || question.trim().is_empty() || standard_answer.trim().is_empty()
        {
            return Err(SessionError::Invalid(
                "Question ID, question text and standard answer are all required".to_string(),
            ));
        }

        let previous = self.questions.insert(
            question_id.to_string(),
            QuestionRubric {
                question: question.to_string(),
                standard_answer: standard_answer.to_string(),
            },
        );
        Ok(previous.is_some())
    }

    pub(crate) fn delete_question(&mut self, question_id: &str) -> Result<(), SessionError> {
        self.questions
            .shift_remove(question_id)
            .map(|_| ())
            .ok_or_else(|| SessionError::QuestionNotFound(question_id.to_string()))
    }

    pub(crate) fn questions(&self) -> &QuestionMap {
        &self.questions
    }

    /// Replaces the criterion at `display_id` when it names a current
    /// position, otherwise appends. Returns the resulting display id.
    pub(crate) fn upsert_criterion(
        &mut self,
        display_id: Option<&str>,
        title: &str,
        explanation: &str,
    ) -> Result<String, SessionError> {
        if title.trim().is_empty() || explanation.trim().is_empty() {
            return Err(SessionError::Invalid(
                "Criterion title and explanation are required".to_string(),
            ));
        }

        let criterion =
            RubricCriteria { title: title.to_string(), explanation: explanation.to_string() };
        let position = display_id.and_then(|id| criterion_position(id, self.criteria.len()));

        let position = match position {
            Some(position) => {
                self.criteria[position] = criterion;
                position
            }
            None => {
                self.criteria.push(criterion);
                self.criteria.len() - 1
            }
        };
        Ok(criterion_id(position))
    }

    pub(crate) fn delete_criterion(&mut self, display_id: &str) -> Result<(), SessionError> {
        let position = criterion_position(display_id, self.criteria.len())
            .ok_or_else(|| SessionError::CriterionNotFound(display_id.to_string()))?;
        self.criteria.remove(position);
        Ok(())
    }

    pub(crate) fn criteria(&self) -> &[RubricCriteria] {
        &self.criteria
    }

    pub(crate) fn save_rubric(&mut self) -> Result<&Rubric, SessionError> {
        if self.questions.is_empty() {
            return Err(SessionError::Invalid(
                "Add at least one question before saving the rubric".to_string(),
            ));
        }
        if self.criteria.is_empty() {
            return Err(SessionError::Invalid(
                "Add at least one criterion before saving the rubric".to_string(),
            ));
        }

        Ok(self.rubric.insert(Rubric::new(self.questions.clone(), self.criteria.clone())))
    }

    pub(crate) fn rubric(&self) -> Option<&Rubric> {
        self.rubric.as_ref()
    }

    pub(crate) fn readiness(&self) -> Readiness {
        let mut missing = Vec::new();
        if self.students.is_empty() {
            missing.push(MissingItem::Students);
        }
        if self.questions.is_empty() {
            missing.push(MissingItem::Questions);
        }
        if self.criteria.is_empty() {
            missing.push(MissingItem::Criteria);
        }
        if self.rubric.is_none() {
            missing.push(MissingItem::SavedRubric);
        }
        Readiness { ready: missing.is_empty(), missing }
    }

    /// Checks readiness, drops the results the run will replace and returns
    /// what the run should evaluate. The saved rubric only gates the run; the
    /// questions and criteria come from the live rubric.
    pub(crate) fn plan_evaluation(
        &mut self,
        scope: &EvaluationScope,
    ) -> Result<EvaluationPlan, SessionError> {
        let readiness = self.readiness();
        if !readiness.ready {
            return Err(SessionError::NotReady(readiness.missing));
        }
        let rubric = Rubric::new(self.questions.clone(), self.criteria.clone());

        let students = match scope {
            EvaluationScope::All => {
                self.results.clear();
                self.students.clone()
            }
            EvaluationScope::Student(roll_number) => {
                let student = self
                    .student(roll_number)
                    .cloned()
                    .ok_or_else(|| SessionError::StudentNotFound(roll_number.clone()))?;
                self.results.retain(|result| result.roll_number() != roll_number);
                vec![student]
            }
        };

        Ok(EvaluationPlan { epoch: self.epoch, rubric, students })
    }

    /// Replaces any earlier result for the same student.
    pub(crate) fn record_result(&mut self, result: EvaluationResult) {
        self.results.retain(|existing| existing.roll_number() != result.roll_number());
        self.results.push(result);
    }

    pub(crate) fn results(&self) -> &[EvaluationResult] {
        &self.results
    }

    pub(crate) fn result(&self, roll_number: &str) -> Option<&EvaluationResult> {
        self.results.iter().find(|result| result.roll_number() == roll_number)
    }

    pub(crate) fn correct_result(
        &mut self,
        roll_number: &str,
        question_id: &str,
        score: Option<f64>,
        feedback: Option<String>,
    ) -> Result<&EvaluationResult, SessionError> {
        if let Some(score) = score {
            validate_score(score)?;
        }

        let result = self
            .results
            .iter_mut()
            .find(|result| result.roll_number() == roll_number)
            .ok_or_else(|| SessionError::ResultNotFound(roll_number.to_string()))?;

        if !result.correct(question_id, score, feedback) {
            return Err(SessionError::QuestionNotFound(question_id.to_string()));
        }
        tracing::info!(roll_number, question_id, ?score, "Evaluation corrected by reviewer");
        Ok(result)
    }

    /// Per-question score statistics over results without an error, in
    /// first-seen question order.
    pub(crate) fn summary(&self) -> Vec<QuestionSummary> {
        let mut scores: IndexMap<&str, Vec<f64>> = IndexMap::new();
        for result in self.results.iter().filter(|result| result.error().is_none()) {
            for (question_id, grade) in result.grades() {
                scores.entry(question_id).or_default().push(grade.score);
            }
        }

        scores
            .into_iter()
            .map(|(question_id, values)| {
                let count = values.len();
                let total: f64 = values.iter().sum();
                QuestionSummary {
                    question_id: question_id.to_string(),
                    average: total / count as f64,
                    min: values.iter().copied().fold(f64::INFINITY, f64::min),
                    max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                    count,
                }
            })
            .collect()
    }

    pub(crate) fn reset(&mut self) {
        let epoch = self.epoch.wrapping_add(1);
        *self = Self { epoch, ..Self::default() };
    }
}

fn validate_score(score: f64) -> Result<(), SessionError> {
    let in_range = (0.0..=MAX_SCORE).contains(&score);
    let half_step = (score * 2.0).fract() == 0.0;
    if in_range && half_step {
        Ok(())
    } else {
        Err(SessionError::Invalid(format!(
            "Score must be between 0 and {MAX_SCORE} in steps of 0.5, got {score}"
        )))
    }
}

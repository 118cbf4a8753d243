pub(crate) mod evaluation;
pub(crate) mod rubric;
pub(crate) mod student;

pub(crate) use evaluation::{
    EvaluatedQuestion, EvaluationOutcome, EvaluationResult, UNKNOWN_QUESTION,
};
pub(crate) use rubric::{
    criteria_by_id, criterion_id, criterion_position, QuestionMap, QuestionRubric, Rubric, RubricCriteria,
};
pub(crate) use student::Student;

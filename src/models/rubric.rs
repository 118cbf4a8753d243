use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Questions keyed by id, in insertion order. Re-inserting a key keeps its slot.
pub(crate) type QuestionMap = IndexMap<String, QuestionRubric>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct QuestionRubric {
    pub(crate) question: String,
    pub(crate) standard_answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct RubricCriteria {
    pub(crate) title: String,
    pub(crate) explanation: String,
}

/// Display id of the criterion at `position`. Ids are never stored.
pub(crate) fn criterion_id(position: usize) -> String {
    format!("R{}", position + 1)
}

/// Position addressed by a display id such as `R2`, if it exists in a list of `len`.
pub(crate) fn criterion_position(id: &str, len: usize) -> Option<usize> {
    let number: usize = id.trim().strip_prefix('R')?.parse().ok()?;
    (1..=len).contains(&number).then(|| number - 1)
}

/// Criteria keyed by their display id, in position order.
pub(crate) fn criteria_by_id(criteria: &[RubricCriteria]) -> IndexMap<String, &RubricCriteria> {
    criteria
        .iter()
        .enumerate()
        .map(|(position, criterion)| (criterion_id(position), criterion))
        .collect()
}

/// Questions and criteria as one unit, either saved or taken for a run.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Rubric {
    questions: QuestionMap,
    criteria: Vec<RubricCriteria>,
}

impl Rubric {
    pub(crate) fn new(questions: QuestionMap, criteria: Vec<RubricCriteria>) -> Self {
        Self { questions, criteria }
    }

    pub(crate) fn questions(&self) -> &QuestionMap {
        &self.questions
    }

    pub(crate) fn criteria(&self) -> &[RubricCriteria] {
        &self.criteria
    }
}

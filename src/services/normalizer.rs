//! Converts model replies into [`EvaluationOutcome`].
//!
//! A reply that matches the response schema arrives as
//! [`ModelReply::Structured`]; anything else is kept as text and parsed
//! leniently. The two paths differ on unknown question ids: the structured
//! path keeps them under [`UNKNOWN_QUESTION`], the raw path drops them.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::models::{EvaluatedQuestion, EvaluationOutcome, QuestionMap, UNKNOWN_QUESTION};

/// Reply shape requested from the model.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct EvaluationPayload {
    pub(crate) question_evaluations: Vec<QuestionEvaluation>,
    #[serde(default)]
    pub(crate) overall_feedback: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct QuestionEvaluation {
    #[serde(default)]
    pub(crate) question_id: String,
    #[serde(default)]
    pub(crate) score: f64,
    #[serde(default)]
    pub(crate) feedback: String,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ModelReply {
    Structured(EvaluationPayload),
    RawText(String),
}

impl ModelReply {
    /// Text that deserializes into the response schema is treated as structured.
    pub(crate) fn from_text(text: String) -> Self {
        match serde_json::from_str::<EvaluationPayload>(&text) {
            Ok(payload) => ModelReply::Structured(payload),
            Err(_) => ModelReply::RawText(text),
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum NormalizeError {
    #[error("malformed JSON in model reply: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected a JSON object in model reply, got {0}")]
    NotAnObject(&'static str),
}

pub(crate) fn normalize(
    reply: ModelReply,
    questions: &QuestionMap,
) -> Result<EvaluationOutcome, NormalizeError> {
    match reply {
        ModelReply::Structured(payload) => Ok(normalize_structured(payload, questions)),
        ModelReply::RawText(text) => normalize_raw(&text, questions),
    }
}

fn normalize_structured(payload: EvaluationPayload, questions: &QuestionMap) -> EvaluationOutcome {
    let results = payload
        .question_evaluations
        .into_iter()
        .filter(|evaluation| !evaluation.question_id.trim().is_empty())
        .map(|evaluation| {
            let question = questions
                .get(&evaluation.question_id)
                .map(|rubric| rubric.question.clone())
                .unwrap_or_else(|| UNKNOWN_QUESTION.to_string());
            EvaluatedQuestion {
                question_id: evaluation.question_id,
                question,
                score: non_negative(evaluation.score),
                feedback: evaluation.feedback,
            }
        })
        .collect();

    EvaluationOutcome { results, overall_feedback: payload.overall_feedback, error: None }
}

fn normalize_raw(text: &str, questions: &QuestionMap) -> Result<EvaluationOutcome, NormalizeError> {
    let value: Value = serde_json::from_str(text)?;
    let object = value.as_object().ok_or_else(|| NormalizeError::NotAnObject(kind(&value)))?;

    let overall_feedback = object
        .get("overall_feedback")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let evaluations = object
        .get("question_evaluations")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut results = Vec::with_capacity(evaluations.len());
    for item in evaluations {
        let Some(question_id) = item.get("question_id").and_then(Value::as_str) else {
            continue;
        };
        let Some(rubric) = questions.get(question_id) else {
            tracing::debug!(question_id, "Dropping evaluation for a question outside the rubric");
            continue;
        };

        results.push(EvaluatedQuestion {
            question_id: question_id.to_string(),
            question: rubric.question.clone(),
            score: item.get("score").and_then(Value::as_f64).map(non_negative).unwrap_or(0.0),
            feedback: item.get("feedback").and_then(Value::as_str).unwrap_or_default().to_string(),
        });
    }

    Ok(EvaluationOutcome { results, overall_feedback, error: None })
}

fn non_negative(score: f64) -> f64 {
    if score.is_finite() && score > 0.0 {
        score
    } else {
        0.0
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

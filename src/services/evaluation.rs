//! AI evaluation of a single student PDF.
//!
//! [`EvaluationClient::evaluate`] never fails: configuration, transport and
//! parsing problems all come back as an [`EvaluationOutcome`] carrying an
//! error message.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::config::{ConfigError, Settings};
use crate::models::{EvaluationOutcome, QuestionMap, RubricCriteria};
use crate::services::gemini::{GeminiConfig, GeminiModel};
use crate::services::normalizer::{normalize, ModelReply, NormalizeError};
use crate::services::prompt::build_prompt;

pub(crate) struct GenerateRequest<'a> {
    pub(crate) prompt: &'a str,
    pub(crate) pdf_bytes: &'a [u8],
}

/// A generative model that reads a PDF and a prompt and answers with text.
#[async_trait]
pub(crate) trait GenerativeModel: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, request: GenerateRequest<'_>) -> Result<ModelReply, EvaluationError>;
}

#[derive(Debug, Error)]
pub(crate) enum EvaluationError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Student PDF is empty.")]
    EmptyPdf,
    #[error("Rubric has no questions to evaluate.")]
    NoQuestions,
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("model returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model reply is missing {0}")]
    MissingContent(&'static str),
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
}

impl EvaluationError {
    /// Message stored on a failed outcome.
    fn outcome_message(&self) -> String {
        match self {
            EvaluationError::Config(_) | EvaluationError::EmptyPdf | EvaluationError::NoQuestions => {
                self.to_string()
            }
            other => format!("Failed to process with Gemini: {other}"),
        }
    }
}

#[derive(Clone)]
pub(crate) struct EvaluationClient {
    backend: Result<Arc<dyn GenerativeModel>, ConfigError>,
}

impl EvaluationClient {
    /// A missing API key is not fatal here; every evaluation reports it instead.
    pub(crate) fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let backend = match GeminiConfig::from_settings(settings) {
            Ok(config) => {
                let model = GeminiModel::new(config)?;
                tracing::info!(model = %model.name(), "Gemini evaluation client configured");
                Ok(Arc::new(model) as Arc<dyn GenerativeModel>)
            }
            Err(err) => {
                tracing::warn!(error = %err, "Gemini evaluation client not configured");
                Err(err)
            }
        };

        Ok(Self { backend })
    }

    pub(crate) fn with_model(model: Arc<dyn GenerativeModel>) -> Self {
        Self { backend: Ok(model) }
    }

    pub(crate) fn is_configured(&self) -> bool {
        self.backend.is_ok()
    }

    pub(crate) fn model_name(&self) -> Option<&str> {
        self.backend.as_ref().ok().map(|model| model.name())
    }

    pub(crate) async fn evaluate(
        &self,
        pdf_bytes: &[u8],
        questions: &QuestionMap,
        criteria: &[RubricCriteria],
    ) -> EvaluationOutcome {
        match self.try_evaluate(pdf_bytes, questions, criteria).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(error = %err, "Evaluation failed");
                EvaluationOutcome::failed(err.outcome_message())
            }
        }
    }

    pub(crate) async fn try_evaluate(
        &self,
        pdf_bytes: &[u8],
        questions: &QuestionMap,
        criteria: &[RubricCriteria],
    ) -> Result<EvaluationOutcome, EvaluationError> {
        let model = self.backend.as_ref().map_err(|err| EvaluationError::Config(err.clone()))?;
        if pdf_bytes.is_empty() {
            return Err(EvaluationError::EmptyPdf);
        }
        if questions.is_empty() {
            return Err(EvaluationError::NoQuestions);
        }

        let prompt = build_prompt(criteria, questions);
        tracing::debug!(
            model = %model.name(),
            prompt_chars = prompt.len(),
            pdf_bytes = pdf_bytes.len(),
            questions = questions.len(),
            "Requesting evaluation"
        );

        let reply = model.generate(GenerateRequest { prompt: &prompt, pdf_bytes }).await?;
        Ok(normalize(reply, questions)?)
    }
}

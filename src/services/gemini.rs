use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use serde_json::{json, Value};

use crate::core::config::{ConfigError, Settings};
use crate::services::evaluation::{EvaluationError, GenerateRequest, GenerativeModel};
use crate::services::normalizer::ModelReply;

const PDF_MIME_TYPE: &str = "application/pdf";

#[derive(Debug, Clone)]
pub(crate) struct GeminiConfig {
    api_key: String,
    base_url: String,
    model: String,
    temperature: Option<f64>,
    timeout: Option<Duration>,
}

impl GeminiConfig {
    /// Fails when the API key is absent; no request is ever attempted without it.
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let ai = settings.ai();
        let api_key = ai.gemini_api_key.clone().ok_or(ConfigError::MissingSecret("GEMINI_API_KEY"))?;

        Ok(Self {
            api_key,
            base_url: ai.gemini_base_url.trim_end_matches('/').to_string(),
            model: ai.ai_model.clone(),
            temperature: ai.ai_temperature,
            timeout: ai.ai_request_timeout.map(Duration::from_secs),
        })
    }
}

#[derive(Debug, Clone)]
pub(crate) struct GeminiModel {
    client: Client,
    config: GeminiConfig,
}

impl GeminiModel {
    pub(crate) fn new(config: GeminiConfig) -> anyhow::Result<Self> {
        let mut builder = Client::builder().connect_timeout(Duration::from_secs(30));
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to build Gemini HTTP client")?;

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.config.base_url, self.config.model)
    }

    fn payload(&self, request: &GenerateRequest<'_>) -> Value {
        let mut generation_config = json!({
            "responseMimeType": "application/json",
            "responseSchema": response_schema(),
        });
        if let Some(temperature) = self.config.temperature {
            generation_config["temperature"] = json!(temperature);
        }

        json!({
            "contents": [{
                "role": "user",
                "parts": [
                    {"inlineData": {"mimeType": PDF_MIME_TYPE, "data": STANDARD.encode(request.pdf_bytes)}},
                    {"text": request.prompt}
                ]
            }],
            "generationConfig": generation_config
        })
    }
}

#[async_trait]
impl GenerativeModel for GeminiModel {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, request: GenerateRequest<'_>) -> Result<ModelReply, EvaluationError> {
        let payload = self.payload(&request);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EvaluationError::Status { status: status.as_u16(), body });
        }

        let body: Value = response.json().await?;
        let text = reply_text(&body)?;

        if let Some(tokens) = body
            .get("usageMetadata")
            .and_then(|usage| usage.get("totalTokenCount"))
            .and_then(Value::as_u64)
        {
            tracing::debug!(model = %self.config.model, tokens_used = tokens, "Gemini usage");
        }

        Ok(ModelReply::from_text(text))
    }
}

/// Concatenated text parts of the first candidate.
fn reply_text(body: &Value) -> Result<String, EvaluationError> {
    let parts = body
        .get("candidates")
        .and_then(|candidates| candidates.get(0))
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)
        .ok_or(EvaluationError::MissingContent("candidates[0].content.parts"))?;

    let text: String =
        parts.iter().filter_map(|part| part.get("text").and_then(Value::as_str)).collect();

    if text.trim().is_empty() {
        return Err(EvaluationError::MissingContent("text"));
    }
    Ok(text)
}

fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "question_evaluations": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "question_id": {"type": "STRING"},
                        "score": {"type": "NUMBER"},
                        "feedback": {"type": "STRING"}
                    },
                    "required": ["question_id", "score", "feedback"]
                }
            },
            "overall_feedback": {"type": "STRING"}
        },
        "required": ["question_evaluations", "overall_feedback"]
    })
}

//! OpenAI-compatible chat-completions client producing survey skeletons.

use std::sync::Arc;

use async_trait::async_trait;
use canvass_api_types::SurveyDraft;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::application::generation::{GenerationRequest, GeneratorError, SurveyGenerator};
use crate::config::GeneratorSettings;

use super::error::InfraError;

/// Generator used when no API key is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledGenerator;

#[async_trait]
impl SurveyGenerator for DisabledGenerator {
    async fn generate(&self, _request: &GenerationRequest) -> Result<SurveyDraft, GeneratorError> {
        Err(GeneratorError::NotConfigured)
    }
}

#[derive(Clone)]
pub struct OpenAiGenerator {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
    model: String,
}

impl OpenAiGenerator {
    pub fn new(settings: &GeneratorSettings, api_key: String) -> Result<Self, InfraError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|err| InfraError::HttpClient(err.to_string()))?;
        let endpoint = settings
            .base_url
            .join("chat/completions")
            .map_err(|err| InfraError::configuration(format!("generator.base_url: {err}")))?;
        Ok(Self {
            client,
            endpoint,
            api_key,
            model: settings.model.clone(),
        })
    }
}

/// Picks the OpenAI client when a key is configured.
pub fn from_settings(settings: &GeneratorSettings) -> Result<Arc<dyn SurveyGenerator>, InfraError> {
    match settings.api_key.as_ref() {
        Some(key) => Ok(Arc::new(OpenAiGenerator::new(settings, key.clone())?)),
        None => {
            warn!(
                target: "canvass::generation",
                "No generator API key configured; survey generation is disabled"
            );
            Ok(Arc::new(DisabledGenerator))
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    response_format: ResponseFormat,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[async_trait]
impl SurveyGenerator for OpenAiGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<SurveyDraft, GeneratorError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.instructions,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
            temperature: 0.7,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(GeneratorError::Upstream(format!(
                "status {status}: {}",
                truncate(&detail, 300)
            )));
        }

        let reply: ChatResponse = response.json().await.map_err(classify)?;
        let content = reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| GeneratorError::Malformed("reply has no content".to_string()))?;
        debug!(target: "canvass::generation", bytes = content.len(), "Generator replied");

        parse_draft(&content)
    }
}

fn classify(err: reqwest::Error) -> GeneratorError {
    if err.is_timeout() {
        GeneratorError::Timeout
    } else if err.is_decode() {
        GeneratorError::Malformed(err.to_string())
    } else {
        GeneratorError::Upstream(err.to_string())
    }
}

/// Parses the model output, tolerating a fenced code block around the JSON.
fn parse_draft(content: &str) -> Result<SurveyDraft, GeneratorError> {
    let trimmed = content.trim();
    let json = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);
    serde_json::from_str(json.trim()).map_err(|err| GeneratorError::Malformed(err.to_string()))
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

//! Survey skeletons proposed from a free-text prompt.
//!
//! The generator is an opaque collaborator; this service only shapes the
//! request and validates what comes back before anyone can save it.

use std::sync::Arc;

use async_trait::async_trait;
use canvass_api_types::{OptionDraft, QuestionDraft, SurveyDraft};
use thiserror::Error;
use tracing::{info, instrument};

use crate::application::error::ServiceError;
use crate::application::questions::PreparedQuestion;
use crate::domain::error::DomainError;
use crate::domain::surveys::{normalize_description, normalize_title};

pub const PROMPT_MAX_CHARS: usize = 2_000;
pub const MIN_GENERATED_QUESTIONS: usize = 1;
pub const MAX_GENERATED_QUESTIONS: usize = 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("survey generation is not configured")]
    NotConfigured,
    #[error("generator request failed: {0}")]
    Upstream(String),
    #[error("generator returned an unusable payload: {0}")]
    Malformed(String),
    #[error("generator timed out")]
    Timeout,
}

/// Instructions and the user's request, handed to the model as one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub instructions: String,
    pub prompt: String,
}

#[async_trait]
pub trait SurveyGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<SurveyDraft, GeneratorError>;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error(transparent)]
    InvalidPrompt(DomainError),
    #[error(transparent)]
    Generator(#[from] GeneratorError),
    #[error("generated survey rejected: {0}")]
    InvalidSkeleton(String),
}

impl From<DomainError> for GenerationError {
    fn from(error: DomainError) -> Self {
        Self::InvalidSkeleton(error.to_string())
    }
}

impl From<ServiceError> for GenerationError {
    fn from(error: ServiceError) -> Self {
        Self::InvalidSkeleton(error.to_string())
    }
}

#[derive(Clone)]
pub struct GenerationService {
    generator: Arc<dyn SurveyGenerator>,
}

impl GenerationService {
    pub fn new(generator: Arc<dyn SurveyGenerator>) -> Self {
        Self { generator }
    }

    #[instrument(skip(self, prompt), fields(prompt_chars = prompt.chars().count()))]
    pub async fn generate(&self, prompt: &str) -> Result<SurveyDraft, GenerationError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(GenerationError::InvalidPrompt(DomainError::validation(
                "prompt",
                "prompt is required",
            )));
        }
        if prompt.chars().count() > PROMPT_MAX_CHARS {
            return Err(GenerationError::InvalidPrompt(DomainError::validation(
                "prompt",
                format!("prompt must be at most {PROMPT_MAX_CHARS} characters"),
            )));
        }

        let request = GenerationRequest {
            instructions: INSTRUCTIONS.to_string(),
            prompt: prompt.to_string(),
        };
        let raw = self.generator.generate(&request).await?;
        let draft = normalize_skeleton(&raw)?;
        info!(
            target: "canvass::generation",
            questions = draft.questions.len(),
            "Generated survey skeleton"
        );
        Ok(draft)
    }
}

/// Validates a generated skeleton and fills in option ids.
pub fn normalize_skeleton(raw: &SurveyDraft) -> Result<SurveyDraft, GenerationError> {
    let title = normalize_title(&raw.title)?;
    let description = normalize_description(raw.description.as_deref())?;

    let count = raw.questions.len();
    if !(MIN_GENERATED_QUESTIONS..=MAX_GENERATED_QUESTIONS).contains(&count) {
        return Err(DomainError::validation(
            "questions",
            format!(
                "expected {MIN_GENERATED_QUESTIONS} to {MAX_GENERATED_QUESTIONS} questions, got {count}"
            ),
        )
        .into());
    }

    let questions = raw
        .questions
        .iter()
        .map(|question| {
            PreparedQuestion::from_draft(question).map(|prepared| QuestionDraft {
                question_text: prepared.question_text,
                question_type: prepared.question_type,
                is_required: prepared.is_required,
                options: prepared.options.map(|options| {
                    options
                        .into_iter()
                        .map(|option| OptionDraft {
                            id: Some(option.id),
                            text: option.text,
                        })
                        .collect()
                }),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SurveyDraft {
        title,
        description,
        questions,
    })
}

const INSTRUCTIONS: &str = "\
You design short, well-structured surveys. Reply with a single JSON object of the form \
{\"title\": string, \"description\": string, \"questions\": [{\"question_text\": string, \
\"question_type\": \"multiple_choice\" | \"text\" | \"rating\", \"is_required\": boolean, \
\"options\": [{\"text\": string}] | null}]}.
Rules:
- The title is at most 100 characters; the description is one or two sentences.
- Include between 3 and 8 questions and mix the question types where it makes sense.
- Multiple choice questions carry 3 to 5 distinct options; other types carry no options.
- Rating questions are answered on a 1 to 5 scale.
- Mark the questions essential to the survey's goal as required.
- Order the questions so they read naturally from general to specific.";

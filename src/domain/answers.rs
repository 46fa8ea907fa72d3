//! Answer acceptance rules, shared by the server and the filling wizard.

use crate::domain::{
    entities::QuestionRecord,
    error::DomainError,
    types::{QuestionOption, QuestionType},
};

pub const ANSWER_MAX_CHARS: usize = 5_000;
pub const RATING_MIN: u8 = 1;
pub const RATING_MAX: u8 = 5;

/// Checks `raw` against the question and returns the text to store.
///
/// Blank answers are accepted only for optional questions and are stored as
/// the empty string.
pub fn normalize_answer(question: &QuestionRecord, raw: &str) -> Result<String, DomainError> {
    check_answer(
        question.question_type,
        question.is_required,
        question.options.as_deref(),
        raw,
    )
}

pub fn check_answer(
    question_type: QuestionType,
    is_required: bool,
    options: Option<&[QuestionOption]>,
    raw: &str,
) -> Result<String, DomainError> {
    let answer = raw.trim();
    if answer.is_empty() {
        if is_required {
            return Err(DomainError::validation(
                "answer",
                "an answer is required for this question",
            ));
        }
        return Ok(String::new());
    }

    match question_type {
        QuestionType::Text => {
            if answer.chars().count() > ANSWER_MAX_CHARS {
                return Err(DomainError::validation(
                    "answer",
                    format!("answers are limited to {ANSWER_MAX_CHARS} characters"),
                ));
            }
        }
        QuestionType::Rating => {
            let rating: u8 = answer.parse().map_err(|_| {
                DomainError::validation("answer", "rating must be a whole number")
            })?;
            if !(RATING_MIN..=RATING_MAX).contains(&rating) {
                return Err(DomainError::validation(
                    "answer",
                    format!("rating must be between {RATING_MIN} and {RATING_MAX}"),
                ));
            }
        }
        QuestionType::MultipleChoice => {
            let known = options
                .unwrap_or_default()
                .iter()
                .any(|option| option.text == answer);
            if !known {
                return Err(DomainError::validation(
                    "answer",
                    "answer must match one of the question's options",
                ));
            }
        }
    }

    Ok(answer.to_string())
}

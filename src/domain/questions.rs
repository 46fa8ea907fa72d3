//! Question content rules and display ordering.
//!
//! Order indices are not unique at the storage level. Consumers sort with
//! [`sort_for_display`], which breaks ties by creation time and then by id so
//! every reader sees the same sequence.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use canvass_api_types::OptionDraft;

use crate::domain::{
    entities::QuestionRecord,
    error::DomainError,
    types::{QuestionOption, QuestionType},
};

pub const TEXT_MAX_CHARS: usize = 500;
pub const OPTION_MAX_CHARS: usize = 200;
pub const MAX_OPTIONS: usize = 20;

pub fn normalize_text(raw: &str) -> Result<String, DomainError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(DomainError::validation(
            "question_text",
            "question text is required",
        ));
    }
    if text.chars().count() > TEXT_MAX_CHARS {
        return Err(DomainError::validation(
            "question_text",
            format!("question text must be at most {TEXT_MAX_CHARS} characters"),
        ));
    }
    Ok(text.to_string())
}

pub fn validate_order_index(order_index: i32) -> Result<i32, DomainError> {
    if order_index < 0 {
        return Err(DomainError::validation(
            "order_index",
            "order index must be zero or greater",
        ));
    }
    Ok(order_index)
}

/// Multiple-choice questions need at least one option; other kinds take none.
/// Missing option ids are assigned as `opt-<n>` in list order.
pub fn normalize_options(
    question_type: QuestionType,
    drafts: Option<&[OptionDraft]>,
) -> Result<Option<Vec<QuestionOption>>, DomainError> {
    let drafts = drafts.unwrap_or_default();

    if question_type != QuestionType::MultipleChoice {
        if drafts.is_empty() {
            return Ok(None);
        }
        return Err(DomainError::validation(
            "options",
            format!("{question_type} questions do not take options"),
        ));
    }

    if drafts.is_empty() {
        return Err(DomainError::validation(
            "options",
            "multiple choice questions need at least one option",
        ));
    }
    if drafts.len() > MAX_OPTIONS {
        return Err(DomainError::validation(
            "options",
            format!("at most {MAX_OPTIONS} options are allowed"),
        ));
    }

    let mut options = Vec::with_capacity(drafts.len());
    for (position, draft) in drafts.iter().enumerate() {
        let text = draft.text.trim();
        if text.is_empty() {
            return Err(DomainError::validation("options", "option text is required"));
        }
        if text.chars().count() > OPTION_MAX_CHARS {
            return Err(DomainError::validation(
                "options",
                format!("option text must be at most {OPTION_MAX_CHARS} characters"),
            ));
        }
        if options.iter().any(|existing: &QuestionOption| existing.text == text) {
            return Err(DomainError::validation(
                "options",
                format!("duplicate option `{text}`"),
            ));
        }
        let id = draft
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("opt-{}", position + 1));
        options.push(QuestionOption {
            id,
            text: text.to_string(),
        });
    }

    Ok(Some(options))
}

fn display_order(a: &QuestionRecord, b: &QuestionRecord) -> Ordering {
    a.order_index
        .cmp(&b.order_index)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

pub fn sort_for_display(questions: &mut [QuestionRecord]) {
    questions.sort_by(display_order);
}

/// Order indices shared by more than one question.
pub fn duplicate_order_indices(questions: &[QuestionRecord]) -> Vec<i32> {
    let mut seen: BTreeMap<i32, usize> = BTreeMap::new();
    for question in questions {
        *seen.entry(question.order_index).or_default() += 1;
    }
    seen.into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(index, _)| index)
        .collect()
}

/// Index appended after the current last question.
pub fn next_order_index(questions: &[QuestionRecord]) -> i32 {
    questions
        .iter()
        .map(|question| question.order_index)
        .max()
        .map_or(0, |max| max.saturating_add(1))
}

//! Shared domain enumerations aligned with persisted database enums.
//!
//! The definitions live in `canvass-api-types` so the CLI speaks the same names.

pub use canvass_api_types::{QuestionOption, QuestionType, UserRole};

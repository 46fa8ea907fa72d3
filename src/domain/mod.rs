//! Domain layer types and invariants.

pub mod access_tokens;
pub mod answers;
pub mod entities;
pub mod error;
pub mod permissions;
pub mod questions;
pub mod surveys;
pub mod types;

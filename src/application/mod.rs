//! Application services: authorization, validation and cache wiring over the repositories.

pub mod access_tokens;
pub mod error;
pub mod generation;
pub mod questions;
pub mod reads;
pub mod repos;
pub mod responses;
pub mod services;
pub mod stats;
pub mod surveys;
pub mod users;
pub mod wizard;

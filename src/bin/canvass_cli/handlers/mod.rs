#![deny(clippy::all, clippy::pedantic)]

pub mod fill;
pub mod generate;
pub mod questions;
pub mod responses;
pub mod stats;
pub mod surveys;

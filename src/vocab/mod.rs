//! Vocabulary words and their familiarity scheduling
//!
//! This module provides:
//! - Word model (captured terms with context and translation)
//! - Familiarity levels 1-5 with a configurable interval table

pub mod familiarity;
pub mod models;

pub use familiarity::{FamiliarityDelta, IntervalTable, WordStrengthTracker};
pub use models::*;

//! Flashcards and SM-2 scheduling
//!
//! This module provides:
//! - Deck, card template and flashcard models
//! - SM-2 spaced repetition algorithm
//! - Template rendering for cards generated from words

pub mod algorithm;
pub mod models;
pub mod templates;

pub use algorithm::{CardScheduler, QualityMap};
pub use models::*;
pub use templates::{PlaceholderRenderer, TemplateRenderer, WordFields};

//! Review scheduling engine for a language-learning app
//!
//! Vocabulary words carry a coarse 1-5 familiarity level, flashcards carry
//! SM-2 state, and both feed one due queue. [`review::ReviewSession`] is the
//! entry point that ties the schedulers, storage and weekly goals together.

pub mod clock;
pub mod config;
pub mod flashcards;
pub mod goals;
pub mod review;
pub mod storage;
pub mod vocab;

//! Weekly goals and streak tracking module

pub mod models;
pub mod tracker;

pub use models::*;
pub use tracker::{week_start_for, GoalTracker};

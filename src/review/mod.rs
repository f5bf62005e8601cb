//! Review scheduling across words and cards
//!
//! This module provides:
//! - Ratings and the shared `Schedulable` capability
//! - Due queue selection
//! - The `ReviewSession` service tying schedulers, storage and goals together

pub mod error;
pub mod models;
pub mod queue;
pub mod rating;
pub mod schedulable;
pub mod session;

pub use error::{ReviewError, Result};
pub use models::{DailyReviews, PracticeSession, RatedItem, ReviewRecord, ReviewStats, ReviewSubmission, SessionStats};
pub use queue::{DueItem, DueQueueSelector, QueuePolicy, Scope};
pub use rating::{ItemKind, Rating};
pub use schedulable::{ScheduleState, Schedulable, Schedulers};
pub use session::ReviewSession;

//! Data models for captured vocabulary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lowest familiarity level
pub const MIN_FAMILIARITY: u8 = 1;
/// Highest familiarity level
pub const MAX_FAMILIARITY: u8 = 5;

/// Where a word stands in the learner's vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WordStatus {
    /// Imported but not yet encountered in reading
    New,
    /// Encountered at least once
    Seen,
    /// Marked as known
    Learned,
}

impl Default for WordStatus {
    fn default() -> Self {
        Self::New
    }
}

impl WordStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            WordStatus::New => "new",
            WordStatus::Seen => "seen",
            WordStatus::Learned => "learned",
        }
    }
}

/// A vocabulary word captured from reading or import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Word {
    pub id: Uuid,
    pub deck_id: Uuid,
    pub term: String,
    /// Sentence the word was captured from
    #[serde(default)]
    pub context: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part_of_speech: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub literal_translation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grammatical_breakdown: Option<String>,
    #[serde(default)]
    pub status: WordStatus,
    /// Coarse familiarity level, always within 1..=5
    #[serde(default = "default_familiarity")]
    pub familiarity_score: u8,
    pub next_review_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reviewed_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub encounters: u32,
    pub created_at: DateTime<Utc>,
}

fn default_familiarity() -> u8 {
    MIN_FAMILIARITY
}

impl Word {
    /// Create a word that is immediately due for its first review
    pub fn new(deck_id: Uuid, term: String, context: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            deck_id,
            term,
            context,
            translation: None,
            part_of_speech: None,
            literal_translation: None,
            grammatical_breakdown: None,
            status: WordStatus::New,
            familiarity_score: MIN_FAMILIARITY,
            next_review_date: now,
            last_reviewed_date: None,
            encounters: 0,
            created_at: now,
        }
    }

    pub fn with_translation(mut self, translation: String) -> Self {
        self.translation = Some(translation);
        self
    }

    /// Check if the word is due for review
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_date <= now
    }
}

/// Analysis attached to a capture request (usually produced by the AI service)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordAnalysis {
    pub translation: Option<String>,
    pub part_of_speech: Option<String>,
    pub literal_translation: Option<String>,
}

/// Whether a capture created a new word or updated an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CaptureAction {
    Created,
    Updated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureOutcome {
    pub action: CaptureAction,
    pub word: Word,
}

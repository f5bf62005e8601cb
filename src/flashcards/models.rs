//! Data models for decks, card templates and flashcards

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::algorithm::INITIAL_EASE_FACTOR;

/// A deck groups the words and cards of one language
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
    pub id: Uuid,
    pub name: String,
    pub language: String,
    /// Template used when generating cards without an explicit template
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_template_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Deck {
    pub fn new(name: String, language: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            language,
            default_template_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_default_template(mut self, template_id: Uuid) -> Self {
        self.default_template_id = Some(template_id);
        self
    }
}

/// Front/back templates with `{{field}}` placeholders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardTemplate {
    pub id: Uuid,
    pub name: String,
    pub front_template: String,
    pub back_template: String,
}

impl CardTemplate {
    pub fn new(name: String, front_template: String, back_template: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            front_template,
            back_template,
        }
    }

    /// Stable id of the built-in "Basic" template
    pub fn basic_id() -> Uuid {
        Uuid::new_v5(&Uuid::NAMESPACE_OID, b"lexis.card-template.basic")
    }

    /// The built-in template every store falls back to
    pub fn basic() -> Self {
        Self {
            id: Self::basic_id(),
            name: "Basic".to_string(),
            front_template: "{{term}}".to_string(),
            back_template: "{{translation}}\n\nContext: {{context}}".to_string(),
        }
    }
}

/// A flashcard with its SM-2 scheduling state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: Uuid,
    pub deck_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<Uuid>,
    /// Word this card was generated from (lookup only, the card does not own it)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_id: Option<Uuid>,
    pub front: String,
    pub back: String,
    /// Consecutive successful reviews
    #[serde(default)]
    pub repetition: u32,
    #[serde(default = "default_ease_factor")]
    pub easiness_factor: f64,
    /// Current interval in days (0 until the first review)
    #[serde(default)]
    pub interval: u32,
    pub next_review_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reviewed_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

fn default_ease_factor() -> f64 {
    INITIAL_EASE_FACTOR
}

impl Card {
    /// Create a card that is immediately due
    pub fn new(deck_id: Uuid, front: String, back: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            deck_id,
            template_id: None,
            word_id: None,
            front,
            back,
            repetition: 0,
            easiness_factor: INITIAL_EASE_FACTOR,
            interval: 0,
            next_review_date: now,
            last_reviewed_date: None,
            created_at: now,
        }
    }

    pub fn with_easiness(mut self, easiness_factor: f64) -> Self {
        self.easiness_factor = easiness_factor;
        self
    }

    /// Check if the card is due for review
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_date <= now
    }
}

/// Outcome of generating cards from a batch of words
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkCreateReport {
    pub created: Vec<Card>,
    /// Words that already had a card in the target deck
    pub skipped: Vec<Uuid>,
    /// Word ids that did not resolve
    pub missing: Vec<Uuid>,
    /// Words whose card could not be written, with the reason
    pub failed: Vec<FailedWord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedWord {
    pub word_id: Uuid,
    pub reason: String,
}

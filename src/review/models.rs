//! Review session, submission and history records

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::queue::Scope;
use super::rating::{ItemKind, Rating};
use super::schedulable::{Schedulable, Schedulers};
use crate::flashcards::Card;
use crate::vocab::Word;

/// Counters for one review pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub reviewed: u32,
    pub correct: u32,
    pub incorrect: u32,
}

impl SessionStats {
    pub fn record(&mut self, passed: bool) {
        self.reviewed += 1;
        if passed {
            self.correct += 1;
        } else {
            self.incorrect += 1;
        }
    }

    /// Share of correct answers, 0.0 - 1.0
    pub fn accuracy(&self) -> f32 {
        if self.reviewed == 0 {
            0.0
        } else {
            self.correct as f32 / self.reviewed as f32
        }
    }
}

/// A practice session grouping several ratings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeSession {
    pub id: Uuid,
    pub scope: Scope,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stats: SessionStats,
}

impl PracticeSession {
    pub fn new(scope: Scope, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            scope,
            started_at: now,
            completed_at: None,
            stats: SessionStats::default(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// Record of an applied rating, keyed by the caller's idempotency key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSubmission {
    pub key: String,
    pub item_kind: ItemKind,
    pub item_id: Uuid,
    pub rating: Rating,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
    pub applied_at: DateTime<Utc>,
}

/// A word or a card, as returned by a rating submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "item", rename_all = "camelCase")]
pub enum RatedItem {
    Word(Word),
    Card(Card),
}

impl RatedItem {
    pub fn as_schedulable(&self) -> &dyn Schedulable {
        match self {
            RatedItem::Word(word) => word,
            RatedItem::Card(card) => card,
        }
    }

    pub fn rated(&self, rating: Rating, schedulers: &Schedulers, now: DateTime<Utc>) -> Self {
        match self {
            RatedItem::Word(word) => RatedItem::Word(word.apply_rating(rating, schedulers, now)),
            RatedItem::Card(card) => RatedItem::Card(card.apply_rating(rating, schedulers, now)),
        }
    }
}

/// One applied rating, kept for review history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRecord {
    pub id: Uuid,
    pub item_kind: ItemKind,
    pub item_id: Uuid,
    pub deck_id: Uuid,
    pub rating: Rating,
    /// SM-2 quality (0-5) the rating mapped to
    pub quality: u8,
    pub passed: bool,
    /// Days until the next review, as scheduled by this rating
    pub interval: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
    pub reviewed_at: DateTime<Utc>,
}

impl ReviewRecord {
    /// History entry for `rated`, the item state after the rating
    pub fn new(
        rated: &RatedItem,
        rating: Rating,
        quality: u8,
        passed: bool,
        session_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Self {
        let item = rated.as_schedulable();
        let interval = (item.current_state().next_review_date - now).num_days().max(0);
        Self {
            id: Uuid::new_v4(),
            item_kind: item.kind(),
            item_id: item.id(),
            deck_id: item.deck_id(),
            rating,
            quality,
            passed,
            interval: u32::try_from(interval).unwrap_or(u32::MAX),
            session_id,
            reviewed_at: now,
        }
    }
}

/// Reviews of one UTC day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyReviews {
    pub date: NaiveDate,
    pub reviews: usize,
    pub correct: usize,
    pub average_quality: f64,
}

/// Review statistics for a scope
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStats {
    pub total_words: usize,
    pub total_cards: usize,
    pub due_words: usize,
    pub due_cards: usize,
    /// Days covered by `total_reviews`, `average_quality` and `daily`
    pub window_days: u32,
    pub total_reviews: usize,
    pub average_quality: Option<f64>,
    pub reviews_today: usize,
    pub correct_today: usize,
    /// Oldest day first; days without reviews are left out
    pub daily: Vec<DailyReviews>,
}

impl ReviewStats {
    /// Aggregate `records` from the last `window_days` UTC days, today
    /// included. Item counts are left for the caller to fill in.
    pub fn from_records<'a>(
        records: impl IntoIterator<Item = &'a ReviewRecord>,
        now: DateTime<Utc>,
        window_days: u32,
    ) -> Self {
        let today = now.date_naive();
        let first_day = today - Duration::days(i64::from(window_days.max(1)) - 1);

        // (reviews, correct, quality sum) per day
        let mut days: BTreeMap<NaiveDate, (usize, usize, u64)> = BTreeMap::new();
        for record in records {
            let day = record.reviewed_at.date_naive();
            if day < first_day || day > today {
                continue;
            }
            let entry = days.entry(day).or_default();
            entry.0 += 1;
            entry.1 += usize::from(record.passed);
            entry.2 += u64::from(record.quality);
        }

        let total_reviews: usize = days.values().map(|d| d.0).sum();
        let quality_sum: u64 = days.values().map(|d| d.2).sum();
        let (reviews_today, correct_today) = days.get(&today).map_or((0, 0), |d| (d.0, d.1));

        Self {
            window_days: window_days.max(1),
            total_reviews,
            average_quality: (total_reviews > 0).then(|| quality_sum as f64 / total_reviews as f64),
            reviews_today,
            correct_today,
            daily: days
                .into_iter()
                .map(|(date, (reviews, correct, quality))| DailyReviews {
                    date,
                    reviews,
                    correct,
                    average_quality: quality as f64 / reviews as f64,
                })
                .collect(),
            ..Self::default()
        }
    }
}

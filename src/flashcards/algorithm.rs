//! SM-2 Spaced Repetition Algorithm
//!
//! Implementation of the SuperMemo 2 algorithm for calculating
//! review intervals based on recall quality.
//!
//! Quality ratings (0-5):
//! - 0: Complete blackout, no recall
//! - 1: Incorrect, but upon seeing answer, remembered
//! - 2: Incorrect, but answer seemed easy to recall
//! - 3: Correct response with serious difficulty
//! - 4: Correct response after hesitation
//! - 5: Perfect response with no hesitation
//!
//! A failed review (quality below 3) restarts the repetition count and leaves
//! the easiness factor untouched. Intervals after the second repetition are
//! rounded half-up to whole days.

use chrono::{DateTime, Duration, Utc};

use super::models::Card;
use crate::config::ConfigError;
use crate::review::error::report_invariant;
use crate::review::Rating;

/// Minimum ease factor allowed
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Ease factor of a new card
pub const INITIAL_EASE_FACTOR: f64 = 2.5;

/// Lowest quality that counts as a successful recall
pub const PASSING_QUALITY: u8 = 3;

const MAX_QUALITY: u8 = 5;

/// Mapping from the four UI ratings to SM-2 quality
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityMap {
    qualities: [u8; 4],
}

impl QualityMap {
    /// Again -> 2, Hard -> 3, Good -> 4, Easy -> 5
    pub const DEFAULT: [u8; 4] = [2, 3, 4, 5];

    pub fn new(qualities: [u8; 4]) -> Result<Self, ConfigError> {
        if let Some(q) = qualities.iter().find(|q| **q > MAX_QUALITY) {
            return Err(ConfigError::Invalid(format!(
                "SM-2 quality must be between 0 and {}, got {}",
                MAX_QUALITY, q
            )));
        }
        if qualities.windows(2).any(|w| w[1] < w[0]) {
            return Err(ConfigError::Invalid(format!(
                "SM-2 quality map must not decrease from Again to Easy: {:?}",
                qualities
            )));
        }
        Ok(Self { qualities })
    }

    pub fn from_slice(qualities: &[u8]) -> Result<Self, ConfigError> {
        let qualities: [u8; 4] = qualities.try_into().map_err(|_| {
            ConfigError::Invalid(format!(
                "SM-2 quality map needs one entry per rating (4), got {}",
                qualities.len()
            ))
        })?;
        Self::new(qualities)
    }

    pub fn quality(&self, rating: Rating) -> u8 {
        self.qualities[rating.index()]
    }

    pub fn is_passing(&self, rating: Rating) -> bool {
        self.quality(rating) >= PASSING_QUALITY
    }
}

impl Default for QualityMap {
    fn default() -> Self {
        Self {
            qualities: Self::DEFAULT,
        }
    }
}

/// Result of calculating the next review
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewResult {
    pub repetition: u32,
    pub interval: u32,
    pub easiness_factor: f64,
    pub next_review_date: DateTime<Utc>,
}

/// Calculate the next SM-2 state for a card
///
/// # Arguments
/// * `card` - Card in its current state
/// * `quality` - Quality rating (0-5)
/// * `now` - Review time
pub fn calculate_next_review(card: &Card, quality: u8, now: DateTime<Utc>) -> ReviewResult {
    let quality = quality.min(MAX_QUALITY);
    let ease_factor = floored_ease(card);

    if quality < PASSING_QUALITY {
        return ReviewResult {
            repetition: 0,
            interval: 1,
            easiness_factor: ease_factor,
            next_review_date: now + Duration::days(1),
        };
    }

    let interval = match card.repetition {
        0 => 1,
        1 => 6,
        _ => {
            let next = round_half_up(card.interval as f64 * ease_factor);
            if next < 1 {
                report_invariant(format!(
                    "card {} produced interval {} from stored interval {}; using 1",
                    card.id, next, card.interval
                ));
                1
            } else {
                next
            }
        }
    };

    // EF' = EF + (0.1 - (5-q) * (0.08 + (5-q) * 0.02))
    let distance = (MAX_QUALITY - quality) as f64;
    let ease_factor = (ease_factor + (0.1 - distance * (0.08 + distance * 0.02))).max(MIN_EASE_FACTOR);

    ReviewResult {
        repetition: card.repetition + 1,
        interval,
        easiness_factor: ease_factor,
        next_review_date: now + Duration::days(interval as i64),
    }
}

/// Stored ease factor, repaired if it fell below the floor
fn floored_ease(card: &Card) -> f64 {
    if card.easiness_factor.is_finite() && card.easiness_factor >= MIN_EASE_FACTOR {
        return card.easiness_factor;
    }
    report_invariant(format!(
        "card {} has easiness factor {} below {}; clamping",
        card.id, card.easiness_factor, MIN_EASE_FACTOR
    ));
    MIN_EASE_FACTOR
}

fn round_half_up(value: f64) -> u32 {
    (value + 0.5).floor().max(0.0) as u32
}

/// Applies SM-2 reviews to cards
#[derive(Debug, Clone, Default)]
pub struct CardScheduler {
    qualities: QualityMap,
}

impl CardScheduler {
    pub fn new(qualities: QualityMap) -> Self {
        Self { qualities }
    }

    pub fn quality_map(&self) -> &QualityMap {
        &self.qualities
    }

    /// Review a card with a UI rating, returning the rescheduled card
    pub fn review_card(&self, card: &Card, rating: Rating, now: DateTime<Utc>) -> Card {
        let ReviewResult {
            repetition,
            interval,
            easiness_factor,
            next_review_date,
        } = calculate_next_review(card, self.qualities.quality(rating), now);

        let mut updated = card.clone();
        updated.repetition = repetition;
        updated.interval = interval;
        updated.easiness_factor = easiness_factor;
        updated.next_review_date = next_review_date;
        updated.last_reviewed_date = Some(now);
        updated
    }

    /// Interval each rating would give, in the order Again, Hard, Good, Easy.
    /// Used to show users what each button does.
    pub fn preview_intervals(&self, card: &Card, now: DateTime<Utc>) -> [u32; 4] {
        Rating::ALL.map(|rating| calculate_next_review(card, self.qualities.quality(rating), now).interval)
    }
}

/// Format an interval in days to a human-readable string
pub fn format_interval(days: u32) -> String {
    if days == 0 {
        "now".to_string()
    } else if days < 7 {
        format!("{}d", days)
    } else if days < 30 {
        format!("{}w", days / 7)
    } else if days < 365 {
        format!("{}mo", days / 30)
    } else {
        format!("{}y", days / 365)
    }
}

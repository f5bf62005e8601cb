//! Familiarity levels for vocabulary words
//!
//! Each word carries a level from 1 (weak) to 5 (strong). A review moves the
//! level one step up or down, and the next review date is looked up from an
//! interval table indexed by the new level.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::models::{Word, WordStatus, MAX_FAMILIARITY, MIN_FAMILIARITY};
use crate::config::ConfigError;
use crate::review::Rating;

/// Days a known word waits before it is shown again
const KNOWN_WORD_INTERVAL_DAYS: i64 = 365;

/// A single familiarity step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FamiliarityDelta {
    Up,
    Down,
}

impl FamiliarityDelta {
    /// Accepts only +1 and -1
    pub fn from_step(step: i32) -> Option<Self> {
        match step {
            1 => Some(Self::Up),
            -1 => Some(Self::Down),
            _ => None,
        }
    }

    pub fn step(self) -> i16 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
        }
    }

    /// Again and Hard weaken a word, Good and Easy strengthen it
    pub fn for_rating(rating: Rating) -> Self {
        match rating {
            Rating::Again | Rating::Hard => Self::Down,
            Rating::Good | Rating::Easy => Self::Up,
        }
    }
}

/// Days until the next review for each familiarity level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalTable {
    days: [u32; 5],
}

impl IntervalTable {
    pub const DEFAULT_DAYS: [u32; 5] = [0, 1, 3, 7, 14];

    /// Build a table; levels must map to non-decreasing intervals
    pub fn new(days: [u32; 5]) -> Result<Self, ConfigError> {
        if let Some(pos) = days.windows(2).position(|w| w[1] < w[0]) {
            return Err(ConfigError::Invalid(format!(
                "familiarity intervals must not decrease: level {} has {}d but level {} has {}d",
                pos + 1,
                days[pos],
                pos + 2,
                days[pos + 1]
            )));
        }
        Ok(Self { days })
    }

    pub fn from_slice(days: &[u32]) -> Result<Self, ConfigError> {
        let days: [u32; 5] = days.try_into().map_err(|_| {
            ConfigError::Invalid(format!(
                "familiarity intervals need exactly {} entries, got {}",
                MAX_FAMILIARITY,
                days.len()
            ))
        })?;
        Self::new(days)
    }

    /// Interval for a level; out-of-range levels are clamped first
    pub fn interval(&self, level: u8) -> Duration {
        let level = level.clamp(MIN_FAMILIARITY, MAX_FAMILIARITY);
        Duration::days(self.days[(level - MIN_FAMILIARITY) as usize] as i64)
    }

    pub fn days(&self) -> [u32; 5] {
        self.days
    }
}

impl Default for IntervalTable {
    fn default() -> Self {
        Self {
            days: Self::DEFAULT_DAYS,
        }
    }
}

/// Applies familiarity changes to words
#[derive(Debug, Clone, Default)]
pub struct WordStrengthTracker {
    table: IntervalTable,
}

impl WordStrengthTracker {
    pub fn new(table: IntervalTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &IntervalTable {
        &self.table
    }

    /// Move a word one level up or down and reschedule it.
    ///
    /// `last_reviewed_date` is stamped even when the level is already at a
    /// bound and does not move, so the word leaves the due queue either way.
    pub fn adjust_familiarity(&self, word: &Word, delta: FamiliarityDelta, now: DateTime<Utc>) -> Word {
        let current = word.familiarity_score as i16;
        let new_score = (current + delta.step())
            .clamp(MIN_FAMILIARITY as i16, MAX_FAMILIARITY as i16) as u8;

        let mut updated = word.clone();
        updated.familiarity_score = new_score;
        updated.last_reviewed_date = Some(now);
        updated.next_review_date = now + self.table.interval(new_score);
        updated
    }

    /// Mark a word as known: top level, parked for a year
    pub fn mark_known(&self, word: &Word, now: DateTime<Utc>) -> Word {
        let mut updated = word.clone();
        updated.status = WordStatus::Learned;
        updated.familiarity_score = MAX_FAMILIARITY;
        updated.last_reviewed_date = Some(now);
        updated.next_review_date = now + Duration::days(KNOWN_WORD_INTERVAL_DAYS);
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    fn word_at(score: u8) -> Word {
        let mut word = Word::new(Uuid::new_v4(), "gato".to_string(), String::new(), now() - Duration::days(3));
        word.familiarity_score = score;
        word
    }

    #[test]
    fn test_due_word_moves_up_one_level() {
        let tracker = WordStrengthTracker::default();
        let word = word_at(3);
        assert!(word.is_due(now()));

        let updated = tracker.adjust_familiarity(&word, FamiliarityDelta::Up, now());

        assert_eq!(updated.familiarity_score, 4);
        assert_eq!(updated.last_reviewed_date, Some(now()));
        assert_eq!(updated.next_review_date, now() + Duration::days(7));
    }

    #[test]
    fn test_score_stays_within_bounds() {
        let tracker = WordStrengthTracker::default();
        for score in MIN_FAMILIARITY..=MAX_FAMILIARITY {
            for delta in [FamiliarityDelta::Up, FamiliarityDelta::Down] {
                let updated = tracker.adjust_familiarity(&word_at(score), delta, now());
                assert!((MIN_FAMILIARITY..=MAX_FAMILIARITY).contains(&updated.familiarity_score));
                let expected = (score as i16 + delta.step()).clamp(1, 5) as u8;
                assert_eq!(updated.familiarity_score, expected);
            }
        }
    }

    #[test]
    fn test_clamped_adjustment_still_stamps_review() {
        let tracker = WordStrengthTracker::default();

        let top = tracker.adjust_familiarity(&word_at(5), FamiliarityDelta::Up, now());
        assert_eq!(top.familiarity_score, 5);
        assert_eq!(top.last_reviewed_date, Some(now()));
        assert_eq!(top.next_review_date, now() + Duration::days(14));
        assert!(!top.is_due(now()));

        let bottom = tracker.adjust_familiarity(&word_at(1), FamiliarityDelta::Down, now());
        assert_eq!(bottom.familiarity_score, 1);
        assert_eq!(bottom.last_reviewed_date, Some(now()));
        // Level 1 maps to zero days: due again immediately
        assert_eq!(bottom.next_review_date, now());
    }

    #[test]
    fn test_next_review_never_precedes_last_review() {
        let tracker = WordStrengthTracker::default();
        let mut word = word_at(2);
        for delta in [FamiliarityDelta::Down, FamiliarityDelta::Down, FamiliarityDelta::Up] {
            word = tracker.adjust_familiarity(&word, delta, now());
            assert!(word.next_review_date >= word.last_reviewed_date.unwrap());
        }
    }

    #[test]
    fn test_injected_table_is_used() {
        let table = IntervalTable::new([1, 2, 5, 10, 30]).unwrap();
        let tracker = WordStrengthTracker::new(table);
        let updated = tracker.adjust_familiarity(&word_at(4), FamiliarityDelta::Up, now());
        assert_eq!(updated.next_review_date, now() + Duration::days(30));
    }

    #[test]
    fn test_table_must_be_non_decreasing() {
        assert!(IntervalTable::new([0, 1, 1, 7, 14]).is_ok());
        assert!(IntervalTable::new([0, 5, 3, 7, 14]).is_err());
        assert!(IntervalTable::from_slice(&[0, 1, 3]).is_err());
    }

    #[test]
    fn test_mark_known() {
        let tracker = WordStrengthTracker::default();
        let updated = tracker.mark_known(&word_at(2), now());
        assert_eq!(updated.status, WordStatus::Learned);
        assert_eq!(updated.familiarity_score, MAX_FAMILIARITY);
        assert_eq!(updated.next_review_date, now() + Duration::days(365));
    }

    #[test]
    fn test_rating_to_delta() {
        assert_eq!(FamiliarityDelta::for_rating(Rating::Again), FamiliarityDelta::Down);
        assert_eq!(FamiliarityDelta::for_rating(Rating::Hard), FamiliarityDelta::Down);
        assert_eq!(FamiliarityDelta::for_rating(Rating::Good), FamiliarityDelta::Up);
        assert_eq!(FamiliarityDelta::for_rating(Rating::Easy), FamiliarityDelta::Up);
        assert_eq!(FamiliarityDelta::from_step(2), None);
    }
}

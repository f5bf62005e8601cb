//! Common scheduling capability of words and cards
//!
//! Words use familiarity levels and cards use SM-2, but the queue and the
//! session only need to know when an item is due, how strong it is, and how
//! to produce its next state from a rating.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::rating::{ItemKind, Rating};
use crate::flashcards::{Card, CardScheduler};
use crate::vocab::{FamiliarityDelta, Word, WordStrengthTracker};

/// Scheduling view of an item
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleState {
    pub next_review_date: DateTime<Utc>,
    pub last_reviewed_date: Option<DateTime<Utc>>,
    /// Familiarity level for words, easiness factor for cards; lower is weaker
    pub strength: f64,
}

impl ScheduleState {
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_date <= now
    }
}

/// The schedulers an item may need when it is rated
#[derive(Debug, Clone, Default)]
pub struct Schedulers {
    pub words: WordStrengthTracker,
    pub cards: CardScheduler,
}

pub trait Schedulable {
    fn kind(&self) -> ItemKind;

    fn id(&self) -> Uuid;

    fn deck_id(&self) -> Uuid;

    fn current_state(&self) -> ScheduleState;

    /// Next state after `rating`; the item itself is not modified
    fn apply_rating(&self, rating: Rating, schedulers: &Schedulers, now: DateTime<Utc>) -> Self
    where
        Self: Sized;
}

impl Schedulable for Word {
    fn kind(&self) -> ItemKind {
        ItemKind::Word
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn deck_id(&self) -> Uuid {
        self.deck_id
    }

    fn current_state(&self) -> ScheduleState {
        ScheduleState {
            next_review_date: self.next_review_date,
            last_reviewed_date: self.last_reviewed_date,
            strength: self.familiarity_score as f64,
        }
    }

    fn apply_rating(&self, rating: Rating, schedulers: &Schedulers, now: DateTime<Utc>) -> Self {
        schedulers
            .words
            .adjust_familiarity(self, FamiliarityDelta::for_rating(rating), now)
    }
}

impl Schedulable for Card {
    fn kind(&self) -> ItemKind {
        ItemKind::Card
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn deck_id(&self) -> Uuid {
        self.deck_id
    }

    fn current_state(&self) -> ScheduleState {
        ScheduleState {
            next_review_date: self.next_review_date,
            last_reviewed_date: self.last_reviewed_date,
            strength: self.easiness_factor,
        }
    }

    fn apply_rating(&self, rating: Rating, schedulers: &Schedulers, now: DateTime<Utc>) -> Self {
        schedulers.cards.review_card(self, rating, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    fn rate<T: Schedulable>(item: &T, rating: Rating) -> T {
        item.apply_rating(rating, &Schedulers::default(), now())
    }

    #[test]
    fn test_word_and_card_share_capability() {
        let deck = Uuid::new_v4();
        let word = Word::new(deck, "casa".to_string(), String::new(), now() - Duration::days(1));
        let card = Card::new(deck, "casa".to_string(), "house".to_string(), now() - Duration::days(1));

        let items: Vec<&dyn Schedulable> = vec![&word, &card];
        for item in &items {
            assert!(item.current_state().is_due(now()));
            assert_eq!(item.deck_id(), deck);
        }

        let word = rate(&word, Rating::Good);
        let card = rate(&card, Rating::Good);
        for state in [word.current_state(), card.current_state()] {
            assert_eq!(state.last_reviewed_date, Some(now()));
            assert!(!state.is_due(now()) || state.next_review_date == now());
        }
        assert_eq!(word.familiarity_score, 2);
        assert_eq!(card.repetition, 1);
    }

    #[test]
    fn test_failed_word_rating_lowers_familiarity() {
        let mut word = Word::new(Uuid::new_v4(), "casa".to_string(), String::new(), now());
        word.familiarity_score = 3;
        let rated = rate(&word, Rating::Again);
        assert_eq!(rated.familiarity_score, 2);
        assert_eq!(rated.next_review_date, now() + Duration::days(1));
    }
}

//! Due queue selection
//!
//! Picks the items to review next from words and cards. Selection is a pure
//! function of the items, the time, the limit and the policy.
//!
//! Ordering:
//! 1. most overdue first (`now - next_review_date`, descending)
//! 2. weakest first (familiarity level or easiness factor, ascending)
//! 3. words before cards, then by id, so equal items always come out the same way

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::rating::ItemKind;
use super::schedulable::Schedulable;

/// Which items a queue is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Scope {
    /// Every deck
    All,
    /// A single deck
    Deck { id: Uuid },
}

impl Scope {
    pub fn contains(&self, deck_id: Uuid) -> bool {
        match self {
            Scope::All => true,
            Scope::Deck { id } => *id == deck_id,
        }
    }

    pub fn deck_id(&self) -> Option<Uuid> {
        match self {
            Scope::All => None,
            Scope::Deck { id } => Some(*id),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuePolicy {
    /// Top up a short queue with items that are not yet due
    pub backfill: bool,
}

/// One entry of a due queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DueItem {
    pub kind: ItemKind,
    pub id: Uuid,
    pub deck_id: Uuid,
    pub next_review_date: DateTime<Utc>,
    pub strength: f64,
    /// False for backfilled items
    pub due: bool,
    /// Seconds past the review date (negative when not yet due)
    pub overdue_seconds: i64,
}

impl DueItem {
    fn from_item(item: &dyn Schedulable, now: DateTime<Utc>) -> Self {
        let state = item.current_state();
        Self {
            kind: item.kind(),
            id: item.id(),
            deck_id: item.deck_id(),
            next_review_date: state.next_review_date,
            strength: state.strength,
            due: state.is_due(now),
            overdue_seconds: (now - state.next_review_date).num_seconds(),
        }
    }
}

fn queue_order(a: &DueItem, b: &DueItem) -> Ordering {
    // Earlier review date == more overdue
    a.next_review_date
        .cmp(&b.next_review_date)
        .then_with(|| a.strength.total_cmp(&b.strength))
        .then_with(|| a.kind.cmp(&b.kind))
        .then_with(|| a.id.cmp(&b.id))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DueQueueSelector {
    policy: QueuePolicy,
}

impl DueQueueSelector {
    pub fn new(policy: QueuePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> QueuePolicy {
        self.policy
    }

    /// Ordered queue of at most `limit` items from `scope`
    pub fn select(
        &self,
        items: &[&dyn Schedulable],
        scope: Scope,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Vec<DueItem> {
        if limit == 0 {
            return Vec::new();
        }

        let (mut due, mut later): (Vec<DueItem>, Vec<DueItem>) = items
            .iter()
            .filter(|item| scope.contains(item.deck_id()))
            .map(|item| DueItem::from_item(*item, now))
            .partition(|item| item.due);

        due.sort_by(queue_order);
        due.truncate(limit);

        if self.policy.backfill && due.len() < limit {
            // Soonest-due first, weakest first among equals
            later.sort_by(queue_order);
            let room = limit - due.len();
            due.extend(later.into_iter().take(room));
        }

        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flashcards::Card;
    use crate::vocab::Word;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    fn word(deck: Uuid, overdue_days: i64, score: u8) -> Word {
        let mut word = Word::new(deck, "w".to_string(), String::new(), now());
        word.next_review_date = now() - Duration::days(overdue_days);
        word.familiarity_score = score;
        word
    }

    fn card(deck: Uuid, overdue_days: i64, ef: f64) -> Card {
        let mut card = Card::new(deck, "f".to_string(), "b".to_string(), now());
        card.next_review_date = now() - Duration::days(overdue_days);
        card.easiness_factor = ef;
        card
    }

    #[test]
    fn test_more_overdue_comes_first() {
        let deck = Uuid::new_v4();
        let a = word(deck, 1, 1);
        let b = card(deck, 5, 2.5);
        let items: Vec<&dyn Schedulable> = vec![&a, &b];

        let queue = DueQueueSelector::default().select(&items, Scope::All, 10, now());

        assert_eq!(queue.len(), 2);
        assert_eq!(queue[0].id, b.id);
        assert_eq!(queue[0].overdue_seconds, 5 * 86_400);
        assert_eq!(queue[1].id, a.id);
    }

    #[test]
    fn test_weaker_first_among_equally_overdue() {
        let deck = Uuid::new_v4();
        let strong = word(deck, 2, 4);
        let weak = word(deck, 2, 2);
        let weak_card = card(deck, 2, 1.3);
        let items: Vec<&dyn Schedulable> = vec![&strong, &weak, &weak_card];

        let queue = DueQueueSelector::default().select(&items, Scope::All, 10, now());
        let ids: Vec<Uuid> = queue.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![weak_card.id, weak.id, strong.id]);
    }

    #[test]
    fn test_not_due_excluded_without_backfill() {
        let deck = Uuid::new_v4();
        let due = word(deck, 0, 3);
        let future = word(deck, -3, 1);
        let items: Vec<&dyn Schedulable> = vec![&due, &future];

        let queue = DueQueueSelector::default().select(&items, Scope::All, 10, now());
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].id, due.id);
        assert!(queue[0].due);
    }

    #[test]
    fn test_backfill_tops_up_short_queue() {
        let deck = Uuid::new_v4();
        let due = word(deck, 1, 3);
        let soon = card(deck, -1, 2.5);
        let later = word(deck, -7, 1);
        let items: Vec<&dyn Schedulable> = vec![&later, &due, &soon];

        let selector = DueQueueSelector::new(QueuePolicy { backfill: true });
        let queue = selector.select(&items, Scope::All, 2, now());

        assert_eq!(queue.len(), 2);
        assert_eq!(queue[0].id, due.id);
        assert_eq!(queue[1].id, soon.id);
        assert!(!queue[1].due);
    }

    #[test]
    fn test_backfill_unused_when_due_set_fills_limit() {
        let deck = Uuid::new_v4();
        let a = word(deck, 1, 3);
        let b = word(deck, 2, 3);
        let future = word(deck, -1, 1);
        let items: Vec<&dyn Schedulable> = vec![&a, &b, &future];

        let selector = DueQueueSelector::new(QueuePolicy { backfill: true });
        let queue = selector.select(&items, Scope::All, 2, now());
        assert!(queue.iter().all(|i| i.due));
    }

    #[test]
    fn test_scope_and_limit() {
        let deck_a = Uuid::new_v4();
        let deck_b = Uuid::new_v4();
        let words: Vec<Word> = (1..=5).map(|d| word(deck_a, d, 3)).collect();
        let other = word(deck_b, 30, 1);
        let mut items: Vec<&dyn Schedulable> = words.iter().map(|w| w as &dyn Schedulable).collect();
        items.push(&other);

        let queue = DueQueueSelector::default().select(&items, Scope::Deck { id: deck_a }, 3, now());
        assert_eq!(queue.len(), 3);
        assert!(queue.iter().all(|i| i.deck_id == deck_a));
        assert_eq!(queue[0].id, words[4].id);

        assert!(DueQueueSelector::default().select(&items, Scope::All, 0, now()).is_empty());
    }

    #[test]
    fn test_order_is_deterministic() {
        let deck = Uuid::new_v4();
        let a = word(deck, 1, 2);
        let b = word(deck, 1, 2);
        let forward: Vec<&dyn Schedulable> = vec![&a, &b];
        let backward: Vec<&dyn Schedulable> = vec![&b, &a];

        let selector = DueQueueSelector::default();
        assert_eq!(
            selector.select(&forward, Scope::All, 5, now()),
            selector.select(&backward, Scope::All, 5, now())
        );
    }
}

//! In-process record store

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use uuid::Uuid;

use super::{RecordStore, Result, StorageError};
use crate::flashcards::{Card, CardTemplate, Deck};
use crate::goals::GoalProgress;
use crate::review::models::{PracticeSession, ReviewRecord, ReviewSubmission};
use crate::vocab::Word;

#[derive(Debug, Default)]
struct Records {
    decks: HashMap<Uuid, Deck>,
    words: HashMap<Uuid, Word>,
    cards: HashMap<Uuid, Card>,
    templates: HashMap<Uuid, CardTemplate>,
    goals: Option<GoalProgress>,
    sessions: HashMap<Uuid, PracticeSession>,
    submissions: HashMap<String, ReviewSubmission>,
    reviews: Vec<ReviewRecord>,
    /// Writes that will fail with a transient error before succeeding again
    pending_failures: u32,
    /// Record kinds whose writes keep failing until restored
    failing: HashSet<&'static str>,
}

/// Keeps every record in memory; nothing survives the process
#[derive(Debug, Default)]
pub struct MemoryStorage {
    records: Mutex<Records>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` writes fail with [`StorageError::Transient`]
    pub fn fail_next_writes(&self, count: u32) {
        self.lock().pending_failures = count;
    }

    /// Make every write of one record kind fail with
    /// [`StorageError::Transient`] until [`restore_writes`](Self::restore_writes).
    ///
    /// Kinds: `deck`, `word`, `card`, `template`, `goals`, `session`,
    /// `submission`, `review`.
    pub fn fail_writes_to(&self, kind: &'static str) {
        self.lock().failing.insert(kind);
    }

    pub fn restore_writes(&self) {
        let mut records = self.lock();
        records.failing.clear();
        records.pending_failures = 0;
    }

    fn lock(&self) -> MutexGuard<'_, Records> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Lock for a write of `kind`, consuming one injected failure if any are
    /// pending
    fn write(&self, kind: &'static str) -> Result<MutexGuard<'_, Records>> {
        let mut records = self.lock();
        if records.failing.contains(kind) {
            return Err(StorageError::Transient(format!("{} writes unavailable", kind)));
        }
        if records.pending_failures > 0 {
            records.pending_failures -= 1;
            return Err(StorageError::Transient("injected write failure".to_string()));
        }
        Ok(records)
    }
}

fn in_deck<'a, T: 'a>(
    items: impl Iterator<Item = &'a T>,
    deck_id: Option<Uuid>,
    deck_of: impl Fn(&T) -> Uuid,
) -> Vec<T>
where
    T: Clone,
{
    items
        .filter(|item| deck_id.map_or(true, |id| deck_of(*item) == id))
        .cloned()
        .collect()
}

impl RecordStore for MemoryStorage {
    fn list_decks(&self) -> Result<Vec<Deck>> {
        let mut decks: Vec<Deck> = self.lock().decks.values().cloned().collect();
        decks.sort_by_key(|d| (d.created_at, d.id));
        Ok(decks)
    }

    fn get_deck(&self, id: Uuid) -> Result<Deck> {
        self.lock().decks.get(&id).cloned().ok_or(StorageError::DeckNotFound(id))
    }

    fn put_deck(&self, deck: &Deck) -> Result<()> {
        self.write("deck")?.decks.insert(deck.id, deck.clone());
        Ok(())
    }

    fn list_words(&self, deck_id: Option<Uuid>) -> Result<Vec<Word>> {
        let mut words = in_deck(self.lock().words.values(), deck_id, |w| w.deck_id);
        words.sort_by_key(|w| (w.created_at, w.id));
        Ok(words)
    }

    fn get_word(&self, id: Uuid) -> Result<Word> {
        self.lock().words.get(&id).cloned().ok_or(StorageError::WordNotFound(id))
    }

    fn put_word(&self, word: &Word) -> Result<()> {
        self.write("word")?.words.insert(word.id, word.clone());
        Ok(())
    }

    fn list_cards(&self, deck_id: Option<Uuid>) -> Result<Vec<Card>> {
        let mut cards = in_deck(self.lock().cards.values(), deck_id, |c| c.deck_id);
        cards.sort_by_key(|c| (c.created_at, c.id));
        Ok(cards)
    }

    fn get_card(&self, id: Uuid) -> Result<Card> {
        self.lock().cards.get(&id).cloned().ok_or(StorageError::CardNotFound(id))
    }

    fn put_card(&self, card: &Card) -> Result<()> {
        self.write("card")?.cards.insert(card.id, card.clone());
        Ok(())
    }

    fn list_templates(&self) -> Result<Vec<CardTemplate>> {
        let mut templates: Vec<CardTemplate> = self.lock().templates.values().cloned().collect();
        templates.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(templates)
    }

    fn get_template(&self, id: Uuid) -> Result<CardTemplate> {
        self.lock()
            .templates
            .get(&id)
            .cloned()
            .ok_or(StorageError::TemplateNotFound(id))
    }

    fn put_template(&self, template: &CardTemplate) -> Result<()> {
        self.write("template")?.templates.insert(template.id, template.clone());
        Ok(())
    }

    fn get_goal_progress(&self) -> Result<Option<GoalProgress>> {
        Ok(self.lock().goals.clone())
    }

    fn put_goal_progress(&self, progress: &GoalProgress) -> Result<()> {
        self.write("goals")?.goals = Some(progress.clone());
        Ok(())
    }

    fn get_session(&self, id: Uuid) -> Result<PracticeSession> {
        self.lock()
            .sessions
            .get(&id)
            .cloned()
            .ok_or(StorageError::SessionNotFound(id))
    }

    fn put_session(&self, session: &PracticeSession) -> Result<()> {
        self.write("session")?.sessions.insert(session.id, session.clone());
        Ok(())
    }

    fn get_submission(&self, key: &str) -> Result<Option<ReviewSubmission>> {
        Ok(self.lock().submissions.get(key).cloned())
    }

    fn claim_submission(&self, submission: &ReviewSubmission) -> Result<bool> {
        let mut records = self.write("submission")?;
        if records.submissions.contains_key(&submission.key) {
            return Ok(false);
        }
        records.submissions.insert(submission.key.clone(), submission.clone());
        Ok(true)
    }

    fn release_submission(&self, key: &str) -> Result<()> {
        self.write("submission")?.submissions.remove(key);
        Ok(())
    }

    fn list_review_records(&self) -> Result<Vec<ReviewRecord>> {
        let mut reviews = self.lock().reviews.clone();
        reviews.sort_by_key(|r| (r.reviewed_at, r.id));
        Ok(reviews)
    }

    fn put_review_record(&self, record: &ReviewRecord) -> Result<()> {
        self.write("review")?.reviews.push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_put_then_get() {
        let storage = MemoryStorage::new();
        let deck = Deck::new("German".to_string(), "de".to_string());
        storage.put_deck(&deck).unwrap();
        let word = Word::new(deck.id, "Haus".to_string(), String::new(), Utc::now());
        storage.put_word(&word).unwrap();

        assert_eq!(storage.get_deck(deck.id).unwrap(), deck);
        assert_eq!(storage.list_words(Some(deck.id)).unwrap(), vec![word]);
        assert!(storage.list_words(Some(Uuid::new_v4())).unwrap().is_empty());
    }

    #[test]
    fn test_injected_failures_are_transient_and_run_out() {
        let storage = MemoryStorage::new();
        storage.fail_next_writes(1);
        let deck = Deck::new("German".to_string(), "de".to_string());

        let err = storage.put_deck(&deck).unwrap_err();
        assert!(err.is_transient());
        assert!(storage.get_deck(deck.id).is_err());

        storage.put_deck(&deck).unwrap();
        assert!(storage.get_deck(deck.id).is_ok());
    }

    #[test]
    fn test_failing_kind_only_blocks_that_kind() {
        let storage = MemoryStorage::new();
        storage.fail_writes_to("goals");
        let deck = Deck::new("German".to_string(), "de".to_string());
        storage.put_deck(&deck).unwrap();

        let progress = GoalProgress::new(Utc::now());
        assert!(storage.put_goal_progress(&progress).unwrap_err().is_transient());
        assert!(storage.put_goal_progress(&progress).is_err());

        storage.restore_writes();
        storage.put_goal_progress(&progress).unwrap();
    }

    #[test]
    fn test_claim_submission_once() {
        use crate::review::{ItemKind, Rating};

        let storage = MemoryStorage::new();
        let submission = ReviewSubmission {
            key: "k".to_string(),
            item_kind: ItemKind::Word,
            item_id: Uuid::new_v4(),
            rating: Rating::Good,
            session_id: None,
            applied_at: Utc::now(),
        };

        assert!(storage.claim_submission(&submission).unwrap());
        assert!(!storage.claim_submission(&submission).unwrap());
        storage.release_submission("k").unwrap();
        assert!(storage.get_submission("k").unwrap().is_none());
        assert!(storage.claim_submission(&submission).unwrap());
    }
}

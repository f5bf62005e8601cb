//! Persistent record store
//!
//! [`RecordStore`] is the seam between the review logic and wherever records
//! live. [`FileStorage`] keeps them as JSON files in the data directory;
//! [`MemoryStorage`] keeps them in process for tests and dry runs.

mod file_storage;
mod memory;

use uuid::Uuid;

use crate::flashcards::{Card, CardTemplate, Deck};
use crate::goals::GoalProgress;
use crate::review::models::{PracticeSession, ReviewRecord, ReviewSubmission};
use crate::vocab::Word;

pub use file_storage::{FileStorage, Result, StorageError};
pub use memory::MemoryStorage;

/// Read and write access to every persisted record.
///
/// `get_*` fails with the matching `*NotFound` error when the id does not
/// resolve. `put_*` inserts or replaces the whole record in one write.
pub trait RecordStore {
    fn list_decks(&self) -> Result<Vec<Deck>>;
    fn get_deck(&self, id: Uuid) -> Result<Deck>;
    fn put_deck(&self, deck: &Deck) -> Result<()>;

    /// Words of one deck, or of every deck when `deck_id` is `None`
    fn list_words(&self, deck_id: Option<Uuid>) -> Result<Vec<Word>>;
    fn get_word(&self, id: Uuid) -> Result<Word>;
    fn put_word(&self, word: &Word) -> Result<()>;

    /// Cards of one deck, or of every deck when `deck_id` is `None`
    fn list_cards(&self, deck_id: Option<Uuid>) -> Result<Vec<Card>>;
    fn get_card(&self, id: Uuid) -> Result<Card>;
    fn put_card(&self, card: &Card) -> Result<()>;

    /// Stored templates only; the built-in Basic template is not persisted
    fn list_templates(&self) -> Result<Vec<CardTemplate>>;
    fn get_template(&self, id: Uuid) -> Result<CardTemplate>;
    fn put_template(&self, template: &CardTemplate) -> Result<()>;

    fn get_goal_progress(&self) -> Result<Option<GoalProgress>>;
    fn put_goal_progress(&self, progress: &GoalProgress) -> Result<()>;

    fn get_session(&self, id: Uuid) -> Result<PracticeSession>;
    fn put_session(&self, session: &PracticeSession) -> Result<()>;

    fn get_submission(&self, key: &str) -> Result<Option<ReviewSubmission>>;

    /// Store `submission` unless its key is already taken, checking and
    /// inserting in one atomic step. Returns `false` when the key was taken.
    fn claim_submission(&self, submission: &ReviewSubmission) -> Result<bool>;

    /// Free a claimed key whose rating was never written
    fn release_submission(&self, key: &str) -> Result<()>;

    /// Review history, oldest first
    fn list_review_records(&self) -> Result<Vec<ReviewRecord>>;
    fn put_review_record(&self, record: &ReviewRecord) -> Result<()>;
}

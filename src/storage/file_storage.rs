//! JSON file storage
//!
//! Directory structure:
//! ```text
//! {data-dir}/
//! ├── decks.json            # Array of all decks
//! ├── templates.json        # Array of user templates
//! ├── goals/
//! │   └── progress.json     # Weekly counters and streak
//! ├── words/
//! │   └── {word-id}.json
//! ├── cards/
//! │   └── {card-id}.json
//! ├── sessions/
//! │   └── {session-id}.json
//! ├── submissions/
//! │   └── {key-hash}.json   # Claimed submission keys
//! └── reviews/
//!     └── {review-id}.json  # Review history
//! ```
//!
//! Every write goes to a `.json.tmp` sibling first and is renamed into place,
//! so a crash never leaves a half-written record behind. Submission claims
//! are hard-linked into place instead, which fails when the key file exists.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use super::RecordStore;
use crate::flashcards::{Card, CardTemplate, Deck};
use crate::goals::GoalProgress;
use crate::review::models::{PracticeSession, ReviewRecord, ReviewSubmission};
use crate::vocab::Word;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Deck not found: {0}")]
    DeckNotFound(Uuid),

    #[error("Word not found: {0}")]
    WordNotFound(Uuid),

    #[error("Card not found: {0}")]
    CardNotFound(Uuid),

    #[error("Template not found: {0}")]
    TemplateNotFound(Uuid),

    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("Storage temporarily unavailable: {0}")]
    Transient(String),

    #[error("Data directory not found")]
    DataDirNotFound,
}

impl StorageError {
    /// Whether retrying the same call may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            StorageError::Transient(_) => true,
            StorageError::Io(err) => matches!(
                err.kind(),
                ErrorKind::Interrupted | ErrorKind::WouldBlock | ErrorKind::TimedOut
            ),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;

pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Get the default data directory
    pub fn default_data_dir() -> Result<PathBuf> {
        dirs::data_local_dir()
            .map(|p| p.join("lexis"))
            .ok_or(StorageError::DataDirNotFound)
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Initialize storage directories
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(self.words_dir())?;
        fs::create_dir_all(self.cards_dir())?;
        fs::create_dir_all(self.sessions_dir())?;
        fs::create_dir_all(self.submissions_dir())?;
        fs::create_dir_all(self.reviews_dir())?;
        fs::create_dir_all(self.base_path.join("goals"))?;
        Ok(())
    }

    fn decks_path(&self) -> PathBuf {
        self.base_path.join("decks.json")
    }

    fn templates_path(&self) -> PathBuf {
        self.base_path.join("templates.json")
    }

    fn goals_path(&self) -> PathBuf {
        self.base_path.join("goals").join("progress.json")
    }

    fn words_dir(&self) -> PathBuf {
        self.base_path.join("words")
    }

    fn cards_dir(&self) -> PathBuf {
        self.base_path.join("cards")
    }

    fn sessions_dir(&self) -> PathBuf {
        self.base_path.join("sessions")
    }

    fn word_path(&self, id: Uuid) -> PathBuf {
        self.words_dir().join(format!("{}.json", id))
    }

    fn card_path(&self, id: Uuid) -> PathBuf {
        self.cards_dir().join(format!("{}.json", id))
    }

    fn session_path(&self, id: Uuid) -> PathBuf {
        self.sessions_dir().join(format!("{}.json", id))
    }

    fn submissions_dir(&self) -> PathBuf {
        self.base_path.join("submissions")
    }

    fn reviews_dir(&self) -> PathBuf {
        self.base_path.join("reviews")
    }

    /// Keys are arbitrary caller strings, so the file is named by a hash of
    /// the key
    fn submission_path(&self, key: &str) -> PathBuf {
        let name = Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes());
        self.submissions_dir().join(format!("{}.json", name))
    }

    fn review_path(&self, id: Uuid) -> PathBuf {
        self.reviews_dir().join(format!("{}.json", id))
    }
}

/// Write using atomic write (write to .tmp then rename)
fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(value)?;
    fs::write(&tmp_path, json)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&content)?))
}

/// Every `*.json` record in a directory; leftover `.json.tmp` files are ignored
fn read_dir_json<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut items = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().map_or(false, |ext| ext == "json") {
            let content = fs::read_to_string(&path)?;
            items.push(serde_json::from_str(&content)?);
        }
    }
    Ok(items)
}

/// Replace the entry with the same id, or append it
fn upsert<T: Clone>(items: &mut Vec<T>, item: &T, same: impl Fn(&T) -> bool) {
    match items.iter().position(same) {
        Some(pos) => items[pos] = item.clone(),
        None => items.push(item.clone()),
    }
}

impl RecordStore for FileStorage {
    // ===== Decks =====

    fn list_decks(&self) -> Result<Vec<Deck>> {
        Ok(read_json(&self.decks_path())?.unwrap_or_default())
    }

    fn get_deck(&self, id: Uuid) -> Result<Deck> {
        self.list_decks()?
            .into_iter()
            .find(|d| d.id == id)
            .ok_or(StorageError::DeckNotFound(id))
    }

    fn put_deck(&self, deck: &Deck) -> Result<()> {
        let mut decks = self.list_decks()?;
        upsert(&mut decks, deck, |d| d.id == deck.id);
        write_json(&self.decks_path(), &decks)
    }

    // ===== Words =====

    fn list_words(&self, deck_id: Option<Uuid>) -> Result<Vec<Word>> {
        let mut words: Vec<Word> = read_dir_json(&self.words_dir())?;
        if let Some(deck_id) = deck_id {
            words.retain(|w| w.deck_id == deck_id);
        }
        words.sort_by_key(|w| (w.created_at, w.id));
        Ok(words)
    }

    fn get_word(&self, id: Uuid) -> Result<Word> {
        read_json(&self.word_path(id))?.ok_or(StorageError::WordNotFound(id))
    }

    fn put_word(&self, word: &Word) -> Result<()> {
        write_json(&self.word_path(word.id), word)
    }

    // ===== Cards =====

    fn list_cards(&self, deck_id: Option<Uuid>) -> Result<Vec<Card>> {
        let mut cards: Vec<Card> = read_dir_json(&self.cards_dir())?;
        if let Some(deck_id) = deck_id {
            cards.retain(|c| c.deck_id == deck_id);
        }
        cards.sort_by_key(|c| (c.created_at, c.id));
        Ok(cards)
    }

    fn get_card(&self, id: Uuid) -> Result<Card> {
        read_json(&self.card_path(id))?.ok_or(StorageError::CardNotFound(id))
    }

    fn put_card(&self, card: &Card) -> Result<()> {
        write_json(&self.card_path(card.id), card)
    }

    // ===== Templates =====

    fn list_templates(&self) -> Result<Vec<CardTemplate>> {
        Ok(read_json(&self.templates_path())?.unwrap_or_default())
    }

    fn get_template(&self, id: Uuid) -> Result<CardTemplate> {
        self.list_templates()?
            .into_iter()
            .find(|t| t.id == id)
            .ok_or(StorageError::TemplateNotFound(id))
    }

    fn put_template(&self, template: &CardTemplate) -> Result<()> {
        let mut templates = self.list_templates()?;
        upsert(&mut templates, template, |t| t.id == template.id);
        write_json(&self.templates_path(), &templates)
    }

    // ===== Goals =====

    fn get_goal_progress(&self) -> Result<Option<GoalProgress>> {
        read_json(&self.goals_path())
    }

    fn put_goal_progress(&self, progress: &GoalProgress) -> Result<()> {
        write_json(&self.goals_path(), progress)
    }

    // ===== Sessions =====

    fn get_session(&self, id: Uuid) -> Result<PracticeSession> {
        read_json(&self.session_path(id))?.ok_or(StorageError::SessionNotFound(id))
    }

    fn put_session(&self, session: &PracticeSession) -> Result<()> {
        write_json(&self.session_path(session.id), session)
    }

    // ===== Submissions =====

    fn get_submission(&self, key: &str) -> Result<Option<ReviewSubmission>> {
        let submission: Option<ReviewSubmission> = read_json(&self.submission_path(key))?;
        Ok(submission.filter(|s| s.key == key))
    }

    fn claim_submission(&self, submission: &ReviewSubmission) -> Result<bool> {
        let path = self.submission_path(&submission.key);
        fs::create_dir_all(self.submissions_dir())?;

        // The complete record is written under a unique name first, then
        // linked to the key's path. Linking fails if the path exists, so of
        // two processes claiming the same key exactly one wins.
        let tmp_path = path.with_extension(format!("{}.json.tmp", Uuid::new_v4()));
        fs::write(&tmp_path, serde_json::to_string_pretty(submission)?)?;
        let linked = fs::hard_link(&tmp_path, &path);
        if let Err(err) = fs::remove_file(&tmp_path) {
            log::warn!("Failed to remove {}: {}", tmp_path.display(), err);
        }

        match linked {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn release_submission(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.submission_path(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    // ===== Review history =====

    fn list_review_records(&self) -> Result<Vec<ReviewRecord>> {
        let mut records: Vec<ReviewRecord> = read_dir_json(&self.reviews_dir())?;
        records.sort_by_key(|r| (r.reviewed_at, r.id));
        Ok(records)
    }

    fn put_review_record(&self, record: &ReviewRecord) -> Result<()> {
        write_json(&self.review_path(record.id), record)
    }
}

//! Review session orchestration
//!
//! Every operation reads the records it needs, computes new state with the
//! pure schedulers and writes each changed record once. Input is validated
//! and every record is loaded before anything is written. Storage calls are
//! retried once when the store reports a transient failure.
//!
//! Operations touching several records have one commit write, such as the
//! rated item for a rating. An error before it leaves nothing changed.
//! Writes after it (history, session stats, goals, a linked word) are
//! logged when they fail and never turn a committed operation into an
//! error, so a caller retrying after an error never applies a rating
//! twice.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::error::{ReviewError, Result};
use super::models::{PracticeSession, RatedItem, ReviewRecord, ReviewStats, ReviewSubmission};
use super::queue::{DueItem, DueQueueSelector, Scope};
use super::rating::{ItemKind, Rating};
use super::schedulable::{Schedulable, Schedulers};
use crate::clock::{Clock, SystemClock};
use crate::config::SchedulerConfig;
use crate::flashcards::templates::fallback_sides;
use crate::flashcards::{
    BulkCreateReport, Card, CardScheduler, CardTemplate, Deck, FailedWord, PlaceholderRenderer, TemplateRenderer,
    WordFields,
};
use crate::goals::{CheckInOutcome, GoalProgress, GoalTracker, GoalsSummary, WeeklyTargets};
use crate::storage::{self, RecordStore};
use crate::vocab::{
    CaptureAction, CaptureOutcome, FamiliarityDelta, Word, WordAnalysis, WordStatus, WordStrengthTracker,
};

/// Entry point for every review operation, generic over the record store
pub struct ReviewSession<S: RecordStore> {
    store: S,
    config: SchedulerConfig,
    schedulers: Schedulers,
    selector: DueQueueSelector,
    goals: GoalTracker,
    renderer: Box<dyn TemplateRenderer + Send + Sync>,
    clock: Arc<dyn Clock>,
}

impl<S: RecordStore> ReviewSession<S> {
    pub fn new(store: S, config: SchedulerConfig) -> Result<Self> {
        config.validate()?;

        let schedulers = Schedulers {
            words: WordStrengthTracker::new(config.interval_table()?),
            cards: CardScheduler::new(config.quality_map()?),
        };
        let selector = DueQueueSelector::new(config.queue_policy());
        let goals = GoalTracker::new(WeeklyTargets {
            words_per_week: config.goals.words_per_week,
            sessions_per_week: config.goals.sessions_per_week,
        });

        Ok(Self {
            store,
            config,
            schedulers,
            selector,
            goals,
            renderer: Box::new(PlaceholderRenderer),
            clock: Arc::new(SystemClock),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_renderer(mut self, renderer: impl TemplateRenderer + Send + Sync + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn schedulers(&self) -> &Schedulers {
        &self.schedulers
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Run a storage call, retrying once on a transient failure
    fn with_retry<T>(&self, mut op: impl FnMut(&S) -> storage::Result<T>) -> Result<T> {
        match op(&self.store) {
            Err(err) if err.is_transient() => {
                log::warn!("Transient storage error, retrying once: {}", err);
                op(&self.store).map_err(ReviewError::from)
            }
            result => result.map_err(ReviewError::from),
        }
    }

    /// A write after the commit point; a failure is logged, not returned
    fn follow_up(&self, what: &str, op: impl FnMut(&S) -> storage::Result<()>) {
        if let Err(err) = self.with_retry(op) {
            log::warn!("Committed, but {} was not saved: {}", what, err);
        }
    }

    // ===== Decks =====

    pub fn create_deck(&self, name: &str, language: &str, default_template_id: Option<Uuid>) -> Result<Deck> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ReviewError::InvalidInput("deck name must not be empty".to_string()));
        }
        if let Some(template_id) = default_template_id {
            self.get_template(template_id)?;
        }

        let mut deck = Deck::new(name.to_string(), language.trim().to_string());
        deck.default_template_id = default_template_id;
        deck.created_at = self.now();
        self.with_retry(|s| s.put_deck(&deck))?;

        log::info!("Created deck '{}' ({})", deck.name, deck.id);
        Ok(deck)
    }

    pub fn list_decks(&self) -> Result<Vec<Deck>> {
        self.with_retry(|s| s.list_decks())
    }

    pub fn get_deck(&self, id: Uuid) -> Result<Deck> {
        self.with_retry(|s| s.get_deck(id))
    }

    /// Change (or clear) the template a deck generates cards with
    pub fn set_default_template(&self, deck_id: Uuid, template_id: Option<Uuid>) -> Result<Deck> {
        let mut deck = self.get_deck(deck_id)?;
        if let Some(template_id) = template_id {
            self.get_template(template_id)?;
        }
        deck.default_template_id = template_id;
        self.with_retry(|s| s.put_deck(&deck))?;
        Ok(deck)
    }

    // ===== Templates =====

    pub fn create_template(&self, name: &str, front_template: &str, back_template: &str) -> Result<CardTemplate> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ReviewError::InvalidInput("template name must not be empty".to_string()));
        }

        let template = CardTemplate::new(name.to_string(), front_template.to_string(), back_template.to_string());
        self.with_retry(|s| s.put_template(&template))?;

        log::info!("Created card template '{}' ({})", template.name, template.id);
        Ok(template)
    }

    /// The built-in Basic template followed by the stored ones
    pub fn list_templates(&self) -> Result<Vec<CardTemplate>> {
        let mut templates = vec![CardTemplate::basic()];
        templates.extend(self.with_retry(|s| s.list_templates())?);
        Ok(templates)
    }

    pub fn get_template(&self, id: Uuid) -> Result<CardTemplate> {
        if id == CardTemplate::basic_id() {
            return Ok(CardTemplate::basic());
        }
        self.with_retry(|s| s.get_template(id))
    }

    /// Explicit template, else the deck's default, else Basic. An id that no
    /// longer resolves falls back to Basic.
    fn resolve_template(&self, explicit: Option<Uuid>, deck: &Deck) -> Result<CardTemplate> {
        let Some(id) = explicit.or(deck.default_template_id) else {
            return Ok(CardTemplate::basic());
        };
        match self.get_template(id) {
            Ok(template) => Ok(template),
            Err(ReviewError::NotFound { .. }) => {
                log::warn!("Card template {} not found, using Basic", id);
                Ok(CardTemplate::basic())
            }
            Err(err) => Err(err),
        }
    }

    // ===== Words =====

    /// Record an encounter with `term` in a deck.
    ///
    /// A term already in the deck (compared case-insensitively) gets its
    /// encounter count bumped and missing analysis filled in. A new term is
    /// created as seen, immediately due, and counts toward the weekly word goal.
    pub fn capture_word(
        &self,
        deck_id: Uuid,
        term: &str,
        context: &str,
        analysis: WordAnalysis,
    ) -> Result<CaptureOutcome> {
        let term = term.trim();
        if term.is_empty() {
            return Err(ReviewError::InvalidInput("term must not be empty".to_string()));
        }
        let deck = self.get_deck(deck_id)?;
        let now = self.now();
        let context = context.trim();

        let existing = self
            .with_retry(|s| s.list_words(Some(deck.id)))?
            .into_iter()
            .find(|w| same_term(&w.term, term));

        if let Some(mut word) = existing {
            word.encounters += 1;
            if word.status == WordStatus::New {
                word.status = WordStatus::Seen;
            }
            if word.context.is_empty() {
                word.context = context.to_string();
            }
            fill_missing_analysis(&mut word, analysis);
            self.with_retry(|s| s.put_word(&word))?;

            log::debug!("Word '{}' encountered again ({} times)", word.term, word.encounters);
            return Ok(CaptureOutcome {
                action: CaptureAction::Updated,
                word,
            });
        }

        let mut goals = self.load_goals(now)?;
        self.goals.record_new_word(&mut goals, now);

        let mut word = Word::new(deck.id, term.to_string(), context.to_string(), now);
        word.status = WordStatus::Seen;
        word.encounters = 1;
        fill_missing_analysis(&mut word, analysis);
        self.with_retry(|s| s.put_word(&word))?;
        self.follow_up("weekly word count", |s| s.put_goal_progress(&goals));

        log::info!("Captured word '{}' into deck {}", word.term, deck.id);
        Ok(CaptureOutcome {
            action: CaptureAction::Created,
            word,
        })
    }

    /// Words of one deck, or all words
    pub fn list_words(&self, deck_id: Option<Uuid>) -> Result<Vec<Word>> {
        if let Some(id) = deck_id {
            self.get_deck(id)?;
        }
        self.with_retry(|s| s.list_words(deck_id))
    }

    pub fn get_word(&self, id: Uuid) -> Result<Word> {
        self.with_retry(|s| s.get_word(id))
    }

    pub fn adjust_familiarity(&self, word_id: Uuid, delta: FamiliarityDelta) -> Result<Word> {
        let word = self.get_word(word_id)?;
        let updated = self.schedulers.words.adjust_familiarity(&word, delta, self.now());
        self.with_retry(|s| s.put_word(&updated))?;

        log::debug!(
            "Word {} familiarity {} -> {}",
            word_id,
            word.familiarity_score,
            updated.familiarity_score
        );
        Ok(updated)
    }

    pub fn mark_known(&self, word_id: Uuid) -> Result<Word> {
        let word = self.get_word(word_id)?;
        let updated = self.schedulers.words.mark_known(&word, self.now());
        self.with_retry(|s| s.put_word(&updated))?;

        log::info!("Word '{}' marked as known", updated.term);
        Ok(updated)
    }

    // ===== Cards =====

    /// A standalone card not tied to any word
    pub fn create_card(&self, deck_id: Uuid, front: &str, back: &str) -> Result<Card> {
        if front.trim().is_empty() {
            return Err(ReviewError::InvalidInput("card front must not be empty".to_string()));
        }
        let deck = self.get_deck(deck_id)?;

        let card = Card::new(deck.id, front.to_string(), back.to_string(), self.now())
            .with_easiness(self.config.sm2.initial_easiness);
        self.with_retry(|s| s.put_card(&card))?;

        log::info!("Created card {} in deck {}", card.id, deck.id);
        Ok(card)
    }

    /// Generate the card for one word, failing with `AlreadyExists` when the
    /// word already has a card in the target deck
    pub fn create_card_for_word(
        &self,
        word_id: Uuid,
        template_id: Option<Uuid>,
        deck_id: Option<Uuid>,
    ) -> Result<Card> {
        let word = self.get_word(word_id)?;
        let deck = self.get_deck(deck_id.unwrap_or(word.deck_id))?;

        let exists = self
            .with_retry(|s| s.list_cards(Some(deck.id)))?
            .iter()
            .any(|c| c.word_id == Some(word.id));
        if exists {
            return Err(ReviewError::AlreadyExists(format!(
                "card for word {} in deck {}",
                word.id, deck.id
            )));
        }

        let template = self.resolve_template(template_id, &deck)?;
        let card = self.render_card(&word, &deck, &template, self.now());
        self.with_retry(|s| s.put_card(&card))?;

        log::info!("Created card {} for word '{}'", card.id, word.term);
        Ok(card)
    }

    /// Generate one card per (word, deck) pair.
    ///
    /// Pairs that already have a card are skipped, so running the same batch
    /// twice creates nothing the second time. Words that do not resolve or
    /// cannot be written are reported individually; only an unknown
    /// `deck_id` override fails the whole call.
    pub fn bulk_create_cards(
        &self,
        word_ids: &[Uuid],
        template_id: Option<Uuid>,
        deck_id: Option<Uuid>,
    ) -> Result<BulkCreateReport> {
        let now = self.now();
        let override_deck = match deck_id {
            Some(id) => Some(self.get_deck(id)?),
            None => None,
        };

        let mut existing: HashSet<(Uuid, Uuid)> = self
            .with_retry(|s| s.list_cards(None))?
            .iter()
            .filter_map(|c| c.word_id.map(|word_id| (word_id, c.deck_id)))
            .collect();
        let mut targets: HashMap<Uuid, (Deck, CardTemplate)> = HashMap::new();
        let mut report = BulkCreateReport::default();

        for &word_id in word_ids {
            let word = match self.get_word(word_id) {
                Ok(word) => word,
                Err(ReviewError::NotFound { .. }) => {
                    log::debug!("Skipping unknown word {}", word_id);
                    report.missing.push(word_id);
                    continue;
                }
                Err(err) => {
                    report.failed.push(FailedWord {
                        word_id,
                        reason: err.to_string(),
                    });
                    continue;
                }
            };

            let target_deck_id = override_deck.as_ref().map_or(word.deck_id, |d| d.id);
            if existing.contains(&(word_id, target_deck_id)) {
                log::debug!("Word {} already has a card in deck {}", word_id, target_deck_id);
                report.skipped.push(word_id);
                continue;
            }

            let target = match targets.entry(target_deck_id) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    match self.bulk_target(override_deck.as_ref(), target_deck_id, template_id) {
                        Ok(target) => entry.insert(target),
                        Err(err) => {
                            report.failed.push(FailedWord {
                                word_id,
                                reason: err.to_string(),
                            });
                            continue;
                        }
                    }
                }
            };

            let card = self.render_card(&word, &target.0, &target.1, now);
            match self.with_retry(|s| s.put_card(&card)) {
                Ok(()) => {
                    existing.insert((word_id, target_deck_id));
                    report.created.push(card);
                }
                Err(err) => {
                    log::warn!("Failed to write card for word {}: {}", word_id, err);
                    report.failed.push(FailedWord {
                        word_id,
                        reason: err.to_string(),
                    });
                }
            }
        }

        log::info!(
            "Bulk card creation: {} created, {} skipped, {} missing, {} failed",
            report.created.len(),
            report.skipped.len(),
            report.missing.len(),
            report.failed.len()
        );
        Ok(report)
    }

    fn bulk_target(
        &self,
        override_deck: Option<&Deck>,
        deck_id: Uuid,
        template_id: Option<Uuid>,
    ) -> Result<(Deck, CardTemplate)> {
        let deck = match override_deck {
            Some(deck) => deck.clone(),
            None => self.get_deck(deck_id)?,
        };
        let template = self.resolve_template(template_id, &deck)?;
        Ok((deck, template))
    }

    fn render_card(&self, word: &Word, deck: &Deck, template: &CardTemplate, now: DateTime<Utc>) -> Card {
        let (front, back) = self.renderer.render(template, &WordFields::from_word(word));
        let (front, back) = fallback_sides(word, front, back);

        let mut card = Card::new(deck.id, front, back, now).with_easiness(self.config.sm2.initial_easiness);
        card.template_id = Some(template.id);
        card.word_id = Some(word.id);
        card
    }

    pub fn list_cards(&self, deck_id: Option<Uuid>) -> Result<Vec<Card>> {
        if let Some(id) = deck_id {
            self.get_deck(id)?;
        }
        self.with_retry(|s| s.list_cards(deck_id))
    }

    pub fn get_card(&self, id: Uuid) -> Result<Card> {
        self.with_retry(|s| s.get_card(id))
    }

    /// Interval in days each rating would give the card, Again to Easy
    pub fn preview_intervals(&self, card_id: Uuid) -> Result<[u32; 4]> {
        let card = self.get_card(card_id)?;
        Ok(self.schedulers.cards.preview_intervals(&card, self.now()))
    }

    // ===== Reviews =====

    pub fn review_card(&self, card_id: Uuid, rating: i64, session_id: Option<Uuid>) -> Result<Card> {
        match self.submit_rating(card_id, ItemKind::Card, rating, session_id, None)? {
            RatedItem::Card(card) => Ok(card),
            RatedItem::Word(word) => Err(ReviewError::StateInvariantViolation(format!(
                "card {} resolved to word {}",
                card_id, word.id
            ))),
        }
    }

    /// Apply a 1-4 rating to a word or a card.
    ///
    /// With a `submission_key`, the key is claimed before anything else is
    /// read. A replay of an already claimed key returns the item's current
    /// state without rating it again, and reusing a key for a different item
    /// fails with `AlreadyExists`. If the rating cannot be written the claim
    /// is released so the caller can retry with the same key.
    ///
    /// Rating a card generated from a word also moves that word one
    /// familiarity step.
    pub fn submit_rating(
        &self,
        item_id: Uuid,
        kind: ItemKind,
        rating: i64,
        session_id: Option<Uuid>,
        submission_key: Option<&str>,
    ) -> Result<RatedItem> {
        let rating = Rating::from_value(rating)?;
        if submission_key.is_some_and(|key| key.trim().is_empty()) {
            return Err(ReviewError::InvalidInput("submission key must not be empty".to_string()));
        }

        let now = self.now();
        let Some(key) = submission_key else {
            return self.apply_rating(kind, item_id, rating, session_id, now);
        };

        let submission = ReviewSubmission {
            key: key.to_string(),
            item_kind: kind,
            item_id,
            rating,
            session_id,
            applied_at: now,
        };
        if !self.with_retry(|s| s.claim_submission(&submission))? {
            return self.replay_submission(key, kind, item_id);
        }

        let result = self.apply_rating(kind, item_id, rating, session_id, now);
        if result.is_err() {
            if let Err(err) = self.with_retry(|s| s.release_submission(key)) {
                log::warn!("Failed to release submission '{}': {}", key, err);
            }
        }
        result
    }

    fn replay_submission(&self, key: &str, kind: ItemKind, item_id: Uuid) -> Result<RatedItem> {
        let previous = self.with_retry(|s| s.get_submission(key))?;
        if let Some(previous) = previous.filter(|p| p.item_id != item_id || p.item_kind != kind) {
            return Err(ReviewError::AlreadyExists(format!(
                "submission key '{}' was used for {} {}",
                key, previous.item_kind, previous.item_id
            )));
        }
        log::debug!("Submission '{}' already applied, returning current state", key);
        self.load_item(kind, item_id)
    }

    /// Load everything, compute every next state, then write the item. The
    /// item write is the commit point.
    fn apply_rating(
        &self,
        kind: ItemKind,
        item_id: Uuid,
        rating: Rating,
        session_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<RatedItem> {
        let item = self.load_item(kind, item_id)?;
        let session = match session_id {
            Some(id) => {
                let session = self.with_retry(|s| s.get_session(id))?;
                if session.is_completed() {
                    return Err(ReviewError::InvalidInput(format!("session {} is already completed", id)));
                }
                Some(session)
            }
            None => None,
        };
        let linked_word = match &item {
            RatedItem::Card(card) => self.linked_word(card)?,
            RatedItem::Word(_) => None,
        };
        let mut goals = self.load_goals(now)?;

        let qualities = self.schedulers.cards.quality_map();
        let quality = qualities.quality(rating);
        let passed = qualities.is_passing(rating);

        let rated = item.rated(rating, &self.schedulers, now);
        let record = ReviewRecord::new(&rated, rating, quality, passed, session_id, now);
        let linked_word = linked_word.map(|word| {
            self.schedulers
                .words
                .adjust_familiarity(&word, FamiliarityDelta::for_rating(rating), now)
        });
        let session = session.map(|mut session| {
            session.stats.record(passed);
            session
        });
        self.goals.award_review_points(&mut goals, quality);

        self.store_item(&rated)?;

        self.follow_up("review history", |s| s.put_review_record(&record));
        if let Some(word) = &linked_word {
            self.follow_up("linked word familiarity", |s| s.put_word(word));
        }
        if let Some(session) = &session {
            self.follow_up("session stats", |s| s.put_session(session));
        }
        self.follow_up("review points", |s| s.put_goal_progress(&goals));

        log::debug!("Rated {} {} as {}", kind, item_id, rating);
        Ok(rated)
    }

    /// The word a card was generated from, if it still exists
    fn linked_word(&self, card: &Card) -> Result<Option<Word>> {
        let Some(word_id) = card.word_id else {
            return Ok(None);
        };
        match self.get_word(word_id) {
            Ok(word) => Ok(Some(word)),
            Err(ReviewError::NotFound { .. }) => {
                log::debug!("Card {} links to missing word {}", card.id, word_id);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn load_item(&self, kind: ItemKind, id: Uuid) -> Result<RatedItem> {
        match kind {
            ItemKind::Word => self.get_word(id).map(RatedItem::Word),
            ItemKind::Card => self.get_card(id).map(RatedItem::Card),
        }
    }

    fn store_item(&self, item: &RatedItem) -> Result<()> {
        match item {
            RatedItem::Word(word) => self.with_retry(|s| s.put_word(word)),
            RatedItem::Card(card) => self.with_retry(|s| s.put_card(card)),
        }
    }

    /// Due words and cards for `scope`, most urgent first. `limit` defaults
    /// to the configured queue size.
    pub fn get_due_queue(&self, scope: Scope, limit: Option<usize>) -> Result<Vec<DueItem>> {
        let deck_id = scope.deck_id();
        if let Some(id) = deck_id {
            self.get_deck(id)?;
        }

        let words = self.with_retry(|s| s.list_words(deck_id))?;
        let cards = self.with_retry(|s| s.list_cards(deck_id))?;
        let items: Vec<&dyn Schedulable> = words
            .iter()
            .map(|w| w as &dyn Schedulable)
            .chain(cards.iter().map(|c| c as &dyn Schedulable))
            .collect();

        let limit = limit.unwrap_or(self.config.queue.default_limit);
        Ok(self.selector.select(&items, scope, limit, self.now()))
    }

    /// Item counts, due counts and review history for `scope`
    pub fn review_stats(&self, scope: Scope) -> Result<ReviewStats> {
        let deck_id = scope.deck_id();
        if let Some(id) = deck_id {
            self.get_deck(id)?;
        }
        let now = self.now();

        let words = self.with_retry(|s| s.list_words(deck_id))?;
        let cards = self.with_retry(|s| s.list_cards(deck_id))?;
        let records = self.with_retry(|s| s.list_review_records())?;

        let mut stats = ReviewStats::from_records(
            records.iter().filter(|r| scope.contains(r.deck_id)),
            now,
            self.config.stats.window_days,
        );
        stats.total_words = words.len();
        stats.total_cards = cards.len();
        stats.due_words = words.iter().filter(|w| w.is_due(now)).count();
        stats.due_cards = cards.iter().filter(|c| c.is_due(now)).count();
        Ok(stats)
    }

    // ===== Practice sessions =====

    pub fn start_session(&self, scope: Scope) -> Result<PracticeSession> {
        if let Some(id) = scope.deck_id() {
            self.get_deck(id)?;
        }
        let session = PracticeSession::new(scope, self.now());
        self.with_retry(|s| s.put_session(&session))?;

        log::info!("Started practice session {}", session.id);
        Ok(session)
    }

    pub fn get_session(&self, id: Uuid) -> Result<PracticeSession> {
        self.with_retry(|s| s.get_session(id))
    }

    /// Close a session and count it toward the weekly goal. Completing a
    /// session twice is a no-op.
    pub fn complete_session(&self, id: Uuid) -> Result<PracticeSession> {
        let mut session = self.get_session(id)?;
        if session.is_completed() {
            log::debug!("Session {} already completed", id);
            return Ok(session);
        }

        let now = self.now();
        let mut goals = self.load_goals(now)?;
        self.goals.record_session(&mut goals, now);

        session.completed_at = Some(now);
        self.with_retry(|s| s.put_session(&session))?;
        self.follow_up("weekly session count", |s| s.put_goal_progress(&goals));

        log::info!(
            "Completed practice session {}: {} reviewed, {} correct",
            id,
            session.stats.reviewed,
            session.stats.correct
        );
        Ok(session)
    }

    // ===== Goals =====

    /// Load the goal counters, roll them into the current week, apply
    /// `update` and persist the result
    fn update_goals<R>(
        &self,
        now: DateTime<Utc>,
        update: impl FnOnce(&GoalTracker, &mut GoalProgress) -> R,
    ) -> Result<R> {
        let mut progress = self.load_goals(now)?;
        let result = update(&self.goals, &mut progress);
        self.with_retry(|s| s.put_goal_progress(&progress))?;
        Ok(result)
    }

    fn load_goals(&self, now: DateTime<Utc>) -> Result<GoalProgress> {
        let mut progress = self
            .with_retry(|s| s.get_goal_progress())?
            .unwrap_or_else(|| self.goals.start(now));
        self.goals.roll_week(&mut progress, now);
        Ok(progress)
    }

    /// Daily check-in for the current UTC date
    pub fn check_in(&self) -> Result<CheckInOutcome> {
        let now = self.now();
        let outcome = self.update_goals(now, |goals, progress| goals.check_in(progress, now.date_naive()))?;
        log::debug!("Check-in {:?}, streak {}", outcome.kind, outcome.streak);
        Ok(outcome)
    }

    pub fn goals_summary(&self) -> Result<GoalsSummary> {
        let progress = self.load_goals(self.now())?;
        Ok(self.goals.summary(&progress))
    }
}

fn same_term(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

fn fill_missing_analysis(word: &mut Word, analysis: WordAnalysis) {
    fn non_empty(value: Option<String>) -> Option<String> {
        value.filter(|v| !v.trim().is_empty())
    }

    if word.translation.is_none() {
        word.translation = non_empty(analysis.translation);
    }
    if word.part_of_speech.is_none() {
        word.part_of_speech = non_empty(analysis.part_of_speech);
    }
    if word.literal_translation.is_none() {
        word.literal_translation = non_empty(analysis.literal_translation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::goals::CheckInKind;
    use crate::storage::MemoryStorage;
    use chrono::{Duration, TimeZone};

    /// A Wednesday
    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 4, 9, 0, 0).unwrap()
    }

    fn service() -> (ReviewSession<MemoryStorage>, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(t0()));
        let service = ReviewSession::new(MemoryStorage::new(), SchedulerConfig::default())
            .unwrap()
            .with_clock(clock.clone());
        (service, clock)
    }

    fn analysis(translation: &str) -> WordAnalysis {
        WordAnalysis {
            translation: Some(translation.to_string()),
            ..Default::default()
        }
    }

    fn deck(service: &ReviewSession<MemoryStorage>) -> Deck {
        service.create_deck("Spanish", "es", None).unwrap()
    }

    #[test]
    fn test_capture_twice_counts_one_new_word() {
        let (service, _clock) = service();
        let deck = deck(&service);

        let first = service
            .capture_word(deck.id, "casa", "La casa es grande.", WordAnalysis::default())
            .unwrap();
        assert_eq!(first.action, CaptureAction::Created);
        assert_eq!(first.word.status, WordStatus::Seen);
        assert_eq!(first.word.encounters, 1);
        assert!(first.word.is_due(t0()));

        let second = service.capture_word(deck.id, "Casa", "", analysis("house")).unwrap();
        assert_eq!(second.action, CaptureAction::Updated);
        assert_eq!(second.word.id, first.word.id);
        assert_eq!(second.word.encounters, 2);
        assert_eq!(second.word.translation.as_deref(), Some("house"));
        assert_eq!(second.word.context, "La casa es grande.");

        assert_eq!(service.goals_summary().unwrap().new_words_this_week, 1);
    }

    #[test]
    fn test_capture_validates_before_writing() {
        let (service, _clock) = service();
        let err = service
            .capture_word(Uuid::new_v4(), "casa", "", WordAnalysis::default())
            .unwrap_err();
        assert!(matches!(err, ReviewError::NotFound { kind: "Deck", .. }));

        let deck = deck(&service);
        let err = service.capture_word(deck.id, "   ", "", WordAnalysis::default()).unwrap_err();
        assert!(matches!(err, ReviewError::InvalidInput(_)));
        assert!(service.list_words(Some(deck.id)).unwrap().is_empty());
    }

    #[test]
    fn test_adjust_familiarity_persists() {
        let (service, _clock) = service();
        let deck = deck(&service);
        let word = service
            .capture_word(deck.id, "perro", "", WordAnalysis::default())
            .unwrap()
            .word;

        let updated = service.adjust_familiarity(word.id, FamiliarityDelta::Up).unwrap();
        assert_eq!(updated.familiarity_score, 2);
        assert_eq!(updated.next_review_date, t0() + Duration::days(1));
        assert_eq!(service.get_word(word.id).unwrap(), updated);

        let err = service
            .adjust_familiarity(Uuid::new_v4(), FamiliarityDelta::Down)
            .unwrap_err();
        assert!(matches!(err, ReviewError::NotFound { kind: "Word", .. }));
    }

    #[test]
    fn test_mark_known() {
        let (service, _clock) = service();
        let deck = deck(&service);
        let word = service
            .capture_word(deck.id, "gato", "", WordAnalysis::default())
            .unwrap()
            .word;

        let known = service.mark_known(word.id).unwrap();
        assert_eq!(known.status, WordStatus::Learned);
        assert_eq!(known.familiarity_score, 5);
        assert_eq!(known.next_review_date, t0() + Duration::days(365));
    }

    #[test]
    fn test_review_card_rejects_out_of_range_ratings() {
        let (service, _clock) = service();
        let deck = deck(&service);
        let card = service.create_card(deck.id, "casa", "house").unwrap();

        for rating in [0, 5, -1] {
            let err = service.review_card(card.id, rating, None).unwrap_err();
            assert!(matches!(err, ReviewError::InvalidRating(r) if r == rating));
        }
        assert_eq!(service.get_card(card.id).unwrap(), card);
        assert_eq!(service.goals_summary().unwrap().points, 0);
    }

    #[test]
    fn test_review_card_progression() {
        let (service, clock) = service();
        let deck = deck(&service);
        let card = service.create_card(deck.id, "casa", "house").unwrap();

        let first = service.review_card(card.id, 3, None).unwrap();
        assert_eq!((first.repetition, first.interval), (1, 1));
        assert_eq!(first.last_reviewed_date, Some(t0()));

        clock.advance(Duration::days(1));
        let second = service.review_card(card.id, 3, None).unwrap();
        assert_eq!((second.repetition, second.interval), (2, 6));
        assert_eq!(second.next_review_date, t0() + Duration::days(7));

        clock.advance(Duration::days(6));
        let failed = service.review_card(card.id, 1, None).unwrap();
        assert_eq!((failed.repetition, failed.interval), (0, 1));
        assert_eq!(failed.easiness_factor, second.easiness_factor);
    }

    #[test]
    fn test_replayed_submission_is_not_applied_twice() {
        let (service, _clock) = service();
        let deck = deck(&service);
        let card = service.create_card(deck.id, "casa", "house").unwrap();

        let first = service
            .submit_rating(card.id, ItemKind::Card, 3, None, Some("tap-1"))
            .unwrap();
        let replay = service
            .submit_rating(card.id, ItemKind::Card, 3, None, Some("tap-1"))
            .unwrap();
        assert_eq!(first, replay);

        let stored = service.get_card(card.id).unwrap();
        assert_eq!(stored.repetition, 1);
        // Good maps to quality 4
        assert_eq!(service.goals_summary().unwrap().points, 20);

        let other = service.create_card(deck.id, "perro", "dog").unwrap();
        let err = service
            .submit_rating(other.id, ItemKind::Card, 3, None, Some("tap-1"))
            .unwrap_err();
        assert!(matches!(err, ReviewError::AlreadyExists(_)));
    }

    #[test]
    fn test_words_and_cards_share_submission_path() {
        let (service, _clock) = service();
        let deck = deck(&service);
        let word = service
            .capture_word(deck.id, "sol", "", WordAnalysis::default())
            .unwrap()
            .word;

        let rated = service.submit_rating(word.id, ItemKind::Word, 4, None, None).unwrap();
        match rated {
            RatedItem::Word(word) => assert_eq!(word.familiarity_score, 2),
            other => panic!("expected a word, got {:?}", other),
        }

        let err = service.submit_rating(word.id, ItemKind::Card, 4, None, None).unwrap_err();
        assert!(matches!(err, ReviewError::NotFound { kind: "Card", .. }));
    }

    #[test]
    fn test_session_stats_and_completion() {
        let (service, _clock) = service();
        let deck = deck(&service);
        let a = service.create_card(deck.id, "uno", "one").unwrap();
        let b = service.create_card(deck.id, "dos", "two").unwrap();
        let session = service.start_session(Scope::Deck { id: deck.id }).unwrap();

        service.review_card(a.id, 1, Some(session.id)).unwrap();
        service.review_card(b.id, 2, Some(session.id)).unwrap();

        let stats = service.get_session(session.id).unwrap().stats;
        assert_eq!(stats.reviewed, 2);
        assert_eq!(stats.incorrect, 1);
        // Hard maps to quality 3, which passes
        assert_eq!(stats.correct, 1);

        let completed = service.complete_session(session.id).unwrap();
        assert!(completed.is_completed());
        service.complete_session(session.id).unwrap();
        assert_eq!(service.goals_summary().unwrap().practice_sessions_this_week, 1);

        let err = service.review_card(a.id, 3, Some(session.id)).unwrap_err();
        assert!(matches!(err, ReviewError::InvalidInput(_)));
    }

    #[test]
    fn test_bulk_create_is_idempotent_and_reports_missing() {
        let (service, _clock) = service();
        let deck = deck(&service);
        let casa = service
            .capture_word(deck.id, "casa", "Mi casa", analysis("house"))
            .unwrap()
            .word;
        let perro = service
            .capture_word(deck.id, "perro", "", analysis("dog"))
            .unwrap()
            .word;
        let missing = Uuid::new_v4();

        let report = service
            .bulk_create_cards(&[casa.id, perro.id, missing, casa.id], None, None)
            .unwrap();
        assert_eq!(report.created.len(), 2);
        assert_eq!(report.missing, vec![missing]);
        assert_eq!(report.skipped, vec![casa.id]);

        let card = &report.created[0];
        assert_eq!(card.front, "casa");
        assert_eq!(card.back, "house\n\nContext: Mi casa");
        assert_eq!(card.word_id, Some(casa.id));
        assert_eq!(card.template_id, Some(CardTemplate::basic_id()));
        assert!(card.is_due(t0()));

        let again = service.bulk_create_cards(&[casa.id, perro.id], None, None).unwrap();
        assert!(again.created.is_empty());
        assert_eq!(again.skipped, vec![casa.id, perro.id]);
        assert_eq!(service.list_cards(Some(deck.id)).unwrap().len(), 2);
    }

    #[test]
    fn test_bulk_create_into_other_deck_and_unknown_override() {
        let (service, _clock) = service();
        let source = deck(&service);
        let target = service.create_deck("Review", "es", None).unwrap();
        let word = service
            .capture_word(source.id, "luna", "", analysis("moon"))
            .unwrap()
            .word;

        service.bulk_create_cards(&[word.id], None, None).unwrap();
        let report = service.bulk_create_cards(&[word.id], None, Some(target.id)).unwrap();
        assert_eq!(report.created.len(), 1);
        assert_eq!(report.created[0].deck_id, target.id);

        let err = service
            .bulk_create_cards(&[word.id], None, Some(Uuid::new_v4()))
            .unwrap_err();
        assert!(matches!(err, ReviewError::NotFound { kind: "Deck", .. }));
    }

    #[test]
    fn test_template_resolution_and_blank_fallback() {
        let (service, _clock) = service();
        let template = service
            .create_template("Literal", "{{term}}", "{{literal_translation}}")
            .unwrap();
        let deck = service.create_deck("Italian", "it", Some(template.id)).unwrap();
        let word = service
            .capture_word(deck.id, "ciao", "", WordAnalysis::default())
            .unwrap()
            .word;

        let card = service.create_card_for_word(word.id, None, None).unwrap();
        assert_eq!(card.template_id, Some(template.id));
        assert_eq!(card.front, "ciao");
        assert_eq!(card.back, "No translation available");

        let err = service.create_card_for_word(word.id, None, None).unwrap_err();
        assert!(matches!(err, ReviewError::AlreadyExists(_)));
    }

    #[test]
    fn test_unknown_template_falls_back_to_basic() {
        let (service, _clock) = service();
        let deck = deck(&service);
        let word = service
            .capture_word(deck.id, "agua", "", analysis("water"))
            .unwrap()
            .word;

        let report = service
            .bulk_create_cards(&[word.id], Some(Uuid::new_v4()), None)
            .unwrap();
        assert_eq!(report.created[0].template_id, Some(CardTemplate::basic_id()));
        assert_eq!(report.created[0].back, "water");
    }

    #[test]
    fn test_due_queue_mixes_words_and_cards() {
        let (service, clock) = service();
        let deck = deck(&service);
        let word = service
            .capture_word(deck.id, "casa", "", WordAnalysis::default())
            .unwrap()
            .word;
        clock.advance(Duration::hours(1));
        let card = service.create_card(deck.id, "perro", "dog").unwrap();

        let queue = service.get_due_queue(Scope::Deck { id: deck.id }, None).unwrap();
        let ids: Vec<Uuid> = queue.iter().map(|item| item.id).collect();
        assert_eq!(ids, vec![word.id, card.id]);

        service.review_card(card.id, 3, None).unwrap();
        let queue = service.get_due_queue(Scope::All, Some(10)).unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].kind, ItemKind::Word);

        let err = service
            .get_due_queue(Scope::Deck { id: Uuid::new_v4() }, None)
            .unwrap_err();
        assert!(matches!(err, ReviewError::NotFound { kind: "Deck", .. }));
    }

    #[test]
    fn test_transient_storage_retried_once() {
        let (service, _clock) = service();

        service.store().fail_next_writes(1);
        assert!(service.create_deck("German", "de", None).is_ok());

        service.store().fail_next_writes(2);
        let err = service.create_deck("French", "fr", None).unwrap_err();
        assert!(matches!(err, ReviewError::TransientStorage(_)));
        assert_eq!(service.list_decks().unwrap().len(), 1);
    }

    #[test]
    fn test_rating_commits_even_when_follow_up_writes_fail() {
        let (service, _clock) = service();
        let deck = deck(&service);
        let card = service.create_card(deck.id, "casa", "house").unwrap();
        let session = service.start_session(Scope::All).unwrap();

        service.store().fail_writes_to("goals");
        service.store().fail_writes_to("session");
        let rated = service.review_card(card.id, 3, Some(session.id)).unwrap();
        assert_eq!((rated.repetition, rated.interval), (1, 1));
        assert_eq!(service.get_card(card.id).unwrap(), rated);
        assert_eq!(service.store().list_review_records().unwrap().len(), 1);

        service.store().restore_writes();
        assert_eq!(service.goals_summary().unwrap().points, 0);
        assert_eq!(service.get_session(session.id).unwrap().stats.reviewed, 0);
        assert_eq!(service.get_card(card.id).unwrap().repetition, 1);
    }

    #[test]
    fn test_capture_commits_when_goal_write_fails() {
        let (service, _clock) = service();
        let deck = deck(&service);

        service.store().fail_writes_to("goals");
        let outcome = service
            .capture_word(deck.id, "casa", "", WordAnalysis::default())
            .unwrap();
        assert_eq!(outcome.action, CaptureAction::Created);
        assert_eq!(service.get_word(outcome.word.id).unwrap(), outcome.word);
    }

    #[test]
    fn test_failed_item_write_releases_submission_key() {
        let (service, _clock) = service();
        let deck = deck(&service);
        let card = service.create_card(deck.id, "casa", "house").unwrap();

        service.store().fail_writes_to("card");
        let err = service
            .submit_rating(card.id, ItemKind::Card, 3, None, Some("tap-9"))
            .unwrap_err();
        assert!(matches!(err, ReviewError::TransientStorage(_)));
        assert_eq!(service.get_card(card.id).unwrap(), card);
        assert!(service.store().get_submission("tap-9").unwrap().is_none());
        assert!(service.store().list_review_records().unwrap().is_empty());
        assert_eq!(service.goals_summary().unwrap().points, 0);

        service.store().restore_writes();
        for _ in 0..2 {
            service
                .submit_rating(card.id, ItemKind::Card, 3, None, Some("tap-9"))
                .unwrap();
        }
        assert_eq!(service.get_card(card.id).unwrap().repetition, 1);
        assert_eq!(service.goals_summary().unwrap().points, 20);
    }

    #[test]
    fn test_concurrent_submissions_with_one_key_rate_once() {
        let (service, _clock) = service();
        let deck = deck(&service);
        let card = service.create_card(deck.id, "casa", "house").unwrap();

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| service.submit_rating(card.id, ItemKind::Card, 3, None, Some("double-tap"))))
                .collect();
            for handle in handles {
                handle.join().unwrap().unwrap();
            }
        });

        assert_eq!(service.get_card(card.id).unwrap().repetition, 1);
        assert_eq!(service.store().list_review_records().unwrap().len(), 1);
        assert_eq!(service.goals_summary().unwrap().points, 20);
    }

    #[test]
    fn test_card_review_moves_linked_word() {
        let (service, clock) = service();
        let deck = deck(&service);
        let word = service
            .capture_word(deck.id, "casa", "", analysis("house"))
            .unwrap()
            .word;
        let card = service.create_card_for_word(word.id, None, None).unwrap();
        let standalone = service.create_card(deck.id, "perro", "dog").unwrap();

        service.review_card(card.id, 3, None).unwrap();
        let linked = service.get_word(word.id).unwrap();
        assert_eq!(linked.familiarity_score, 2);
        assert_eq!(linked.last_reviewed_date, Some(t0()));

        clock.advance(Duration::days(1));
        service.review_card(card.id, 1, None).unwrap();
        assert_eq!(service.get_word(word.id).unwrap().familiarity_score, 1);

        service.review_card(standalone.id, 4, None).unwrap();
        assert_eq!(service.get_word(word.id).unwrap().familiarity_score, 1);
    }

    #[test]
    fn test_review_history_and_stats() {
        let (service, clock) = service();
        let spanish = deck(&service);
        let german = service.create_deck("German", "de", None).unwrap();
        let word = service
            .capture_word(spanish.id, "sol", "", WordAnalysis::default())
            .unwrap()
            .word;
        let card = service.create_card(spanish.id, "casa", "house").unwrap();
        let other = service.create_card(german.id, "Haus", "house").unwrap();
        let session = service.start_session(Scope::All).unwrap();

        clock.advance(Duration::days(2));
        service.review_card(card.id, 3, Some(session.id)).unwrap();
        clock.advance(Duration::minutes(1));
        service.submit_rating(word.id, ItemKind::Word, 1, None, None).unwrap();
        clock.advance(Duration::minutes(1));
        service.review_card(other.id, 4, None).unwrap();

        let history = service.store().list_review_records().unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].item_id, card.id);
        assert_eq!(history[0].session_id, Some(session.id));
        assert_eq!((history[0].quality, history[0].interval), (4, 1));
        assert_eq!(history[1].item_kind, ItemKind::Word);
        assert!(!history[1].passed);

        let stats = service.review_stats(Scope::Deck { id: spanish.id }).unwrap();
        assert_eq!((stats.total_words, stats.total_cards), (1, 1));
        assert_eq!((stats.due_words, stats.due_cards), (1, 0));
        assert_eq!(stats.total_reviews, 2);
        assert_eq!((stats.reviews_today, stats.correct_today), (2, 1));
        assert_eq!(stats.average_quality, Some(3.0));

        let all = service.review_stats(Scope::All).unwrap();
        assert_eq!(all.total_reviews, 3);
        assert_eq!(all.daily.len(), 1);

        let err = service.review_stats(Scope::Deck { id: Uuid::new_v4() }).unwrap_err();
        assert!(matches!(err, ReviewError::NotFound { kind: "Deck", .. }));
    }

    #[test]
    fn test_check_in_streak() {
        let (service, clock) = service();

        assert_eq!(service.check_in().unwrap().kind, CheckInKind::Started);
        assert_eq!(service.check_in().unwrap().kind, CheckInKind::AlreadyCheckedIn);

        clock.advance(Duration::days(1));
        let continued = service.check_in().unwrap();
        assert_eq!(continued.kind, CheckInKind::Continued);
        assert_eq!(continued.streak, 2);

        clock.advance(Duration::days(3));
        let reset = service.check_in().unwrap();
        assert_eq!(reset.kind, CheckInKind::Reset);
        assert_eq!(reset.streak, 1);
        assert_eq!(reset.points, 30);
    }

    #[test]
    fn test_week_rollover_resets_counters() {
        let (service, clock) = service();
        let deck = deck(&service);
        service
            .capture_word(deck.id, "casa", "", WordAnalysis::default())
            .unwrap();
        assert_eq!(service.goals_summary().unwrap().new_words_this_week, 1);

        clock.advance(Duration::days(7));
        let summary = service.goals_summary().unwrap();
        assert_eq!(summary.new_words_this_week, 0);
        assert_eq!(summary.week_start, Utc.with_ymd_and_hms(2026, 3, 9, 0, 0, 0).unwrap());
        assert_eq!(summary.words_goal, 20);
    }
}

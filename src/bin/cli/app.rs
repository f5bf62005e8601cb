use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use uuid::Uuid;

use lexis_lib::config::SchedulerConfig;
use lexis_lib::flashcards::Deck;
use lexis_lib::review::ReviewSession;
use lexis_lib::storage::FileStorage;

/// Shared application state for CLI commands
pub struct App {
    pub data_dir: PathBuf,
    pub service: ReviewSession<FileStorage>,
}

impl App {
    /// Open the data directory and load the scheduler config
    pub fn new(data_dir: Option<&Path>, config_path: Option<&Path>) -> Result<Self> {
        let data_dir = match data_dir {
            Some(dir) => dir.to_path_buf(),
            None => FileStorage::default_data_dir().context("Failed to get data directory")?,
        };

        let config_path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| data_dir.join("config.toml"));
        let config = SchedulerConfig::load_or_default(&config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

        let storage = FileStorage::new(data_dir.clone());
        storage.init().context("Failed to initialize storage")?;

        let service = ReviewSession::new(storage, config).context("Invalid scheduler configuration")?;

        Ok(Self { data_dir, service })
    }

    /// Find a deck by id, or by name (case-insensitive prefix match)
    pub fn find_deck(&self, name_or_id: &str) -> Result<Deck> {
        if let Ok(id) = Uuid::parse_str(name_or_id) {
            return self.service.get_deck(id).context("Failed to get deck");
        }

        let decks = self.service.list_decks().context("Failed to list decks")?;
        let name_lower = name_or_id.to_lowercase();

        // Exact match first
        if let Some(deck) = decks.iter().find(|d| d.name.to_lowercase() == name_lower) {
            return Ok(deck.clone());
        }

        // Prefix match
        let matches: Vec<&Deck> = decks
            .iter()
            .filter(|d| d.name.to_lowercase().starts_with(&name_lower))
            .collect();

        match matches.len() {
            0 => bail!(
                "No deck matching '{}'. Available decks:\n{}",
                name_or_id,
                decks.iter().map(|d| format!("  - {}", d.name)).collect::<Vec<_>>().join("\n")
            ),
            1 => Ok(matches[0].clone()),
            _ => bail!(
                "Ambiguous deck name '{}'. Matches:\n{}",
                name_or_id,
                matches.iter().map(|d| format!("  - {}", d.name)).collect::<Vec<_>>().join("\n")
            ),
        }
    }

    /// Resolve an optional deck argument to its id
    pub fn find_deck_id(&self, name_or_id: Option<&str>) -> Result<Option<Uuid>> {
        name_or_id.map(|n| self.find_deck(n).map(|d| d.id)).transpose()
    }
}

mod app;
mod commands;
mod render;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use uuid::Uuid;

use lexis_lib::review::ItemKind;

#[derive(Parser)]
#[command(name = "lexis-cli", about = "Vocabulary and flashcard review from the terminal", version)]
struct Cli {
    /// Data directory (default: platform local data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Scheduler config file (default: <data dir>/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum Direction {
    Up,
    Down,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum KindArg {
    Word,
    Card,
}

impl From<KindArg> for ItemKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Word => ItemKind::Word,
            KindArg::Card => ItemKind::Card,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Deck management
    #[command(subcommand)]
    Deck(DeckCommand),

    /// Card template management
    #[command(subcommand)]
    Template(TemplateCommand),

    /// Vocabulary words
    #[command(subcommand)]
    Word(WordCommand),

    /// Flashcards
    #[command(subcommand)]
    Card(CardCommand),

    /// Rate a word or card (1=Again, 2=Hard, 3=Good, 4=Easy)
    Rate {
        kind: KindArg,
        id: Uuid,
        rating: i64,
        /// Practice session to count the rating in
        #[arg(long)]
        session: Option<Uuid>,
        /// Idempotency key; repeating it does not rate twice
        #[arg(long)]
        key: Option<String>,
    },

    /// Show the due review queue
    Due {
        /// Deck name or id (default: all decks)
        #[arg(long)]
        deck: Option<String>,
        /// Maximum items (default: from config)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Review statistics and daily history
    Stats {
        /// Deck name or id (default: all decks)
        #[arg(long)]
        deck: Option<String>,
    },

    /// Practice sessions
    #[command(subcommand)]
    Session(SessionCommand),

    /// Weekly goals, streak and points
    Goals,

    /// Daily check-in
    CheckIn,

    /// Print the effective scheduler configuration
    Config,
}

#[derive(Subcommand)]
enum DeckCommand {
    /// Create a deck
    Create {
        name: String,
        /// Language code, e.g. "es"
        #[arg(long, default_value = "")]
        language: String,
        /// Default card template id
        #[arg(long)]
        template: Option<Uuid>,
    },

    /// List decks
    List,
}

#[derive(Subcommand)]
enum TemplateCommand {
    /// Create a card template with {{field}} placeholders
    Create {
        name: String,
        #[arg(long)]
        front: String,
        #[arg(long)]
        back: String,
    },

    /// List templates
    List,
}

#[derive(Subcommand)]
enum WordCommand {
    /// Capture a word (re-capturing counts another encounter)
    Capture {
        /// Deck name or id
        deck: String,
        term: String,
        #[arg(long, default_value = "")]
        context: String,
        #[arg(long)]
        translation: Option<String>,
        #[arg(long)]
        part_of_speech: Option<String>,
    },

    /// List words
    List {
        /// Deck name or id
        #[arg(long)]
        deck: Option<String>,
    },

    /// Move a word's familiarity one level up or down
    Adjust { id: Uuid, direction: Direction },

    /// Mark a word as known
    Known { id: Uuid },
}

#[derive(Subcommand)]
enum CardCommand {
    /// Create a standalone card
    Create {
        /// Deck name or id
        deck: String,
        front: String,
        back: String,
    },

    /// Generate cards from words, skipping words that already have one
    FromWords {
        #[arg(required = true)]
        words: Vec<Uuid>,
        #[arg(long)]
        template: Option<Uuid>,
        /// Target deck name or id (default: each word's deck)
        #[arg(long)]
        deck: Option<String>,
    },

    /// List cards
    List {
        /// Deck name or id
        #[arg(long)]
        deck: Option<String>,
    },

    /// Review a card (1=Again, 2=Hard, 3=Good, 4=Easy)
    Review {
        id: Uuid,
        rating: i64,
        #[arg(long)]
        session: Option<Uuid>,
    },

    /// Show the interval each rating would give
    Preview { id: Uuid },
}

#[derive(Subcommand)]
enum SessionCommand {
    /// Start a practice session
    Start {
        /// Deck name or id (default: all decks)
        #[arg(long)]
        deck: Option<String>,
    },

    /// Complete a practice session
    Complete { id: Uuid },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let use_color = !cli.no_color && atty_check();
    let app = app::App::new(cli.data_dir.as_deref(), cli.config.as_deref())?;
    let format = &cli.format;

    match cli.command {
        Command::Deck(DeckCommand::Create { name, language, template }) => {
            commands::deck::run_create(&app, &name, &language, template, format)?;
        }
        Command::Deck(DeckCommand::List) => {
            commands::deck::run_list(&app, format)?;
        }
        Command::Template(TemplateCommand::Create { name, front, back }) => {
            commands::deck::run_template_create(&app, &name, &front, &back, format)?;
        }
        Command::Template(TemplateCommand::List) => {
            commands::deck::run_template_list(&app, format)?;
        }
        Command::Word(subcmd) => match subcmd {
            WordCommand::Capture {
                deck,
                term,
                context,
                translation,
                part_of_speech,
            } => {
                commands::word::run_capture(
                    &app,
                    &deck,
                    &term,
                    &context,
                    translation,
                    part_of_speech,
                    format,
                )?;
            }
            WordCommand::List { deck } => {
                commands::word::run_list(&app, deck.as_deref(), format, use_color)?;
            }
            WordCommand::Adjust { id, direction } => {
                commands::word::run_adjust(&app, id, direction, format)?;
            }
            WordCommand::Known { id } => {
                commands::word::run_known(&app, id, format)?;
            }
        },
        Command::Card(subcmd) => match subcmd {
            CardCommand::Create { deck, front, back } => {
                commands::card::run_create(&app, &deck, &front, &back, format)?;
            }
            CardCommand::FromWords { words, template, deck } => {
                commands::card::run_from_words(&app, &words, template, deck.as_deref(), format)?;
            }
            CardCommand::List { deck } => {
                commands::card::run_list(&app, deck.as_deref(), format, use_color)?;
            }
            CardCommand::Review { id, rating, session } => {
                commands::card::run_review(&app, id, rating, session, format)?;
            }
            CardCommand::Preview { id } => {
                commands::card::run_preview(&app, id, format)?;
            }
        },
        Command::Rate {
            kind,
            id,
            rating,
            session,
            key,
        } => {
            commands::review::run_rate(&app, kind.into(), id, rating, session, key.as_deref(), format)?;
        }
        Command::Due { deck, limit } => {
            commands::review::run_due(&app, deck.as_deref(), limit, format, use_color)?;
        }
        Command::Stats { deck } => {
            commands::review::run_stats(&app, deck.as_deref(), format, use_color)?;
        }
        Command::Session(SessionCommand::Start { deck }) => {
            commands::review::run_session_start(&app, deck.as_deref(), format)?;
        }
        Command::Session(SessionCommand::Complete { id }) => {
            commands::review::run_session_complete(&app, id, format)?;
        }
        Command::Goals => {
            commands::goals::run_summary(&app, format, use_color)?;
        }
        Command::CheckIn => {
            commands::goals::run_check_in(&app, format)?;
        }
        Command::Config => {
            commands::config::run(&app, format)?;
        }
    }

    Ok(())
}

/// Check if stdout is a terminal (for color support)
fn atty_check() -> bool {
    unsafe { libc_isatty(1) != 0 }
}

extern "C" {
    #[link_name = "isatty"]
    fn libc_isatty(fd: i32) -> i32;
}

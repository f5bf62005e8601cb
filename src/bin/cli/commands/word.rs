use anyhow::{Context, Result};
use chrono::Utc;
use uuid::Uuid;

use lexis_lib::vocab::{CaptureAction, FamiliarityDelta, Word, WordAnalysis};

use crate::app::App;
use crate::render::terminal::{describe_due, truncate};
use crate::{Direction, OutputFormat};

pub fn run_capture(
    app: &App,
    deck: &str,
    term: &str,
    context: &str,
    translation: Option<String>,
    part_of_speech: Option<String>,
    format: &OutputFormat,
) -> Result<()> {
    let deck = app.find_deck(deck)?;
    let analysis = WordAnalysis {
        translation,
        part_of_speech,
        literal_translation: None,
    };
    let outcome = app
        .service
        .capture_word(deck.id, term, context, analysis)
        .context("Failed to capture word")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        OutputFormat::Plain => {
            let word = &outcome.word;
            match outcome.action {
                CaptureAction::Created => println!("Captured \"{}\" into {}", word.term, deck.name),
                CaptureAction::Updated => {
                    println!("\"{}\" seen again ({} encounters)", word.term, word.encounters)
                }
            }
            println!("  ID: {}", word.id);
        }
    }

    Ok(())
}

pub fn run_list(app: &App, deck: Option<&str>, format: &OutputFormat, use_color: bool) -> Result<()> {
    let deck_id = app.find_deck_id(deck)?;
    let words = app.service.list_words(deck_id).context("Failed to list words")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&words)?),
        OutputFormat::Plain => {
            if words.is_empty() {
                println!("No words.");
                return Ok(());
            }

            let now = Utc::now();
            let term_width = words.iter().map(|w| w.term.chars().count()).max().unwrap_or(4).clamp(4, 30);

            println!(
                "{:<tw$} {:<20} {:<8} {:<5} {}",
                "Term",
                "Translation",
                "Status",
                "Level",
                "Next review",
                tw = term_width
            );
            println!("{}", "\u{2500}".repeat(term_width + 50));

            for word in &words {
                println!(
                    "{:<tw$} {:<20} {:<8} {:<5} {}",
                    truncate(&word.term, term_width),
                    truncate(word.translation.as_deref().unwrap_or(""), 20),
                    word.status.as_str(),
                    word.familiarity_score,
                    describe_due(word.next_review_date, now, use_color),
                    tw = term_width
                );
            }

            println!("\n{} words total", words.len());
        }
    }

    Ok(())
}

pub fn run_adjust(app: &App, id: Uuid, direction: Direction, format: &OutputFormat) -> Result<()> {
    let delta = match direction {
        Direction::Up => FamiliarityDelta::Up,
        Direction::Down => FamiliarityDelta::Down,
    };
    let word = app
        .service
        .adjust_familiarity(id, delta)
        .context("Failed to adjust familiarity")?;
    print_word(&word, format)
}

pub fn run_known(app: &App, id: Uuid, format: &OutputFormat) -> Result<()> {
    let word = app.service.mark_known(id).context("Failed to mark word as known")?;
    print_word(&word, format)
}

fn print_word(word: &Word, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(word)?),
        OutputFormat::Plain => {
            println!(
                "{}: level {} ({}), next review {}",
                word.term,
                word.familiarity_score,
                word.status.as_str(),
                word.next_review_date.format("%Y-%m-%d %H:%M")
            );
        }
    }
    Ok(())
}

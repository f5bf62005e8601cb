use anyhow::{Context, Result};
use chrono::Utc;
use uuid::Uuid;

use lexis_lib::flashcards::algorithm::format_interval;
use lexis_lib::flashcards::Card;
use lexis_lib::review::Rating;

use crate::app::App;
use crate::render::terminal::{describe_due, indent_block, truncate};
use crate::OutputFormat;

pub fn run_create(app: &App, deck: &str, front: &str, back: &str, format: &OutputFormat) -> Result<()> {
    let deck = app.find_deck(deck)?;
    let card = app
        .service
        .create_card(deck.id, front, back)
        .context("Failed to create card")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&card)?),
        OutputFormat::Plain => {
            println!("Created card in {}", deck.name);
            println!("  ID: {}", card.id);
        }
    }

    Ok(())
}

pub fn run_from_words(
    app: &App,
    words: &[Uuid],
    template: Option<Uuid>,
    deck: Option<&str>,
    format: &OutputFormat,
) -> Result<()> {
    let deck_id = app.find_deck_id(deck)?;
    let report = app
        .service
        .bulk_create_cards(words, template, deck_id)
        .context("Failed to create cards")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Plain => {
            println!(
                "Created {} cards, skipped {} (already had a card)",
                report.created.len(),
                report.skipped.len()
            );
            for card in &report.created {
                println!("  + {} ({})", truncate(&card.front, 40), card.id);
            }
            for id in &report.missing {
                println!("  ? word {} not found", id);
            }
            for failed in &report.failed {
                println!("  ! word {}: {}", failed.word_id, failed.reason);
            }
        }
    }

    Ok(())
}

pub fn run_list(app: &App, deck: Option<&str>, format: &OutputFormat, use_color: bool) -> Result<()> {
    let deck_id = app.find_deck_id(deck)?;
    let cards = app.service.list_cards(deck_id).context("Failed to list cards")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&cards)?),
        OutputFormat::Plain => {
            if cards.is_empty() {
                println!("No cards.");
                return Ok(());
            }

            let now = Utc::now();
            println!("{:<30} {:>4} {:>5} {:>8} {}", "Front", "Reps", "EF", "Interval", "Next review");
            println!("{}", "\u{2500}".repeat(70));
            for card in &cards {
                println!(
                    "{:<30} {:>4} {:>5.2} {:>8} {}",
                    truncate(&card.front, 30),
                    card.repetition,
                    card.easiness_factor,
                    format_interval(card.interval),
                    describe_due(card.next_review_date, now, use_color)
                );
            }
            println!("\n{} cards total", cards.len());
        }
    }

    Ok(())
}

pub fn run_review(app: &App, id: Uuid, rating: i64, session: Option<Uuid>, format: &OutputFormat) -> Result<()> {
    let card = app
        .service
        .review_card(id, rating, session)
        .context("Failed to review card")?;
    print_reviewed(&card, format)
}

pub fn run_preview(app: &App, id: Uuid, format: &OutputFormat) -> Result<()> {
    let card = app.service.get_card(id).context("Failed to get card")?;
    let intervals = app.service.preview_intervals(id).context("Failed to preview card")?;

    match format {
        OutputFormat::Json => {
            let output: Vec<serde_json::Value> = Rating::ALL
                .iter()
                .zip(intervals.iter())
                .map(|(rating, days)| {
                    serde_json::json!({
                        "rating": rating.value(),
                        "label": rating.label(),
                        "intervalDays": days,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("{}", indent_block(&card.front, ""));
            println!();
            for (rating, days) in Rating::ALL.iter().zip(intervals.iter()) {
                println!("  {} {:<6} {}", rating.value(), rating.label(), format_interval(*days));
            }
        }
    }

    Ok(())
}

pub(crate) fn print_reviewed(card: &Card, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(card)?),
        OutputFormat::Plain => {
            println!("{}", indent_block(&card.back, "  "));
            println!(
                "Next review in {} ({}), ease {:.2}",
                format_interval(card.interval),
                card.next_review_date.format("%Y-%m-%d"),
                card.easiness_factor
            );
        }
    }
    Ok(())
}

use anyhow::{Context, Result};
use uuid::Uuid;

use lexis_lib::review::{ItemKind, RatedItem, Scope};

use crate::app::App;
use crate::render::terminal::{describe_due, paint, Color};
use crate::OutputFormat;

pub fn run_rate(
    app: &App,
    kind: ItemKind,
    id: Uuid,
    rating: i64,
    session: Option<Uuid>,
    key: Option<&str>,
    format: &OutputFormat,
) -> Result<()> {
    let rated = app
        .service
        .submit_rating(id, kind, rating, session, key)
        .with_context(|| format!("Failed to rate {} {}", kind, id))?;

    match (&rated, format) {
        (_, OutputFormat::Json) => println!("{}", serde_json::to_string_pretty(&rated)?),
        (RatedItem::Card(card), OutputFormat::Plain) => super::card::print_reviewed(card, format)?,
        (RatedItem::Word(word), OutputFormat::Plain) => {
            println!(
                "{}: level {}, next review {}",
                word.term,
                word.familiarity_score,
                word.next_review_date.format("%Y-%m-%d")
            );
        }
    }

    Ok(())
}

pub fn run_due(
    app: &App,
    deck: Option<&str>,
    limit: Option<usize>,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let scope = match app.find_deck_id(deck)? {
        Some(id) => Scope::Deck { id },
        None => Scope::All,
    };
    let queue = app.service.get_due_queue(scope, limit).context("Failed to build due queue")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&queue)?),
        OutputFormat::Plain => {
            if queue.is_empty() {
                println!("Nothing due. {}", paint("All caught up!", Color::GREEN, use_color));
                return Ok(());
            }

            let now = chrono::Utc::now();
            for item in &queue {
                let label = match item.kind {
                    ItemKind::Word => {
                        let word = app.service.get_word(item.id)?;
                        word.term
                    }
                    ItemKind::Card => {
                        let card = app.service.get_card(item.id)?;
                        card.front.lines().next().unwrap_or("").to_string()
                    }
                };
                println!(
                    "{:<4} {:<30} {:<14} {}",
                    item.kind.as_str(),
                    label,
                    describe_due(item.next_review_date, now, use_color),
                    item.id
                );
            }
            println!("\n{} items", queue.len());
        }
    }

    Ok(())
}

pub fn run_session_start(app: &App, deck: Option<&str>, format: &OutputFormat) -> Result<()> {
    let scope = match app.find_deck_id(deck)? {
        Some(id) => Scope::Deck { id },
        None => Scope::All,
    };
    let session = app.service.start_session(scope).context("Failed to start session")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&session)?),
        OutputFormat::Plain => {
            println!("Started practice session");
            println!("  ID: {}", session.id);
        }
    }

    Ok(())
}

pub fn run_session_complete(app: &App, id: Uuid, format: &OutputFormat) -> Result<()> {
    let session = app
        .service
        .complete_session(id)
        .context("Failed to complete session")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&session)?),
        OutputFormat::Plain => {
            let stats = session.stats;
            println!(
                "Session complete: {} reviewed, {} correct, {} incorrect ({:.0}% accuracy)",
                stats.reviewed,
                stats.correct,
                stats.incorrect,
                stats.accuracy() * 100.0
            );
        }
    }

    Ok(())
}

pub fn run_stats(app: &App, deck: Option<&str>, format: &OutputFormat, use_color: bool) -> Result<()> {
    let scope = match app.find_deck_id(deck)? {
        Some(id) => Scope::Deck { id },
        None => Scope::All,
    };
    let stats = app.service.review_stats(scope).context("Failed to compute review stats")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Plain => {
            println!(
                "Words: {} ({} due)   Cards: {} ({} due)",
                stats.total_words,
                paint(&stats.due_words.to_string(), Color::YELLOW, use_color),
                stats.total_cards,
                paint(&stats.due_cards.to_string(), Color::YELLOW, use_color)
            );
            println!("Today: {} reviewed, {} correct", stats.reviews_today, stats.correct_today);

            let average = stats
                .average_quality
                .map_or_else(|| "-".to_string(), |q| format!("{:.1}", q));
            println!(
                "Last {} days: {} reviews, average quality {}",
                stats.window_days, stats.total_reviews, average
            );

            if !stats.daily.is_empty() {
                println!();
                for day in &stats.daily {
                    println!(
                        "  {}  {:>4} reviews  {:>4} correct  avg {:.1}",
                        day.date, day.reviews, day.correct, day.average_quality
                    );
                }
            }
        }
    }

    Ok(())
}

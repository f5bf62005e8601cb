use anyhow::{Context, Result};

use lexis_lib::goals::CheckInKind;

use crate::app::App;
use crate::render::terminal::{paint, Color};
use crate::OutputFormat;

pub fn run_summary(app: &App, format: &OutputFormat, use_color: bool) -> Result<()> {
    let summary = app.service.goals_summary().context("Failed to load goals")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Plain => {
            let mark = |met: bool| {
                if met {
                    paint("done", Color::GREEN, use_color)
                } else {
                    paint("open", Color::YELLOW, use_color)
                }
            };

            println!("Week of {}", summary.week_start.format("%Y-%m-%d"));
            println!(
                "  New words:  {:>3} / {:<3} {}",
                summary.new_words_this_week,
                summary.words_goal,
                mark(summary.words_goal_met())
            );
            println!(
                "  Sessions:   {:>3} / {:<3} {}",
                summary.practice_sessions_this_week,
                summary.sessions_goal,
                mark(summary.sessions_goal_met())
            );
            println!("  Streak:     {} days", summary.streak);
            println!("  Points:     {}", summary.points);
        }
    }

    Ok(())
}

pub fn run_check_in(app: &App, format: &OutputFormat) -> Result<()> {
    let outcome = app.service.check_in().context("Failed to check in")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        OutputFormat::Plain => {
            let message = match outcome.kind {
                CheckInKind::Started => "Streak started",
                CheckInKind::AlreadyCheckedIn => "Already checked in today",
                CheckInKind::Continued => "Streak extended",
                CheckInKind::Reset => "Streak restarted",
            };
            println!("{}: {} days, {} points", message, outcome.streak, outcome.points);
        }
    }

    Ok(())
}

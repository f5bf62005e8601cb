use anyhow::{Context, Result};
use uuid::Uuid;

use crate::app::App;
use crate::OutputFormat;

pub fn run_create(
    app: &App,
    name: &str,
    language: &str,
    template: Option<Uuid>,
    format: &OutputFormat,
) -> Result<()> {
    let deck = app
        .service
        .create_deck(name, language, template)
        .context("Failed to create deck")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&deck)?),
        OutputFormat::Plain => {
            println!("Created deck \"{}\"", deck.name);
            println!("  ID: {}", deck.id);
        }
    }

    Ok(())
}

pub fn run_list(app: &App, format: &OutputFormat) -> Result<()> {
    let decks = app.service.list_decks().context("Failed to list decks")?;

    match format {
        OutputFormat::Json => {
            let mut output = Vec::new();
            for deck in &decks {
                let words = app.service.list_words(Some(deck.id))?.len();
                let cards = app.service.list_cards(Some(deck.id))?.len();
                output.push(serde_json::json!({
                    "id": deck.id.to_string(),
                    "name": deck.name,
                    "language": deck.language,
                    "defaultTemplateId": deck.default_template_id,
                    "wordCount": words,
                    "cardCount": cards,
                }));
            }
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            if decks.is_empty() {
                println!("No decks. Create one with `lexis-cli deck create <name>`.");
                return Ok(());
            }
            for deck in &decks {
                let words = app.service.list_words(Some(deck.id))?.len();
                let cards = app.service.list_cards(Some(deck.id))?.len();
                let language = if deck.language.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", deck.language)
                };
                println!("{}{} ({} words, {} cards)", deck.name, language, words, cards);
                println!("    {}", deck.id);
            }
        }
    }

    Ok(())
}

pub fn run_template_create(app: &App, name: &str, front: &str, back: &str, format: &OutputFormat) -> Result<()> {
    let template = app
        .service
        .create_template(name, front, back)
        .context("Failed to create template")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&template)?),
        OutputFormat::Plain => {
            println!("Created template \"{}\"", template.name);
            println!("  ID: {}", template.id);
        }
    }

    Ok(())
}

pub fn run_template_list(app: &App, format: &OutputFormat) -> Result<()> {
    let templates = app.service.list_templates().context("Failed to list templates")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&templates)?),
        OutputFormat::Plain => {
            for template in &templates {
                println!("{} ({})", template.name, template.id);
                println!("    front: {:?}", template.front_template);
                println!("    back:  {:?}", template.back_template);
            }
        }
    }

    Ok(())
}

//! Card template rendering
//!
//! Templates use `{{field}}` placeholders filled from a word's fields.
//! Unknown or empty fields render as an empty string; no escaping is applied.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use super::models::CardTemplate;
use crate::vocab::Word;

/// Field values available to a template
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WordFields(BTreeMap<&'static str, String>);

impl WordFields {
    pub fn from_word(word: &Word) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert("term", word.term.clone());
        fields.insert("context", word.context.clone());
        fields.insert("translation", word.translation.clone().unwrap_or_default());
        fields.insert("part_of_speech", word.part_of_speech.clone().unwrap_or_default());
        fields.insert(
            "literal_translation",
            word.literal_translation.clone().unwrap_or_default(),
        );
        fields.insert(
            "grammatical_breakdown",
            word.grammatical_breakdown.clone().unwrap_or_default(),
        );
        Self(fields)
    }

    pub fn get(&self, name: &str) -> &str {
        self.0.get(name).map(String::as_str).unwrap_or("")
    }
}

/// Produces the front and back text of a card
pub trait TemplateRenderer {
    fn render(&self, template: &CardTemplate, fields: &WordFields) -> (String, String);
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder pattern is valid"))
}

/// Plain `{{field}}` substitution
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderRenderer;

impl PlaceholderRenderer {
    pub fn render_str(&self, template: &str, fields: &WordFields) -> String {
        placeholder_pattern()
            .replace_all(template, |caps: &Captures| fields.get(&caps[1]).to_string())
            .into_owned()
    }
}

impl TemplateRenderer for PlaceholderRenderer {
    fn render(&self, template: &CardTemplate, fields: &WordFields) -> (String, String) {
        (
            self.render_str(&template.front_template, fields),
            self.render_str(&template.back_template, fields),
        )
    }
}

/// Drop `Label:` lines whose placeholder rendered empty. Text without such a
/// line is returned unchanged.
fn drop_empty_labels(text: String) -> String {
    let is_empty_label = |line: &str| {
        line.trim()
            .strip_suffix(':')
            .is_some_and(|label| !label.trim().is_empty() && !label.contains(':'))
    };
    if !text.lines().any(is_empty_label) {
        return text;
    }

    let mut lines: Vec<&str> = Vec::new();
    for line in text.lines().filter(|line| !is_empty_label(*line)) {
        let blank = line.trim().is_empty();
        if blank && lines.last().map_or(true, |prev| prev.trim().is_empty()) {
            continue;
        }
        lines.push(line);
    }
    while lines.last().is_some_and(|line| line.trim().is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

/// Fill in sides that rendered blank so a card is never empty
pub fn fallback_sides(word: &Word, front: String, back: String) -> (String, String) {
    let front = drop_empty_labels(front);
    let back = drop_empty_labels(back);

    let front = if front.trim().is_empty() {
        if word.term.trim().is_empty() {
            "No content".to_string()
        } else {
            word.term.clone()
        }
    } else {
        front
    };

    let back = if back.trim().is_empty() {
        let mut parts = Vec::new();
        if let Some(translation) = word.translation.as_deref().filter(|t| !t.is_empty()) {
            parts.push(format!("Translation: {}", translation));
        }
        if let Some(pos) = word.part_of_speech.as_deref().filter(|p| !p.is_empty()) {
            parts.push(format!("Part of Speech: {}", pos));
        }
        if !word.context.is_empty() {
            parts.push(format!("Context: {}", word.context));
        }
        if parts.is_empty() {
            "No translation available".to_string()
        } else {
            parts.join("\n\n")
        }
    } else {
        back
    };

    (front, back)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn word() -> Word {
        Word::new(
            Uuid::new_v4(),
            "perro".to_string(),
            "El perro duerme.".to_string(),
            Utc::now(),
        )
        .with_translation("dog".to_string())
    }

    #[test]
    fn test_basic_template() {
        let (front, back) = PlaceholderRenderer.render(&CardTemplate::basic(), &WordFields::from_word(&word()));
        assert_eq!(front, "perro");
        assert_eq!(back, "dog\n\nContext: El perro duerme.");
    }

    #[test]
    fn test_unknown_placeholder_renders_empty() {
        let fields = WordFields::from_word(&word());
        assert_eq!(PlaceholderRenderer.render_str("[{{cloze_text}}]", &fields), "[]");
        assert_eq!(PlaceholderRenderer.render_str("{{ term }}!", &fields), "perro!");
    }

    #[test]
    fn test_no_escaping() {
        let mut w = word();
        w.translation = Some("<b>dog</b> & co".to_string());
        let fields = WordFields::from_word(&w);
        assert_eq!(PlaceholderRenderer.render_str("{{translation}}", &fields), "<b>dog</b> & co");
    }

    #[test]
    fn test_fallback_sides() {
        let mut w = word();
        w.part_of_speech = Some("noun".to_string());
        let (front, back) = fallback_sides(&w, "  ".to_string(), String::new());
        assert_eq!(front, "perro");
        assert_eq!(back, "Translation: dog\n\nPart of Speech: noun\n\nContext: El perro duerme.");

        let (front, back) = fallback_sides(&w, "kept".to_string(), "also kept".to_string());
        assert_eq!(front, "kept");
        assert_eq!(back, "also kept");
    }

    #[test]
    fn test_empty_label_lines_are_dropped() {
        let mut w = word();
        w.context = String::new();
        let (_, back) = PlaceholderRenderer.render(&CardTemplate::basic(), &WordFields::from_word(&w));
        let (_, back) = fallback_sides(&w, "perro".to_string(), back);
        assert_eq!(back, "dog");

        w.translation = None;
        w.part_of_speech = Some("noun".to_string());
        let (_, back) = PlaceholderRenderer.render(&CardTemplate::basic(), &WordFields::from_word(&w));
        let (_, back) = fallback_sides(&w, "perro".to_string(), back);
        assert_eq!(back, "Part of Speech: noun");

        let (_, back) = fallback_sides(&w, "perro".to_string(), "Note: 10:30\n\nSee:".to_string());
        assert_eq!(back, "Note: 10:30");
    }
}

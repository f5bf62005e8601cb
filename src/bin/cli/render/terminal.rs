use chrono::{DateTime, Utc};

/// ANSI color codes
#[allow(dead_code)]
pub struct Color;

#[allow(dead_code)]
impl Color {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";
}

/// Wrap `text` in a color when color output is on
pub fn paint(text: &str, color: &str, use_color: bool) -> String {
    if use_color {
        format!("{}{}{}", color, text, Color::RESET)
    } else {
        text.to_string()
    }
}

/// "due now", "overdue 3d" or "in 2d"
pub fn describe_due(next_review: DateTime<Utc>, now: DateTime<Utc>, use_color: bool) -> String {
    let days = (next_review - now).num_days();
    if next_review <= now {
        let overdue = (now - next_review).num_days();
        if overdue == 0 {
            paint("due now", Color::YELLOW, use_color)
        } else {
            paint(&format!("overdue {}d", overdue), Color::RED, use_color)
        }
    } else if days == 0 {
        paint("due today", Color::YELLOW, use_color)
    } else {
        paint(&format!("in {}d", days), Color::GRAY, use_color)
    }
}

/// Indent every line of a (possibly multi-line) card side
pub fn indent_block(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| format!("{}{}", prefix, line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Shorten long text to `max` characters for table columns
pub fn truncate(text: &str, max: usize) -> String {
    let first_line = text.lines().next().unwrap_or("");
    if first_line.chars().count() <= max {
        first_line.to_string()
    } else {
        let cut: String = first_line.chars().take(max.saturating_sub(1)).collect();
        format!("{}\u{2026}", cut)
    }
}

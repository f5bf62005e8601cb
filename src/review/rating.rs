//! Review ratings and item kinds shared by words and cards

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::ReviewError;

/// Four-bucket rating submitted by the learner.
///
/// The wire form is an integer in `1..=4`. Anything else is rejected with
/// [`ReviewError::InvalidRating`], never clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Rating {
    Again,
    Hard,
    Good,
    Easy,
}

impl Rating {
    pub const ALL: [Rating; 4] = [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy];

    /// Parse the integer wire value
    pub fn from_value(value: i64) -> Result<Self, ReviewError> {
        match value {
            1 => Ok(Rating::Again),
            2 => Ok(Rating::Hard),
            3 => Ok(Rating::Good),
            4 => Ok(Rating::Easy),
            other => Err(ReviewError::InvalidRating(other)),
        }
    }

    pub fn value(self) -> i64 {
        match self {
            Rating::Again => 1,
            Rating::Hard => 2,
            Rating::Good => 3,
            Rating::Easy => 4,
        }
    }

    /// Zero-based position, used to index per-rating tables
    pub(crate) fn index(self) -> usize {
        (self.value() - 1) as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Rating::Again => "Again",
            Rating::Hard => "Hard",
            Rating::Good => "Good",
            Rating::Easy => "Easy",
        }
    }
}

impl TryFrom<i64> for Rating {
    type Error = ReviewError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Rating::from_value(value)
    }
}

impl From<Rating> for i64 {
    fn from(rating: Rating) -> Self {
        rating.value()
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.value())
    }
}

/// Kind of schedulable item
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemKind {
    Word,
    Card,
}

impl ItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Word => "word",
            ItemKind::Card => "card",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "word" => Ok(ItemKind::Word),
            "card" => Ok(ItemKind::Card),
            other => Err(format!("unknown item kind '{}'", other)),
        }
    }
}

//! Weekly goal and streak data models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Weekly learning counters plus the daily check-in streak
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalProgress {
    /// Start of the week the counters belong to (Monday 00:00 UTC)
    pub week_start: DateTime<Utc>,
    /// Words captured since `week_start`
    #[serde(default)]
    pub new_words_this_week: u32,
    /// Practice sessions completed since `week_start`
    #[serde(default)]
    pub practice_sessions_this_week: u32,
    /// Consecutive days with a check-in
    #[serde(default)]
    pub streak: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_active_date: Option<NaiveDate>,
    #[serde(default)]
    pub points: u64,
}

impl GoalProgress {
    pub fn new(week_start: DateTime<Utc>) -> Self {
        Self {
            week_start,
            new_words_this_week: 0,
            practice_sessions_this_week: 0,
            streak: 0,
            last_active_date: None,
            points: 0,
        }
    }
}

/// Weekly targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyTargets {
    pub words_per_week: u32,
    pub sessions_per_week: u32,
}

impl Default for WeeklyTargets {
    fn default() -> Self {
        Self {
            words_per_week: 20,
            sessions_per_week: 3,
        }
    }
}

/// How a check-in changed the streak
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CheckInKind {
    /// First check-in ever
    Started,
    /// Already checked in today, nothing changed
    AlreadyCheckedIn,
    /// Checked in yesterday, streak extended
    Continued,
    /// Missed at least one day, streak restarted
    Reset,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInOutcome {
    pub kind: CheckInKind,
    pub streak: u32,
    pub points: u64,
}

/// Progress against the weekly targets
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalsSummary {
    pub week_start: DateTime<Utc>,
    pub new_words_this_week: u32,
    pub words_goal: u32,
    pub practice_sessions_this_week: u32,
    pub sessions_goal: u32,
    pub streak: u32,
    pub points: u64,
}

impl GoalsSummary {
    pub fn words_goal_met(&self) -> bool {
        self.new_words_this_week >= self.words_goal
    }

    pub fn sessions_goal_met(&self) -> bool {
        self.practice_sessions_this_week >= self.sessions_goal
    }
}

//! Goal counter updates
//!
//! All functions here are pure transitions on [`GoalProgress`]; persisting the
//! result is the caller's job.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};

use super::models::*;

/// Points awarded for each daily check-in that counts
const CHECK_IN_POINTS: u64 = 10;

/// Points per SM-2 quality unit of a review
const POINTS_PER_QUALITY: u64 = 5;

/// Monday 00:00 UTC of the ISO week containing `now`
pub fn week_start_for(now: DateTime<Utc>) -> DateTime<Utc> {
    let date = now.date_naive();
    let monday = date - Duration::days(date.weekday().num_days_from_monday() as i64);
    monday.and_time(NaiveTime::MIN).and_utc()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GoalTracker {
    targets: WeeklyTargets,
}

impl GoalTracker {
    pub fn new(targets: WeeklyTargets) -> Self {
        Self { targets }
    }

    pub fn targets(&self) -> WeeklyTargets {
        self.targets
    }

    /// Fresh progress for the week containing `now`
    pub fn start(&self, now: DateTime<Utc>) -> GoalProgress {
        GoalProgress::new(week_start_for(now))
    }

    /// Reset the weekly counters once `now` has moved into a later week.
    /// Returns whether a reset happened. A clock that moved backwards leaves
    /// the counters alone.
    pub fn roll_week(&self, progress: &mut GoalProgress, now: DateTime<Utc>) -> bool {
        let current = week_start_for(now);
        if current <= progress.week_start {
            return false;
        }
        log::debug!(
            "Goal week rolled over from {} to {}",
            progress.week_start.date_naive(),
            current.date_naive()
        );
        progress.week_start = current;
        progress.new_words_this_week = 0;
        progress.practice_sessions_this_week = 0;
        true
    }

    pub fn record_new_word(&self, progress: &mut GoalProgress, now: DateTime<Utc>) {
        self.roll_week(progress, now);
        progress.new_words_this_week += 1;
    }

    pub fn record_session(&self, progress: &mut GoalProgress, now: DateTime<Utc>) {
        self.roll_week(progress, now);
        progress.practice_sessions_this_week += 1;
    }

    pub fn award_review_points(&self, progress: &mut GoalProgress, quality: u8) {
        progress.points += quality as u64 * POINTS_PER_QUALITY;
    }

    /// Daily check-in: first ever starts the streak, a consecutive day extends
    /// it, a gap restarts it, and a repeat on the same day changes nothing.
    pub fn check_in(&self, progress: &mut GoalProgress, today: NaiveDate) -> CheckInOutcome {
        let kind = match progress.last_active_date {
            None => CheckInKind::Started,
            Some(last) if last == today => CheckInKind::AlreadyCheckedIn,
            Some(last) if last.succ_opt() == Some(today) => CheckInKind::Continued,
            Some(_) => CheckInKind::Reset,
        };

        match kind {
            CheckInKind::AlreadyCheckedIn => {}
            CheckInKind::Continued => {
                progress.streak += 1;
                progress.points += CHECK_IN_POINTS;
            }
            CheckInKind::Started | CheckInKind::Reset => {
                progress.streak = 1;
                progress.points += CHECK_IN_POINTS;
            }
        }
        if kind != CheckInKind::AlreadyCheckedIn {
            progress.last_active_date = Some(today);
        }

        CheckInOutcome {
            kind,
            streak: progress.streak,
            points: progress.points,
        }
    }

    pub fn summary(&self, progress: &GoalProgress) -> GoalsSummary {
        GoalsSummary {
            week_start: progress.week_start,
            new_words_this_week: progress.new_words_this_week,
            words_goal: self.targets.words_per_week,
            practice_sessions_this_week: progress.practice_sessions_this_week,
            sessions_goal: self.targets.sessions_per_week,
            streak: progress.streak,
            points: progress.points,
        }
    }
}

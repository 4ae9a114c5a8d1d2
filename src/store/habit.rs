use std::{fmt::Display, str::FromStr};

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Serialize;

use crate::utils::time::{day_start, local_day};

pub type HabitId = String;

/// A tracked routine. Field names follow the persisted format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    pub id: HabitId,
    pub name: String,
    /// Raw `HH:MM` as entered. It's only interpreted by the reminder engine, which skips it when
    /// it doesn't parse.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder_time: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Local midnight of every day the habit was completed, oldest first.
    pub history: Vec<DateTime<Utc>>,
    pub streak: u32,
    pub longest_streak: u32,
    pub last_completed: Option<DateTime<Utc>>,
    pub reminder_last_notified: Option<NaiveDate>,
}

/// Result of completing a habit for a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Completed { streak: u32, longest_streak: u32 },
    AlreadyCompleted,
}

impl Habit {
    /// Creates a habit with an empty history. Blank names are rejected by returning [None].
    pub fn new(
        id: HabitId,
        name: &str,
        reminder_time: Option<&str>,
        created_at: DateTime<Utc>,
    ) -> Option<Self> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let reminder_time = reminder_time
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from);

        Some(Self {
            id,
            name: name.to_string(),
            reminder_time,
            created_at,
            history: vec![],
            streak: 0,
            longest_streak: 0,
            last_completed: None,
            reminder_last_notified: None,
        })
    }

    /// Parsed reminder time, if one is configured.
    pub fn reminder(&self) -> Option<Result<ReminderTime>> {
        self.reminder_time.as_deref().map(ReminderTime::from_str)
    }

    pub fn completed_on(&self, day: NaiveDate) -> bool {
        self.history.iter().any(|v| local_day(*v) == day)
    }

    pub fn last_completed_day(&self) -> Option<NaiveDate> {
        self.last_completed
            .or_else(|| self.history.iter().max().copied())
            .map(local_day)
    }

    /// Records a completion for `today`. Completing the same day twice doesn't change anything.
    pub fn complete(&mut self, today: NaiveDate) -> Completion {
        if self.completed_on(today) {
            return Completion::AlreadyCompleted;
        }

        let follows_previous = self
            .last_completed_day()
            .is_some_and(|previous| (today - previous).num_days() == 1);

        self.streak = if follows_previous { self.streak + 1 } else { 1 };
        self.longest_streak = self.longest_streak.max(self.streak);

        let moment = day_start(today);
        self.history.push(moment);
        self.history.sort();
        self.last_completed = self.history.last().copied();

        Completion::Completed {
            streak: self.streak,
            longest_streak: self.longest_streak,
        }
    }

    /// Returns the habit to the state of a freshly created one, keeping its identity.
    pub fn reset(&mut self) {
        self.history.clear();
        self.streak = 0;
        self.longest_streak = 0;
        self.last_completed = None;
        self.reminder_last_notified = None;
    }

    /// Streak as seen on `today`. A run that ended before yesterday is already broken even though
    /// the stored counter is only reset on the next completion.
    pub fn effective_streak(&self, today: NaiveDate) -> u32 {
        match self.last_completed_day() {
            Some(last) if (today - last).num_days() <= 1 => self.streak,
            _ => 0,
        }
    }

    /// Completion days in chronological order.
    pub fn history_days(&self) -> Vec<NaiveDate> {
        let mut days = self.history.iter().map(|v| local_day(*v)).collect::<Vec<_>>();
        days.sort();
        days.dedup();
        days
    }

    pub fn fired_on(&self, day: NaiveDate) -> bool {
        self.reminder_last_notified == Some(day)
    }

    pub fn mark_fired(&mut self, day: NaiveDate) {
        self.reminder_last_notified = Some(day);
    }
}

/// Local time of day a reminder should go off at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReminderTime {
    hour: u32,
    minute: u32,
}

impl ReminderTime {
    pub fn new_opt(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(|_| Self { hour, minute })
    }

    /// The moment on `date` this reminder targets.
    pub fn on(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_hms_opt(self.hour, self.minute, 0)
            .unwrap_or_else(|| date.and_time(NaiveTime::MIN))
    }
}

impl FromStr for ReminderTime {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hour, minute) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| anyhow!("Expected HH:MM, got {s:?}"))?;
        let parse = |part: &str| -> Result<u32> {
            if part.is_empty() || part.len() > 2 || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(anyhow!("Expected HH:MM, got {s:?}"));
            }
            Ok(part.parse::<u32>()?)
        };
        ReminderTime::new_opt(parse(hour)?, parse(minute)?)
            .ok_or_else(|| anyhow!("{s:?} is not a valid time of day"))
    }
}

impl Display for ReminderTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    use super::{Completion, Habit, ReminderTime};

    const DAY: NaiveDate = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();

    fn habit() -> Habit {
        Habit::new(
            "id".into(),
            "Read",
            Some("09:00"),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_blank_name_is_rejected() {
        assert!(Habit::new("id".into(), "   ", None, Utc::now()).is_none());
        assert!(Habit::new("id".into(), "", None, Utc::now()).is_none());
    }

    #[test]
    fn test_name_and_reminder_are_trimmed() {
        let habit = Habit::new("id".into(), "  Walk ", Some(" "), Utc::now()).unwrap();
        assert_eq!(habit.name, "Walk");
        assert_eq!(habit.reminder_time, None);
        assert_eq!(habit.streak, 0);
        assert!(habit.history.is_empty());
    }

    #[test]
    fn test_complete_twice_same_day() {
        let mut habit = habit();
        assert_eq!(
            habit.complete(DAY),
            Completion::Completed {
                streak: 1,
                longest_streak: 1
            }
        );
        assert_eq!(habit.complete(DAY), Completion::AlreadyCompleted);
        assert_eq!(habit.history.len(), 1);
        assert_eq!(habit.streak, 1);
    }

    #[test]
    fn test_consecutive_days_extend_streak() {
        let mut habit = habit();
        for offset in 0..3 {
            habit.complete(DAY + Duration::days(offset));
        }
        assert_eq!(habit.streak, 3);
        assert_eq!(habit.longest_streak, 3);
        assert_eq!(habit.last_completed_day(), Some(DAY + Duration::days(2)));
    }

    #[test]
    fn test_skipped_day_resets_streak() {
        let mut habit = habit();
        habit.complete(DAY);
        habit.complete(DAY + Duration::days(2));
        assert_eq!(habit.streak, 1);
        assert_eq!(habit.longest_streak, 1);
    }

    #[test]
    fn test_longest_streak_never_decreases() {
        let mut habit = habit();
        let days = [0, 1, 2, 3, 5, 6, 9, 10, 11, 12, 13];
        let mut previous = 0;
        for offset in days {
            habit.complete(DAY + Duration::days(offset));
            assert!(habit.longest_streak >= previous);
            assert!(habit.longest_streak >= habit.streak);
            previous = habit.longest_streak;
        }
        assert_eq!(habit.streak, 5);
        assert_eq!(habit.longest_streak, 5);
    }

    #[test]
    fn test_reset_clears_progress() {
        let mut habit = habit();
        habit.complete(DAY);
        habit.complete(DAY + Duration::days(1));
        habit.mark_fired(DAY);

        habit.reset();

        assert!(habit.history.is_empty());
        assert_eq!(habit.streak, 0);
        assert_eq!(habit.longest_streak, 0);
        assert_eq!(habit.last_completed, None);
        assert_eq!(habit.reminder_last_notified, None);
        assert_eq!(habit.name, "Read");
        assert_eq!(habit.reminder_time.as_deref(), Some("09:00"));
    }

    #[test]
    fn test_effective_streak_breaks_after_missed_day() {
        let mut habit = habit();
        habit.complete(DAY);
        habit.complete(DAY + Duration::days(1));

        assert_eq!(habit.effective_streak(DAY + Duration::days(1)), 2);
        assert_eq!(habit.effective_streak(DAY + Duration::days(2)), 2);
        assert_eq!(habit.effective_streak(DAY + Duration::days(3)), 0);
    }

    #[test]
    fn test_history_days_are_chronological() {
        let mut habit = habit();
        habit.complete(DAY + Duration::days(3));
        habit.complete(DAY);
        assert_eq!(habit.history_days(), vec![DAY, DAY + Duration::days(3)]);
    }

    #[test]
    fn test_backdated_completion_keeps_latest_day() {
        let mut habit = habit();
        habit.complete(DAY + Duration::days(3));
        habit.complete(DAY);
        assert_eq!(habit.last_completed_day(), Some(DAY + Duration::days(3)));
        assert_eq!(habit.effective_streak(DAY + Duration::days(4)), 1);
    }

    #[test]
    fn test_reminder_time_parsing() {
        assert_eq!(
            "09:05".parse::<ReminderTime>().unwrap(),
            ReminderTime::new_opt(9, 5).unwrap()
        );
        assert_eq!("7:30".parse::<ReminderTime>().unwrap().to_string(), "07:30");
        assert!("24:00".parse::<ReminderTime>().is_err());
        assert!("12:60".parse::<ReminderTime>().is_err());
        assert!("noon".parse::<ReminderTime>().is_err());
        assert!("12:".parse::<ReminderTime>().is_err());
        assert!("-1:30".parse::<ReminderTime>().is_err());
    }
}

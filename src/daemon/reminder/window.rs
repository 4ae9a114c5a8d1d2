use std::fmt::Display;

use chrono::{NaiveDateTime, TimeDelta};
use clap::ValueEnum;
use tracing::{debug, warn};

use crate::store::habit::{Habit, HabitId, ReminderTime};

/// How long after its target a reminder may still fire. Twice the poll interval, so a late tick
/// doesn't skip a reminder.
pub const REMINDER_WINDOW: TimeDelta = TimeDelta::seconds(60);

/// Which of the reminders that became due in the same tick get a visible notification. All of
/// them are marked as fired either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum NotifyPolicy {
    /// Only the first due habit in list order.
    #[default]
    First,
    /// Every due habit.
    All,
}

impl Display for NotifyPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotifyPolicy::First => write!(f, "first"),
            NotifyPolicy::All => write!(f, "all"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueReminder {
    pub id: HabitId,
    pub name: String,
    pub at: ReminderTime,
}

/// Checks whether the reminder of `habit` should fire at local time `now`.
pub fn due_at(habit: &Habit, now: NaiveDateTime) -> Option<ReminderTime> {
    let reminder = match habit.reminder()? {
        Ok(v) => v,
        Err(e) => {
            warn!("Skipping reminder of {}: {e}", habit.name);
            return None;
        }
    };
    let today = now.date();
    if habit.fired_on(today) || habit.completed_on(today) {
        return None;
    }

    let elapsed = now - reminder.on(today);
    (elapsed >= TimeDelta::zero() && elapsed <= REMINDER_WINDOW).then_some(reminder)
}

/// Finds every habit whose reminder is due and marks it as fired for today, so that later ticks
/// of the same day skip it.
pub fn collect_due(habits: &mut [Habit], now: NaiveDateTime) -> Vec<DueReminder> {
    habits
        .iter_mut()
        .filter_map(|habit| {
            let at = due_at(habit, now)?;
            habit.mark_fired(now.date());
            debug!("Reminder of {} at {at} is due", habit.name);
            Some(DueReminder {
                id: habit.id.clone(),
                name: habit.name.clone(),
                at,
            })
        })
        .collect()
}

/// Narrows due reminders down to the ones the user gets to see.
pub fn select(due: Vec<DueReminder>, policy: NotifyPolicy) -> Vec<DueReminder> {
    match policy {
        NotifyPolicy::First => due.into_iter().take(1).collect(),
        NotifyPolicy::All => due,
    }
}

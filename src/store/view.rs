use std::fmt::Display;

use chrono::NaiveDate;
use clap::ValueEnum;

use super::habit::Habit;

/// Projection of the habit list used when displaying it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum View {
    /// Every habit.
    #[default]
    All,
    /// Habits not completed yet today.
    Today,
    /// Habits that have a reminder time configured.
    Reminders,
}

impl View {
    pub fn includes(&self, habit: &Habit, today: NaiveDate) -> bool {
        match self {
            View::All => true,
            View::Today => !habit.completed_on(today),
            View::Reminders => habit.reminder_time.is_some(),
        }
    }
}

impl Display for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            View::All => write!(f, "all"),
            View::Today => write!(f, "today"),
            View::Reminders => write!(f, "reminders"),
        }
    }
}

/// Habits visible in `view`, keeping list order.
pub fn filter(habits: &[Habit], view: View, today: NaiveDate) -> Vec<&Habit> {
    habits.iter().filter(|v| view.includes(v, today)).collect()
}

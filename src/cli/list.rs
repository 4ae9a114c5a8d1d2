use ansi_term::{Colour, Style};
use anyhow::Result;
use chrono::{DateTime, Local};

use crate::store::{habit::Habit, view::View};

/// Renders habits as an aligned table. Colours are only used when `styled` is set.
pub fn render_table(habits: &[&Habit], view: View, now: DateTime<Local>, styled: bool) -> String {
    if habits.is_empty() {
        return match view {
            View::All => "No habits yet. Add one with `habitwatch add <name>`".into(),
            View::Today => "Everything is done for today".into(),
            View::Reminders => "No habits have reminders".into(),
        };
    }

    let today = now.date_naive();
    let name_width = habits
        .iter()
        .map(|v| v.name.chars().count())
        .max()
        .unwrap_or(0);

    habits
        .iter()
        .map(|habit| {
            let done = habit.completed_on(today);
            let mark = match (done, styled) {
                (true, true) => Colour::Green.paint("✓").to_string(),
                (true, false) => "✓".into(),
                (false, _) => " ".into(),
            };
            let name = format!("{:<name_width$}", habit.name);
            let name = if styled && done {
                Style::new().dimmed().paint(name).to_string()
            } else {
                name
            };
            let streak = habit.effective_streak(today);
            let streak = format!("streak {streak:>3} (best {:>3})", habit.longest_streak);
            let streak = if styled && habit.effective_streak(today) > 0 {
                Colour::Yellow.paint(streak).to_string()
            } else {
                streak
            };
            let reminder = habit.reminder_time.as_deref().unwrap_or("--:--");
            let id = habit.id.get(..8).unwrap_or(&habit.id);
            format!("{mark} {name}  {streak}  {reminder:>5}  {id}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_json(habits: &[&Habit]) -> Result<String> {
    Ok(serde_json::to_string_pretty(habits)?)
}

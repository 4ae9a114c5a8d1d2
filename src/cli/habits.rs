//! Handlers for commands that change or inspect single habits. They return the text to print so
//! they can be exercised without a terminal.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Local};

use crate::{
    store::{
        habit::{Completion, Habit, ReminderTime},
        storage::KeyValueStorage,
        HabitStore,
    },
    utils::time::date_key,
};

pub async fn add(
    store: &mut HabitStore<impl KeyValueStorage>,
    name: &str,
    at: Option<ReminderTime>,
    now: DateTime<Local>,
) -> Result<String> {
    let reminder = at.map(|v| v.to_string());
    match store.create(name, reminder.as_deref(), now).await? {
        Some(habit) => Ok(match &habit.reminder_time {
            Some(time) => format!("Added {} with a reminder at {time} ({})", habit.name, habit.id),
            None => format!("Added {} ({})", habit.name, habit.id),
        }),
        None => Ok("Habit name can't be empty, nothing added".into()),
    }
}

pub async fn done(
    store: &mut HabitStore<impl KeyValueStorage>,
    query: &str,
    now: DateTime<Local>,
) -> Result<String> {
    let habit = store.resolve(query)?;
    let (id, name) = (habit.id.clone(), habit.name.clone());
    match store.complete(&id, now).await? {
        Some(Completion::Completed {
            streak,
            longest_streak,
        }) => Ok(format!(
            "{name} done for today. Streak {streak} {}, best {longest_streak}",
            days(streak)
        )),
        Some(Completion::AlreadyCompleted) => Ok(format!("{name} was already done today")),
        None => Err(anyhow!("Habit {id} disappeared")),
    }
}

pub async fn reset(store: &mut HabitStore<impl KeyValueStorage>, query: &str) -> Result<String> {
    let habit = store.resolve(query)?;
    let (id, name) = (habit.id.clone(), habit.name.clone());
    if store.reset(&id).await? {
        Ok(format!("{name} was reset"))
    } else {
        Err(anyhow!("Habit {id} disappeared"))
    }
}

pub async fn delete(store: &mut HabitStore<impl KeyValueStorage>, query: &str) -> Result<String> {
    let id = store.resolve(query)?.id.clone();
    match store.delete(&id).await? {
        Some(habit) => Ok(format!("Deleted {}", habit.name)),
        None => Err(anyhow!("Habit {id} disappeared")),
    }
}

pub fn show(store: &HabitStore<impl KeyValueStorage>, query: &str, now: DateTime<Local>) -> Result<String> {
    Ok(describe(store.resolve(query)?, now))
}

fn describe(habit: &Habit, now: DateTime<Local>) -> String {
    let today = now.date_naive();
    let mut lines = vec![
        format!("{} ({})", habit.name, habit.id),
        format!(
            "Created:  {}",
            habit.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        ),
        format!(
            "Reminder: {}",
            habit.reminder_time.as_deref().unwrap_or("none")
        ),
        format!(
            "Streak:   {} {} (best {})",
            habit.effective_streak(today),
            days(habit.effective_streak(today)),
            habit.longest_streak
        ),
    ];
    let history = habit.history_days();
    if history.is_empty() {
        lines.push("History:  never completed".into());
    } else {
        lines.push(format!("History:  {} days", history.len()));
        lines.extend(history.into_iter().map(|day| format!("  {}", date_key(day))));
    }
    lines.join("\n")
}

fn days(count: u32) -> &'static str {
    if count == 1 {
        "day"
    } else {
        "days"
    }
}

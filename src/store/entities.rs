//! Persisted form of the habit list. Reading is deliberately lenient about timestamps so that
//! blobs written by older builds (or edited by hand) still load.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::utils::time::{day_start, local_day};

use super::habit::{Habit, HabitId};

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Serialize)]
struct HabitsBlob<'a> {
    version: u32,
    habits: &'a [Habit],
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredBlob {
    Versioned {
        version: u32,
        habits: Vec<StoredHabit>,
    },
    Unversioned(Vec<StoredHabit>),
}

/// A habit exactly as found in the blob, before normalization.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct StoredHabit {
    pub id: HabitId,
    pub name: String,
    #[serde(default)]
    pub reminder_time: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub history: Vec<Value>,
    #[serde(default)]
    pub streak: u32,
    #[serde(default)]
    pub longest_streak: u32,
    #[serde(default)]
    pub reminder_last_notified: Option<Value>,
}

impl From<StoredHabit> for Habit {
    fn from(
        StoredHabit {
            id,
            name,
            reminder_time,
            created_at,
            history,
            streak,
            longest_streak,
            reminder_last_notified,
        }: StoredHabit,
    ) -> Self {
        let history = normalize_history(&id, &history);
        let last_completed = history.last().copied();
        let streak = if history.is_empty() { 0 } else { streak };

        Habit {
            id,
            name,
            reminder_time: reminder_time.filter(|v| !v.trim().is_empty()),
            created_at,
            history,
            streak,
            longest_streak: longest_streak.max(streak),
            last_completed,
            reminder_last_notified: reminder_last_notified.as_ref().and_then(parse_day),
        }
    }
}

pub fn serialize_habits(habits: &[Habit]) -> serde_json::Result<String> {
    serde_json::to_string(&HabitsBlob {
        version: SCHEMA_VERSION,
        habits,
    })
}

pub fn deserialize_habits(blob: &str) -> serde_json::Result<Vec<Habit>> {
    let habits = match serde_json::from_str::<StoredBlob>(blob)? {
        StoredBlob::Versioned { version, habits } => {
            if version > SCHEMA_VERSION {
                warn!("Blob has schema version {version}, newer than {SCHEMA_VERSION}. Reading anyway");
            }
            habits
        }
        StoredBlob::Unversioned(habits) => habits,
    };
    Ok(habits.into_iter().map(Habit::from).collect())
}

/// Collapses every entry of a day into that day's local midnight and drops values that aren't
/// timestamps. The result is chronological.
pub fn normalize_history(id: &str, history: &[Value]) -> Vec<DateTime<Utc>> {
    let days = history
        .iter()
        .filter_map(|value| {
            let parsed = parse_timestamp(value).map(local_day);
            if parsed.is_none() {
                warn!("Dropping invalid history entry {value} of habit {id}");
            }
            parsed
        })
        .collect::<BTreeSet<_>>();

    days.into_iter().map(day_start).collect()
}

/// Accepts RFC 3339 strings, bare `YYYY-MM-DD` dates and epoch milliseconds.
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|v| v.with_timezone(&Utc))
            .ok()
            .or_else(|| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().map(day_start)),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

fn parse_day(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .or_else(|| parse_timestamp(value).map(local_day)),
        _ => parse_timestamp(value).map(local_day),
    }
}

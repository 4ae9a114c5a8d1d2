//! The habit store owns the authoritative list of habits and keeps it mirrored into a
//! [KeyValueStorage] slot.
//!  - Every mutation rewrites the whole slot, starting from the latest stored list while the
//!    slot is held, so changes from other processes are never overwritten.
//!  - Loading never fails. An unreadable blob is logged and treated as an empty list.
//!  - Habits are kept most recent first.

pub mod entities;
pub mod habit;
pub mod storage;
pub mod view;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Local};
use habit::{Completion, Habit};
use storage::KeyValueStorage;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;
use view::View;

pub const HABITS_KEY: &str = "habits";

pub struct HabitStore<S: KeyValueStorage> {
    storage: S,
    habits: Vec<Habit>,
}

impl<S: KeyValueStorage> HabitStore<S> {
    /// Rehydrates the store from `storage`.
    pub async fn load(storage: S) -> Self {
        let habits = read_habits(&storage).await;
        Self { storage, habits }
    }

    pub fn habits(&self) -> &[Habit] {
        &self.habits
    }

    pub fn get(&self, id: &str) -> Option<&Habit> {
        self.habits.iter().find(|v| v.id == id)
    }

    /// Finds a habit by id, unique id prefix or name. Names are compared case-insensitively.
    pub fn resolve(&self, query: &str) -> Result<&Habit> {
        let query = query.trim();
        if let Some(habit) = self.get(query) {
            return Ok(habit);
        }

        let by_name = self
            .habits
            .iter()
            .filter(|v| v.name.eq_ignore_ascii_case(query))
            .collect::<Vec<_>>();
        let by_prefix = self
            .habits
            .iter()
            .filter(|v| !query.is_empty() && v.id.starts_with(query))
            .collect::<Vec<_>>();

        match (by_name.as_slice(), by_prefix.as_slice()) {
            ([habit], _) => Ok(*habit),
            ([], [habit]) => Ok(*habit),
            ([], []) => Err(anyhow!("No habit matches {query:?}")),
            _ => Err(anyhow!("{query:?} matches more than one habit, use its id")),
        }
    }

    /// Creates a habit and puts it first. Blank names are ignored and return [None].
    #[instrument(skip(self))]
    pub async fn create(
        &mut self,
        name: &str,
        reminder_time: Option<&str>,
        now: DateTime<Local>,
    ) -> Result<Option<&Habit>> {
        let id = Uuid::new_v4().to_string();
        let Some(habit) = Habit::new(id.clone(), name, reminder_time, now.to_utc()) else {
            debug!("Ignoring habit with a blank name");
            return Ok(None);
        };
        self.update(|habits| {
            info!("Created habit {} ({})", habit.name, habit.id);
            habits.insert(0, habit);
            ((), true)
        })
        .await?;
        Ok(self.get(&id))
    }

    /// Marks a habit done for the current day. [None] means the habit doesn't exist.
    #[instrument(skip(self))]
    pub async fn complete(&mut self, id: &str, now: DateTime<Local>) -> Result<Option<Completion>> {
        self.update(|habits| {
            let Some(habit) = habits.iter_mut().find(|v| v.id == id) else {
                return (None, false);
            };
            let completion = habit.complete(now.date_naive());
            let changed = matches!(completion, Completion::Completed { .. });
            if let Completion::Completed { streak, .. } = completion {
                info!("Completed habit {} with streak {streak}", habit.name);
            }
            (Some(completion), changed)
        })
        .await
    }

    /// Clears all progress of a habit. Returns false when the habit doesn't exist.
    #[instrument(skip(self))]
    pub async fn reset(&mut self, id: &str) -> Result<bool> {
        self.update(|habits| {
            let Some(habit) = habits.iter_mut().find(|v| v.id == id) else {
                return (false, false);
            };
            habit.reset();
            info!("Reset habit {}", habit.name);
            (true, true)
        })
        .await
    }

    /// Removes a habit, returning it.
    #[instrument(skip(self))]
    pub async fn delete(&mut self, id: &str) -> Result<Option<Habit>> {
        self.update(|habits| {
            let Some(position) = habits.iter().position(|v| v.id == id) else {
                return (None, false);
            };
            let habit = habits.remove(position);
            info!("Deleted habit {}", habit.name);
            (Some(habit), true)
        })
        .await
    }

    pub fn filter(&self, view: View, now: DateTime<Local>) -> Vec<&Habit> {
        view::filter(&self.habits, view, now.date_naive())
    }

    /// Applies `change` to the latest stored list while holding the slot, so writers in other
    /// processes can't interleave. `change` returns its result and whether the list was modified;
    /// unmodified lists aren't written back. The in-memory list is refreshed either way.
    pub async fn update<T>(
        &mut self,
        change: impl FnOnce(&mut Vec<Habit>) -> (T, bool),
    ) -> Result<T> {
        let mut outcome = None;
        let mut latest = None;
        self.storage
            .update(HABITS_KEY, |blob| {
                let mut habits = blob.as_deref().map(parse_habits).unwrap_or_default();
                let (value, changed) = change(&mut habits);
                let blob = if changed {
                    Some(entities::serialize_habits(&habits)?)
                } else {
                    None
                };
                outcome = Some(value);
                latest = Some(habits);
                Ok(blob)
            })
            .await
            .inspect_err(|e| error!("Failed to update habits {e:?}"))?;

        if let Some(habits) = latest {
            self.habits = habits;
        }
        outcome.ok_or_else(|| anyhow!("Habit update was never applied"))
    }
}

async fn read_habits(storage: &impl KeyValueStorage) -> Vec<Habit> {
    let blob = match storage.get(HABITS_KEY).await {
        Ok(Some(blob)) => blob,
        Ok(None) => return vec![],
        Err(e) => {
            error!("Failed to read habits, starting empty {e:?}");
            return vec![];
        }
    };
    parse_habits(&blob)
}

fn parse_habits(blob: &str) -> Vec<Habit> {
    match entities::deserialize_habits(blob) {
        Ok(habits) => {
            debug!("Loaded {} habits", habits.len());
            habits
        }
        Err(e) => {
            error!("Stored habits are corrupted, starting empty {e}");
            vec![]
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{DateTime, Duration, Local, TimeZone};

    use crate::utils::logging::TEST_LOGGING;

    use super::{
        habit::Completion,
        storage::{KeyValueStorage, MemoryStorage},
        view::View,
        HabitStore, HABITS_KEY,
    };

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 1, day, hour, minute, 0)
            .single()
            .unwrap()
    }

    async fn store_with(names: &[&str]) -> Result<(HabitStore<MemoryStorage>, MemoryStorage)> {
        let storage = MemoryStorage::new();
        let mut store = HabitStore::load(storage.clone()).await;
        for name in names {
            store.create(name, None, at(1, 12, 0)).await?;
        }
        Ok((store, storage))
    }

    #[tokio::test]
    async fn test_create_prepends_and_persists() -> Result<()> {
        *TEST_LOGGING;
        let (store, storage) = store_with(&["first", "second"]).await?;

        let names = store.habits().iter().map(|v| v.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["second", "first"]);
        assert_ne!(store.habits()[0].id, store.habits()[1].id);

        let reloaded = HabitStore::load(storage).await;
        assert_eq!(reloaded.habits(), store.habits());
        Ok(())
    }

    #[tokio::test]
    async fn test_create_blank_is_noop() -> Result<()> {
        let (mut store, storage) = store_with(&[]).await?;
        assert!(store.create("  ", Some("09:00"), at(1, 9, 0)).await?.is_none());
        assert!(store.habits().is_empty());
        assert_eq!(storage.get(HABITS_KEY).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_complete_is_idempotent_per_day() -> Result<()> {
        let (mut store, _) = store_with(&["Read"]).await?;
        let id = store.habits()[0].id.clone();

        assert_eq!(
            store.complete(&id, at(2, 8, 0)).await?,
            Some(Completion::Completed {
                streak: 1,
                longest_streak: 1
            })
        );
        assert_eq!(
            store.complete(&id, at(2, 22, 0)).await?,
            Some(Completion::AlreadyCompleted)
        );
        assert_eq!(store.get(&id).unwrap().history.len(), 1);
        assert_eq!(store.complete("missing", at(2, 8, 0)).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_streak_over_days() -> Result<()> {
        let (mut store, storage) = store_with(&["Read"]).await?;
        let id = store.habits()[0].id.clone();

        store.complete(&id, at(3, 8, 0)).await?;
        store.complete(&id, at(4, 23, 0)).await?;
        store.complete(&id, at(5, 0, 30)).await?;
        assert_eq!(store.get(&id).unwrap().streak, 3);

        store.complete(&id, at(7, 8, 0)).await?;
        let habit = store.get(&id).unwrap();
        assert_eq!(habit.streak, 1);
        assert_eq!(habit.longest_streak, 3);

        let reloaded = HabitStore::load(storage).await;
        assert_eq!(reloaded.get(&id), store.get(&id));
        Ok(())
    }

    #[tokio::test]
    async fn test_reset_and_delete() -> Result<()> {
        let (mut store, storage) = store_with(&["Read", "Walk"]).await?;
        let walk = store.habits()[0].id.clone();
        let read = store.habits()[1].id.clone();

        store.complete(&walk, at(3, 8, 0)).await?;
        store.complete(&read, at(3, 8, 0)).await?;

        assert!(store.reset(&walk).await?);
        assert!(!store.reset("missing").await?);
        let habit = store.get(&walk).unwrap();
        assert!(habit.history.is_empty());
        assert_eq!((habit.streak, habit.longest_streak), (0, 0));

        let removed = store.delete(&walk).await?.unwrap();
        assert_eq!(removed.name, "Walk");
        assert!(store.delete(&walk).await?.is_none());
        assert_eq!(store.habits().len(), 1);
        assert_eq!(store.get(&read).unwrap().streak, 1);

        let reloaded = HabitStore::load(storage).await;
        assert_eq!(reloaded.habits(), store.habits());
        Ok(())
    }

    #[tokio::test]
    async fn test_corrupt_blob_loads_empty() -> Result<()> {
        *TEST_LOGGING;
        let storage = MemoryStorage::new();
        storage.set(HABITS_KEY, "{{{".into()).await?;

        let store = HabitStore::load(storage).await;
        assert!(store.habits().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_stale_store_keeps_other_writers() -> Result<()> {
        *TEST_LOGGING;
        let (mut store, storage) = store_with(&["Read"]).await?;
        let read_id = store.habits()[0].id.clone();

        let mut other = HabitStore::load(storage.clone()).await;
        let walk_id = other
            .create("Walk", Some("07:00"), at(1, 13, 0))
            .await?
            .unwrap()
            .id
            .clone();
        other.complete(&walk_id, at(1, 13, 5)).await?;

        // `store` never saw Walk, its next mutation must not drop it.
        store.complete(&read_id, at(1, 14, 0)).await?;
        assert_eq!(store.habits().len(), 2);

        let stored = HabitStore::load(storage).await;
        assert_eq!(stored.get(&walk_id).unwrap().history.len(), 1);
        assert_eq!(stored.get(&read_id).unwrap().history.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_id_does_not_write() -> Result<()> {
        let storage = MemoryStorage::new();
        let mut store = HabitStore::load(storage.clone()).await;

        assert!(store.complete("missing", at(1, 12, 0)).await?.is_none());
        assert!(!store.reset("missing").await?);
        assert!(store.delete("missing").await?.is_none());
        assert_eq!(storage.get(HABITS_KEY).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_filter_views() -> Result<()> {
        let (mut store, _) = store_with(&["Read"]).await?;
        store.create("Walk", Some("07:00"), at(1, 13, 0)).await?;
        let read = store.habits()[1].id.clone();
        let now = at(2, 10, 0);
        store.complete(&read, now).await?;

        let today = store.filter(View::Today, now);
        assert_eq!(today.len(), 1);
        assert_eq!(today[0].name, "Walk");

        let reminders = store.filter(View::Reminders, now);
        assert_eq!(reminders.len(), 1);
        assert_eq!(reminders[0].name, "Walk");

        assert_eq!(store.filter(View::Today, now + Duration::days(1)).len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_resolve() -> Result<()> {
        let (store, _) = store_with(&["Read", "Walk"]).await?;
        let walk = store.habits()[0].clone();

        assert_eq!(store.resolve("walk")?.id, walk.id);
        assert_eq!(store.resolve(&walk.id)?.id, walk.id);
        assert_eq!(store.resolve(&walk.id[..8])?.id, walk.id);
        assert!(store.resolve("swim").is_err());
        assert!(store.resolve("").is_err());
        Ok(())
    }
}

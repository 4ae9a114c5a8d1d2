use std::{collections::HashMap, future::Future, ops::Deref, path::PathBuf, sync::Arc};

use anyhow::Result;
use tokio::sync::Mutex;
use tracing::debug;

use crate::fs::operations::{read_optional, write_atomic, LockFile};

/// Interface for abstracting the local key-value slots everything is persisted into. Blobs are
/// always read and written whole.
pub trait KeyValueStorage {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>>;

    fn set(&self, key: &str, blob: String) -> impl Future<Output = Result<()>>;

    /// Read-modify-write of one slot. No other writer can touch the slot between the read and
    /// the write. `change` returns the new blob, or [None] to leave the slot as it is.
    fn update<F>(&self, key: &str, change: F) -> impl Future<Output = Result<()>>
    where
        F: FnOnce(Option<String>) -> Result<Option<String>>;
}

impl<T: Deref> KeyValueStorage for T
where
    T::Target: KeyValueStorage,
{
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>> {
        self.deref().get(key)
    }

    fn set(&self, key: &str, blob: String) -> impl Future<Output = Result<()>> {
        self.deref().set(key, blob)
    }

    fn update<F>(&self, key: &str, change: F) -> impl Future<Output = Result<()>>
    where
        F: FnOnce(Option<String>) -> Result<Option<String>>,
    {
        self.deref().update(key, change)
    }
}

/// The main realization of [KeyValueStorage]. Every key is a json file inside one directory.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&dir)?;

        Ok(Self { dir })
    }

    fn slot_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn lock_path(&self) -> PathBuf {
        self.dir.join(".lock")
    }
}

impl KeyValueStorage for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.slot_path(key);
        debug!("Reading {path:?}");
        let lock = LockFile::acquire(&self.lock_path(), false).await?;
        let result = read_optional(&path).await;
        lock.release().await?;
        Ok(result?)
    }

    async fn set(&self, key: &str, blob: String) -> Result<()> {
        let path = self.slot_path(key);
        debug!("Writing {} bytes into {path:?}", blob.len());
        let lock = LockFile::acquire(&self.lock_path(), true).await?;
        let result = write_atomic(&path, blob.as_bytes()).await;
        lock.release().await?;
        Ok(result?)
    }

    async fn update<F>(&self, key: &str, change: F) -> Result<()>
    where
        F: FnOnce(Option<String>) -> Result<Option<String>>,
    {
        let path = self.slot_path(key);
        let lock = LockFile::acquire(&self.lock_path(), true).await?;
        let result = async {
            let current = read_optional(&path).await?;
            if let Some(blob) = change(current)? {
                debug!("Updating {path:?} with {} bytes", blob.len());
                write_atomic(&path, blob.as_bytes()).await?;
            }
            Ok::<_, anyhow::Error>(())
        }
        .await;
        lock.release().await?;
        result
    }
}

/// Keeps slots in memory. Clones share the same slots.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    slots: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.slots.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, blob: String) -> Result<()> {
        self.slots.lock().await.insert(key.to_string(), blob);
        Ok(())
    }

    async fn update<F>(&self, key: &str, change: F) -> Result<()>
    where
        F: FnOnce(Option<String>) -> Result<Option<String>>,
    {
        let mut slots = self.slots.lock().await;
        if let Some(blob) = change(slots.get(key).cloned())? {
            slots.insert(key.to_string(), blob);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{path::PathBuf, sync::Arc, thread};

    use anyhow::Result;
    use tempfile::tempdir;

    use crate::utils::runtime::single_thread_runtime;

    use super::{FileStorage, KeyValueStorage, MemoryStorage};

    async fn increment(storage: &impl KeyValueStorage) -> Result<()> {
        storage
            .update("counter", |blob| {
                let count = blob.map(|v| v.parse::<u32>()).transpose()?.unwrap_or(0);
                Ok(Some((count + 1).to_string()))
            })
            .await
    }

    #[tokio::test]
    async fn test_file_storage_basic() -> Result<()> {
        let dir = tempdir()?;
        let storage = FileStorage::new(dir.path().join("store"))?;

        assert_eq!(storage.get("habits").await?, None);

        storage.set("habits", "[]".into()).await?;
        storage.set("other", "{}".into()).await?;

        assert_eq!(storage.get("habits").await?.as_deref(), Some("[]"));
        assert_eq!(storage.get("other").await?.as_deref(), Some("{}"));
        assert!(dir.path().join("store").join("habits.json").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_file_storage_survives_reopen() -> Result<()> {
        let dir = tempdir()?;
        FileStorage::new(dir.path().to_owned())?
            .set("habits", "saved".into())
            .await?;

        let reopened = FileStorage::new(dir.path().to_owned())?;
        assert_eq!(reopened.get("habits").await?.as_deref(), Some("saved"));
        Ok(())
    }

    #[tokio::test]
    async fn test_shared_storage_through_arc() -> Result<()> {
        let storage = Arc::new(MemoryStorage::new());
        let other = storage.clone();

        storage.set("key", "value".into()).await?;

        assert_eq!(other.get("key").await?.as_deref(), Some("value"));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_skips_write_on_none() -> Result<()> {
        let dir = tempdir()?;
        let storage = FileStorage::new(dir.path().to_owned())?;

        storage
            .update("habits", |blob| {
                assert_eq!(blob, None);
                Ok(None)
            })
            .await?;
        assert!(!dir.path().join("habits.json").exists());

        increment(&storage).await?;
        increment(&storage).await?;
        assert_eq!(storage.get("counter").await?.as_deref(), Some("2"));
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_update_keeps_old_value() -> Result<()> {
        let storage = MemoryStorage::new();
        storage.set("counter", "7".into()).await?;

        let result = storage
            .update("counter", |_| Err(anyhow::anyhow!("rejected")))
            .await;

        assert!(result.is_err());
        assert_eq!(storage.get("counter").await?.as_deref(), Some("7"));
        Ok(())
    }

    /// Separate threads with their own runtime and their own [FileStorage] stand in for the cli
    /// and the daemon. Every increment has to survive.
    #[test]
    fn test_file_storage_concurrent_writers() -> Result<()> {
        const WRITERS: usize = 4;
        const INCREMENTS: usize = 25;

        let dir = tempdir()?;
        let handles = (0..WRITERS)
            .map(|_| {
                let path: PathBuf = dir.path().to_owned();
                thread::spawn(move || -> Result<()> {
                    let storage = FileStorage::new(path)?;
                    single_thread_runtime()?.block_on(async {
                        for _ in 0..INCREMENTS {
                            increment(&storage).await?;
                        }
                        Ok::<_, anyhow::Error>(())
                    })
                })
            })
            .collect::<Vec<_>>();

        for handle in handles {
            handle
                .join()
                .map_err(|_| anyhow::anyhow!("writer panicked"))??;
        }

        let storage = FileStorage::new(dir.path().to_owned())?;
        let total = single_thread_runtime()?.block_on(storage.get("counter"))?;
        assert_eq!(total, Some((WRITERS * INCREMENTS).to_string()));
        Ok(())
    }
}

use std::path::{Path, PathBuf};

use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{self, AsyncWriteExt},
};

/// Advisory lock held on a sidecar file. Both the CLI and the daemon touch the same blobs, so
/// every read takes a shared lock and every write an exclusive one.
pub struct LockFile {
    file: File,
}

impl LockFile {
    pub async fn acquire(path: &Path, exclusive: bool) -> Result<Self, io::Error> {
        let file = File::options()
            .write(true)
            .create(true)
            .read(true)
            .truncate(false)
            .open(path)
            .await?;
        if exclusive {
            file.lock_exclusive()?;
        } else {
            file.lock_shared()?;
        }
        Ok(Self { file })
    }

    pub async fn release(self) -> Result<(), io::Error> {
        self.file.unlock_async().await
    }
}

/// Replaces the contents of `path` in one step. Data goes into a sibling temporary file first and
/// is then renamed over the target, so readers never observe a half written blob.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), io::Error> {
    let temp = temp_path(path);
    let mut file = File::options()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp)
        .await?;
    file.write_all(contents).await?;
    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(&temp, path).await
}

/// Reads the whole file. A missing file is not an error, it just means nothing was saved yet.
pub async fn read_optional(path: &Path) -> Result<Option<String>, io::Error> {
    match tokio::fs::read_to_string(path).await {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|v| v.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

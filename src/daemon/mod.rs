use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use reminder::{toast::ToastSlot, window::NotifyPolicy, ReminderModule};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    notify::{default_notifier, permission::PermissionStore, Notifier},
    store::{
        storage::{FileStorage, KeyValueStorage},
        HabitStore,
    },
    utils::clock::{Clock, DefaultClock},
};

pub mod args;
pub mod reminder;
pub mod shutdown;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Location of the key-value slots inside the application directory.
pub fn store_dir(app_dir: &std::path::Path) -> PathBuf {
    app_dir.join("store")
}

/// Represents the starting point for the daemon
pub async fn start_daemon(dir: PathBuf, policy: NotifyPolicy) -> Result<()> {
    // The working directory changes below, relative paths would point elsewhere afterwards.
    let dir = std::fs::canonicalize(&dir)?;
    let storage = Arc::new(FileStorage::new(store_dir(&dir))?);
    std::env::set_current_dir("/")?;

    let shutdown_token = CancellationToken::new();

    let reminders = create_reminder_module(
        storage,
        default_notifier(),
        policy,
        &shutdown_token,
        DefaultClock,
    )
    .await;

    info!("Daemon started for {dir:?}");
    let (_, reminder_result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token.clone()),
        reminders.run(),
    );

    if let Err(reminder_result) = reminder_result {
        error!("Reminder module got an error {:?}", reminder_result);
    }
    info!("Daemon stopped");

    Ok(())
}

async fn create_reminder_module<S: KeyValueStorage + Clone>(
    storage: S,
    notifier: Box<dyn Notifier>,
    policy: NotifyPolicy,
    shutdown_token: &CancellationToken,
    clock: impl Clock,
) -> ReminderModule<S> {
    let permissions = PermissionStore::new(storage.clone(), notifier.is_supported());
    let store = HabitStore::load(storage).await;
    ReminderModule::new(
        store,
        permissions,
        notifier,
        ToastSlot::default(),
        policy,
        shutdown_token.clone(),
        DEFAULT_POLL_INTERVAL,
        Box::new(clock),
    )
}

pub mod toast;
pub mod window;

use std::time::Duration;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use toast::{Toast, ToastSlot};
use tracing::{debug, error, info, info_span, warn, Instrument};
use window::{DueReminder, NotifyPolicy};

use crate::{
    notify::{
        permission::{PermissionState, PermissionStore},
        Notification, Notifier,
    },
    store::{storage::KeyValueStorage, HabitStore},
    utils::clock::Clock,
};

/// Periodically checks habit reminders and surfaces the ones that are due.
pub struct ReminderModule<S: KeyValueStorage> {
    store: HabitStore<S>,
    permissions: PermissionStore<S>,
    notifier: Box<dyn Notifier>,
    toasts: ToastSlot,
    policy: NotifyPolicy,
    shutdown: CancellationToken,
    poll_interval: Duration,
    clock: Box<dyn Clock>,
}

impl<S: KeyValueStorage> ReminderModule<S> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: HabitStore<S>,
        permissions: PermissionStore<S>,
        notifier: Box<dyn Notifier>,
        toasts: ToastSlot,
        policy: NotifyPolicy,
        shutdown: CancellationToken,
        poll_interval: Duration,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            store,
            permissions,
            notifier,
            toasts,
            policy,
            shutdown,
            poll_interval,
            clock,
        }
    }

    /// One complete pass over the habit list. Returns the reminders that were surfaced.
    pub async fn tick(&mut self) -> Result<Vec<DueReminder>> {
        let now = self.clock.time();
        // The CLI writes to the same slot, so fired markers are applied to the stored list
        // while it's held.
        let due = self
            .store
            .update(|habits| {
                let due = window::collect_due(habits, now.naive_local());
                let changed = !due.is_empty();
                (due, changed)
            })
            .await?;
        if due.is_empty() {
            return Ok(vec![]);
        }

        let permission = self.permissions.state().await;
        let shown = window::select(due, self.policy);
        for reminder in &shown {
            self.deliver(reminder, permission);
        }
        Ok(shown)
    }

    fn deliver(&mut self, reminder: &DueReminder, permission: PermissionState) {
        self.toasts.show(Toast::for_habit(&reminder.name));

        if permission != PermissionState::Granted {
            debug!("Native notification suppressed, permission is {permission}");
            return;
        }
        let notification = Notification {
            title: "Habit reminder".into(),
            body: format!("Time for {} ({})", reminder.name, reminder.at),
            tag: reminder.id.clone(),
        };
        if let Err(e) = self.notifier.show(&notification) {
            error!("Failed to show notification for {}: {e:?}", reminder.name);
        }
    }

    /// Executes the reminder loop until shutdown is requested.
    pub async fn run(mut self) -> Result<()> {
        if !self.notifier.is_supported() {
            warn!("No notification backend available, reminders will only be logged");
        }
        info!("Checking reminders every {:?} ({} policy)", self.poll_interval, self.policy);

        let mut check_point = self.clock.instant();
        loop {
            check_point += self.poll_interval;

            let span = info_span!("Reminder tick");
            match self.tick().instrument(span).await {
                Ok(shown) if !shown.is_empty() => info!("Surfaced {} reminders", shown.len()),
                Ok(_) => {}
                Err(e) => error!("Reminder tick failed {e:?}"),
            }

            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    self.toasts.dismiss();
                    return Ok(())
                }
                _ = self.clock.sleep_until(check_point) => ()
            }
        }
    }
}

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// How long a toast stays visible.
pub const TOAST_DURATION: Duration = Duration::from_secs(5);

/// Short in-app message shown when a reminder fires, independent of native notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
}

impl Toast {
    pub fn for_habit(name: &str) -> Self {
        Self {
            message: format!("Time for {name}!"),
        }
    }
}

/// Holds at most one toast. A new toast replaces the current one immediately and cancels its
/// dismiss timer. Needs a running tokio runtime.
pub struct ToastSlot {
    current: Arc<Mutex<Option<Toast>>>,
    dismiss: Option<CancellationToken>,
    duration: Duration,
}

impl ToastSlot {
    pub fn new(duration: Duration) -> Self {
        Self {
            current: Arc::new(Mutex::new(None)),
            dismiss: None,
            duration,
        }
    }

    pub fn show(&mut self, toast: Toast) {
        self.cancel_timer();
        info!("{}", toast.message);
        *lock(&self.current) = Some(toast);

        let token = CancellationToken::new();
        self.dismiss = Some(token.clone());
        let current = self.current.clone();
        let duration = self.duration;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(duration) => {
                    debug!("Dismissing toast");
                    lock(&current).take();
                }
            }
        });
    }

    pub fn current(&self) -> Option<Toast> {
        lock(&self.current).clone()
    }

    pub fn dismiss(&mut self) {
        self.cancel_timer();
        lock(&self.current).take();
    }

    fn cancel_timer(&mut self) {
        if let Some(token) = self.dismiss.take() {
            token.cancel();
        }
    }
}

impl Default for ToastSlot {
    fn default() -> Self {
        Self::new(TOAST_DURATION)
    }
}

impl Drop for ToastSlot {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

fn lock(toast: &Mutex<Option<Toast>>) -> std::sync::MutexGuard<'_, Option<Toast>> {
    // The slot only ever holds plain data, a poisoned lock still has a usable value.
    toast.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{Toast, ToastSlot};

    #[tokio::test(start_paused = true)]
    async fn test_toast_auto_dismisses() {
        let mut slot = ToastSlot::default();
        slot.show(Toast::for_habit("Read"));
        assert_eq!(slot.current(), Some(Toast::for_habit("Read")));

        tokio::time::sleep(Duration::from_millis(4900)).await;
        assert!(slot.current().is_some());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(slot.current(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_toast_replaces_and_restarts_timer() {
        let mut slot = ToastSlot::default();
        slot.show(Toast::for_habit("Read"));
        tokio::time::sleep(Duration::from_secs(3)).await;

        slot.show(Toast::for_habit("Walk"));
        assert_eq!(slot.current(), Some(Toast::for_habit("Walk")));

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(slot.current(), Some(Toast::for_habit("Walk")));

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(slot.current(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_clears_immediately() {
        let mut slot = ToastSlot::default();
        slot.show(Toast::for_habit("Read"));
        slot.dismiss();
        assert_eq!(slot.current(), None);
    }
}

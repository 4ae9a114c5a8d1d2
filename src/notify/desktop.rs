use anyhow::Result;
use notify_rust::Timeout;

use crate::utils::dir::APPLICATION_NAME;

use super::{Notification, Notifier};

const DISPLAY_TIMEOUT_MS: u32 = 10_000;

/// Shows notifications through the desktop notification service (D-Bus on Linux, Notification
/// Center on macOS, toasts on Windows).
pub struct DesktopNotifier;

impl DesktopNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for DesktopNotifier {
    fn is_supported(&self) -> bool {
        true
    }

    fn show(&mut self, notification: &Notification) -> Result<()> {
        let mut native = notify_rust::Notification::new();
        native
            .summary(&notification.title)
            .body(&notification.body)
            .appname(APPLICATION_NAME)
            .timeout(Timeout::Milliseconds(DISPLAY_TIMEOUT_MS));

        // Reusing the id makes the server replace an earlier notification with the same tag.
        #[cfg(all(unix, not(target_os = "macos")))]
        native.id(tag_id(&notification.tag));

        native.show().map(|_| ())?;
        Ok(())
    }
}

#[cfg(all(unix, not(target_os = "macos")))]
fn tag_id(tag: &str) -> u32 {
    // FNV-1a, only needs to be stable within a session. 0 asks the server for a fresh id.
    let hash = tag
        .bytes()
        .fold(0x811c9dc5u32, |hash, b| (hash ^ b as u32).wrapping_mul(0x01000193));
    hash.max(1)
}

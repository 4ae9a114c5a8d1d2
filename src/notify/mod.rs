//! Native notification delivery. [default_notifier] picks the backend the binary was built with,
//! permission decisions live in [permission::PermissionStore].

#[cfg(feature = "desktop")]
pub mod desktop;
pub mod permission;

use anyhow::{anyhow, Result};

/// A native notification. Notifications sharing a `tag` replace each other where the platform
/// supports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub tag: String,
}

/// Contract every notification backend implements.
#[cfg_attr(test, mockall::automock)]
pub trait Notifier {
    /// Whether this backend can display anything at all.
    fn is_supported(&self) -> bool;

    fn show(&mut self, notification: &Notification) -> Result<()>;
}

/// Used when the binary has no notification backend compiled in.
pub struct UnsupportedNotifier;

impl Notifier for UnsupportedNotifier {
    fn is_supported(&self) -> bool {
        false
    }

    fn show(&mut self, notification: &Notification) -> Result<()> {
        Err(anyhow!(
            "Notifications are not supported in this build, dropping {:?}",
            notification.title
        ))
    }
}

pub fn default_notifier() -> Box<dyn Notifier> {
    cfg_if::cfg_if! {
        if #[cfg(feature = "desktop")] {
            Box::new(desktop::DesktopNotifier::new())
        } else {
            Box::new(UnsupportedNotifier)
        }
    }
}

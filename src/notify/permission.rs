use std::{fmt::Display, future::Future};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::store::storage::KeyValueStorage;

pub const PERMISSION_KEY: &str = "notification-permission";

/// Whether native notifications may be shown.
///
/// `Unsupported` means the build can't notify at all. From `Default` a single request moves the
/// state to either `Granted` or `Denied`, after which it never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    Unsupported,
    Default,
    Granted,
    Denied,
}

impl Display for PermissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionState::Unsupported => write!(f, "unsupported"),
            PermissionState::Default => write!(f, "default"),
            PermissionState::Granted => write!(f, "granted"),
            PermissionState::Denied => write!(f, "denied"),
        }
    }
}

/// Keeps the user's decision in its own storage slot, so the CLI can ask and the daemon can obey.
pub struct PermissionStore<S: KeyValueStorage> {
    storage: S,
    supported: bool,
}

impl<S: KeyValueStorage> PermissionStore<S> {
    pub fn new(storage: S, supported: bool) -> Self {
        Self { storage, supported }
    }

    pub async fn state(&self) -> PermissionState {
        if !self.supported {
            return PermissionState::Unsupported;
        }
        match self.storage.get(PERMISSION_KEY).await {
            Ok(Some(blob)) => match serde_json::from_str::<PermissionState>(&blob) {
                Ok(state @ (PermissionState::Granted | PermissionState::Denied)) => state,
                Ok(_) => PermissionState::Default,
                Err(e) => {
                    warn!("Ignoring unreadable permission {blob:?}: {e}");
                    PermissionState::Default
                }
            },
            Ok(None) => PermissionState::Default,
            Err(e) => {
                error!("Failed to read notification permission {e:?}");
                PermissionState::Default
            }
        }
    }

    /// Asks the user through `ask` and records the answer. Only a `Default` state issues the
    /// request, anything else is returned as is without calling `ask`.
    pub async fn request<F>(&self, ask: impl FnOnce() -> F) -> Result<PermissionState>
    where
        F: Future<Output = Result<bool>>,
    {
        let current = self.state().await;
        if current != PermissionState::Default {
            debug!("Permission already {current}, not asking again");
            return Ok(current);
        }

        let decision = if ask().await? {
            PermissionState::Granted
        } else {
            PermissionState::Denied
        };
        self.storage
            .set(PERMISSION_KEY, serde_json::to_string(&decision)?)
            .await?;
        info!("Notification permission {decision}");
        Ok(decision)
    }
}

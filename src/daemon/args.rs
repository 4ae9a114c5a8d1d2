use std::path::PathBuf;

use clap::Parser;
use tracing::level_filters::LevelFilter;

use super::reminder::window::NotifyPolicy;

#[derive(Parser)]
#[command(name = "habitwatch-daemon", version, about = "Reminder daemon for habitwatch")]
pub struct DaemonArgs {
    /// Run in the current process instead of detaching.
    #[arg(long)]
    pub force: bool,
    #[arg(long)]
    pub dir: Option<PathBuf>,
    /// This option is for debugging purposes only.
    #[arg(long = "log-console")]
    pub log_console: bool,
    #[arg(long = "log-filter")]
    pub log: Option<LevelFilter>,
    /// Which reminders due in the same check get a notification.
    #[arg(long, default_value_t = NotifyPolicy::First)]
    pub notify: NotifyPolicy,
}

use anyhow::Result;
use clap::Subcommand;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::{
    notify::permission::{PermissionState, PermissionStore},
    store::storage::KeyValueStorage,
};

#[derive(Subcommand, Debug)]
pub enum NotificationsCommand {
    #[command(about = "Show whether desktop notifications are allowed")]
    Status {},
    #[command(about = "Decide whether the daemon may show desktop notifications. Asked only once")]
    Request {
        #[arg(long, conflicts_with = "deny", help = "Allow without prompting")]
        allow: bool,
        #[arg(long, help = "Deny without prompting")]
        deny: bool,
    },
}

pub async fn process_notifications_command(
    command: NotificationsCommand,
    permissions: &PermissionStore<impl KeyValueStorage>,
) -> Result<String> {
    match command {
        NotificationsCommand::Status {} => Ok(describe(permissions.state().await)),
        NotificationsCommand::Request { allow, deny } => {
            let state = permissions
                .request(|| async move {
                    if allow || deny {
                        Ok(allow)
                    } else {
                        prompt("Allow habitwatch to show desktop notifications? [y/N] ").await
                    }
                })
                .await?;
            Ok(describe(state))
        }
    }
}

fn describe(state: PermissionState) -> String {
    match state {
        PermissionState::Unsupported => {
            "Desktop notifications are not supported by this build, reminders are only logged"
                .into()
        }
        PermissionState::Default => {
            "Desktop notifications haven't been decided on. Run `habitwatch notifications request`"
                .into()
        }
        PermissionState::Granted => "Desktop notifications are allowed".into(),
        PermissionState::Denied => "Desktop notifications are denied".into(),
    }
}

async fn prompt(question: &str) -> Result<bool> {
    let mut stdout = io::stdout();
    stdout.write_all(question.as_bytes()).await?;
    stdout.flush().await?;

    let mut answer = String::new();
    BufReader::new(io::stdin()).read_line(&mut answer).await?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

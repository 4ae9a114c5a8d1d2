pub mod daemon_path;
pub mod habits;
pub mod list;
pub mod notifications;
pub mod process;

use std::{io::IsTerminal, path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::{Parser, Subcommand};
use notifications::{process_notifications_command, NotificationsCommand};
use process::{restart_server, stop_servers};
use tracing::level_filters::LevelFilter;

use crate::{
    daemon::{reminder::window::NotifyPolicy, start_daemon, store_dir},
    notify::{default_notifier, permission::PermissionStore},
    store::{habit::ReminderTime, storage::FileStorage, view::View, HabitStore},
    utils::{
        clock::{Clock, DefaultClock},
        dir::resolve_application_path,
        logging::{enable_logging, CLI_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "Habitwatch", version, long_about = None)]
#[command(about = "Track daily habits, streaks and reminders", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Create a new habit")]
    Add {
        name: String,
        #[arg(long, help = "Daily reminder time, HH:MM in local time")]
        at: Option<ReminderTime>,
    },
    #[command(about = "Mark a habit as done for today")]
    Done {
        #[arg(help = "Habit name, id or id prefix")]
        habit: String,
    },
    #[command(about = "Clear the history and streaks of a habit")]
    Reset {
        #[arg(help = "Habit name, id or id prefix")]
        habit: String,
    },
    #[command(about = "Remove a habit")]
    Delete {
        #[arg(help = "Habit name, id or id prefix")]
        habit: String,
    },
    #[command(about = "List habits")]
    List {
        #[arg(long, value_enum, default_value_t = View::All)]
        view: View,
        #[arg(long, help = "Print as json")]
        json: bool,
    },
    #[command(about = "Show streaks and history of a habit")]
    Show {
        #[arg(help = "Habit name, id or id prefix")]
        habit: String,
    },
    #[command(about = "Manage desktop notification permission")]
    Notifications {
        #[command(subcommand)]
        command: NotificationsCommand,
    },
    #[command(about = "Starts the reminder daemon, replacing a running one")]
    Init {
        #[arg(long, default_value_t = NotifyPolicy::First)]
        notify: NotifyPolicy,
    },
    #[command(
        about = "Run the reminder daemon directly in current console. Used for debugging"
    )]
    Serve {
        #[arg(long, default_value_t = NotifyPolicy::First)]
        notify: NotifyPolicy,
    },
    #[command(about = "Stop currently running daemon.")]
    Stop {},
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = resolve_application_path(args.dir)?;
    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(CLI_PREFIX, &app_dir.join("logs"), logging_level, args.log)?;

    let storage = Arc::new(FileStorage::new(store_dir(&app_dir))?);
    let now = DefaultClock.time();

    let output = match args.commands {
        Commands::Add { name, at } => {
            let mut store = HabitStore::load(storage).await;
            habits::add(&mut store, &name, at, now).await?
        }
        Commands::Done { habit } => {
            let mut store = HabitStore::load(storage).await;
            habits::done(&mut store, &habit, now).await?
        }
        Commands::Reset { habit } => {
            let mut store = HabitStore::load(storage).await;
            habits::reset(&mut store, &habit).await?
        }
        Commands::Delete { habit } => {
            let mut store = HabitStore::load(storage).await;
            habits::delete(&mut store, &habit).await?
        }
        Commands::List { view, json } => {
            let store = HabitStore::load(storage).await;
            let habits = store.filter(view, now);
            if json {
                list::render_json(&habits)?
            } else {
                list::render_table(&habits, view, now, std::io::stdout().is_terminal())
            }
        }
        Commands::Show { habit } => {
            let store = HabitStore::load(storage).await;
            habits::show(&store, &habit, now)?
        }
        Commands::Notifications { command } => {
            let permissions =
                PermissionStore::new(storage, default_notifier().is_supported());
            process_notifications_command(command, &permissions).await?
        }
        Commands::Init { notify } => {
            restart_server(&app_dir, notify)?;
            "Reminder daemon started".into()
        }
        Commands::Serve { notify } => {
            start_daemon(app_dir, notify).await?;
            return Ok(());
        }
        Commands::Stop {} => match stop_servers()? {
            0 => "No running daemon found".into(),
            stopped => format!("Stopped {stopped} daemon(s)"),
        },
    };

    println!("{output}");
    Ok(())
}

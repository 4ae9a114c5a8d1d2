use std::{
    env,
    path::Path,
    process::{Command, Stdio},
};

use anyhow::{anyhow, Result};
use sysinfo::{get_current_pid, Signal, System};
use tracing::info;

use crate::daemon::reminder::window::NotifyPolicy;

use super::daemon_path::to_daemon_path;

/// Stops every running process started from the executable at `name`. Returns how many were
/// stopped.
pub fn kill_previous_servers(name: &Path) -> Result<usize> {
    let system = System::new_all();
    let current_id = get_current_pid().map_err(|e| anyhow!("Can't determine own pid {e}"))?;
    let mut stopped = 0;
    for (pid, process) in system.processes().iter() {
        if *pid == current_id {
            continue;
        }
        if matches!(process.parent(), Some(p) if p == current_id) {
            continue;
        }

        if process
            .exe()
            .filter(|v| v.exists())
            .filter(|v| name == *v)
            .is_some()
        {
            info!("Stopping daemon {pid}");
            // This will forcefully terminate the process on Windows. Anything better will require a
            // lot more work.
            if process.kill_with(Signal::Term).is_none() {
                process.kill();
            }
            process.wait();
            stopped += 1;
        }
    }
    Ok(stopped)
}

/// Stops daemons started from the daemon binary next to this executable.
pub fn stop_servers() -> Result<usize> {
    kill_previous_servers(&to_daemon_path(env::current_exe()?))
}

/// Shuts down previous daemons and starts a new one for `app_dir`. The daemon binary detaches
/// itself, so the spawned process exits right after forking.
pub fn restart_server(app_dir: &Path, policy: NotifyPolicy) -> Result<()> {
    let daemon = to_daemon_path(env::current_exe()?);
    if !daemon.exists() {
        return Err(anyhow!("Daemon executable {daemon:?} not found"));
    }
    kill_previous_servers(&daemon)?;

    let mut command = daemon_command(&daemon, app_dir, policy)?;

    info!("Spawning {daemon:?}");
    let status = command.status()?;
    if !status.success() {
        return Err(anyhow!("Daemon failed to start: {status}"));
    }
    Ok(())
}

/// The daemon changes its working directory once detached, so `app_dir` is passed on absolute.
fn daemon_command(daemon: &Path, app_dir: &Path, policy: NotifyPolicy) -> Result<Command> {
    let app_dir = std::fs::canonicalize(app_dir)?;

    let mut command = Command::new(daemon);
    command.arg("--dir").arg(app_dir);
    command.arg("--notify").arg(policy.to_string());
    command.stdin(Stdio::null());
    Ok(command)
}

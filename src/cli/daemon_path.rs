use std::path::PathBuf;

/// Path of the daemon binary, expected to sit next to the cli executable.
pub fn to_daemon_path(mut path: PathBuf) -> PathBuf {
    path.set_file_name("habitwatch-daemon");
    #[cfg(windows)]
    {
        path.set_extension("exe");
    }
    path
}

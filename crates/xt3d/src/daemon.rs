//! Background process management: PID file, daemonization and stop.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::debug;

/// State directory name under the user's state dir.
const STATE_DIR: &str = "xt3";

/// How long `stop` waits for the process to exit.
const STOP_WAIT: Duration = Duration::from_secs(5);
const STOP_POLL: Duration = Duration::from_millis(100);

fn state_dir() -> PathBuf {
    dirs::state_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(STATE_DIR)
}

/// Returns the path to the log file used when daemonized.
pub fn log_file_path() -> PathBuf {
    state_dir().join("xt3d.log")
}

/// PID file of a running authority.
#[derive(Debug, Clone)]
pub struct PidFile {
    path: PathBuf,
}

impl Default for PidFile {
    fn default() -> Self {
        Self::at(state_dir().join("xt3d.pid"))
    }
}

impl PidFile {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the recorded PID, if the file exists and parses.
    pub fn read(&self) -> Option<u32> {
        let mut file = File::open(&self.path).ok()?;
        let mut contents = String::new();
        file.read_to_string(&mut contents).ok()?;
        contents.trim().parse().ok()
    }

    /// Records the current process ID.
    pub fn write_current(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create state directory")?;
        }
        let mut file = File::create(&self.path).context("Failed to create PID file")?;
        write!(file, "{}", process::id()).context("Failed to write PID")?;
        Ok(())
    }

    pub fn remove(&self) {
        let _ = fs::remove_file(&self.path);
    }

    /// Returns the PID of a live authority, clearing a stale file.
    pub fn running_pid(&self) -> Option<u32> {
        let pid = self.read()?;
        if is_process_running(pid) {
            return Some(pid);
        }
        debug!(pid, path = %self.path.display(), "Removing stale PID file");
        self.remove();
        None
    }
}

/// Checks if a process with the given PID is running.
pub fn is_process_running(pid: u32) -> bool {
    PathBuf::from(format!("/proc/{pid}")).exists()
}

/// Sends SIGTERM to `pid` and waits for it to exit.
///
/// Returns false if the process was still alive after the wait.
pub fn stop(pid: u32) -> Result<bool> {
    #[cfg(unix)]
    {
        let pid_t = libc::pid_t::try_from(pid).context("PID out of range")?;
        // SAFETY: kill(2) has no memory-safety preconditions.
        let result = unsafe { libc::kill(pid_t, libc::SIGTERM) };
        if result != 0 {
            bail!("Failed to send SIGTERM to process {pid}");
        }
    }
    #[cfg(not(unix))]
    {
        bail!("Stop command is only supported on Unix systems");
    }

    let polls = STOP_WAIT.as_millis() / STOP_POLL.as_millis();
    for _ in 0..polls {
        if !is_process_running(pid) {
            return Ok(true);
        }
        std::thread::sleep(STOP_POLL);
    }
    Ok(false)
}

/// Detaches from the terminal, sending output to the log file.
///
/// Must be called before the tokio runtime starts.
pub fn daemonize() -> Result<()> {
    use daemonize::Daemonize;

    let log_path = log_file_path();
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent).context("Failed to create log directory")?;
    }

    let stdout = File::create(&log_path).context("Failed to create log file for stdout")?;
    let stderr = stdout
        .try_clone()
        .context("Failed to create log file for stderr")?;

    Daemonize::new()
        .working_directory("/")
        .stdout(stdout)
        .stderr(stderr)
        .start()
        .context("Failed to daemonize")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pid_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = PidFile::at(dir.path().join("nested").join("xt3d.pid"));

        assert_eq!(pid_file.read(), None);
        pid_file.write_current().unwrap();
        assert_eq!(pid_file.read(), Some(process::id()));
        assert_eq!(pid_file.running_pid(), Some(process::id()));

        pid_file.remove();
        assert_eq!(pid_file.read(), None);
    }

    #[test]
    fn test_stale_pid_file_is_cleared() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xt3d.pid");
        // PIDs are capped well below this on Linux.
        fs::write(&path, "4194399").unwrap();

        let pid_file = PidFile::at(&path);
        assert_eq!(pid_file.running_pid(), None);
        assert!(!path.exists());
    }

    #[test]
    fn test_garbage_pid_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xt3d.pid");
        fs::write(&path, "not a pid").unwrap();

        assert_eq!(PidFile::at(&path).read(), None);
    }
}

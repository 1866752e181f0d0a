//! Launching and gracefully stopping the dedicated server process.

use crate::error::{ExecutableKind, Result as RuntimeResult, RuntimeError};

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// A live OS process, identified by pid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ProcessHandle {
    pid: u32,
}

impl ProcessHandle {
    pub fn new(pid: u32) -> Self {
        Self { pid }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }
}

#[async_trait]
pub trait ProcessController: Send + Sync {
    /// Spawn the launcher detached from the manager. A launcher that does not
    /// exist fails with [`RuntimeError::MissingExecutable`].
    async fn launch(&self, launcher: &Path, install_dir: &Path) -> RuntimeResult<ProcessHandle>;

    /// Request a graceful stop and wait for the process to exit. A process
    /// that is already gone counts as stopped.
    async fn send_stop(&self, process: ProcessHandle) -> RuntimeResult<()>;
}

/// [`ProcessController`] backed by real OS processes.
#[derive(Debug, Clone)]
pub struct OsProcessController {
    shutdown_timeout: Duration,
}

impl OsProcessController {
    pub fn new(shutdown_timeout: Duration) -> Self {
        Self { shutdown_timeout }
    }

    async fn wait_for_exit(&self, pid: u32) -> RuntimeResult<()> {
        let start = Instant::now();

        while start.elapsed() < self.shutdown_timeout {
            if !is_process_alive(pid) {
                info!("Process {pid} exited after {:?}", start.elapsed());
                return Ok(());
            }
            tokio::time::sleep(EXIT_POLL_INTERVAL).await;
        }

        warn!(
            "Process {pid} still running after {}s",
            self.shutdown_timeout.as_secs()
        );
        Err(RuntimeError::shutdown_timeout(
            pid,
            self.shutdown_timeout.as_secs(),
        ))
    }
}

#[async_trait]
impl ProcessController for OsProcessController {
    async fn launch(&self, launcher: &Path, install_dir: &Path) -> RuntimeResult<ProcessHandle> {
        if !launcher.is_file() {
            return Err(RuntimeError::missing_executable(
                ExecutableKind::Launcher,
                launcher,
                install_dir,
            ));
        }

        let mut cmd = tokio::process::Command::new(launcher);
        cmd.current_dir(launcher.parent().unwrap_or(install_dir))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        // Detach so the server outlives the manager
        #[cfg(unix)]
        unsafe {
            cmd.pre_exec(|| {
                libc::setsid();
                Ok(())
            });
        }

        #[cfg(windows)]
        {
            use windows_sys::Win32::System::Threading::CREATE_NEW_PROCESS_GROUP;
            cmd.creation_flags(CREATE_NEW_PROCESS_GROUP);
        }

        let mut child = cmd.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                RuntimeError::missing_executable(ExecutableKind::Launcher, launcher, install_dir)
            }
            _ => RuntimeError::from(e),
        })?;

        let pid = child.id().ok_or_else(|| {
            RuntimeError::from(std::io::Error::other(
                "launcher exited before reporting a pid",
            ))
        })?;
        info!("Spawned launcher {} with PID: {pid}", launcher.display());

        // Reap the launcher when it exits; the server itself is tracked by the watcher
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => debug!("Launcher {pid} exited with {status}"),
                Err(e) => warn!("Failed waiting on launcher {pid}: {e}"),
            }
        });

        Ok(ProcessHandle::new(pid))
    }

    async fn send_stop(&self, process: ProcessHandle) -> RuntimeResult<()> {
        let pid = process.pid();

        if !is_process_alive(pid) {
            debug!("Process {pid} already exited");
            return Ok(());
        }

        signal_stop(pid)?;
        self.wait_for_exit(pid).await
    }
}

#[cfg(unix)]
fn signal_stop(pid: u32) -> RuntimeResult<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let raw = i32::try_from(pid)
        .map_err(|_| RuntimeError::process_control(pid, "pid out of range"))?;

    info!("Sending SIGTERM to pid {pid}");
    match kill(Pid::from_raw(raw), Signal::SIGTERM) {
        Ok(()) => Ok(()),
        Err(Errno::ESRCH) => {
            debug!("Process {pid} vanished before SIGTERM");
            Ok(())
        }
        Err(e) => Err(RuntimeError::process_control(pid, e.to_string())),
    }
}

#[cfg(windows)]
fn signal_stop(pid: u32) -> RuntimeResult<()> {
    use windows_sys::Win32::System::Console::{CTRL_BREAK_EVENT, GenerateConsoleCtrlEvent};

    info!("Sending CTRL_BREAK to pid {pid}");
    let sent = unsafe { GenerateConsoleCtrlEvent(CTRL_BREAK_EVENT, pid) };
    if sent == 0 {
        return Err(RuntimeError::process_control(
            pid,
            std::io::Error::last_os_error().to_string(),
        ));
    }
    Ok(())
}

/// Check if a process with given PID is running.
#[cfg(unix)]
pub(crate) fn is_process_alive(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };

    // Signal 0 probes for existence; EPERM means it exists under another user
    match kill(Pid::from_raw(raw), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

/// Check if a process with given PID is running (Windows).
#[cfg(windows)]
pub(crate) fn is_process_alive(pid: u32) -> bool {
    use windows_sys::Win32::Foundation::{CloseHandle, STILL_ACTIVE};
    use windows_sys::Win32::System::Threading::{
        GetExitCodeProcess, OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION,
    };

    unsafe {
        let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, pid);
        if handle.is_null() {
            return false;
        }

        let mut exit_code: u32 = 0;
        let result = GetExitCodeProcess(handle, &mut exit_code);
        CloseHandle(handle);

        result != 0 && exit_code == STILL_ACTIVE as u32
    }
}

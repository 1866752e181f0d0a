//! Fakes for the runtime's collaborators.

use crate::error::{ExecutableKind, Result as RuntimeResult, RuntimeError};
use crate::firewall::FirewallGate;
use crate::host::HostPlatform;
use crate::process::{ProcessController, ProcessHandle};
use crate::progress::ProgressSink;
use crate::runtime::{RuntimeCollaborators, ServerRuntime};
use crate::snapshot::{ManagedInstanceSnapshot, RuntimeSettings};
use crate::upgrade::{ToolInvocation, UpdateTool};
use crate::watcher::{
    SampleCallback, StatusSample, StatusWatcher, WatchRegistration, WatchRequest, WatcherStatus,
};

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use gsm_config::InstanceConfig;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub(crate) const SERVER_PID: u32 = 4242;

// =========================================================================
// Watcher
// =========================================================================

#[derive(Default)]
pub(crate) struct FakeWatcher {
    next_id: AtomicU64,
    registrations: Mutex<Vec<(WatchRegistration, WatchRequest, SampleCallback)>>,
    deregistered: Mutex<Vec<WatchRegistration>>,
    on_register: Mutex<Option<StatusSample>>,
}

impl FakeWatcher {
    pub(crate) fn register_count(&self) -> usize {
        self.registrations.lock().unwrap().len()
    }

    pub(crate) fn active_count(&self) -> usize {
        self.register_count() - self.deregistered.lock().unwrap().len()
    }

    pub(crate) fn is_deregistered(&self, index: usize) -> bool {
        let registration = self.registrations.lock().unwrap()[index].0;
        self.deregistered.lock().unwrap().contains(&registration)
    }

    pub(crate) fn request(&self, index: usize) -> WatchRequest {
        self.registrations.lock().unwrap()[index].1.clone()
    }

    /// Deliver a sample through the callback of registration `index`.
    pub(crate) fn emit(&self, index: usize, sample: StatusSample) {
        let callback = Arc::clone(&self.registrations.lock().unwrap()[index].2);
        callback(sample);
    }

    /// Deliver `sample` from inside the next `register` call, like a watcher
    /// whose first poll fires immediately.
    pub(crate) fn sample_on_register(&self, sample: StatusSample) {
        *self.on_register.lock().unwrap() = Some(sample);
    }

    /// Deliver a sample through the most recent registration.
    pub(crate) fn emit_latest(&self, sample: StatusSample) {
        let index = self.register_count() - 1;
        self.emit(index, sample);
    }
}

impl StatusWatcher for FakeWatcher {
    fn register(&self, request: WatchRequest, callback: SampleCallback) -> WatchRegistration {
        let registration = WatchRegistration::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.registrations
            .lock()
            .unwrap()
            .push((registration, request, Arc::clone(&callback)));

        let immediate = self.on_register.lock().unwrap().take();
        if let Some(sample) = immediate {
            callback(sample);
        }
        registration
    }

    fn deregister(&self, registration: WatchRegistration) {
        self.deregistered.lock().unwrap().push(registration);
    }
}

// =========================================================================
// Process controller
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum StopBehaviour {
    #[default]
    Exits,
    SignalFails,
    TimesOut,
}

#[derive(Default)]
pub(crate) struct FakeProcessController {
    launch_fails: AtomicBool,
    stop: Mutex<StopBehaviour>,
    pub(crate) launched: Mutex<Vec<PathBuf>>,
    pub(crate) stopped: Mutex<Vec<ProcessHandle>>,
}

impl FakeProcessController {
    pub(crate) fn fail_launch(&self) {
        self.launch_fails.store(true, Ordering::SeqCst);
    }

    pub(crate) fn set_stop(&self, behaviour: StopBehaviour) {
        *self.stop.lock().unwrap() = behaviour;
    }

    pub(crate) fn launch_count(&self) -> usize {
        self.launched.lock().unwrap().len()
    }
}

#[async_trait]
impl ProcessController for FakeProcessController {
    async fn launch(&self, launcher: &Path, install_dir: &Path) -> RuntimeResult<ProcessHandle> {
        self.launched.lock().unwrap().push(launcher.to_path_buf());
        if self.launch_fails.load(Ordering::SeqCst) {
            return Err(RuntimeError::missing_executable(
                ExecutableKind::Launcher,
                launcher,
                install_dir,
            ));
        }
        Ok(ProcessHandle::new(SERVER_PID))
    }

    async fn send_stop(&self, process: ProcessHandle) -> RuntimeResult<()> {
        self.stopped.lock().unwrap().push(process);
        let behaviour = *self.stop.lock().unwrap();
        match behaviour {
            StopBehaviour::Exits => Ok(()),
            StopBehaviour::SignalFails => Err(RuntimeError::process_control(
                process.pid(),
                "no such process",
            )),
            StopBehaviour::TimesOut => Err(RuntimeError::shutdown_timeout(process.pid(), 60)),
        }
    }
}

// =========================================================================
// Firewall
// =========================================================================

pub(crate) struct RecordingFirewall {
    succeeds: AtomicBool,
    pub(crate) calls: Mutex<Vec<(PathBuf, Vec<u16>, String)>>,
}

impl Default for RecordingFirewall {
    fn default() -> Self {
        Self {
            succeeds: AtomicBool::new(true),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl RecordingFirewall {
    pub(crate) fn fail(&self) {
        self.succeeds.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl FirewallGate for RecordingFirewall {
    async fn ensure_ports_open(&self, exe_path: &Path, ports: &[u16], rule_label: &str) -> bool {
        self.calls.lock().unwrap().push((
            exe_path.to_path_buf(),
            ports.to_vec(),
            rule_label.to_string(),
        ));
        self.succeeds.load(Ordering::SeqCst)
    }
}

// =========================================================================
// Update tool
// =========================================================================

#[derive(Default)]
pub(crate) struct FakeUpdateTool {
    lines: Mutex<Vec<String>>,
    exit_fails: AtomicBool,
    wait_for_cancel: AtomicBool,
    writes_file: Mutex<Option<PathBuf>>,
    pub(crate) invocations: Mutex<Vec<ToolInvocation>>,
}

impl FakeUpdateTool {
    pub(crate) fn print(&self, lines: &[&str]) {
        *self.lines.lock().unwrap() = lines.iter().map(|line| line.to_string()).collect();
    }

    pub(crate) fn fail_exit(&self) {
        self.exit_fails.store(true, Ordering::SeqCst);
    }

    pub(crate) fn block_until_cancelled(&self) {
        self.wait_for_cancel.store(true, Ordering::SeqCst);
    }

    pub(crate) fn write_file(&self, path: PathBuf) {
        *self.writes_file.lock().unwrap() = Some(path);
    }

    pub(crate) fn invocation_count(&self) -> usize {
        self.invocations.lock().unwrap().len()
    }

    pub(crate) fn last_arguments(&self) -> String {
        self.invocations
            .lock()
            .unwrap()
            .last()
            .map(|invocation| invocation.arguments.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl UpdateTool for FakeUpdateTool {
    async fn run(
        &self,
        invocation: &ToolInvocation,
        output: Option<mpsc::UnboundedSender<String>>,
        cancel: &CancellationToken,
    ) -> RuntimeResult<bool> {
        self.invocations.lock().unwrap().push(invocation.clone());

        if self.wait_for_cancel.load(Ordering::SeqCst) {
            cancel.cancelled().await;
            return Err(RuntimeError::cancelled());
        }

        let target = self.writes_file.lock().unwrap().clone();
        if let Some(path) = target {
            // Keep the write clear of the upgrade's start timestamp
            tokio::time::sleep(Duration::from_millis(50)).await;
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, b"new content").unwrap();
        }

        if let Some(tx) = output {
            let lines = self.lines.lock().unwrap().clone();
            for line in lines {
                tx.send(line).unwrap();
            }
        }

        Ok(!self.exit_fails.load(Ordering::SeqCst))
    }
}

// =========================================================================
// Progress
// =========================================================================

#[derive(Default)]
pub(crate) struct RecordingProgress {
    lines: Mutex<Vec<(String, bool)>>,
}

impl RecordingProgress {
    pub(crate) fn messages(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .map(|(message, _)| message.clone())
            .collect()
    }

    pub(crate) fn contains(&self, message: &str) -> bool {
        self.messages().iter().any(|line| line == message)
    }

    pub(crate) fn suppressed_count(&self) -> usize {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, suppressed)| *suppressed)
            .count()
    }
}

impl ProgressSink for RecordingProgress {
    fn report(&self, _percent: u8, message: &str, suppress_newline: bool) {
        self.lines
            .lock()
            .unwrap()
            .push((message.to_string(), suppress_newline));
    }
}

// =========================================================================
// Harness
// =========================================================================

/// A runtime wired to fakes, with a temporary install and tool layout.
pub(crate) struct Harness {
    pub(crate) temp: TempDir,
    pub(crate) watcher: Arc<FakeWatcher>,
    pub(crate) process: Arc<FakeProcessController>,
    pub(crate) firewall: Arc<RecordingFirewall>,
    pub(crate) update_tool: Arc<FakeUpdateTool>,
    pub(crate) runtime: ServerRuntime,
}

impl Harness {
    pub(crate) fn new() -> Self {
        Self::build(true, |_, _| {})
    }

    pub(crate) fn with_settings(configure: impl FnOnce(&mut RuntimeSettings, &Path)) -> Self {
        Self::build(true, configure)
    }

    pub(crate) fn on_32bit_host() -> Self {
        Self::build(false, |_, _| {})
    }

    fn build(is_64bit_os: bool, configure: impl FnOnce(&mut RuntimeSettings, &Path)) -> Self {
        let temp = TempDir::new().unwrap();

        let steamcmd = temp.path().join("steamcmd").join("steamcmd.sh");
        std::fs::create_dir_all(steamcmd.parent().unwrap()).unwrap();
        std::fs::write(&steamcmd, b"#!/bin/sh\n").unwrap();

        let mut settings = RuntimeSettings::default();
        settings.update.steamcmd_path = steamcmd.display().to_string();
        configure(&mut settings, temp.path());

        let watcher = Arc::new(FakeWatcher::default());
        let process = Arc::new(FakeProcessController::default());
        let firewall = Arc::new(RecordingFirewall::default());
        let update_tool = Arc::new(FakeUpdateTool::default());

        let runtime = ServerRuntime::new(
            settings,
            RuntimeCollaborators {
                watcher: watcher.clone(),
                process: process.clone(),
                firewall: firewall.clone(),
                update_tool: update_tool.clone(),
            },
        )
        .with_host_platform(HostPlatform { is_64bit_os });

        Self {
            temp,
            watcher,
            process,
            firewall,
            update_tool,
            runtime,
        }
    }

    pub(crate) fn install_dir(&self) -> PathBuf {
        self.temp.path().join("servers").join("island")
    }

    pub(crate) fn snapshot(&self) -> ManagedInstanceSnapshot {
        ManagedInstanceSnapshot::from_config(&InstanceConfig {
            profile_id: String::from("island"),
            profile_name: String::from("The Island"),
            install_directory: self.install_dir().display().to_string(),
            server_name: String::from("My Island"),
            ..InstanceConfig::default()
        })
    }

    /// Attach the default snapshot and report `status` through the watcher.
    pub(crate) fn attach_with(&self, status: WatcherStatus) {
        assert!(self.runtime.attach(self.snapshot()));
        self.watcher.emit_latest(StatusSample::new(status));
    }

    /// Attach and report a running server process.
    pub(crate) fn attach_running(&self) {
        assert!(self.runtime.attach(self.snapshot()));
        self.watcher.emit_latest(
            StatusSample::new(WatcherStatus::RunningLocalCheck)
                .with_process(ProcessHandle::new(SERVER_PID)),
        );
    }
}

//! Process-based status watcher.
//!
//! Polls the process table for the instance's server executable. It performs
//! no query-protocol probing, so it reports at most `RunningLocalCheck`.

use crate::process::ProcessHandle;
use crate::snapshot::RuntimeSettings;
use crate::watcher::{
    SampleCallback, StatusSample, StatusWatcher, WatchRegistration, WatchRequest, WatcherStatus,
};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};
use tokio::task::JoinHandle;
use tracing::{debug, info};

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

pub struct ProcessStatusWatcher {
    settings: RuntimeSettings,
    poll_interval: Duration,
    next_id: AtomicU64,
    tasks: Mutex<HashMap<u64, JoinHandle<()>>>,
}

impl ProcessStatusWatcher {
    pub fn new(settings: RuntimeSettings) -> Self {
        let poll_interval = settings.poll_interval.max(MIN_POLL_INTERVAL);
        Self {
            settings,
            poll_interval,
            next_id: AtomicU64::new(1),
            tasks: Mutex::new(HashMap::new()),
        }
    }
}

impl StatusWatcher for ProcessStatusWatcher {
    /// Must be called from within a tokio runtime.
    fn register(&self, request: WatchRequest, callback: SampleCallback) -> WatchRegistration {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let exe = self.settings.server_exe_path(&request.install_dir);
        let interval = self.poll_interval;

        info!(
            "Watching '{}' ({}), local query {}, public query {}",
            request.instance_id,
            exe.display(),
            request.endpoints.local,
            request
                .endpoints
                .public
                .map_or_else(|| String::from("<none>"), |addr| addr.to_string())
        );

        let task = tokio::spawn(async move {
            let mut system = System::new();
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let sample = sample_process(&mut system, &exe);
                debug!("Sample for {}: {:?}", exe.display(), sample.status);
                callback(sample);
            }
        });

        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, task);

        WatchRegistration::new(id)
    }

    fn deregister(&self, registration: WatchRegistration) {
        let task = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&registration.id());

        if let Some(task) = task {
            task.abort();
            debug!("Stopped watch {}", registration.id());
        }
    }
}

impl Drop for ProcessStatusWatcher {
    fn drop(&mut self) {
        let tasks = self.tasks.get_mut().unwrap_or_else(PoisonError::into_inner);
        for (_, task) in tasks.drain() {
            task.abort();
        }
    }
}

fn sample_process(system: &mut System, exe: &Path) -> StatusSample {
    if !exe.is_file() {
        return StatusSample::new(WatcherStatus::NotInstalled);
    }

    system.refresh_processes_specifics(
        ProcessesToUpdate::All,
        true,
        ProcessRefreshKind::nothing().with_exe(UpdateKind::OnlyIfNotSet),
    );

    let canonical = exe.canonicalize().unwrap_or_else(|_| PathBuf::from(exe));
    let running = system.processes().values().find(|process| {
        process
            .exe()
            .is_some_and(|path| path == canonical || path == exe)
    });

    match running {
        Some(process) => StatusSample::new(WatcherStatus::RunningLocalCheck)
            .with_process(ProcessHandle::new(process.pid().as_u32())),
        None => StatusSample::new(WatcherStatus::Stopped),
    }
}

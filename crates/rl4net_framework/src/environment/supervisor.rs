//! Lifecycle control for the external simulator process.
//!
//! The simulator is started in its own process group with its output sent to a
//! log file. Teardown signals that group and then runs a name-based sweep for
//! processes that escaped it (for example a simulator left over from a previous
//! run of the training loop). Both steps treat "nothing to kill" as success.

use crate::utilities::configuration::{SimulatorConfigParams, TerminationSignal};

use log::{debug, info, trace, warn};
use std::fs::File;
use std::io;
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("[SupervisorError] Failed to open simulator log {path:?}: {source}")]
    LogSink {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("[SupervisorError] Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    NotStarted,
    Running,
    Terminating,
    Stopped,
}

/// Identifiers of a started simulator. The process leads its own group, so
/// `process_group` equals `pid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessHandle {
    pub pid: u32,
    pub process_group: libc::pid_t,
}

pub struct SimulatorSupervisor {
    config: SimulatorConfigParams,
    state: ProcessState,
    child: Option<Child>,
    handle: Option<ProcessHandle>,
}

impl SimulatorSupervisor {
    pub fn new(config: SimulatorConfigParams) -> Self {
        Self {
            config,
            state: ProcessState::NotStarted,
            child: None,
            handle: None,
        }
    }

    /// Launches the simulator, stopping a running one first.
    pub fn start(&mut self) -> Result<ProcessHandle, SupervisorError> {
        if self.is_running() {
            self.stop();
        }

        let log_sink = |source: io::Error| SupervisorError::LogSink {
            path: self.config.log_file.clone(),
            source,
        };
        let stdout = File::create(&self.config.log_file).map_err(log_sink)?;
        let stderr = stdout.try_clone().map_err(log_sink)?;

        let mut command = Command::new(&self.config.program);
        command
            .args(&self.config.args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .process_group(0);
        if let Some(dir) = &self.config.working_directory {
            command.current_dir(dir);
        }

        let child = command.spawn().map_err(|source| SupervisorError::Spawn {
            program: self.config.program.clone(),
            source,
        })?;

        let pid = child.id();
        let handle = ProcessHandle {
            pid,
            process_group: pid as libc::pid_t,
        };

        info!(
            "[SimulatorSupervisor] Started '{}' (pid {}), output in {:?}",
            self.config.program, pid, self.config.log_file
        );

        self.child = Some(child);
        self.handle = Some(handle);
        self.state = ProcessState::Running;

        Ok(handle)
    }

    /// Tears the simulator down. Safe to call in any state and never fails.
    ///
    /// Returns once the signal is delivered; the child is reaped in the
    /// background if it has not exited yet.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.state = ProcessState::Terminating;
            signal_group(handle.process_group, self.config.termination_signal);
            if let Some(child) = self.child.take() {
                reap(child);
            }
            self.state = ProcessState::Stopped;
        }

        self.sweep_by_name();
    }

    fn sweep_by_name(&self) {
        let (program, base_args) = match self.config.name_kill_command.split_first() {
            Some(split) => split,
            None => return,
        };

        for name in &self.config.stray_process_names {
            let status = Command::new(program)
                .args(base_args)
                .arg(name)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status();

            match status {
                Ok(status) if status.success() => {
                    info!("[SimulatorSupervisor] Terminated stray '{}' processes", name)
                }
                // pkill and killall report "no process matched" with exit code 1
                Ok(status) if status.code() == Some(1) => {
                    trace!("[SimulatorSupervisor] No stray '{}' processes", name)
                }
                Ok(status) => warn!(
                    "[SimulatorSupervisor] '{}' sweep for '{}' exited with {}",
                    program, name, status
                ),
                Err(e) => warn!(
                    "[SimulatorSupervisor] Could not run '{}' for '{}': {}",
                    program, name, e
                ),
            }
        }
    }

    /// Current lifecycle state. A simulator that exited on its own is reaped
    /// here and reported as `Stopped`.
    pub fn state(&mut self) -> ProcessState {
        self.poll_exit();
        self.state
    }

    fn poll_exit(&mut self) {
        let exited = match self.child.as_mut().map(Child::try_wait) {
            Some(Ok(Some(status))) => {
                info!("[SimulatorSupervisor] Simulator exited on its own with {}", status);
                true
            }
            Some(Ok(None)) | None => false,
            Some(Err(e)) => {
                warn!("[SimulatorSupervisor] Failed to poll simulator: {}", e);
                false
            }
        };

        if exited {
            self.child = None;
            self.handle = None;
            self.state = ProcessState::Stopped;
        }
    }

    pub fn process_group(&self) -> Option<libc::pid_t> {
        self.handle.map(|handle| handle.process_group)
    }

    pub fn handle(&self) -> Option<ProcessHandle> {
        self.handle
    }

    pub fn is_running(&mut self) -> bool {
        self.state() == ProcessState::Running
    }

    pub fn config(&self) -> &SimulatorConfigParams {
        &self.config
    }
}

fn signal_group(process_group: libc::pid_t, signal: TerminationSignal) {
    // SAFETY: killpg has no memory-safety preconditions.
    let rc = unsafe { libc::killpg(process_group, signal.as_raw()) };
    if rc == 0 {
        debug!(
            "[SimulatorSupervisor] Sent {} to process group {}",
            signal, process_group
        );
        return;
    }

    let err = io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        debug!(
            "[SimulatorSupervisor] Process group {} already gone",
            process_group
        );
    } else {
        warn!(
            "[SimulatorSupervisor] Failed to send {} to process group {}: {}",
            signal, process_group, err
        );
    }
}

fn reap(mut child: Child) {
    match child.try_wait() {
        Ok(Some(status)) => debug!(
            "[SimulatorSupervisor] Simulator {} exited with {}",
            child.id(),
            status
        ),
        Ok(None) => {
            let pid = child.id();
            let spawned = thread::Builder::new()
                .name(format!("rl4net-reap-{}", pid))
                .spawn(move || match child.wait() {
                    Ok(status) => {
                        debug!("[SimulatorSupervisor] Simulator {} exited with {}", pid, status)
                    }
                    Err(e) => warn!("[SimulatorSupervisor] Failed to reap {}: {}", pid, e),
                });
            if let Err(e) = spawned {
                warn!(
                    "[SimulatorSupervisor] Could not start reaper for {}: {}",
                    pid, e
                );
            }
        }
        Err(e) => warn!(
            "[SimulatorSupervisor] Failed to poll simulator {}: {}",
            child.id(),
            e
        ),
    }
}

//! Integration tests for simulator process supervision.
//!
//! `sleep` plays the simulator. Stray-process names are chosen so the sweep
//! never matches anything real on the test machine.

use rl4net_framework::prelude::config::{
    SimulatorConfigBuildParams, SimulatorConfigBuilder, SimulatorConfigParams, TerminationSignal,
};
use rl4net_framework::prelude::environment::{ProcessState, SimulatorSupervisor};

use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn sleep_config(temp_dir: &TempDir) -> SimulatorConfigParams {
    SimulatorConfigBuilder::new()
        .set_program("sleep")
        .set_args(&["60"])
        .set_log_file(&temp_dir.path().join("out.inet"))
        .set_stray_process_names(&["rl4net-no-such-inet", "rl4net-no-such-opp"])
        .build()
}

fn process_exists(pid: u32) -> bool {
    // SAFETY: signal 0 only checks for existence.
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}

fn wait_for_exit(pid: u32) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if !process_exists(pid) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    false
}

/// Polls `path` until it contains `needle`. The child stays a zombie until
/// `stop` reaps it, so its output is the reliable completion signal.
fn wait_for_log(path: &Path, needle: &str) -> String {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let output = fs::read_to_string(path).unwrap_or_default();
        if output.contains(needle) || Instant::now() >= deadline {
            return output;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

#[test]
fn stop_without_start_is_a_no_op() {
    let temp_dir = TempDir::new().unwrap();
    let mut supervisor = SimulatorSupervisor::new(sleep_config(&temp_dir));

    supervisor.stop();
    assert_eq!(supervisor.state(), ProcessState::NotStarted);
    supervisor.stop();
    assert_eq!(supervisor.state(), ProcessState::NotStarted);
}

#[test]
fn stop_terminates_the_process_group() {
    let temp_dir = TempDir::new().unwrap();
    let mut supervisor = SimulatorSupervisor::new(sleep_config(&temp_dir));

    let handle = supervisor.start().unwrap();
    assert_eq!(supervisor.state(), ProcessState::Running);
    assert_eq!(supervisor.process_group(), Some(handle.process_group));
    assert!(process_exists(handle.pid));

    supervisor.stop();
    assert_eq!(supervisor.state(), ProcessState::Stopped);
    assert!(wait_for_exit(handle.pid));

    supervisor.stop();
    assert_eq!(supervisor.state(), ProcessState::Stopped);
}

#[test]
fn start_while_running_replaces_the_process() {
    let temp_dir = TempDir::new().unwrap();
    let mut supervisor = SimulatorSupervisor::new(sleep_config(&temp_dir));

    let first = supervisor.start().unwrap();
    let second = supervisor.start().unwrap();
    assert_ne!(first.pid, second.pid);
    assert!(wait_for_exit(first.pid));
    assert!(process_exists(second.pid));

    supervisor.stop();
    assert!(wait_for_exit(second.pid));
}

#[test]
fn stop_after_process_already_exited() {
    let temp_dir = TempDir::new().unwrap();
    let config = SimulatorConfigBuilder::new()
        .set_program("true")
        .set_log_file(&temp_dir.path().join("out.inet"))
        .set_stray_process_names(&[])
        .set_termination_signal(TerminationSignal::Kill)
        .build();
    let mut supervisor = SimulatorSupervisor::new(config);

    let handle = supervisor.start().unwrap();
    std::thread::sleep(Duration::from_millis(200));

    supervisor.stop();
    assert_eq!(supervisor.state(), ProcessState::Stopped);
    assert!(wait_for_exit(handle.pid));
}

#[test]
fn output_goes_to_truncated_log_file() {
    let temp_dir = TempDir::new().unwrap();
    let log_file = temp_dir.path().join("out.inet");
    fs::write(&log_file, "stale output from a previous run\n").unwrap();

    let config = SimulatorConfigBuilder::new()
        .set_program("sh")
        .set_args(&["-c", "echo simulated; echo failure >&2"])
        .set_log_file(&log_file)
        .set_stray_process_names(&[])
        .build();
    let mut supervisor = SimulatorSupervisor::new(config);

    supervisor.start().unwrap();
    let output = wait_for_log(&log_file, "failure");
    supervisor.stop();

    assert!(output.contains("simulated"));
    assert!(output.contains("failure"));
    assert!(!output.contains("stale"));
}

#[test]
fn working_directory_is_applied() {
    let temp_dir = TempDir::new().unwrap();
    let log_file = temp_dir.path().join("out.inet");

    let config = SimulatorConfigBuilder::new()
        .set_program("pwd")
        .set_working_directory(temp_dir.path())
        .set_log_file(&log_file)
        .set_stray_process_names(&[])
        .build();
    let mut supervisor = SimulatorSupervisor::new(config);

    supervisor.start().unwrap();
    let output = wait_for_log(&log_file, "\n");
    supervisor.stop();

    let expected = fs::canonicalize(temp_dir.path()).unwrap();
    assert_eq!(fs::canonicalize(output.trim()).unwrap(), expected);
}

#[test]
fn failing_sweep_command_is_tolerated() {
    let temp_dir = TempDir::new().unwrap();
    let config = SimulatorConfigBuilder::new()
        .set_program("sleep")
        .set_args(&["60"])
        .set_log_file(&temp_dir.path().join("out.inet"))
        .set_stray_process_names(&["inet"])
        .set_name_kill_command(&["rl4net-missing-kill-tool"])
        .build();
    let mut supervisor = SimulatorSupervisor::new(config);

    supervisor.stop();
    assert_eq!(supervisor.state(), ProcessState::NotStarted);

    let handle = supervisor.start().unwrap();
    supervisor.stop();
    assert_eq!(supervisor.state(), ProcessState::Stopped);
    assert!(wait_for_exit(handle.pid));
}

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::{fs, fs::File, io::Read};
use thiserror::Error;

use rl4net_types::prelude::PayloadMode;

/// The default configuration file path, resolved lazily at runtime.
/// If not overridden, the configuration is read from (or created in) the cwd.
pub static DEFAULT_ENV_CONFIG_PATH: Lazy<Option<PathBuf>> =
    Lazy::new(|| get_or_create_env_config_json_path(PathBuf::from("omnet_env_config.json")));

pub(crate) const DEFAULT_ENV_CONFIG_CONTENT: &str = r#"{
    "environment_config": {
        "_comment": "Number of directed links in the topology; must match the simulator's action size.",
        "expected_link_count": 0,
        "_comment2": "structured | opaque",
        "payload_mode": "opaque"
    },
    "channel_config": {
        "address": {
            "prefix": "tcp://",
            "host": "*",
            "port": "5555"
        },
        "_comment": "null waits forever for the simulator's next request.",
        "receive_timeout_ms": 120000,
        "bind_retry": {
            "max_attempts": 5,
            "initial_delay_ms": 50,
            "max_delay_ms": 1000,
            "backoff_multiplier": 2.0
        }
    },
    "simulator_config": {
        "program": "inet",
        "args": [],
        "working_directory": null,
        "log_file": "out.inet",
        "_comment": "SIGTERM | SIGKILL | SIGINT | SIGHUP | SIGUSR1",
        "termination_signal": "SIGTERM",
        "stray_process_names": ["inet", "opp_run_release"],
        "name_kill_command": ["pkill", "-x"]
    }
}"#;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse configuration file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("No configuration path given and the default one could not be created")]
    DefaultPathUnavailable,
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Returns `path` if it exists, otherwise writes the default configuration there.
///
/// `None` means the file was missing and could not be created.
pub fn get_or_create_env_config_json_path(path: PathBuf) -> Option<PathBuf> {
    if path.exists() {
        log::info!("[EnvConfigLoader] Found configuration at {:?}", path);
        return Some(path);
    }

    match fs::write(&path, DEFAULT_ENV_CONFIG_CONTENT) {
        Ok(()) => {
            log::info!("[EnvConfigLoader] Created new configuration at {:?}", path);
            Some(path)
        }
        Err(e) => {
            log::error!(
                "[EnvConfigLoader] Failed to create configuration at {:?}: {}",
                path,
                e
            );
            None
        }
    }
}

/// Resolves an optional user path against [`DEFAULT_ENV_CONFIG_PATH`].
pub fn resolve_env_config_json_path(path: Option<PathBuf>) -> Option<PathBuf> {
    match path {
        Some(p) => get_or_create_env_config_json_path(p),
        None => DEFAULT_ENV_CONFIG_PATH.clone(),
    }
}

/// Endpoint parameters: a transport prefix, a host and a port.
///
/// The port stays a string so that ZeroMQ's wildcard `*` can be configured.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct NetworkParams {
    pub prefix: String,
    pub host: String,
    pub port: String,
}

impl NetworkParams {
    pub fn new(prefix: &str, host: &str, port: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            host: host.to_string(),
            port: port.to_string(),
        }
    }
}

impl Default for NetworkParams {
    fn default() -> Self {
        Self::new("tcp://", "*", "5555")
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EnvironmentConfigParams {
    pub expected_link_count: usize,
    #[serde(default)]
    pub payload_mode: PayloadMode,
}

impl Default for EnvironmentConfigParams {
    fn default() -> Self {
        Self {
            expected_link_count: 0,
            payload_mode: PayloadMode::Opaque,
        }
    }
}

/// Backoff parameters used while (re)binding the listening endpoint.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BindRetryParams {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for BindRetryParams {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 50,
            max_delay_ms: 1000,
            backoff_multiplier: 2.0,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChannelConfigParams {
    pub address: NetworkParams,
    #[serde(default)]
    pub receive_timeout_ms: Option<u64>,
    #[serde(default)]
    pub bind_retry: BindRetryParams,
}

impl Default for ChannelConfigParams {
    fn default() -> Self {
        ChannelConfigBuilder::build_default()
    }
}

/// Signal delivered to the simulator's process group on teardown.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum TerminationSignal {
    #[default]
    #[serde(rename = "SIGTERM")]
    Term,
    #[serde(rename = "SIGKILL")]
    Kill,
    #[serde(rename = "SIGINT")]
    Interrupt,
    #[serde(rename = "SIGHUP")]
    Hangup,
    #[serde(rename = "SIGUSR1")]
    User1,
}

impl TerminationSignal {
    pub fn as_raw(&self) -> libc::c_int {
        match self {
            TerminationSignal::Term => libc::SIGTERM,
            TerminationSignal::Kill => libc::SIGKILL,
            TerminationSignal::Interrupt => libc::SIGINT,
            TerminationSignal::Hangup => libc::SIGHUP,
            TerminationSignal::User1 => libc::SIGUSR1,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TerminationSignal::Term => "SIGTERM",
            TerminationSignal::Kill => "SIGKILL",
            TerminationSignal::Interrupt => "SIGINT",
            TerminationSignal::Hangup => "SIGHUP",
            TerminationSignal::User1 => "SIGUSR1",
        }
    }
}

impl fmt::Display for TerminationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SimulatorConfigParams {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub working_directory: Option<PathBuf>,
    pub log_file: PathBuf,
    #[serde(default)]
    pub termination_signal: TerminationSignal,
    #[serde(default)]
    pub stray_process_names: Vec<String>,
    #[serde(default)]
    pub name_kill_command: Vec<String>,
}

impl Default for SimulatorConfigParams {
    fn default() -> Self {
        SimulatorConfigBuilder::build_default()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct EnvConfigLoader {
    #[serde(default)]
    pub environment_config: EnvironmentConfigParams,
    #[serde(default)]
    pub channel_config: ChannelConfigParams,
    #[serde(default)]
    pub simulator_config: SimulatorConfigParams,
}

impl EnvConfigLoader {
    /// Loads the configuration at `config_path`, or at the default path when `None`.
    ///
    /// A missing file is created with default content first.
    pub fn new_config(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = resolve_env_config_json_path(config_path)
            .ok_or(ConfigError::DefaultPathUnavailable)?;
        Self::load_config(&path)
    }

    pub fn load_config(config_path: &Path) -> Result<Self, ConfigError> {
        let mut contents = String::new();
        File::open(config_path)
            .and_then(|mut file| file.read_to_string(&mut contents))
            .map_err(|source| ConfigError::Io {
                path: config_path.to_path_buf(),
                source,
            })?;

        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: config_path.to_path_buf(),
            source,
        })
    }

    /// Writes this configuration as pretty-printed JSON.
    pub fn save_config(&self, config_path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: config_path.to_path_buf(),
            source,
        })?;
        fs::write(config_path, json).map_err(|source| ConfigError::Io {
            path: config_path.to_path_buf(),
            source,
        })
    }

    /// Checks the constraints serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.environment_config.expected_link_count == 0 {
            return Err(ConfigError::Invalid(
                "environment_config.expected_link_count must be at least 1".to_string(),
            ));
        }

        let address = &self.channel_config.address;
        if address.prefix.is_empty() || address.host.is_empty() || address.port.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "channel_config.address is incomplete: {:?}",
                address
            )));
        }

        let retry = &self.channel_config.bind_retry;
        if !retry.backoff_multiplier.is_finite() || retry.backoff_multiplier < 1.0 {
            return Err(ConfigError::Invalid(format!(
                "channel_config.bind_retry.backoff_multiplier must be >= 1.0, got {}",
                retry.backoff_multiplier
            )));
        }

        let simulator = &self.simulator_config;
        if simulator.program.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "simulator_config.program must not be empty".to_string(),
            ));
        }
        if !simulator.stray_process_names.is_empty() && simulator.name_kill_command.is_empty() {
            return Err(ConfigError::Invalid(
                "simulator_config.name_kill_command is required when stray_process_names is set"
                    .to_string(),
            ));
        }

        Ok(())
    }

    pub fn get_environment_config(&self) -> &EnvironmentConfigParams {
        &self.environment_config
    }

    pub fn get_channel_config(&self) -> &ChannelConfigParams {
        &self.channel_config
    }

    pub fn get_simulator_config(&self) -> &SimulatorConfigParams {
        &self.simulator_config
    }
}

pub trait EnvConfigBuildParams {
    fn set_expected_link_count(&mut self, expected_link_count: usize) -> &mut Self;
    fn set_payload_mode(&mut self, payload_mode: PayloadMode) -> &mut Self;
    fn set_channel_config(&mut self, channel_config: ChannelConfigParams) -> &mut Self;
    fn set_simulator_config(&mut self, simulator_config: SimulatorConfigParams) -> &mut Self;
    fn build(&self) -> EnvConfigLoader;
    fn build_default() -> EnvConfigLoader;
}

#[derive(Debug, Default)]
pub struct EnvConfigBuilder {
    expected_link_count: Option<usize>,
    payload_mode: Option<PayloadMode>,
    channel_config: Option<ChannelConfigParams>,
    simulator_config: Option<SimulatorConfigParams>,
}

impl EnvConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EnvConfigBuildParams for EnvConfigBuilder {
    fn set_expected_link_count(&mut self, expected_link_count: usize) -> &mut Self {
        self.expected_link_count = Some(expected_link_count);
        self
    }

    fn set_payload_mode(&mut self, payload_mode: PayloadMode) -> &mut Self {
        self.payload_mode = Some(payload_mode);
        self
    }

    fn set_channel_config(&mut self, channel_config: ChannelConfigParams) -> &mut Self {
        self.channel_config = Some(channel_config);
        self
    }

    fn set_simulator_config(&mut self, simulator_config: SimulatorConfigParams) -> &mut Self {
        self.simulator_config = Some(simulator_config);
        self
    }

    fn build(&self) -> EnvConfigLoader {
        EnvConfigLoader {
            environment_config: EnvironmentConfigParams {
                expected_link_count: self.expected_link_count.unwrap_or(0),
                payload_mode: self.payload_mode.unwrap_or_default(),
            },
            channel_config: self
                .channel_config
                .clone()
                .unwrap_or_else(ChannelConfigBuilder::build_default),
            simulator_config: self
                .simulator_config
                .clone()
                .unwrap_or_else(SimulatorConfigBuilder::build_default),
        }
    }

    fn build_default() -> EnvConfigLoader {
        EnvConfigLoader {
            environment_config: EnvironmentConfigParams::default(),
            channel_config: ChannelConfigBuilder::build_default(),
            simulator_config: SimulatorConfigBuilder::build_default(),
        }
    }
}

pub trait ChannelConfigBuildParams {
    fn set_address(&mut self, prefix: &str, host: &str, port: &str) -> &mut Self;
    fn set_receive_timeout_ms(&mut self, receive_timeout_ms: Option<u64>) -> &mut Self;
    fn set_bind_retry(&mut self, bind_retry: BindRetryParams) -> &mut Self;
    fn build(&self) -> ChannelConfigParams;
    fn build_default() -> ChannelConfigParams;
}

#[derive(Debug, Default)]
pub struct ChannelConfigBuilder {
    address: Option<NetworkParams>,
    receive_timeout_ms: Option<Option<u64>>,
    bind_retry: Option<BindRetryParams>,
}

impl ChannelConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChannelConfigBuildParams for ChannelConfigBuilder {
    fn set_address(&mut self, prefix: &str, host: &str, port: &str) -> &mut Self {
        self.address = Some(NetworkParams::new(prefix, host, port));
        self
    }

    fn set_receive_timeout_ms(&mut self, receive_timeout_ms: Option<u64>) -> &mut Self {
        self.receive_timeout_ms = Some(receive_timeout_ms);
        self
    }

    fn set_bind_retry(&mut self, bind_retry: BindRetryParams) -> &mut Self {
        self.bind_retry = Some(bind_retry);
        self
    }

    fn build(&self) -> ChannelConfigParams {
        let defaults = Self::build_default();

        ChannelConfigParams {
            address: self.address.clone().unwrap_or(defaults.address),
            receive_timeout_ms: self
                .receive_timeout_ms
                .unwrap_or(defaults.receive_timeout_ms),
            bind_retry: self.bind_retry.clone().unwrap_or(defaults.bind_retry),
        }
    }

    fn build_default() -> ChannelConfigParams {
        ChannelConfigParams {
            address: NetworkParams::default(),
            receive_timeout_ms: Some(120_000),
            bind_retry: BindRetryParams::default(),
        }
    }
}

pub trait SimulatorConfigBuildParams {
    fn set_program(&mut self, program: &str) -> &mut Self;
    fn set_args(&mut self, args: &[&str]) -> &mut Self;
    fn set_working_directory(&mut self, working_directory: &Path) -> &mut Self;
    fn set_log_file(&mut self, log_file: &Path) -> &mut Self;
    fn set_termination_signal(&mut self, signal: TerminationSignal) -> &mut Self;
    fn set_stray_process_names(&mut self, names: &[&str]) -> &mut Self;
    fn set_name_kill_command(&mut self, command: &[&str]) -> &mut Self;
    fn build(&self) -> SimulatorConfigParams;
    fn build_default() -> SimulatorConfigParams;
}

#[derive(Debug, Default)]
pub struct SimulatorConfigBuilder {
    program: Option<String>,
    args: Option<Vec<String>>,
    working_directory: Option<PathBuf>,
    log_file: Option<PathBuf>,
    termination_signal: Option<TerminationSignal>,
    stray_process_names: Option<Vec<String>>,
    name_kill_command: Option<Vec<String>>,
}

impl SimulatorConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }
}

fn to_owned_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl SimulatorConfigBuildParams for SimulatorConfigBuilder {
    fn set_program(&mut self, program: &str) -> &mut Self {
        self.program = Some(program.to_string());
        self
    }

    fn set_args(&mut self, args: &[&str]) -> &mut Self {
        self.args = Some(to_owned_strings(args));
        self
    }

    fn set_working_directory(&mut self, working_directory: &Path) -> &mut Self {
        self.working_directory = Some(working_directory.to_path_buf());
        self
    }

    fn set_log_file(&mut self, log_file: &Path) -> &mut Self {
        self.log_file = Some(log_file.to_path_buf());
        self
    }

    fn set_termination_signal(&mut self, signal: TerminationSignal) -> &mut Self {
        self.termination_signal = Some(signal);
        self
    }

    fn set_stray_process_names(&mut self, names: &[&str]) -> &mut Self {
        self.stray_process_names = Some(to_owned_strings(names));
        self
    }

    fn set_name_kill_command(&mut self, command: &[&str]) -> &mut Self {
        self.name_kill_command = Some(to_owned_strings(command));
        self
    }

    fn build(&self) -> SimulatorConfigParams {
        let defaults = Self::build_default();

        SimulatorConfigParams {
            program: self.program.clone().unwrap_or(defaults.program),
            args: self.args.clone().unwrap_or(defaults.args),
            working_directory: self.working_directory.clone(),
            log_file: self.log_file.clone().unwrap_or(defaults.log_file),
            termination_signal: self
                .termination_signal
                .unwrap_or(defaults.termination_signal),
            stray_process_names: self
                .stray_process_names
                .clone()
                .unwrap_or(defaults.stray_process_names),
            name_kill_command: self
                .name_kill_command
                .clone()
                .unwrap_or(defaults.name_kill_command),
        }
    }

    fn build_default() -> SimulatorConfigParams {
        SimulatorConfigParams {
            program: "inet".to_string(),
            args: Vec::new(),
            working_directory: None,
            log_file: PathBuf::from("out.inet"),
            termination_signal: TerminationSignal::Term,
            stray_process_names: vec!["inet".to_string(), "opp_run_release".to_string()],
            name_kill_command: vec!["pkill".to_string(), "-x".to_string()],
        }
    }
}

//! Step-based interface to a running OMNeT++ simulation.
//!
//! [`OmnetEnv`] owns the simulator process and the reply endpoint the
//! simulator connects to. The simulator asks, the adapter answers:
//!
//! ```text
//! reset()             stop old simulator, rebind endpoint, start simulator
//! observe()           read the next request (state or reward) without answering
//! step(action)        answer the pending request with `action`, read the next one
//! reward_received()   answer a reward request
//! end_episode()       answer the pending request with the episode-end signal
//! close()             stop simulator, release endpoint
//! ```

pub mod supervisor;

use crate::network::channel::{reply_transport_factory, ChannelError, SyncReplyTransport};
use crate::utilities::configuration::{ConfigError, EnvConfigLoader};
use crate::utilities::observability::init_observability;
use supervisor::{ProcessState, SimulatorSupervisor, SupervisorError};

use rl4net_types::prelude::{
    decode, encode_action, validate_action, ActionError, ControlSignal, DecodeError, Message,
    Payload, PayloadMode, Tag,
};

use log::{debug, info, warn};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvError {
    #[error("[EnvError] Malformed simulator message: {0}")]
    Decode(#[from] DecodeError),
    #[error("[EnvError] Invalid action: {0}")]
    InvalidAction(#[from] ActionError),
    #[error("[EnvError] Simulator step went backwards from {previous} to {got}")]
    StepRegression { previous: u64, got: u64 },
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("[EnvError] Operation requires a running episode, adapter is {0:?}")]
    NotRunning(EnvState),
    #[error("[EnvError] Adapter is closed")]
    Closed,
}

impl EnvError {
    /// Whether the error leaves the simulator conversation in an unknown state.
    fn aborts_episode(&self) -> bool {
        match self {
            EnvError::Decode(_) | EnvError::StepRegression { .. } => true,
            EnvError::Channel(ChannelError::State(_)) => false,
            EnvError::Channel(_) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvState {
    Idle,
    Binding,
    Running,
    Resetting,
    Terminated,
}

/// Outcome of one [`OmnetEnv::step`].
///
/// `done` is never set from simulator traffic: episodes end when the caller
/// sends [`OmnetEnv::end_episode`].
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    pub tag: Tag,
    pub step: u64,
    pub payload: Payload,
    pub done: bool,
    pub info: HashMap<String, String>,
}

impl From<Message> for StepResult {
    fn from(message: Message) -> Self {
        Self {
            tag: message.tag,
            step: message.step,
            payload: message.payload,
            done: false,
            info: HashMap::new(),
        }
    }
}

pub struct OmnetEnv {
    config: EnvConfigLoader,
    channel: Box<dyn SyncReplyTransport>,
    supervisor: SimulatorSupervisor,
    state: EnvState,
    episode: u64,
    last_step: Option<u64>,
}

impl OmnetEnv {
    /// Creates an idle adapter backed by a ZeroMQ reply endpoint.
    pub fn new(config: EnvConfigLoader) -> Result<Self, EnvError> {
        let channel = reply_transport_factory(config.get_channel_config());
        Self::with_transport(config, channel)
    }

    /// Loads the JSON configuration (default path when `None`) and creates an adapter.
    pub fn from_config_path(config_path: Option<PathBuf>) -> Result<Self, EnvError> {
        let config = EnvConfigLoader::new_config(config_path)?;
        Self::new(config)
    }

    /// Creates an idle adapter over a caller-provided transport.
    pub fn with_transport(
        config: EnvConfigLoader,
        channel: Box<dyn SyncReplyTransport>,
    ) -> Result<Self, EnvError> {
        init_observability();
        config.validate()?;

        let supervisor = SimulatorSupervisor::new(config.get_simulator_config().clone());

        Ok(Self {
            config,
            channel,
            supervisor,
            state: EnvState::Idle,
            episode: 0,
            last_step: None,
        })
    }

    /// Restarts the simulator on a fresh endpoint and begins a new episode.
    ///
    /// On failure the adapter is left `Idle` and `reset` may be retried.
    pub fn reset(&mut self) -> Result<(), EnvError> {
        self.ensure_open()?;
        info!("[OmnetEnv] Resetting (episode {})", self.episode + 1);

        self.state = EnvState::Resetting;
        self.supervisor.stop();

        self.state = EnvState::Binding;
        if let Err(e) = self.channel.rebind() {
            self.state = EnvState::Idle;
            return Err(e.into());
        }

        if let Err(e) = self.supervisor.start() {
            self.channel.release();
            self.state = EnvState::Idle;
            return Err(e.into());
        }

        self.episode += 1;
        self.last_step = None;
        self.state = EnvState::Running;
        Ok(())
    }

    /// Answers the pending request with `action` and returns the simulator's next message.
    ///
    /// Right after [`reset`](Self::reset) no request is pending yet; the call
    /// then first waits for the simulator's opening request and answers that.
    /// Use [`observe`](Self::observe) beforehand to read it instead.
    pub fn step(&mut self, action: &[f64]) -> Result<StepResult, EnvError> {
        self.ensure_running()?;

        validate_action(action, self.config.environment_config.expected_link_count)?;
        let encoded = encode_action(action)?;

        let result = self.exchange(&encoded);
        self.abort_on_fatal(result).map(StepResult::from)
    }

    /// Reads the next simulator request without answering it.
    pub fn observe(&mut self) -> Result<Message, EnvError> {
        self.ensure_running()?;
        let result = self.receive_message();
        self.abort_on_fatal(result)
    }

    /// Tells the simulator the current episode is over.
    pub fn end_episode(&mut self) -> Result<(), EnvError> {
        self.send_control(ControlSignal::EndEpisode)
    }

    /// Acknowledges the reward message the simulator is waiting on.
    pub fn reward_received(&mut self) -> Result<(), EnvError> {
        self.send_control(ControlSignal::RewardReceived)
    }

    /// Stops the simulator and releases the endpoint. Idempotent.
    pub fn close(&mut self) {
        if self.state == EnvState::Terminated {
            return;
        }

        self.supervisor.stop();
        self.channel.release();
        self.state = EnvState::Terminated;
        info!("[OmnetEnv] Closed after {} episode(s)", self.episode);
    }

    pub fn state(&self) -> EnvState {
        self.state
    }

    /// Number of successful resets so far.
    pub fn episode(&self) -> u64 {
        self.episode
    }

    /// Step of the most recent message in the current episode.
    pub fn last_step(&self) -> Option<u64> {
        self.last_step
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.channel.endpoint()
    }

    pub fn payload_mode(&self) -> PayloadMode {
        self.config.environment_config.payload_mode
    }

    pub fn expected_link_count(&self) -> usize {
        self.config.environment_config.expected_link_count
    }

    pub fn simulator_state(&mut self) -> ProcessState {
        self.supervisor.state()
    }

    pub fn config(&self) -> &EnvConfigLoader {
        &self.config
    }

    fn exchange(&mut self, encoded: &[u8]) -> Result<Message, EnvError> {
        if !self.channel.has_pending_request() {
            let opening = self.receive_message()?;
            debug!(
                "[OmnetEnv] Answering opening request '{}' at step {}",
                opening.tag, opening.step
            );
        }

        self.channel.reply(encoded)?;
        self.receive_message()
    }

    fn receive_message(&mut self) -> Result<Message, EnvError> {
        let raw = self.channel.receive()?;
        let message = decode(&raw, self.payload_mode())?;

        if let Some(previous) = self.last_step {
            if message.step < previous {
                return Err(EnvError::StepRegression {
                    previous,
                    got: message.step,
                });
            }
        }
        self.last_step = Some(message.step);

        Ok(message)
    }

    fn send_control(&mut self, signal: ControlSignal) -> Result<(), EnvError> {
        self.ensure_running()?;
        let result = self
            .channel
            .reply(signal.as_bytes())
            .map_err(EnvError::from);
        if result.is_ok() {
            debug!("[OmnetEnv] Sent '{}'", signal.as_str());
        }
        self.abort_on_fatal(result)
    }

    fn abort_on_fatal<T>(&mut self, result: Result<T, EnvError>) -> Result<T, EnvError> {
        if let Err(e) = &result {
            if e.aborts_episode() {
                warn!(
                    "[OmnetEnv] Episode {} aborted: {}; reset required",
                    self.episode, e
                );
                self.state = EnvState::Idle;
            }
        }
        result
    }

    fn ensure_open(&self) -> Result<(), EnvError> {
        match self.state {
            EnvState::Terminated => Err(EnvError::Closed),
            _ => Ok(()),
        }
    }

    fn ensure_running(&self) -> Result<(), EnvError> {
        match self.state {
            EnvState::Running => Ok(()),
            EnvState::Terminated => Err(EnvError::Closed),
            other => Err(EnvError::NotRunning(other)),
        }
    }
}

impl Drop for OmnetEnv {
    fn drop(&mut self) {
        self.close();
    }
}

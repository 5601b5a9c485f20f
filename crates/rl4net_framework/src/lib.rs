//! # RL4Net Framework
//!
//! Connects a reinforcement-learning training loop to an OMNeT++/INET simulation
//! running a probabilistic-forwarding routing module. The simulator is a separate
//! OS process; every training step trades an action (one forwarding probability
//! per directed link) for a state or a reward measured by the simulator.
//!
//! The crate is organized into the following modules:
//!
//! - **Environment** (`environment::*`): the [`OmnetEnv`](environment::OmnetEnv) adapter with
//!   its reset/step/episode-end state machine, and the `supervisor` that starts and tears
//!   down the simulator process.
//! - **Network** (`network::channel::*`): the ZeroMQ `REP` endpoint the simulator's `REQ`
//!   socket connects to, with strict request/reply turn-taking and a receive deadline.
//! - **Utilities** (`utilities::*`): JSON configuration loading and log4rs-backed logging.
//!
//! Wire framing lives in the companion `rl4net_types` crate.
//!
//! ## Using RL4Net
//!
//! ```no_run
//! use rl4net_framework::prelude::config::{EnvConfigBuildParams, EnvConfigBuilder};
//! use rl4net_framework::prelude::environment::OmnetEnv;
//!
//! let config = EnvConfigBuilder::new().set_expected_link_count(4).build();
//! let mut env = OmnetEnv::new(config)?;
//!
//! env.reset()?;
//! let state = env.observe()?;
//! let reward = env.step(&[0.25, 0.25, 0.25, 0.25])?;
//! env.reward_received()?;
//! env.end_episode()?;
//! env.close();
//! # Ok::<(), rl4net_framework::prelude::environment::EnvError>(())
//! ```

/// **Environment Modules**: the adapter state machine and simulator process control.
pub mod environment;

/// **Network Modules**: the reply endpoint and its bind/retry policies.
pub mod network;

/// **System Utilities**: configuration resolution and observability.
pub mod utilities {
    pub mod configuration;
    pub mod observability;
}

pub mod prelude {
    pub mod config {
        pub use crate::utilities::configuration::{
            BindRetryParams, ChannelConfigBuildParams, ChannelConfigBuilder, ChannelConfigParams,
            ConfigError, EnvConfigBuildParams, EnvConfigBuilder, EnvConfigLoader,
            EnvironmentConfigParams, NetworkParams, SimulatorConfigBuildParams,
            SimulatorConfigBuilder, SimulatorConfigParams, TerminationSignal,
        };
    }

    pub mod environment {
        pub use crate::environment::supervisor::{
            ProcessHandle, ProcessState, SimulatorSupervisor, SupervisorError,
        };
        pub use crate::environment::{EnvError, EnvState, OmnetEnv, StepResult};
    }

    pub mod network {
        pub use crate::network::channel::policies::RetryPolicy;
        pub use crate::network::channel::zmq::ZmqReplyChannel;
        pub use crate::network::channel::{
            reply_transport_factory, ChannelError, SyncReplyTransport, Turn,
        };
        pub use crate::network::construct_address;
    }

    pub use rl4net_types::prelude::*;
}

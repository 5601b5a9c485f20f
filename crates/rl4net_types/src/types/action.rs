//! Outbound replies: forwarding-probability actions and control signals.

use serde::{Deserialize, Serialize};

/// Fixed replies sent in place of an action at episode boundaries.
///
/// These sit outside the `s`/`r` tag vocabulary so the simulator can tell them
/// apart from a probability vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlSignal {
    /// The training loop finished the current episode.
    EndEpisode,
    /// The training loop consumed the last reward message.
    RewardReceived,
}

impl ControlSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlSignal::EndEpisode => "end episode",
            ControlSignal::RewardReceived => "reward received",
        }
    }

    pub fn as_bytes(&self) -> &'static [u8] {
        self.as_str().as_bytes()
    }
}

//! Request/reply endpoint the simulator connects to.
//!
//! The simulator drives every exchange: it sends a request and blocks until the
//! adapter answers. Implementations of [`SyncReplyTransport`] enforce that
//! alternation locally so that a misordered call fails fast instead of wedging
//! the socket.

pub mod policies;
pub mod zmq;

use crate::utilities::configuration::ChannelConfigParams;

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("[ChannelError] Invalid channel state: {0}")]
    State(String),
    #[error("[ChannelError] No request received within {0:?}")]
    Timeout(Duration),
    #[error("[ChannelError] Failed to bind {endpoint} after {attempts} attempt(s): {source}")]
    Bind {
        endpoint: String,
        attempts: u32,
        #[source]
        source: ::zmq::Error,
    },
    #[error("[ChannelError] Transport failure: {0}")]
    Transport(#[from] ::zmq::Error),
}

/// Where the channel is in its receive/reply cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    Unbound,
    AwaitingRequest,
    AwaitingReply,
}

/// Synchronous, strictly alternating reply endpoint.
pub trait SyncReplyTransport: Send {
    /// Drops any current endpoint and binds a fresh one.
    fn rebind(&mut self) -> Result<(), ChannelError>;
    /// Blocks until the next request arrives or the receive deadline expires.
    fn receive(&mut self) -> Result<Vec<u8>, ChannelError>;
    /// Answers the request returned by the last [`receive`](Self::receive).
    fn reply(&mut self, payload: &[u8]) -> Result<(), ChannelError>;
    /// Closes the endpoint without waiting for queued messages.
    fn release(&mut self);
    fn turn(&self) -> Turn;
    /// Resolved endpoint, e.g. the concrete port after binding `*`.
    fn endpoint(&self) -> Option<&str>;

    fn has_pending_request(&self) -> bool {
        self.turn() == Turn::AwaitingReply
    }

    fn is_bound(&self) -> bool {
        self.turn() != Turn::Unbound
    }
}

pub fn reply_transport_factory(config: &ChannelConfigParams) -> Box<dyn SyncReplyTransport> {
    Box::new(zmq::ZmqReplyChannel::new(config))
}

use super::policies::RetryPolicy;
use super::{ChannelError, SyncReplyTransport, Turn};
use crate::network::construct_address;
use crate::utilities::configuration::ChannelConfigParams;

use log::{debug, info, trace, warn};
use std::thread;
use std::time::Duration;
use zmq::{Context, Socket};

/// ZeroMQ `REP` endpoint the simulator's `REQ` socket connects to.
pub struct ZmqReplyChannel {
    context: Context,
    socket: Option<Socket>,
    address: String,
    endpoint: Option<String>,
    receive_timeout: Option<Duration>,
    retry_policy: RetryPolicy,
    turn: Turn,
}

impl ZmqReplyChannel {
    /// Creates an unbound channel. Nothing listens until [`rebind`](SyncReplyTransport::rebind).
    pub fn new(config: &ChannelConfigParams) -> Self {
        Self {
            context: Context::new(),
            socket: None,
            address: construct_address(&config.address),
            endpoint: None,
            receive_timeout: config.receive_timeout_ms.map(Duration::from_millis),
            retry_policy: RetryPolicy::from(&config.bind_retry),
            turn: Turn::Unbound,
        }
    }

    /// Configured (unresolved) bind address.
    pub fn address(&self) -> &str {
        &self.address
    }

    fn create_rep_socket(&self) -> Result<(Socket, String), zmq::Error> {
        let socket = self.context.socket(zmq::REP)?;
        socket.set_linger(0)?;

        let rcvtimeo = match self.receive_timeout {
            Some(timeout) => i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX),
            None => -1,
        };
        socket.set_rcvtimeo(rcvtimeo)?;

        socket.bind(&self.address)?;

        let endpoint = socket
            .get_last_endpoint()?
            .unwrap_or_else(|_| self.address.clone());

        Ok((socket, endpoint))
    }
}

impl SyncReplyTransport for ZmqReplyChannel {
    fn rebind(&mut self) -> Result<(), ChannelError> {
        self.release();

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.create_rep_socket() {
                Ok((socket, endpoint)) => {
                    info!("[ZmqReplyChannel] Listening on {}", endpoint);
                    self.socket = Some(socket);
                    self.endpoint = Some(endpoint);
                    self.turn = Turn::AwaitingRequest;
                    return Ok(());
                }
                // Only a busy port can clear up; anything else fails the same way again.
                Err(e @ zmq::Error::EADDRINUSE) if self.retry_policy.should_retry(attempt) => {
                    let delay = self.retry_policy.delay_for_attempt(attempt);
                    warn!(
                        "[ZmqReplyChannel] Bind to {} failed (attempt {}): {}; retrying in {:?}",
                        self.address, attempt, e, delay
                    );
                    thread::sleep(delay);
                }
                Err(e) => {
                    return Err(ChannelError::Bind {
                        endpoint: self.address.clone(),
                        attempts: attempt,
                        source: e,
                    });
                }
            }
        }
    }

    fn receive(&mut self) -> Result<Vec<u8>, ChannelError> {
        let socket = match (self.turn, self.socket.as_ref()) {
            (Turn::AwaitingRequest, Some(socket)) => socket,
            (Turn::AwaitingReply, _) => {
                return Err(ChannelError::State(
                    "receive called while a reply is outstanding".to_string(),
                ));
            }
            _ => {
                return Err(ChannelError::State(
                    "receive called on an unbound channel".to_string(),
                ));
            }
        };

        match socket.recv_bytes(0) {
            Ok(bytes) => {
                trace!("[ZmqReplyChannel] Received {} bytes", bytes.len());
                self.turn = Turn::AwaitingReply;
                Ok(bytes)
            }
            Err(zmq::Error::EAGAIN) => Err(ChannelError::Timeout(
                self.receive_timeout.unwrap_or_default(),
            )),
            Err(e) => Err(ChannelError::Transport(e)),
        }
    }

    fn reply(&mut self, payload: &[u8]) -> Result<(), ChannelError> {
        let socket = match (self.turn, self.socket.as_ref()) {
            (Turn::AwaitingReply, Some(socket)) => socket,
            _ => {
                return Err(ChannelError::State(
                    "reply called without an unanswered request".to_string(),
                ));
            }
        };

        socket.send(payload, 0)?;
        trace!("[ZmqReplyChannel] Replied with {} bytes", payload.len());
        self.turn = Turn::AwaitingRequest;
        Ok(())
    }

    fn release(&mut self) {
        if let Some(socket) = self.socket.take() {
            if let Some(endpoint) = self.endpoint.as_deref() {
                if let Err(e) = socket.unbind(endpoint) {
                    debug!("[ZmqReplyChannel] Unbind of {} failed: {}", endpoint, e);
                }
            }
            debug!("[ZmqReplyChannel] Released {}", self.address);
        }
        self.endpoint = None;
        self.turn = Turn::Unbound;
    }

    fn turn(&self) -> Turn {
        self.turn
    }

    fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }
}

impl Drop for ZmqReplyChannel {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utilities::configuration::{ChannelConfigBuildParams, ChannelConfigBuilder};

    fn ephemeral_config(timeout_ms: Option<u64>) -> ChannelConfigParams {
        ChannelConfigBuilder::new()
            .set_address("tcp://", "127.0.0.1", "*")
            .set_receive_timeout_ms(timeout_ms)
            .build()
    }

    #[test]
    fn unbound_channel_rejects_io() {
        let mut channel = ZmqReplyChannel::new(&ephemeral_config(Some(50)));
        assert_eq!(channel.turn(), Turn::Unbound);
        assert!(matches!(channel.receive(), Err(ChannelError::State(_))));
        assert!(matches!(channel.reply(b"x"), Err(ChannelError::State(_))));
        assert!(channel.endpoint().is_none());
    }

    #[test]
    fn wildcard_port_resolves_on_bind() {
        let mut channel = ZmqReplyChannel::new(&ephemeral_config(Some(50)));
        channel.rebind().unwrap();

        let endpoint = channel.endpoint().unwrap().to_string();
        assert!(endpoint.starts_with("tcp://127.0.0.1:"));
        assert!(!endpoint.ends_with('*'));
        assert_eq!(channel.address(), "tcp://127.0.0.1:*");
    }

    #[test]
    fn reply_before_receive_is_a_state_error() {
        let mut channel = ZmqReplyChannel::new(&ephemeral_config(Some(50)));
        channel.rebind().unwrap();
        assert!(matches!(channel.reply(b"0.5"), Err(ChannelError::State(_))));
    }

    #[test]
    fn receive_times_out_without_a_peer() {
        let mut channel = ZmqReplyChannel::new(&ephemeral_config(Some(50)));
        channel.rebind().unwrap();

        assert!(matches!(channel.receive(), Err(ChannelError::Timeout(_))));
        // A timeout does not consume the turn.
        assert_eq!(channel.turn(), Turn::AwaitingRequest);
    }

    #[test]
    fn busy_port_is_retried() {
        let mut holder = ZmqReplyChannel::new(&ephemeral_config(Some(50)));
        holder.rebind().unwrap();
        let port = holder.endpoint().unwrap().rsplit(':').next().unwrap().to_string();

        let config = ChannelConfigBuilder::new()
            .set_address("tcp://", "127.0.0.1", &port)
            .build();
        let mut channel = ZmqReplyChannel::new(&config);
        channel.retry_policy = RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
            add_jitter: false,
        };

        match channel.rebind() {
            Err(ChannelError::Bind { attempts, source, .. }) => {
                assert_eq!(attempts, 3);
                assert_eq!(source, zmq::Error::EADDRINUSE);
            }
            other => panic!("expected bind error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn release_is_idempotent() {
        let mut channel = ZmqReplyChannel::new(&ephemeral_config(Some(50)));
        channel.rebind().unwrap();
        channel.release();
        channel.release();
        assert!(!channel.is_bound());
    }
}

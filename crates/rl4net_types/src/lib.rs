//! # RL4Net Types
//!
//! Wire-level vocabulary shared between the RL4Net environment adapter and the
//! OMNeT++ routing module it drives.
//!
//! - **Message types** (`types::message`): the tagged state/reward frames the simulator
//!   sends, plus helpers for interpreting opaque payloads on the caller side.
//! - **Action types** (`types::action`): forwarding-probability vectors and the fixed
//!   control replies used at episode boundaries.
//! - **Codec** (`codec`): byte-level framing for `TAG@@STEP@@PAYLOAD@@` frames and
//!   the comma-joined action encoding.
//!
//! Nothing in this crate performs I/O.

pub mod types {
    pub mod action;
    pub mod message;
}

pub mod codec;

pub mod prelude {
    pub use crate::codec::{
        decode, encode_action, validate_action, ActionError, DecodeError, DELIMITER,
    };
    pub use crate::types::action::ControlSignal;
    pub use crate::types::message::{
        parse_scalar, parse_vector, split_agents, Message, Payload, PayloadMode, Tag,
    };
}

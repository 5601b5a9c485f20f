//! Inbound simulator messages.
//!
//! Every exchange is initiated by the simulator with a [`Message`]: either the
//! state it observed for a routing step, or the reward (latency and loss) it
//! measured once that step finished.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::codec::DecodeError;

/// Separator between per-agent sections of a multi-agent payload.
pub const AGENT_SEPARATOR: char = '/';

/// Separator between numeric values inside a payload.
pub const VALUE_SEPARATOR: char = ',';

/// Message kind, carried as the single leading byte of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tag {
    State,
    Reward,
}

impl Tag {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b's' => Some(Tag::State),
            b'r' => Some(Tag::Reward),
            _ => None,
        }
    }

    pub fn as_byte(&self) -> u8 {
        match self {
            Tag::State => b's',
            Tag::Reward => b'r',
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_byte() as char)
    }
}

/// How the adapter interprets `State` payloads.
///
/// `Structured` parses them into a numeric vector. `Opaque` hands the raw text
/// to the caller, which is what multi-agent setups need since one message then
/// bundles the data of several agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadMode {
    Structured,
    #[default]
    Opaque,
}

/// Decoded message body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    Vector(Vec<f64>),
    Opaque(String),
}

/// A single decoded simulator request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub tag: Tag,
    pub step: u64,
    pub payload: Payload,
}

impl Message {
    pub fn new(tag: Tag, step: u64, payload: Payload) -> Self {
        Self { tag, step, payload }
    }

    pub fn is_state(&self) -> bool {
        self.tag == Tag::State
    }

    pub fn is_reward(&self) -> bool {
        self.tag == Tag::Reward
    }

    pub fn as_vector(&self) -> Option<&[f64]> {
        match &self.payload {
            Payload::Vector(values) => Some(values),
            Payload::Opaque(_) => None,
        }
    }

    pub fn as_opaque(&self) -> Option<&str> {
        match &self.payload {
            Payload::Opaque(text) => Some(text),
            Payload::Vector(_) => None,
        }
    }

    /// Interprets the payload as a single scalar reward.
    ///
    /// Works for opaque payloads holding one float and for one-element vectors.
    /// Composite rewards (`delay,loss` or multi-agent bundles) should go through
    /// [`parse_vector`] / [`split_agents`] instead.
    pub fn reward(&self) -> Result<f64, DecodeError> {
        match &self.payload {
            Payload::Opaque(text) => parse_scalar(text),
            Payload::Vector(values) if values.len() == 1 => Ok(values[0]),
            Payload::Vector(values) => Err(DecodeError::InvalidPayload(format!(
                "expected a single reward value, found {} values",
                values.len()
            ))),
        }
    }
}

/// Parses a comma-separated list of floats.
///
/// An empty string yields an empty vector. Surrounding whitespace of each
/// element is ignored.
pub fn parse_vector(text: &str) -> Result<Vec<f64>, DecodeError> {
    if text.is_empty() {
        return Ok(Vec::new());
    }

    text.split(VALUE_SEPARATOR)
        .map(|value| {
            value.trim().parse::<f64>().map_err(|_| {
                DecodeError::InvalidPayload(format!("'{}' is not a decimal number", value))
            })
        })
        .collect()
}

/// Parses a payload holding exactly one float.
pub fn parse_scalar(text: &str) -> Result<f64, DecodeError> {
    text.trim()
        .parse::<f64>()
        .map_err(|_| DecodeError::InvalidPayload(format!("'{}' is not a decimal number", text)))
}

/// Splits a multi-agent payload into its per-agent sections.
///
/// Sections keep their position: an agent that reported nothing yields an
/// empty string rather than being skipped.
pub fn split_agents(text: &str) -> impl Iterator<Item = &str> {
    text.split(AGENT_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_bytes_match_wire_vocabulary() {
        assert_eq!(Tag::from_byte(b's'), Some(Tag::State));
        assert_eq!(Tag::from_byte(b'r'), Some(Tag::Reward));
        assert_eq!(Tag::from_byte(b'x'), None);
        assert_eq!(Tag::State.as_byte(), b's');
        assert_eq!(Tag::Reward.to_string(), "r");
    }

    #[test]
    fn reward_from_opaque_scalar() {
        let msg = Message::new(Tag::Reward, 5, Payload::Opaque("0.87".to_string()));
        assert!((msg.reward().unwrap() - 0.87).abs() < 1e-12);
    }

    #[test]
    fn reward_rejects_composite_vector() {
        let msg = Message::new(Tag::Reward, 1, Payload::Vector(vec![0.1, 0.2]));
        assert!(matches!(msg.reward(), Err(DecodeError::InvalidPayload(_))));
    }

    #[test]
    fn single_agent_reward_pair() {
        let values = parse_vector("0.012500,0.030000").unwrap();
        assert_eq!(values, vec![0.0125, 0.03]);
    }

    #[test]
    fn multi_agent_rewards_split_per_node() {
        let sections: Vec<&str> = split_agents("0.1,0.0/0.2,0.5/0.3,1.0").collect();
        assert_eq!(sections, vec!["0.1,0.0", "0.2,0.5", "0.3,1.0"]);

        let per_node: Vec<Vec<f64>> = sections
            .iter()
            .map(|section| parse_vector(section).unwrap())
            .collect();
        assert_eq!(per_node[1], vec![0.2, 0.5]);
    }

    #[test]
    fn empty_agent_section_keeps_its_index() {
        let sections: Vec<&str> = split_agents("0.1,0.0//0.3,1.0").collect();
        assert_eq!(sections, vec!["0.1,0.0", "", "0.3,1.0"]);
        assert_eq!(parse_vector(sections[1]).unwrap(), Vec::<f64>::new());
        assert_eq!(parse_vector(sections[2]).unwrap(), vec![0.3, 1.0]);
    }

    #[test]
    fn parse_vector_rejects_garbage() {
        assert!(parse_vector("0.1,abc").is_err());
        assert_eq!(parse_vector("").unwrap(), Vec::<f64>::new());
    }

    #[test]
    fn payload_mode_serializes_snake_case() {
        let json = serde_json::to_string(&PayloadMode::Structured).unwrap();
        assert_eq!(json, "\"structured\"");
        let mode: PayloadMode = serde_json::from_str("\"opaque\"").unwrap();
        assert_eq!(mode, PayloadMode::Opaque);
    }
}

//! Byte-level framing for simulator messages and action replies.
//!
//! # Wire format
//!
//! ```text
//! TAG @@ STEP @@ PAYLOAD [@@]
//! ```
//!
//! `TAG` is a single byte (`s` or `r`), `STEP` a decimal non-negative integer and
//! `PAYLOAD` ASCII text. The trailing delimiter is optional: the routing module
//! omits it while the documented form includes it, and both decode identically.
//!
//! Action replies are comma-joined decimals without a trailing separator
//! (`0.5,0.5`).

use thiserror::Error;

use crate::types::message::{Message, Payload, PayloadMode, Tag, VALUE_SEPARATOR};

/// Two-byte field delimiter.
pub const DELIMITER: &[u8] = b"@@";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecodeError {
    #[error("Expected 3 delimiter-separated fields, found {0}")]
    FieldCount(usize),
    #[error("Unknown message tag: {0:?}")]
    UnknownTag(String),
    #[error("Invalid step field: {0:?}")]
    InvalidStep(String),
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ActionError {
    #[error("Action has {got} probabilities, expected {expected}")]
    Length { expected: usize, got: usize },
    #[error("Probability at index {index} is not finite: {value}")]
    NonFinite { index: usize, value: f64 },
}

/// Splits `raw` on every occurrence of [`DELIMITER`].
fn split_fields(raw: &[u8]) -> Vec<&[u8]> {
    let mut fields = Vec::with_capacity(4);
    let mut start = 0;
    let mut cursor = 0;

    while cursor + DELIMITER.len() <= raw.len() {
        if &raw[cursor..cursor + DELIMITER.len()] == DELIMITER {
            fields.push(&raw[start..cursor]);
            cursor += DELIMITER.len();
            start = cursor;
        } else {
            cursor += 1;
        }
    }
    fields.push(&raw[start..]);

    fields
}

fn decode_tag(field: &[u8]) -> Result<Tag, DecodeError> {
    match field {
        [byte] => Tag::from_byte(*byte)
            .ok_or_else(|| DecodeError::UnknownTag(String::from_utf8_lossy(field).into_owned())),
        _ => Err(DecodeError::UnknownTag(
            String::from_utf8_lossy(field).into_owned(),
        )),
    }
}

fn decode_step(field: &[u8]) -> Result<u64, DecodeError> {
    let invalid = || DecodeError::InvalidStep(String::from_utf8_lossy(field).into_owned());

    if field.is_empty() || !field.iter().all(u8::is_ascii_digit) {
        return Err(invalid());
    }

    // All bytes are ASCII digits, so the UTF-8 check cannot fail; parsing can
    // still overflow.
    std::str::from_utf8(field)
        .map_err(|_| invalid())?
        .parse::<u64>()
        .map_err(|_| invalid())
}

fn decode_state_vector(text: &str) -> Result<Vec<f64>, DecodeError> {
    let trimmed = text.strip_suffix(VALUE_SEPARATOR).unwrap_or(text);
    crate::types::message::parse_vector(trimmed)
}

/// Decodes one frame received from the simulator.
///
/// Under [`PayloadMode::Structured`], `State` payloads become a numeric vector
/// after dropping a single trailing `,`. Every other payload is returned
/// verbatim as [`Payload::Opaque`].
pub fn decode(raw: &[u8], mode: PayloadMode) -> Result<Message, DecodeError> {
    let fields = split_fields(raw);

    let payload_field = match fields.len() {
        3 => fields[2],
        4 if fields[3].is_empty() => fields[2],
        n => return Err(DecodeError::FieldCount(n)),
    };

    let tag = decode_tag(fields[0])?;
    let step = decode_step(fields[1])?;

    let text = std::str::from_utf8(payload_field)
        .map_err(|e| DecodeError::InvalidPayload(format!("payload is not ASCII text: {}", e)))?;

    let payload = match (mode, tag) {
        (PayloadMode::Structured, Tag::State) => Payload::Vector(decode_state_vector(text)?),
        _ => Payload::Opaque(text.to_string()),
    };

    Ok(Message { tag, step, payload })
}

/// Checks that `action` has `expected_len` finite entries.
pub fn validate_action(action: &[f64], expected_len: usize) -> Result<(), ActionError> {
    if action.len() != expected_len {
        return Err(ActionError::Length {
            expected: expected_len,
            got: action.len(),
        });
    }
    check_finite(action)
}

fn check_finite(action: &[f64]) -> Result<(), ActionError> {
    match action.iter().enumerate().find(|(_, p)| !p.is_finite()) {
        Some((index, value)) => Err(ActionError::NonFinite {
            index,
            value: *value,
        }),
        None => Ok(()),
    }
}

/// Encodes forwarding probabilities as a comma-joined decimal list.
pub fn encode_action(action: &[f64]) -> Result<Vec<u8>, ActionError> {
    check_finite(action)?;

    let encoded = action
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(",");

    Ok(encoded.into_bytes())
}

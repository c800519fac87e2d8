//! MessagePack codec. Structs travel as maps keyed by field name, enums as
//! single-entry maps keyed by variant name.

use std::collections::BTreeMap;

use serde::de::IgnoredAny;
use serde::Serialize;

use crate::client::ClientRequest;
use crate::error::WireError;
use crate::server::ServerMessage;

pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, WireError> {
    Ok(rmp_serde::to_vec_named(message)?)
}

/// Decodes an inbound frame. A well-formed frame of a kind outside
/// [`ServerMessage::KINDS`] decodes to [`ServerMessage::Unknown`].
pub fn decode_server_message(frame: &[u8]) -> Result<ServerMessage, WireError> {
    if frame.is_empty() {
        return Err(WireError::EmptyFrame);
    }
    match rmp_serde::from_slice(frame) {
        Ok(message) => Ok(message),
        Err(err) => match frame_kind(frame) {
            Some(kind) if !ServerMessage::KINDS.contains(&kind.as_str()) => {
                Ok(ServerMessage::Unknown(kind))
            }
            _ => Err(err.into()),
        },
    }
}

/// Variant name of an externally tagged frame: the key of a single-entry
/// map, or a bare string for unit variants.
fn frame_kind(frame: &[u8]) -> Option<String> {
    if let Ok(envelope) = rmp_serde::from_slice::<BTreeMap<String, IgnoredAny>>(frame) {
        let mut keys = envelope.into_keys();
        return match (keys.next(), keys.next()) {
            (Some(kind), None) => Some(kind),
            _ => None,
        };
    }
    rmp_serde::from_slice::<String>(frame).ok()
}

pub fn decode_client_request(frame: &[u8]) -> Result<ClientRequest, WireError> {
    if frame.is_empty() {
        return Err(WireError::EmptyFrame);
    }
    Ok(rmp_serde::from_slice(frame)?)
}

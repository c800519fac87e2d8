//! Inbound frames. The server speaks a union of four frame kinds; any other
//! kind decodes to [`ServerMessage::Unknown`].

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::shapes::{WireAmount, WireBytes};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// Acknowledges a request; a subscribe ack carries the stream id.
    #[serde(rename = "Response")]
    Ack(Ack),
    /// Request failed. Always fatal to the stream.
    Error(ErrorFrame),
    #[serde(rename = "StreamData")]
    Data(StreamData),
    #[serde(rename = "StreamEnd")]
    End(StreamEnd),
    /// A frame kind this client does not know. Never sent.
    #[serde(skip)]
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ack {
    pub request_id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<StreamStart>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamStart {
    pub id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamData {
    pub id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
    #[serde(default)]
    pub payload: StreamDataPayload,
}

/// The server closed the stream. Carries a message when it closed on error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamEnd {
    pub id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Payload of a data frame. Only swap quotes are understood; other payload
/// kinds decode to an empty payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamDataPayload {
    #[serde(rename = "SwapQuotes", default, skip_serializing_if = "Option::is_none")]
    pub swap_quotes: Option<SwapQuotes>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapQuotes {
    /// Opaque id, surfaced as the result's route id.
    pub id: String,
    /// Provider id to route. Ordered so selection ties resolve the same way
    /// on every run.
    #[serde(default, deserialize_with = "nil_as_default")]
    pub quotes: BTreeMap<String, SwapRoute>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRoute {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_amount: Option<WireAmount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_amount: Option<WireAmount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slippage_bps: Option<u32>,
    #[serde(
        default,
        deserialize_with = "nil_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub steps: Vec<RoutePlanStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<WireBytes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<Vec<WireInstruction>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_lookup_tables: Option<Vec<WireBytes>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compute_units: Option<WireAmount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compute_units_safe: Option<WireAmount>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutePlanStep {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Instruction in the compact wire layout: `p` program, `a` accounts, `d` data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireInstruction {
    pub p: WireBytes,
    #[serde(default, deserialize_with = "nil_as_default")]
    pub a: Vec<WireAccountMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<WireBytes>,
}

/// Account in the compact wire layout: `p` key, `s` signer, `w` writable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireAccountMeta {
    pub p: WireBytes,
    #[serde(default, deserialize_with = "nil_as_default")]
    pub s: bool,
    #[serde(default, deserialize_with = "nil_as_default")]
    pub w: bool,
}

/// Reads `nil` as the field's default.
fn nil_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl ServerMessage {
    /// Wire names of the frame kinds this client understands.
    pub const KINDS: [&'static str; 4] = ["Response", "Error", "StreamData", "StreamEnd"];

    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Ack(_) => "ack",
            ServerMessage::Error(_) => "error",
            ServerMessage::Data(_) => "data",
            ServerMessage::End(_) => "end",
            ServerMessage::Unknown(_) => "unknown",
        }
    }
}

//! Polymorphic leaf values. Peers encode amounts and keys in more than one
//! physical shape; these types keep the shape so normalization can decide
//! what to do with it.

use std::fmt;

use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An amount as it appeared on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum WireAmount {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    /// Decimal integer text.
    Text(String),
}

/// A key or binary blob as it appeared on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireBytes {
    /// Text, either base58 (keys) or base64 (blobs).
    Text(String),
    /// MessagePack `bin` payload.
    Binary(Vec<u8>),
    /// Array of small integers.
    Array(Vec<u8>),
}

impl WireBytes {
    pub fn binary(bytes: impl Into<Vec<u8>>) -> Self {
        WireBytes::Binary(bytes.into())
    }

    pub fn text(text: impl Into<String>) -> Self {
        WireBytes::Text(text.into())
    }
}

impl From<u64> for WireAmount {
    fn from(value: u64) -> Self {
        WireAmount::Unsigned(value)
    }
}

impl Serialize for WireAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            WireAmount::Unsigned(v) => serializer.serialize_u64(*v),
            WireAmount::Signed(v) => serializer.serialize_i64(*v),
            WireAmount::Float(v) => serializer.serialize_f64(*v),
            WireAmount::Text(v) => serializer.serialize_str(v),
        }
    }
}

impl<'de> Deserialize<'de> for WireAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AmountVisitor;

        impl<'de> Visitor<'de> for AmountVisitor {
            type Value = WireAmount;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an integer, a float or a decimal string")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(WireAmount::Unsigned(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(match u64::try_from(v) {
                    Ok(unsigned) => WireAmount::Unsigned(unsigned),
                    Err(_) => WireAmount::Signed(v),
                })
            }

            fn visit_u128<E: de::Error>(self, v: u128) -> Result<Self::Value, E> {
                Ok(WireAmount::Text(v.to_string()))
            }

            fn visit_i128<E: de::Error>(self, v: i128) -> Result<Self::Value, E> {
                Ok(WireAmount::Text(v.to_string()))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                Ok(WireAmount::Float(v))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(WireAmount::Text(v.to_owned()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
                Ok(WireAmount::Text(v))
            }
        }

        deserializer.deserialize_any(AmountVisitor)
    }
}

impl Serialize for WireBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            WireBytes::Text(text) => serializer.serialize_str(text),
            WireBytes::Binary(bytes) => serializer.serialize_bytes(bytes),
            WireBytes::Array(bytes) => {
                let mut seq = serializer.serialize_seq(Some(bytes.len()))?;
                for byte in bytes {
                    seq.serialize_element(byte)?;
                }
                seq.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for WireBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BytesVisitor;

        impl<'de> Visitor<'de> for BytesVisitor {
            type Value = WireBytes;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a string, a binary buffer or an array of bytes")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(WireBytes::Text(v.to_owned()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
                Ok(WireBytes::Text(v))
            }

            fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
                Ok(WireBytes::Binary(v.to_vec()))
            }

            fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Self::Value, E> {
                Ok(WireBytes::Binary(v))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut bytes = Vec::with_capacity(seq.size_hint().unwrap_or(0).min(4096));
                while let Some(byte) = seq.next_element::<u8>()? {
                    bytes.push(byte);
                }
                Ok(WireBytes::Array(bytes))
            }
        }

        deserializer.deserialize_any(BytesVisitor)
    }
}

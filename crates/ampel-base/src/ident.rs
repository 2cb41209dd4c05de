// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Identifiers for stocks, data points, compounds and feature records.
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::freeze::FrozenValue;

/// Width of a binary identifier in bytes.
pub const BINARY_ID_LEN: usize = 16;

/// Errors raised while interpreting identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// Text is not a 32 character hex string.
    #[error("invalid binary id hex: {input:?}")]
    InvalidHex {
        /// Offending input.
        input: String,
    },
    /// The value kind cannot serve as an identifier.
    #[error("{kind} cannot be used as an identifier")]
    Unsupported {
        /// Kind of the rejected value.
        kind: &'static str,
    },
}

/// 16-byte identifier used for compounds and light curves, rendered as
/// lowercase hex.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct BinaryId(pub [u8; BINARY_ID_LEN]);

impl BinaryId {
    /// Parses a 32 character hex string (either case).
    pub fn from_hex(text: &str) -> Result<Self, IdError> {
        let invalid = || IdError::InvalidHex {
            input: text.to_owned(),
        };
        let mut out = [0_u8; BINARY_ID_LEN];
        hex::decode_to_slice(text, &mut out).map_err(|_| invalid())?;
        Ok(Self(out))
    }

    /// Lowercase hex rendering.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Returns the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; BINARY_ID_LEN] {
        &self.0
    }

    /// Whether `text` is exactly 32 lowercase hex digits.
    #[must_use]
    pub fn is_canonical_hex(text: &str) -> bool {
        text.len() == BINARY_ID_LEN * 2
            && text
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    }
}

impl fmt::Display for BinaryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for BinaryId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for BinaryId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Identifier of a record or stock.
///
/// Text made of 32 lowercase hex digits is always stored as
/// [`RecordId::Binary`], so a hex string and the binary id it encodes compare
/// equal.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordId {
    /// Integer id (ZTF candids, stock numbers).
    Int(i64),
    /// Free text id.
    Text(Arc<str>),
    /// 16-byte id.
    Binary(BinaryId),
    /// Other byte strings.
    Bytes(Arc<[u8]>),
    /// Structured id (e.g. a content-hash document).
    Doc(FrozenValue),
}

impl RecordId {
    /// Interprets a frozen value as an identifier.
    pub fn from_frozen(value: &FrozenValue) -> Result<Self, IdError> {
        match value {
            FrozenValue::Number(n) => n.as_i64().map(Self::Int).ok_or(IdError::Unsupported {
                kind: "non-integer number",
            }),
            FrozenValue::Text(s) => Ok(Self::resolve(s)),
            FrozenValue::Bytes(b) => Ok(<[u8; BINARY_ID_LEN]>::try_from(&b[..])
                .map_or_else(|_| Self::Bytes(b.clone()), |raw| Self::Binary(BinaryId(raw)))),
            FrozenValue::Seq(_) | FrozenValue::Set(_) | FrozenValue::Map(_) => {
                Ok(Self::Doc(value.clone()))
            }
            FrozenValue::Null | FrozenValue::Bool(_) => Err(IdError::Unsupported {
                kind: value.kind(),
            }),
        }
    }

    /// Canonical id for a lookup key given as text.
    #[must_use]
    pub fn resolve(text: &str) -> Self {
        if BinaryId::is_canonical_hex(text) {
            if let Ok(id) = BinaryId::from_hex(text) {
                return Self::Binary(id);
            }
        }
        Self::Text(Arc::from(text))
    }

    /// Hex form of a binary id.
    #[must_use]
    pub fn to_hex(&self) -> Option<String> {
        match self {
            Self::Binary(id) => Some(id.to_hex()),
            Self::Bytes(b) => Some(hex::encode(b)),
            _ => None,
        }
    }

    /// Integer payload.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Converts back into a frozen value.
    #[must_use]
    pub fn to_frozen(&self) -> FrozenValue {
        match self {
            Self::Int(n) => FrozenValue::from(*n),
            Self::Text(s) => FrozenValue::Text(s.clone()),
            Self::Binary(id) => FrozenValue::bytes(id.0),
            Self::Bytes(b) => FrozenValue::Bytes(b.clone()),
            Self::Doc(doc) => doc.clone(),
        }
    }
}

impl From<i64> for RecordId {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<&str> for RecordId {
    fn from(text: &str) -> Self {
        Self::resolve(text)
    }
}

impl From<BinaryId> for RecordId {
    fn from(id: BinaryId) -> Self {
        Self::Binary(id)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
            Self::Binary(id) => write!(f, "{id}"),
            Self::Bytes(b) => f.write_str(&hex::encode(b)),
            Self::Doc(doc) => write!(f, "{doc}"),
        }
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Int(n) => serializer.serialize_i64(*n),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Binary(id) => id.serialize(serializer),
            Self::Bytes(b) => serializer.serialize_str(&hex::encode(b)),
            Self::Doc(doc) => doc.serialize(serializer),
        }
    }
}

/// Owning object(s) of a record: one stock id or several.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Stock {
    /// A single owner.
    One(RecordId),
    /// Several owners.
    Many(Arc<[RecordId]>),
}

impl Stock {
    /// Reads a stock field; sequences become [`Stock::Many`].
    pub fn from_frozen(value: &FrozenValue) -> Result<Self, IdError> {
        match value.as_seq() {
            Some(items) => items
                .iter()
                .map(RecordId::from_frozen)
                .collect::<Result<Arc<[RecordId]>, _>>()
                .map(Self::Many),
            None => RecordId::from_frozen(value).map(Self::One),
        }
    }

    /// Owner ids in order.
    #[must_use]
    pub fn ids(&self) -> &[RecordId] {
        match self {
            Self::One(id) => std::slice::from_ref(id),
            Self::Many(ids) => ids.as_ref(),
        }
    }

    /// Whether `id` is among the owners.
    #[must_use]
    pub fn contains(&self, id: &RecordId) -> bool {
        self.ids().contains(id)
    }
}

impl From<RecordId> for Stock {
    fn from(id: RecordId) -> Self {
        Self::One(id)
    }
}

impl Serialize for Stock {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::One(id) => id.serialize(serializer),
            Self::Many(ids) => serializer.collect_seq(ids.iter()),
        }
    }
}

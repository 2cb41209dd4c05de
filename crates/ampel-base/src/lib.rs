// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! ampel-base: immutable building blocks shared by every Ampel tier.
//!
//! Raw loader mappings enter through [`freeze`], become [`FrozenValue`] trees
//! and are bound into record types ([`DataPoint`], [`Compound`],
//! [`T2Record`]). Nothing here is mutable once constructed except through the
//! explicit [`Freezable`] guard.
#![forbid(unsafe_code)]

pub mod content;
mod freeze;
mod frozen;
mod ident;
mod logger;
mod path;
mod tags;

/// Deep immutability transform and its inverse.
pub use freeze::{freeze, thaw, FrozenMap, FrozenValue};
/// Freeze guard for mutable-until-frozen objects.
pub use frozen::{Freezable, ImmutabilityError};
/// Identifiers for records and stocks.
pub use ident::{BinaryId, IdError, RecordId, Stock, BINARY_ID_LEN};
/// Unit logger port and its tracing adapter.
pub use logger::{LogLevel, Logger, TracingLogger};
/// Dotted key paths.
pub use path::{KeyPath, PathSegment};
/// Tag enumeration, bitset and registry.
pub use tags::{registry, tag_id, Tag, TagError, TagGroup, TagId, TagRegistry, TagSet, TAG_ID_BYTES};
/// Record types.
pub use content::{Compound, DataPoint, T2Record};

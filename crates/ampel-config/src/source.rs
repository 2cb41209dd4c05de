// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Where configuration trees come from.
//!
//! Parsing config files or database documents belongs to the loader behind
//! this port; the tree only ever sees decoded [`FrozenValue`]s.

use ampel_base::{FrozenValue, ImmutabilityError};
use thiserror::Error;

/// Supplier of configuration trees, keyed by logical name (`"ampel"`,
/// `"channel.HU_RAPID"`, ...).
pub trait ConfigSource {
    /// Tree stored under `key`; `Ok(None)` when the source has none.
    fn fetch(&self, key: &str) -> Result<Option<FrozenValue>, ConfigError>;

    /// Replaces the tree stored under `key`.
    fn store(&self, key: &str, tree: &FrozenValue) -> Result<(), ConfigError>;
}

/// Errors raised by configuration access.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The source failed to read or write.
    #[error("configuration source: {0}")]
    Source(String),
    /// A subtree does not decode into the requested type.
    #[error("cannot decode configuration: {0}")]
    Decode(#[from] serde_json::Error),
    /// Write attempted on a frozen configuration.
    #[error(transparent)]
    ReadOnly(#[from] ImmutabilityError),
    /// The path crosses a scalar or an out-of-range index.
    #[error("cannot set configuration path '{0}'")]
    InvalidPath(String),
}

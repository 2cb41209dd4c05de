// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The Ampel configuration tree.
//!
//! Paths are dotted (`channel.HU_RAPID.sources.0`). Purely numeric segments
//! index sequences and fall back to a string key on mappings. Lookups never
//! fail: a missing segment yields `None`.

use ampel_base::{freeze, thaw, Freezable, FrozenValue, KeyPath};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::source::{ConfigError, ConfigSource};

/// Configuration tree, writable until frozen.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AmpelConfig {
    tree: Freezable<FrozenValue>,
}

impl AmpelConfig {
    /// Writable configuration holding `tree`.
    pub const fn new(tree: FrozenValue) -> Self {
        Self {
            tree: Freezable::new(tree),
        }
    }

    /// Read-only configuration holding `tree`.
    pub const fn frozen(tree: FrozenValue) -> Self {
        Self {
            tree: Freezable::frozen(tree),
        }
    }

    /// Builds a configuration from JSON, frozen when `freeze_it` is set.
    pub fn from_json(value: &serde_json::Value, freeze_it: bool) -> Self {
        let tree = freeze(value);
        if freeze_it {
            Self::frozen(tree)
        } else {
            Self::new(tree)
        }
    }

    /// Loads the tree `source` holds under `key`. A missing or null tree
    /// is `Ok(None)`.
    pub fn load<S: ConfigSource + ?Sized>(
        source: &S,
        key: &str,
        freeze_it: bool,
    ) -> Result<Option<Self>, ConfigError> {
        let tree = match source.fetch(key)? {
            None | Some(FrozenValue::Null) => {
                debug!(key, "no configuration stored");
                return Ok(None);
            }
            Some(tree) => tree,
        };
        Ok(Some(if freeze_it {
            Self::frozen(tree)
        } else {
            Self::new(tree)
        }))
    }

    /// Hands the tree to `source` under `key`.
    pub fn save<S: ConfigSource + ?Sized>(&self, source: &S, key: &str) -> Result<(), ConfigError> {
        source.store(key, self.tree.get())
    }

    /// Whole tree.
    pub const fn tree(&self) -> &FrozenValue {
        self.tree.get()
    }

    /// Value at `path`; the empty path is the whole tree.
    pub fn get(&self, path: &str) -> Option<&FrozenValue> {
        self.tree.get().lookup(&KeyPath::parse(path))
    }

    /// Decodes the subtree at `path` into `T`; `Ok(None)` when absent.
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ConfigError> {
        self.get(path)
            .map(|v| serde_json::from_value(thaw(v)))
            .transpose()
            .map_err(ConfigError::from)
    }

    /// Stores `value` at `path`, creating missing mappings.
    pub fn set(&mut self, path: &str, value: impl Into<FrozenValue>) -> Result<(), ConfigError> {
        let key_path = KeyPath::parse(path);
        let tree = self.tree.try_mut()?;
        let next = tree
            .with_value_at(&key_path, value.into())
            .ok_or_else(|| ConfigError::InvalidPath(path.to_owned()))?;
        *tree = next;
        debug!(path, "configuration updated");
        Ok(())
    }

    /// Makes the configuration read-only.
    pub fn freeze(&mut self) {
        self.tree.freeze();
    }

    /// Whether [`AmpelConfig::freeze`] was called or the configuration was
    /// built frozen.
    pub const fn is_frozen(&self) -> bool {
        self.tree.is_frozen()
    }
}

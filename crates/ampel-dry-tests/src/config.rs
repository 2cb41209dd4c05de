// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory configuration source standing in for the external loader.

use ampel_base::{freeze, FrozenValue};
use ampel_config::{ConfigError, ConfigSource};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// In-memory [`ConfigSource`] with call counters and injectable failures.
///
/// Clones share the same contents, so a test can load through one clone
/// and inspect the other.
///
/// ```
/// use ampel_config::AmpelConfig;
/// use ampel_dry_tests::InMemoryConfigSource;
///
/// let source = InMemoryConfigSource::new();
/// let cfg = AmpelConfig::from_json(&serde_json::json!({"channel": {}}), true);
/// cfg.save(&source, "ampel").unwrap();
/// assert_eq!(source.store_count(), 1);
/// assert!(source.contains_key("ampel"));
/// ```
#[derive(Clone, Default)]
pub struct InMemoryConfigSource {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    trees: BTreeMap<String, FrozenValue>,
    fetch_count: usize,
    store_count: usize,
    fail_on_fetch: bool,
    fail_on_store: bool,
}

impl InMemoryConfigSource {
    /// Empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Source holding `value` (frozen) under `key`.
    pub fn with_json(key: &str, value: &serde_json::Value) -> Self {
        let source = Self::new();
        source.lock().trees.insert(key.to_owned(), freeze(value));
        source
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Makes every subsequent fetch fail.
    pub fn set_fail_on_fetch(&self, fail: bool) {
        self.lock().fail_on_fetch = fail;
    }

    /// Makes every subsequent store fail.
    pub fn set_fail_on_store(&self, fail: bool) {
        self.lock().fail_on_store = fail;
    }

    /// Number of `fetch` attempts, failed ones included.
    pub fn fetch_count(&self) -> usize {
        self.lock().fetch_count
    }

    /// Number of `store` attempts, failed ones included.
    pub fn store_count(&self) -> usize {
        self.lock().store_count
    }

    /// Stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.lock().trees.keys().cloned().collect()
    }

    /// Whether `key` is stored.
    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().trees.contains_key(key)
    }

    /// Tree under `key`, bypassing the counters.
    pub fn tree(&self, key: &str) -> Option<FrozenValue> {
        self.lock().trees.get(key).cloned()
    }
}

impl ConfigSource for InMemoryConfigSource {
    fn fetch(&self, key: &str) -> Result<Option<FrozenValue>, ConfigError> {
        let mut inner = self.lock();
        inner.fetch_count += 1;
        if inner.fail_on_fetch {
            return Err(ConfigError::Source("simulated fetch failure".into()));
        }
        Ok(inner.trees.get(key).cloned())
    }

    fn store(&self, key: &str, tree: &FrozenValue) -> Result<(), ConfigError> {
        let mut inner = self.lock();
        inner.store_count += 1;
        if inner.fail_on_store {
            return Err(ConfigError::Source("simulated store failure".into()));
        }
        inner.trees.insert(key.to_owned(), tree.clone());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn counts_attempts_including_failures() {
        let source = InMemoryConfigSource::new();
        source.store("a", &FrozenValue::Null).unwrap();
        source.set_fail_on_store(true);
        assert!(matches!(
            source.store("b", &FrozenValue::Null),
            Err(ConfigError::Source(_))
        ));
        assert_eq!(source.store_count(), 2);
        assert_eq!(source.keys(), vec!["a"]);
    }

    #[test]
    fn missing_key_and_injected_fetch_failure() {
        let source = InMemoryConfigSource::with_json("ampel", &serde_json::json!({"x": 1}));
        assert_eq!(source.fetch("other").unwrap(), None);
        assert_eq!(
            source.fetch("ampel").unwrap().and_then(|t| t.get("x").cloned()),
            Some(FrozenValue::from(1))
        );
        source.set_fail_on_fetch(true);
        assert!(source.fetch("ampel").is_err());
        assert_eq!(source.fetch_count(), 3);
        assert!(source.tree("ampel").is_some());
    }
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Unit traits: the statically checked counterpart of the interface classes.
//!
//! A Rust unit implements [`AmpelUnit`] plus one tier trait. The compiler
//! enforces what [`crate::ContractChecker`] enforces for runtime-declared
//! classes: every processing method exists with the tier's parameters.
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use ampel_base::{thaw, DataPoint, FrozenMap, FrozenValue, Logger, RecordId};
use ampel_view::{AlertView, ItemView, LightCurve};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// Resolved external resources (catalog endpoints, credentials), keyed by
/// resource name.
pub type Resources = BTreeMap<String, FrozenValue>;

/// Errors raised while building or running a unit.
#[derive(Debug, Error)]
pub enum UnitError {
    /// A declared resource is absent from the resolved mapping.
    #[error("{unit}: required resource '{resource}' was not resolved")]
    MissingResource {
        /// Unit name.
        unit: &'static str,
        /// Resource name.
        resource: &'static str,
    },
    /// The unit settings do not match the unit's config structure.
    #[error("{unit}: invalid configuration: {source}")]
    Config {
        /// Unit name.
        unit: &'static str,
        /// Decoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// The unit rejected its input.
    #[error("{unit}: {reason}")]
    Failed {
        /// Unit name.
        unit: &'static str,
        /// Explanation.
        reason: String,
    },
}

/// Capabilities shared by every unit.
pub trait AmpelUnit: Sized {
    /// Unit name as referenced by channel configurations.
    const NAME: &'static str;

    /// External resources the unit needs, resolved before construction.
    const RESOURCES: &'static [&'static str] = &[];

    /// Unit specific settings, decoded from the configuration tree.
    type Config: DeserializeOwned + Default;

    /// Builds the unit. `resources` holds exactly the entries named in
    /// [`AmpelUnit::RESOURCES`].
    fn new(
        logger: Arc<dyn Logger>,
        config: Self::Config,
        resources: Resources,
    ) -> Result<Self, UnitError>;

    /// Optional version string.
    fn version() -> Option<&'static str> {
        None
    }
}

/// Decodes `config` (absent or null means defaults), checks the declared
/// resources and builds `U`.
pub fn instantiate<U: AmpelUnit>(
    logger: Arc<dyn Logger>,
    config: Option<&FrozenValue>,
    resources: &Resources,
) -> Result<U, UnitError> {
    let config = match config {
        None | Some(FrozenValue::Null) => U::Config::default(),
        Some(raw) => serde_json::from_value(thaw(raw))
            .map_err(|source| UnitError::Config { unit: U::NAME, source })?,
    };
    let mut resolved = Resources::new();
    for &resource in U::RESOURCES {
        let value = resources.get(resource).ok_or(UnitError::MissingResource {
            unit: U::NAME,
            resource,
        })?;
        resolved.insert(resource.to_owned(), value.clone());
    }
    debug!(unit = U::NAME, version = ?U::version(), "instantiating unit");
    U::new(logger, config, resolved)
}

/// T0 alert filter.
pub trait AlertFilter: AmpelUnit {
    /// `None` rejects the alert; otherwise the feature units to schedule.
    fn apply(&mut self, alert: &AlertView) -> Option<BTreeSet<RecordId>>;
}

/// T0 data shaper: turns instrument records into data point mappings.
pub trait DataShaper: AmpelUnit {
    /// Shapes `data_list`, taking each record's id from `id_field_name`.
    fn shape(
        &mut self,
        data_list: &[FrozenValue],
        id_field_name: &str,
    ) -> Result<Vec<FrozenMap>, UnitError>;
}

/// T1 state builder.
pub trait StateBuilder: AmpelUnit {
    /// Compound-shaped mapping for the stock `tran_id` over `photo_data`.
    fn create_state(
        &mut self,
        tran_id: &RecordId,
        photo_data: &[DataPoint],
    ) -> Result<FrozenMap, UnitError>;
}

/// T2 feature unit.
pub trait FeatureUnit: AmpelUnit {
    /// Result mapping for one light curve.
    fn run(
        &mut self,
        light_curve: &LightCurve,
        run_config: Option<&FrozenValue>,
    ) -> Result<FrozenMap, UnitError>;
}

/// T3 reactive unit.
pub trait ReactiveUnit: AmpelUnit {
    /// Processes one chunk of views.
    fn add(&mut self, views: &[ItemView]) -> Result<Vec<JournalUpdate>, UnitError>;

    /// Completion hook, run once per batch.
    fn done(&mut self);

    /// Feeds `views` to [`ReactiveUnit::add`] in chunks of `chunk_size`
    /// (0 means one chunk) and then calls [`ReactiveUnit::done`] exactly
    /// once, also when a chunk fails. The first failure stops the feed and
    /// is returned after the hook ran.
    fn process(
        &mut self,
        views: &[ItemView],
        chunk_size: usize,
    ) -> Result<Vec<JournalUpdate>, UnitError> {
        let size = if chunk_size == 0 {
            views.len().max(1)
        } else {
            chunk_size
        };
        let mut updates = Vec::new();
        let mut outcome = Ok(());
        for chunk in views.chunks(size) {
            match self.add(chunk) {
                Ok(mut produced) => updates.append(&mut produced),
                Err(err) => {
                    outcome = Err(err);
                    break;
                }
            }
        }
        self.done();
        outcome.map(|()| updates)
    }
}

/// What a reactive unit did for one stock, appended to that stock's journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JournalUpdate {
    /// Stock the update belongs to.
    pub stock: RecordId,
    /// Whether the update refers to an external side effect.
    pub ext: bool,
    /// Free-form content.
    pub content: FrozenMap,
}

impl JournalUpdate {
    /// Empty update for `stock`.
    pub fn new(stock: RecordId) -> Self {
        Self {
            stock,
            ext: false,
            content: FrozenMap::new(),
        }
    }

    /// Adds a content entry.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FrozenValue>) -> Self {
        self.content.insert(key.into(), value.into());
        self
    }

    /// Marks the update as describing an external side effect.
    #[must_use]
    pub fn external(mut self) -> Self {
        self.ext = true;
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use ampel_base::{freeze, TracingLogger};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Default, Deserialize)]
    struct CounterConfig {
        #[serde(default)]
        step: u32,
    }

    struct Counter {
        step: u32,
        seen: usize,
        done_calls: usize,
        fail_at: Option<usize>,
    }

    impl AmpelUnit for Counter {
        const NAME: &'static str = "Counter";
        const RESOURCES: &'static [&'static str] = &["db"];
        type Config = CounterConfig;

        fn new(
            _logger: Arc<dyn Logger>,
            config: CounterConfig,
            resources: Resources,
        ) -> Result<Self, UnitError> {
            assert_eq!(resources.len(), 1);
            Ok(Self {
                step: config.step,
                seen: 0,
                done_calls: 0,
                fail_at: None,
            })
        }
    }

    impl ReactiveUnit for Counter {
        fn add(&mut self, views: &[ItemView]) -> Result<Vec<JournalUpdate>, UnitError> {
            if self.fail_at == Some(self.seen) {
                return Err(UnitError::Failed {
                    unit: Self::NAME,
                    reason: "boom".into(),
                });
            }
            self.seen += views.len();
            Ok(views
                .iter()
                .map(|v| JournalUpdate::new(v.stock().clone()).with("step", i64::from(self.step)))
                .collect())
        }

        fn done(&mut self) {
            self.done_calls += 1;
        }
    }

    fn logger() -> Arc<dyn Logger> {
        Arc::new(TracingLogger::new(Counter::NAME))
    }

    fn resources() -> Resources {
        Resources::from([
            ("db".to_owned(), FrozenValue::from("mongodb://localhost")),
            ("unused".to_owned(), FrozenValue::Null),
        ])
    }

    fn views(n: i64) -> Vec<ItemView> {
        (0..n).map(|i| ItemView::builder(RecordId::Int(i)).build()).collect()
    }

    #[test]
    fn config_is_decoded_and_resources_are_narrowed() {
        let cfg = freeze(&json!({"step": 3}));
        let unit: Counter = instantiate(logger(), Some(&cfg), &resources()).unwrap();
        assert_eq!(unit.step, 3);
        let unit: Counter = instantiate(logger(), None, &resources()).unwrap();
        assert_eq!(unit.step, 0);
    }

    #[test]
    fn missing_resource_and_bad_config_fail() {
        assert!(matches!(
            instantiate::<Counter>(logger(), None, &Resources::new()),
            Err(UnitError::MissingResource { resource: "db", .. })
        ));
        let cfg = freeze(&json!({"step": "three"}));
        assert!(matches!(
            instantiate::<Counter>(logger(), Some(&cfg), &resources()),
            Err(UnitError::Config { unit: "Counter", .. })
        ));
    }

    #[test]
    fn process_chunks_and_completes_once() {
        let mut unit: Counter = instantiate(logger(), None, &resources()).unwrap();
        let updates = unit.process(&views(5), 2).unwrap();
        assert_eq!(updates.len(), 5);
        assert_eq!(unit.done_calls, 1);
        assert!(unit.process(&[], 0).unwrap().is_empty());
        assert_eq!(unit.done_calls, 2);
    }

    #[test]
    fn failing_chunk_still_runs_completion_hook() {
        let mut unit: Counter = instantiate(logger(), None, &resources()).unwrap();
        unit.fail_at = Some(2);
        assert!(unit.process(&views(5), 2).is_err());
        assert_eq!(unit.seen, 2);
        assert_eq!(unit.done_calls, 1);
    }
}

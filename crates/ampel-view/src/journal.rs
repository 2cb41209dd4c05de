// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Journal entries and journal queries.
use std::sync::Arc;

use ampel_base::content::schema::{ExtraPolicy, FieldSpec, RecordSchema, SchemaError};
use ampel_base::{freeze, FrozenMap, FrozenValue};
use serde::{Serialize, Serializer};
use time::macros::format_description;
use time::{Duration, OffsetDateTime};

const FIELDS: &[FieldSpec] = &[
    FieldSpec::required("dt"),
    FieldSpec::optional("tier"),
    FieldSpec::optional("processName"),
];

const SCHEMA: RecordSchema = RecordSchema {
    record: "JournalEntry",
    fields: FIELDS,
    extra: ExtraPolicy::Allow,
};

/// One timestamped journal event.
#[derive(Debug, Clone, PartialEq)]
pub struct JournalEntry {
    dt: f64,
    tier: Option<i64>,
    process_name: Option<Arc<str>>,
    raw: Arc<FrozenMap>,
}

impl JournalEntry {
    /// Reads an entry; `dt` (unix seconds) is required, `tier` and
    /// `processName` are optional, other keys are kept.
    pub fn from_raw(raw: &FrozenValue) -> Result<Self, SchemaError> {
        let mut bound = SCHEMA.bind(raw)?;
        let dt = bound.float("dt")?;
        let tier = match bound.optional("tier") {
            None => None,
            Some(v) => Some(v.as_i64().ok_or(SchemaError::InvalidField {
                record: SCHEMA.record,
                field: "tier",
                expected: "an integer",
            })?),
        };
        let process_name = bound.opt_text("processName")?;
        let raw = raw.as_map().cloned().unwrap_or_default();
        Ok(Self {
            dt,
            tier,
            process_name,
            raw: Arc::new(raw),
        })
    }

    /// Same as [`JournalEntry::from_raw`] for JSON input.
    pub fn from_json(raw: &serde_json::Value) -> Result<Self, SchemaError> {
        Self::from_raw(&freeze(raw))
    }

    /// Timestamp (unix seconds).
    pub const fn dt(&self) -> f64 {
        self.dt
    }

    /// Tier that wrote the entry.
    pub const fn tier(&self) -> Option<i64> {
        self.tier
    }

    /// Name of the process that wrote the entry.
    pub fn process_name(&self) -> Option<&str> {
        self.process_name.as_deref()
    }

    /// Any key of the stored entry.
    pub fn get(&self, key: &str) -> Option<&FrozenValue> {
        self.raw.get(key)
    }

    /// Timestamp as a UTC date-time; `None` when out of range.
    pub fn datetime(&self) -> Option<OffsetDateTime> {
        let offset = Duration::checked_seconds_f64(self.dt)?;
        OffsetDateTime::UNIX_EPOCH.checked_add(offset)
    }

    /// Timestamp rendered as `DD/MM/YYYY HH:MM:SS` (UTC).
    pub fn formatted(&self) -> Option<String> {
        let format = format_description!("[day]/[month]/[year] [hour]:[minute]:[second]");
        self.datetime()?.format(&format).ok()
    }
}

impl Serialize for JournalEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

/// Selection of journal entries by tier and process name (both optional,
/// combined with AND).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JournalQuery {
    /// Required tier.
    pub tier: Option<i64>,
    /// Required process name.
    pub process_name: Option<String>,
}

impl JournalQuery {
    /// Matches every entry.
    pub fn all() -> Self {
        Self::default()
    }

    /// Restricts to `tier`.
    #[must_use]
    pub fn tier(mut self, tier: i64) -> Self {
        self.tier = Some(tier);
        self
    }

    /// Restricts to `name`.
    #[must_use]
    pub fn process_name(mut self, name: impl Into<String>) -> Self {
        self.process_name = Some(name.into());
        self
    }

    /// Whether `entry` satisfies every set criterion.
    pub fn matches(&self, entry: &JournalEntry) -> bool {
        self.tier.is_none_or(|t| entry.tier() == Some(t))
            && self
                .process_name
                .as_deref()
                .is_none_or(|p| entry.process_name() == Some(p))
    }
}

/// Entry with the largest timestamp; among equal timestamps the one inserted
/// last wins.
pub fn latest<'a, I>(entries: I) -> Option<&'a JournalEntry>
where
    I: IntoIterator<Item = &'a JournalEntry>,
{
    entries
        .into_iter()
        .max_by(|a, b| a.dt().total_cmp(&b.dt()))
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Feature record: output of a T2 unit run against one compound.
use std::sync::Arc;

use serde::Serialize;

use super::schema::{ExtraPolicy, FieldSpec, RecordSchema, SchemaError};
use crate::freeze::{freeze, FrozenMap, FrozenValue};
use crate::ident::{RecordId, Stock};

const FIELDS: &[FieldSpec] = &[
    FieldSpec::required("id"),
    FieldSpec::required("unit"),
    FieldSpec::required("link"),
    FieldSpec::optional("col"),
    FieldSpec::optional("tags"),
    FieldSpec::required("stock"),
    FieldSpec::required("channels"),
    FieldSpec::required("results"),
    FieldSpec::required("config"),
    FieldSpec::required("state"),
];

/// Schema of [`T2Record`]; unknown keys are discarded.
pub const T2RECORD_SCHEMA: RecordSchema = RecordSchema {
    record: "T2Record",
    fields: FIELDS,
    extra: ExtraPolicy::Ignore,
};

/// Stored output of a feature unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct T2Record {
    id: RecordId,
    unit: RecordId,
    link: RecordId,
    col: Option<Arc<str>>,
    tags: Option<Arc<[FrozenValue]>>,
    stock: Stock,
    channels: Arc<[FrozenValue]>,
    results: Arc<[FrozenValue]>,
    config: Arc<FrozenMap>,
    state: i64,
}

impl T2Record {
    /// Builds a feature record from a raw mapping.
    pub fn from_raw(raw: &FrozenValue) -> Result<Self, SchemaError> {
        let mut bound = T2RECORD_SCHEMA.bind(raw)?;
        Ok(Self {
            id: bound.id("id")?,
            unit: bound.id("unit")?,
            link: bound.id("link")?,
            col: bound.opt_text("col")?,
            tags: bound.opt_seq("tags")?,
            stock: bound.stock("stock")?,
            channels: bound.seq("channels")?,
            results: bound.seq("results")?,
            config: bound.map("config")?,
            state: bound.int("state")?,
        })
    }

    /// Builds a feature record from JSON.
    pub fn from_json(raw: &serde_json::Value) -> Result<Self, SchemaError> {
        Self::from_raw(&freeze(raw))
    }

    /// Record identifier.
    pub const fn id(&self) -> &RecordId {
        &self.id
    }

    /// Identifier of the computing unit (name or number).
    pub const fn unit(&self) -> &RecordId {
        &self.unit
    }

    /// Identifier of the compound the unit ran on.
    pub const fn link(&self) -> &RecordId {
        &self.link
    }

    /// Collection the record was loaded from.
    pub fn col(&self) -> Option<&str> {
        self.col.as_deref()
    }

    /// Tags, if any.
    pub fn tags(&self) -> Option<&[FrozenValue]> {
        self.tags.as_deref()
    }

    /// Owning stock(s).
    pub const fn stock(&self) -> &Stock {
        &self.stock
    }

    /// Channels the record belongs to.
    pub fn channels(&self) -> &[FrozenValue] {
        &self.channels
    }

    /// One payload per historical run, oldest first.
    pub fn results(&self) -> &[FrozenValue] {
        &self.results
    }

    /// Most recent run payload.
    pub fn latest_result(&self) -> Option<&FrozenValue> {
        self.results.last()
    }

    /// Unit configuration snapshot.
    pub fn config(&self) -> &FrozenMap {
        &self.config
    }

    /// Processing state marker.
    pub const fn state(&self) -> i64 {
        self.state
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn results_are_required() {
        let raw = json!({
            "_id": 3,
            "unit": "SNCOSMO",
            "link": "00112233445566778899aabbccddeeff",
            "stock": 1,
            "channels": [],
            "config": {},
            "state": 0
        });
        assert_eq!(
            T2Record::from_json(&raw),
            Err(SchemaError::MissingField {
                record: "T2Record",
                field: "results"
            })
        );
    }

    #[test]
    fn empty_results_bind_without_a_latest_run() {
        let rec = T2Record::from_json(&json!({
            "_id": 3,
            "unit": "SNCOSMO",
            "link": "00112233445566778899aabbccddeeff",
            "stock": 1,
            "channels": [],
            "results": [],
            "config": {},
            "state": 0
        }))
        .unwrap();
        assert!(rec.results().is_empty());
        assert!(rec.latest_result().is_none());
        assert!(rec.col().is_none());
        assert_eq!(rec.unit(), &RecordId::from("SNCOSMO"));
    }

    #[test]
    fn latest_result_is_last_run() {
        let rec = T2Record::from_json(&json!({
            "id": 3, "unit": 5, "link": 9, "stock": 1, "channels": ["A"],
            "results": [{"chi2": 3.0}, {"chi2": 1.0}], "config": {"k": 1}, "state": 1
        }))
        .unwrap();
        assert_eq!(
            rec.latest_result().and_then(|r| r.get("chi2")).and_then(FrozenValue::as_f64),
            Some(1.0)
        );
    }
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Photometric record: one observation.
use std::sync::Arc;

use serde::Serialize;

use super::schema::{ExtraPolicy, FieldSpec, RecordSchema, SchemaError};
use crate::freeze::{freeze, FrozenMap, FrozenValue};
use crate::ident::{RecordId, Stock};
use crate::tags::Tag;

const FIELDS: &[FieldSpec] = &[
    FieldSpec::required("id"),
    FieldSpec::optional("tags"),
    FieldSpec::required("stock"),
    FieldSpec::required("body"),
];

/// Schema of [`DataPoint`]; unknown keys are retained.
pub const DATAPOINT_SCHEMA: RecordSchema = RecordSchema {
    record: "DataPoint",
    fields: FIELDS,
    extra: ExtraPolicy::Allow,
};

/// One detection or upper limit with its instrument-specific body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataPoint {
    id: RecordId,
    tags: Option<Arc<[FrozenValue]>>,
    stock: Stock,
    body: Arc<FrozenMap>,
    #[serde(flatten)]
    extra: FrozenMap,
}

impl DataPoint {
    /// Builds a data point from a raw mapping.
    pub fn from_raw(raw: &FrozenValue) -> Result<Self, SchemaError> {
        let mut bound = DATAPOINT_SCHEMA.bind(raw)?;
        Ok(Self {
            id: bound.id("id")?,
            tags: bound.opt_seq("tags")?,
            stock: bound.stock("stock")?,
            body: bound.map("body")?,
            extra: bound.into_extra(),
        })
    }

    /// Builds a data point from JSON.
    pub fn from_json(raw: &serde_json::Value) -> Result<Self, SchemaError> {
        Self::from_raw(&freeze(raw))
    }

    /// Data point identifier.
    pub const fn id(&self) -> &RecordId {
        &self.id
    }

    /// Tags as stored (names or numeric identities), if any.
    pub fn tags(&self) -> Option<&[FrozenValue]> {
        self.tags.as_deref()
    }

    /// Owning stock(s).
    pub const fn stock(&self) -> &Stock {
        &self.stock
    }

    /// Instrument-specific fields.
    pub fn body(&self) -> &FrozenMap {
        &self.body
    }

    /// Body field lookup.
    pub fn get(&self, field: &str) -> Option<&FrozenValue> {
        self.body.get(field)
    }

    /// Unknown keys retained at construction.
    pub const fn extra(&self) -> &FrozenMap {
        &self.extra
    }

    /// Whether `tag` is attached, by name or by numeric identity.
    pub fn has_tag(&self, tag: Tag) -> bool {
        let id = tag.id().0;
        self.tags().is_some_and(|tags| {
            tags.iter()
                .any(|t| t.as_str() == Some(tag.name()) || t.as_u64() == Some(id))
        })
    }

    /// Whether this point is a non-detection.
    pub fn is_upper_limit(&self) -> bool {
        self.has_tag(Tag::Upperlimit)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn underscore_id_binds_to_id() {
        let dp = DataPoint::from_json(&json!({"_id": 7, "stock": 1, "body": {}})).unwrap();
        assert_eq!(dp.id(), &RecordId::Int(7));
        assert!(dp.tags().is_none());
        assert!(dp.extra().is_empty());
    }

    #[test]
    fn unknown_keys_are_retained() {
        let dp = DataPoint::from_json(
            &json!({"id": 1, "stock": 2, "body": {"magpsf": 18.5}, "excl": ["a"]}),
        )
        .unwrap();
        assert_eq!(
            dp.extra().get("excl"),
            Some(&FrozenValue::seq([FrozenValue::from("a")]))
        );
        assert_eq!(dp.get("magpsf").and_then(FrozenValue::as_f64), Some(18.5));
    }

    #[test]
    fn upper_limit_detected_by_name_or_id() {
        let by_name = DataPoint::from_json(
            &json!({"id": -1, "stock": 2, "body": {}, "tags": ["UPPERLIMIT"]}),
        )
        .unwrap();
        let by_id = DataPoint::from_json(
            &json!({"id": -2, "stock": 2, "body": {}, "tags": [Tag::Upperlimit.id().0]}),
        )
        .unwrap();
        assert!(by_name.is_upper_limit());
        assert!(by_id.is_upper_limit());
    }

    #[test]
    fn body_must_be_a_mapping() {
        let err = DataPoint::from_json(&json!({"id": 1, "stock": 2, "body": 3})).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::InvalidField { field: "body", .. }
        ));
    }

    #[test]
    fn serializes_extras_inline() {
        let dp = DataPoint::from_json(&json!({"id": 1, "stock": 2, "body": {}, "x": 1})).unwrap();
        assert_eq!(
            serde_json::to_value(&dp).unwrap(),
            json!({"id": 1, "tags": null, "stock": 2, "body": {}, "x": 1})
        );
    }
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Declarative field schemas for record construction.
//!
//! A [`RecordSchema`] lists the declared fields of one record kind, whether
//! each is required, optional or defaulted, and what happens to unknown input
//! keys. [`RecordSchema::bind`] applies the binding rules to a raw mapping:
//!
//! 1. A raw `_id` key binds to the canonical `id` field; an explicit `id` key
//!    wins over the alias.
//! 2. Each declared field takes the input value when present; otherwise an
//!    optional field binds to absent, a defaulted field to its default, and a
//!    required field fails with [`SchemaError::MissingField`].
//! 3. Leftover keys are retained or discarded according to [`ExtraPolicy`].

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use crate::freeze::{FrozenMap, FrozenValue};
use crate::ident::{RecordId, Stock};

/// Raw key accepted as an alias for the `id` field.
pub const ID_ALIAS: &str = "_id";

/// Errors raised while binding a raw mapping to a record schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Input was not a mapping.
    #[error("{record}: expected a mapping, found {found}")]
    NotAMapping {
        /// Record kind being constructed.
        record: &'static str,
        /// Kind of the value received.
        found: &'static str,
    },
    /// A required field had no value and no default.
    #[error("{record}: value missing for field '{field}'")]
    MissingField {
        /// Record kind being constructed.
        record: &'static str,
        /// Missing field name.
        field: &'static str,
    },
    /// A field value had the wrong shape.
    #[error("{record}: field '{field}' must be {expected}")]
    InvalidField {
        /// Record kind being constructed.
        record: &'static str,
        /// Offending field name.
        field: &'static str,
        /// Human readable description of the accepted shape.
        expected: &'static str,
    },
}

/// How a declared field behaves when the input omits it.
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    /// Omission is an error.
    Required,
    /// Omission binds to absent.
    Optional,
    /// Omission binds to the produced default.
    Default(fn() -> FrozenValue),
}

/// One declared field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Field name as it appears in raw input.
    pub name: &'static str,
    /// Omission behaviour.
    pub kind: FieldKind,
}

impl FieldSpec {
    /// A required field.
    #[must_use]
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Required,
        }
    }

    /// An optional field.
    #[must_use]
    pub const fn optional(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Optional,
        }
    }

    /// A field with a default.
    #[must_use]
    pub const fn with_default(name: &'static str, default: fn() -> FrozenValue) -> Self {
        Self {
            name,
            kind: FieldKind::Default(default),
        }
    }
}

/// Treatment of input keys that match no declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtraPolicy {
    /// Keep them for later access.
    Allow,
    /// Drop them silently.
    Ignore,
}

/// Declared shape of a record kind.
#[derive(Debug, Clone, Copy)]
pub struct RecordSchema {
    /// Record kind name used in errors.
    pub record: &'static str,
    /// Declared fields in order.
    pub fields: &'static [FieldSpec],
    /// Unknown key policy.
    pub extra: ExtraPolicy,
}

impl RecordSchema {
    /// Binds `raw` to this schema.
    pub fn bind(&self, raw: &FrozenValue) -> Result<BoundRecord, SchemaError> {
        let input = raw.as_map().ok_or(SchemaError::NotAMapping {
            record: self.record,
            found: raw.kind(),
        })?;
        let mut fields = BTreeMap::new();
        for spec in self.fields {
            let given = match input.get(spec.name) {
                None if spec.name == "id" => input.get(ID_ALIAS),
                found => found,
            };
            let value = match (given, spec.kind) {
                (Some(v), _) => v.clone(),
                (None, FieldKind::Optional) => FrozenValue::Null,
                (None, FieldKind::Default(make)) => make(),
                (None, FieldKind::Required) => {
                    return Err(SchemaError::MissingField {
                        record: self.record,
                        field: spec.name,
                    })
                }
            };
            fields.insert(spec.name, value);
        }
        let extra = match self.extra {
            ExtraPolicy::Ignore => FrozenMap::new(),
            ExtraPolicy::Allow => input
                .iter()
                .filter(|(k, _)| {
                    k.as_str() != ID_ALIAS && !self.fields.iter().any(|f| f.name == k.as_str())
                })
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        };
        Ok(BoundRecord {
            record: self.record,
            fields,
            extra,
        })
    }
}

/// Field values bound by [`RecordSchema::bind`], consumed by typed getters.
#[derive(Debug, Clone)]
pub struct BoundRecord {
    record: &'static str,
    fields: BTreeMap<&'static str, FrozenValue>,
    extra: FrozenMap,
}

impl BoundRecord {
    fn invalid(&self, field: &'static str, expected: &'static str) -> SchemaError {
        SchemaError::InvalidField {
            record: self.record,
            field,
            expected,
        }
    }

    /// Removes and returns a field value (`Null` when absent).
    pub fn take(&mut self, field: &'static str) -> FrozenValue {
        self.fields.remove(field).unwrap_or_default()
    }

    /// Removes a field, mapping `Null` to `None`.
    pub fn optional(&mut self, field: &'static str) -> Option<FrozenValue> {
        Some(self.take(field)).filter(|v| !v.is_null())
    }

    /// Reads an identifier field.
    pub fn id(&mut self, field: &'static str) -> Result<RecordId, SchemaError> {
        let value = self.take(field);
        RecordId::from_frozen(&value).map_err(|_| self.invalid(field, "an identifier"))
    }

    /// Reads a stock field (one id or a sequence of ids).
    pub fn stock(&mut self, field: &'static str) -> Result<Stock, SchemaError> {
        let value = self.take(field);
        Stock::from_frozen(&value).map_err(|_| self.invalid(field, "a stock id or list of ids"))
    }

    /// Reads a sequence field.
    pub fn seq(&mut self, field: &'static str) -> Result<Arc<[FrozenValue]>, SchemaError> {
        match self.take(field) {
            FrozenValue::Seq(items) => Ok(items),
            _ => Err(self.invalid(field, "a sequence")),
        }
    }

    /// Reads an optional sequence field.
    pub fn opt_seq(
        &mut self,
        field: &'static str,
    ) -> Result<Option<Arc<[FrozenValue]>>, SchemaError> {
        match self.take(field) {
            FrozenValue::Null => Ok(None),
            FrozenValue::Seq(items) => Ok(Some(items)),
            _ => Err(self.invalid(field, "a sequence or null")),
        }
    }

    /// Reads a mapping field.
    pub fn map(&mut self, field: &'static str) -> Result<Arc<FrozenMap>, SchemaError> {
        match self.take(field) {
            FrozenValue::Map(entries) => Ok(entries),
            _ => Err(self.invalid(field, "a mapping")),
        }
    }

    /// Reads a numeric field as `f64`.
    pub fn float(&mut self, field: &'static str) -> Result<f64, SchemaError> {
        let value = self.take(field);
        value.as_f64().ok_or_else(|| self.invalid(field, "a number"))
    }

    /// Reads an integer field.
    pub fn int(&mut self, field: &'static str) -> Result<i64, SchemaError> {
        let value = self.take(field);
        value.as_i64().ok_or_else(|| self.invalid(field, "an integer"))
    }

    /// Reads an optional text field.
    pub fn opt_text(&mut self, field: &'static str) -> Result<Option<Arc<str>>, SchemaError> {
        match self.take(field) {
            FrozenValue::Null => Ok(None),
            FrozenValue::Text(s) => Ok(Some(s)),
            _ => Err(self.invalid(field, "text or null")),
        }
    }

    /// Unknown keys retained under [`ExtraPolicy::Allow`].
    pub fn into_extra(self) -> FrozenMap {
        self.extra
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::freeze::freeze;
    use serde_json::json;

    const FIELDS: &[FieldSpec] = &[
        FieldSpec::required("id"),
        FieldSpec::optional("note"),
        FieldSpec::with_default("count", || FrozenValue::from(3)),
    ];

    const SCHEMA: RecordSchema = RecordSchema {
        record: "Sample",
        fields: FIELDS,
        extra: ExtraPolicy::Allow,
    };

    #[test]
    fn explicit_id_wins_over_alias() {
        let mut bound = SCHEMA.bind(&freeze(&json!({"_id": 1, "id": 2}))).unwrap();
        assert_eq!(bound.take("id"), FrozenValue::from(2));
        assert!(bound.into_extra().is_empty());
    }

    #[test]
    fn optional_and_default_fill_in() {
        let mut bound = SCHEMA.bind(&freeze(&json!({"_id": 1, "x": true}))).unwrap();
        assert_eq!(bound.optional("note"), None);
        assert_eq!(bound.int("count").unwrap(), 3);
        assert_eq!(
            bound.into_extra().get("x"),
            Some(&FrozenValue::Bool(true))
        );
    }

    #[test]
    fn missing_required_field_is_named() {
        let err = SCHEMA.bind(&freeze(&json!({"note": "n"}))).unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingField {
                record: "Sample",
                field: "id"
            }
        );
        assert_eq!(err.to_string(), "Sample: value missing for field 'id'");
    }

    #[test]
    fn non_mapping_input_is_rejected() {
        assert!(matches!(
            SCHEMA.bind(&freeze(&json!([1]))),
            Err(SchemaError::NotAMapping { found: "sequence", .. })
        ));
    }
}

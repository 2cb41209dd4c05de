// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Compound: an ordered grouping of data point references (a state).
use std::sync::Arc;

use serde::Serialize;

use super::schema::{ExtraPolicy, FieldSpec, RecordSchema, SchemaError};
use crate::freeze::{freeze, FrozenValue};
use crate::ident::{RecordId, Stock};

const FIELDS: &[FieldSpec] = &[
    FieldSpec::required("id"),
    FieldSpec::optional("tags"),
    FieldSpec::required("stock"),
    FieldSpec::required("channels"),
    FieldSpec::required("data"),
    FieldSpec::required("added"),
    FieldSpec::required("tier"),
    FieldSpec::required("len"),
];

/// Schema of [`Compound`]; unknown keys are discarded.
pub const COMPOUND_SCHEMA: RecordSchema = RecordSchema {
    record: "Compound",
    fields: FIELDS,
    extra: ExtraPolicy::Ignore,
};

/// State of a stock produced at some tier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Compound {
    id: RecordId,
    tags: Option<Arc<[FrozenValue]>>,
    stock: Stock,
    channels: Arc<[FrozenValue]>,
    data: Arc<[FrozenValue]>,
    added: f64,
    tier: i64,
    len: i64,
}

impl Compound {
    /// Builds a compound from a raw mapping.
    pub fn from_raw(raw: &FrozenValue) -> Result<Self, SchemaError> {
        let mut bound = COMPOUND_SCHEMA.bind(raw)?;
        Ok(Self {
            id: bound.id("id")?,
            tags: bound.opt_seq("tags")?,
            stock: bound.stock("stock")?,
            channels: bound.seq("channels")?,
            data: bound.seq("data")?,
            added: bound.float("added")?,
            tier: bound.int("tier")?,
            len: bound.int("len")?,
        })
    }

    /// Builds a compound from JSON.
    pub fn from_json(raw: &serde_json::Value) -> Result<Self, SchemaError> {
        Self::from_raw(&freeze(raw))
    }

    /// Compound identifier (usually a 16-byte content hash).
    pub const fn id(&self) -> &RecordId {
        &self.id
    }

    /// Tags, if any.
    pub fn tags(&self) -> Option<&[FrozenValue]> {
        self.tags.as_deref()
    }

    /// Owning stock(s).
    pub const fn stock(&self) -> &Stock {
        &self.stock
    }

    /// Channels the compound belongs to.
    pub fn channels(&self) -> &[FrozenValue] {
        &self.channels
    }

    /// Grouping entries in order; each usually references a data point id.
    pub fn data(&self) -> &[FrozenValue] {
        &self.data
    }

    /// Data point ids referenced by the entries (`id` key of each entry).
    pub fn datapoint_ids(&self) -> impl Iterator<Item = RecordId> + '_ {
        self.data
            .iter()
            .filter_map(|entry| entry.get("id"))
            .filter_map(|id| RecordId::from_frozen(id).ok())
    }

    /// Creation timestamp (unix seconds).
    pub const fn added(&self) -> f64 {
        self.added
    }

    /// Tier that produced the compound.
    pub const fn tier(&self) -> i64 {
        self.tier
    }

    /// Declared number of entries.
    pub const fn len(&self) -> i64 {
        self.len
    }

    /// Whether the compound declares no entries.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

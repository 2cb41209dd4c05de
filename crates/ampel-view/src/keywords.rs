// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Keyword translation tables (semantic name to instrument field).
use std::collections::BTreeMap;
use std::sync::Arc;

use ampel_base::FrozenValue;
use serde::Serialize;

/// Maps semantic field names (`mag`, `obs_date`) to the keys used by an
/// instrument's records (`magpsf`, `jd`). Names without an entry pass through
/// unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct KeywordMap(Arc<BTreeMap<String, String>>);

impl KeywordMap {
    /// A table that translates nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Default table for ZTF alerts distributed by IPAC.
    #[must_use]
    pub fn ztf_ipac() -> Self {
        Self::from_pairs([
            ("obsDate", "jd"),
            ("obs_date", "jd"),
            ("filter_id", "fid"),
            ("mag", "magpsf"),
            ("maglim", "diffmaglim"),
            ("magerr", "sigmapsf"),
            ("ra", "ra"),
            ("dec", "dec"),
            ("transient_id", "objectId"),
            ("photopoint_id", "candid"),
        ])
    }

    /// Builds a table from `(semantic, raw)` pairs.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        Self(Arc::new(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect(),
        ))
    }

    /// Reads a table from a frozen mapping of text values; non-text entries
    /// are skipped. Returns `None` when `value` is not a mapping.
    pub fn from_frozen(value: &FrozenValue) -> Option<Self> {
        let map = value.as_map()?;
        Some(Self(Arc::new(
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|raw| (k.clone(), raw.to_owned())))
                .collect(),
        )))
    }

    /// Raw key for `name`.
    pub fn translate<'a>(&'a self, name: &'a str) -> &'a str {
        self.0.get(name).map_or(name, String::as_str)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

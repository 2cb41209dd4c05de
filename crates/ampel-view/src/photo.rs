// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Query surface shared by the alert and light-curve views.
use ampel_base::{DataPoint, FrozenValue};

use crate::filter::Filters;
use crate::keywords::KeywordMap;

/// A record exposing named photometric fields.
pub trait Photometry {
    /// Raw field lookup (no keyword translation).
    fn field(&self, name: &str) -> Option<&FrozenValue>;

    /// Field lookup after keyword translation.
    fn get_value<'a>(&'a self, name: &str, keywords: &KeywordMap) -> Option<&'a FrozenValue> {
        self.field(keywords.translate(name))
    }

    /// Both fields, or `None` if either is missing.
    fn get_tuple<'a>(
        &'a self,
        first: &str,
        second: &str,
        keywords: &KeywordMap,
    ) -> Option<(&'a FrozenValue, &'a FrozenValue)> {
        Some((
            self.get_value(first, keywords)?,
            self.get_value(second, keywords)?,
        ))
    }

    /// Whether the (translated) field is present.
    fn has_parameter(&self, name: &str, keywords: &KeywordMap) -> bool {
        self.get_value(name, keywords).is_some()
    }
}

impl Photometry for FrozenValue {
    fn field(&self, name: &str) -> Option<&FrozenValue> {
        self.get(name)
    }
}

impl Photometry for DataPoint {
    fn field(&self, name: &str) -> Option<&FrozenValue> {
        self.get(name)
    }
}

/// Views holding detections ("points") and non-detections ("limits").
///
/// Either category may be absent when the loader did not fetch it. Every
/// accessor then answers `None`, so "not loaded" never reads as "loaded,
/// nothing qualified". Over a loaded category an accessor selects the
/// records passing all filters, then skips records missing a requested
/// field.
pub trait PhotoQuery {
    /// Record type held by the view.
    type Record: Photometry;

    /// Detections in view order, `None` when they were not loaded.
    fn points(&self) -> Option<&[Self::Record]>;

    /// Non-detections, `None` when they were not loaded.
    fn limits(&self) -> Option<&[Self::Record]>;

    /// Keyword table used to translate field names.
    fn keywords(&self) -> &KeywordMap;

    /// Records of the requested category passing `filters`.
    fn select(&self, filters: Option<&Filters>, want_limits: bool) -> Option<Vec<&Self::Record>> {
        let source = if want_limits {
            self.limits()?
        } else {
            self.points()?
        };
        let keywords = self.keywords();
        Some(
            source
                .iter()
                .filter(|r| filters.is_none_or(|f| f.matches(*r, keywords)))
                .collect(),
        )
    }

    /// Detections passing `filters`.
    fn get_photopoints(&self, filters: Option<&Filters>) -> Option<Vec<&Self::Record>> {
        self.select(filters, false)
    }

    /// Non-detections passing `filters`.
    fn get_upperlimits(&self, filters: Option<&Filters>) -> Option<Vec<&Self::Record>> {
        self.select(filters, true)
    }

    /// Values of `field` from every selected record having it.
    fn get_values(
        &self,
        field: &str,
        filters: Option<&Filters>,
        want_limits: bool,
    ) -> Option<Vec<&FrozenValue>> {
        let keywords = self.keywords();
        Some(
            self.select(filters, want_limits)?
                .into_iter()
                .filter_map(|r| r.get_value(field, keywords))
                .collect(),
        )
    }

    /// `(first, second)` pairs from every selected record having both.
    fn get_tuples(
        &self,
        first: &str,
        second: &str,
        filters: Option<&Filters>,
        want_limits: bool,
    ) -> Option<Vec<(&FrozenValue, &FrozenValue)>> {
        let keywords = self.keywords();
        Some(
            self.select(filters, want_limits)?
                .into_iter()
                .filter_map(|r| r.get_tuple(first, second, keywords))
                .collect(),
        )
    }

    /// One tuple of `fields` per selected record having all of them.
    fn get_ntuples(
        &self,
        fields: &[&str],
        filters: Option<&Filters>,
        want_limits: bool,
    ) -> Option<Vec<Vec<&FrozenValue>>> {
        let keywords = self.keywords();
        Some(
            self.select(filters, want_limits)?
                .into_iter()
                .filter_map(|r| {
                    fields
                        .iter()
                        .map(|f| r.get_value(f, keywords))
                        .collect::<Option<Vec<_>>>()
                })
                .collect(),
        )
    }
}

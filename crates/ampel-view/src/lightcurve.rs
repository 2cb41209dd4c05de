// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Light-curve view: the data points referenced by one compound.
use std::str::FromStr;
use std::sync::Arc;

use ampel_base::{DataPoint, FrozenMap, RecordId};
use serde::Serialize;

use crate::filter::{FilterError, Filters};
use crate::keywords::KeywordMap;
use crate::photo::{PhotoQuery, Photometry};

/// Sky position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    /// Right ascension.
    pub ra: f64,
    /// Declination.
    pub dec: f64,
}

/// Which position [`LightCurve::get_pos`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PosMode {
    /// Every selected position, in view order.
    Raw,
    /// Arithmetic mean of the selected positions.
    Mean,
    /// Position of the point with the largest magnitude value; among equal
    /// magnitudes the one appearing last wins.
    #[default]
    Brightest,
    /// Position of the point with the largest observation date; ties go to
    /// the one appearing last.
    Latest,
}

impl FromStr for PosMode {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(Self::Raw),
            "mean" => Ok(Self::Mean),
            "brightest" => Ok(Self::Brightest),
            "latest" => Ok(Self::Latest),
            _ => Err(FilterError::Malformed(
                "position mode must be raw, mean, brightest or latest",
            )),
        }
    }
}

/// Photometry of one compound.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LightCurve {
    id: RecordId,
    points: Arc<[DataPoint]>,
    limits: Arc<[DataPoint]>,
    info: Option<Arc<FrozenMap>>,
    #[serde(skip)]
    keywords: KeywordMap,
}

impl LightCurve {
    /// Builds a light curve with the ZTF-IPAC keyword table.
    pub fn new(
        id: RecordId,
        points: impl Into<Arc<[DataPoint]>>,
        limits: impl Into<Arc<[DataPoint]>>,
    ) -> Self {
        Self {
            id,
            points: points.into(),
            limits: limits.into(),
            info: None,
            keywords: KeywordMap::ztf_ipac(),
        }
    }

    /// Splits `datapoints` into detections and upper limits by tag.
    pub fn from_datapoints(id: RecordId, datapoints: impl IntoIterator<Item = DataPoint>) -> Self {
        let (limits, points): (Vec<_>, Vec<_>) = datapoints
            .into_iter()
            .partition(DataPoint::is_upper_limit);
        Self::new(id, points, limits)
    }

    /// Attaches provenance info (`added`, `tier`, ...).
    #[must_use]
    pub fn with_info(mut self, info: FrozenMap) -> Self {
        self.info = Some(Arc::new(info));
        self
    }

    /// Replaces the keyword table.
    #[must_use]
    pub fn with_keywords(mut self, keywords: KeywordMap) -> Self {
        self.keywords = keywords;
        self
    }

    /// Compound identifier.
    pub const fn id(&self) -> &RecordId {
        &self.id
    }

    /// Provenance info.
    pub fn info(&self) -> Option<&FrozenMap> {
        self.info.as_deref()
    }

    fn position(&self, dp: &DataPoint) -> Option<Position> {
        let (ra, dec) = dp.get_tuple("ra", "dec", &self.keywords)?;
        Some(Position {
            ra: ra.as_f64()?,
            dec: dec.as_f64()?,
        })
    }

    fn last_max_by_field(&self, field: &str, filters: Option<&Filters>) -> Option<Position> {
        self.select(filters, false)?
            .into_iter()
            .filter_map(|dp| {
                let key = dp.get_value(field, &self.keywords)?.as_f64()?;
                Some((key, self.position(dp)?))
            })
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, pos)| pos)
    }

    /// Every selected detection position.
    pub fn positions(&self, filters: Option<&Filters>) -> Vec<Position> {
        self.select(filters, false)
            .into_iter()
            .flatten()
            .filter_map(|dp| self.position(dp))
            .collect()
    }

    /// Mean of the selected positions.
    pub fn mean_position(&self, filters: Option<&Filters>) -> Option<Position> {
        let all = self.positions(filters);
        if all.is_empty() {
            return None;
        }
        let n = f64::from(u32::try_from(all.len()).ok()?);
        let (ra, dec) = all
            .iter()
            .fold((0.0, 0.0), |(ra, dec), p| (ra + p.ra, dec + p.dec));
        Some(Position {
            ra: ra / n,
            dec: dec / n,
        })
    }

    /// Position of the detection with the largest magnitude value.
    pub fn brightest_position(&self, filters: Option<&Filters>) -> Option<Position> {
        self.last_max_by_field("mag", filters)
    }

    /// Position of the most recent detection.
    pub fn latest_position(&self, filters: Option<&Filters>) -> Option<Position> {
        self.last_max_by_field("obs_date", filters)
    }

    /// Positional query. [`PosMode::Raw`] returns every position; the other
    /// modes return at most one.
    pub fn get_pos(&self, mode: PosMode, filters: Option<&Filters>) -> Vec<Position> {
        match mode {
            PosMode::Raw => self.positions(filters),
            PosMode::Mean => self.mean_position(filters).into_iter().collect(),
            PosMode::Brightest => self.brightest_position(filters).into_iter().collect(),
            PosMode::Latest => self.latest_position(filters).into_iter().collect(),
        }
    }
}

impl PhotoQuery for LightCurve {
    type Record = DataPoint;

    fn points(&self) -> Option<&[DataPoint]> {
        Some(&self.points)
    }

    fn limits(&self) -> Option<&[DataPoint]> {
        Some(&self.limits)
    }

    fn keywords(&self) -> &KeywordMap {
        &self.keywords
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dp(id: i64, body: serde_json::Value) -> DataPoint {
        DataPoint::from_json(&json!({"id": id, "stock": 1, "body": body})).unwrap()
    }

    fn curve() -> LightCurve {
        LightCurve::new(
            RecordId::Int(0),
            vec![
                dp(1, json!({"magpsf": 19.0, "jd": 1.0, "ra": 10.0, "dec": 1.0})),
                dp(2, json!({"magpsf": 19.0, "jd": 3.0, "ra": 12.0, "dec": 3.0})),
                dp(3, json!({"magpsf": 18.0, "jd": 2.0, "ra": 14.0, "dec": 5.0})),
            ],
            Vec::<DataPoint>::new(),
        )
    }

    #[test]
    fn brightest_ties_go_to_the_later_point() {
        assert_eq!(
            curve().brightest_position(None),
            Some(Position { ra: 12.0, dec: 3.0 })
        );
    }

    #[test]
    fn latest_uses_observation_date() {
        assert_eq!(
            curve().get_pos(PosMode::Latest, None),
            vec![Position { ra: 12.0, dec: 3.0 }]
        );
    }

    #[test]
    fn mean_and_raw() {
        let lc = curve();
        assert_eq!(lc.get_pos(PosMode::Raw, None).len(), 3);
        assert_eq!(
            lc.mean_position(None),
            Some(Position { ra: 12.0, dec: 3.0 })
        );
        let bright =
            Filters::from_json(&json!({"attribute": "mag", "operator": "<", "value": 18.5}))
                .unwrap();
        assert_eq!(
            lc.mean_position(Some(&bright)),
            Some(Position { ra: 14.0, dec: 5.0 })
        );
        let none = Filters::from_json(&json!({"attribute": "mag", "operator": ">", "value": 30}))
            .unwrap();
        assert_eq!(lc.mean_position(Some(&none)), None);
    }

    #[test]
    fn upper_limits_are_split_by_tag() {
        let lc = LightCurve::from_datapoints(
            RecordId::Int(0),
            [
                dp(1, json!({"magpsf": 19.0})),
                DataPoint::from_json(&json!({
                    "id": -1, "stock": 1, "tags": ["UPPERLIMIT"], "body": {"diffmaglim": 20.5}
                }))
                .unwrap(),
            ],
        );
        assert_eq!(lc.get_photopoints(None).as_ref().map(Vec::len), Some(1));
        assert_eq!(
            lc.get_values("maglim", None, true)
                .unwrap()
                .into_iter()
                .filter_map(ampel_base::FrozenValue::as_f64)
                .collect::<Vec<_>>(),
            vec![20.5]
        );
        assert_eq!("mean".parse::<PosMode>(), Ok(PosMode::Mean));
    }
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! One small unit per tier, used to exercise the unit traits end to end.

use std::collections::BTreeSet;
use std::sync::Arc;

use ampel_abstract::{
    AlertFilter, AmpelUnit, DataShaper, FeatureUnit, JournalUpdate, ReactiveUnit, Resources,
    StateBuilder, UnitError,
};
use ampel_base::{BinaryId, DataPoint, FrozenMap, FrozenValue, Logger, RecordId, Tag, BINARY_ID_LEN};
use ampel_view::{AlertView, Filter, Filters, ItemView, LightCurve, Operator, PhotoQuery};
use serde::Deserialize;

/// Settings of [`MagnitudeFilter`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MagnitudeFilterConfig {
    /// Detections must be brighter (numerically smaller) than this.
    pub max_mag: f64,
    /// Minimum number of qualifying detections.
    pub min_detections: usize,
    /// Feature units scheduled for accepted alerts.
    pub schedule: Vec<String>,
}

impl Default for MagnitudeFilterConfig {
    fn default() -> Self {
        Self {
            max_mag: 19.5,
            min_detections: 1,
            schedule: Vec::new(),
        }
    }
}

/// Accepts alerts with enough bright detections.
pub struct MagnitudeFilter {
    logger: Arc<dyn Logger>,
    config: MagnitudeFilterConfig,
}

impl AmpelUnit for MagnitudeFilter {
    const NAME: &'static str = "MagnitudeFilter";
    type Config = MagnitudeFilterConfig;

    fn new(logger: Arc<dyn Logger>, config: Self::Config, _: Resources) -> Result<Self, UnitError> {
        Ok(Self { logger, config })
    }

    fn version() -> Option<&'static str> {
        Some("0.1")
    }
}

impl AlertFilter for MagnitudeFilter {
    fn apply(&mut self, alert: &AlertView) -> Option<BTreeSet<RecordId>> {
        let bright = Filters::from(Filter::new("mag", Operator::Lt, self.config.max_mag));
        let n = alert
            .get_photopoints(Some(&bright))
            .as_ref()
            .map_or(0, Vec::len);
        if n < self.config.min_detections {
            self.logger
                .info(&format!("rejected {}: {n} bright detections", alert.id()));
            return None;
        }
        Some(
            self.config
                .schedule
                .iter()
                .map(|unit| RecordId::from(unit.as_str()))
                .collect(),
        )
    }
}

/// Turns ZTF candidates into data point mappings (without `stock`, which the
/// ingester adds).
pub struct ZtfShaper;

impl AmpelUnit for ZtfShaper {
    const NAME: &'static str = "ZtfShaper";
    type Config = ();

    fn new(_: Arc<dyn Logger>, (): (), _: Resources) -> Result<Self, UnitError> {
        Ok(Self)
    }
}

impl DataShaper for ZtfShaper {
    fn shape(
        &mut self,
        data_list: &[FrozenValue],
        id_field_name: &str,
    ) -> Result<Vec<FrozenMap>, UnitError> {
        data_list
            .iter()
            .map(|record| {
                let body = record.as_map().ok_or_else(|| UnitError::Failed {
                    unit: Self::NAME,
                    reason: format!("expected a mapping, found {}", record.kind()),
                })?;
                let (id, tag) = match record.get(id_field_name) {
                    Some(id) if !id.is_null() => (id.clone(), Tag::Photopoint),
                    _ => {
                        let jd = record.get("jd").cloned().unwrap_or_default();
                        let fid = record.get("fid").cloned().unwrap_or_default();
                        (FrozenValue::from(format!("ul:{jd}:{fid}")), Tag::Upperlimit)
                    }
                };
                Ok(FrozenMap::from([
                    ("id".to_owned(), id),
                    ("tags".to_owned(), FrozenValue::seq([FrozenValue::from(tag.name())])),
                    ("body".to_owned(), FrozenValue::from(body.clone())),
                ]))
            })
            .collect()
    }
}

/// Settings of [`SimpleStateBuilder`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SimpleStateBuilderConfig {
    /// Channels stamped on every compound.
    pub channels: Vec<String>,
}

/// Groups all data points of a stock into one compound whose id hashes the
/// stock and the sorted data point ids.
pub struct SimpleStateBuilder {
    config: SimpleStateBuilderConfig,
}

impl AmpelUnit for SimpleStateBuilder {
    const NAME: &'static str = "SimpleStateBuilder";
    type Config = SimpleStateBuilderConfig;

    fn new(_: Arc<dyn Logger>, config: Self::Config, _: Resources) -> Result<Self, UnitError> {
        Ok(Self { config })
    }
}

impl StateBuilder for SimpleStateBuilder {
    fn create_state(
        &mut self,
        tran_id: &RecordId,
        photo_data: &[DataPoint],
    ) -> Result<FrozenMap, UnitError> {
        let mut ids: Vec<&RecordId> = photo_data.iter().map(DataPoint::id).collect();
        ids.sort();
        let mut hasher = blake3::Hasher::new();
        hasher.update(tran_id.to_string().as_bytes());
        for id in &ids {
            hasher.update(b"/");
            hasher.update(id.to_string().as_bytes());
        }
        let mut bytes = [0u8; BINARY_ID_LEN];
        bytes.copy_from_slice(&hasher.finalize().as_bytes()[..BINARY_ID_LEN]);
        let added = photo_data
            .iter()
            .filter_map(|dp| dp.get("jd").and_then(FrozenValue::as_f64))
            .fold(0.0_f64, f64::max);
        let mut tags = Vec::new();
        if photo_data.iter().any(DataPoint::is_upper_limit) {
            tags.push(FrozenValue::from(Tag::HasUpperLimits.name()));
        }
        let len = i64::try_from(ids.len()).map_err(|_| UnitError::Failed {
            unit: Self::NAME,
            reason: "too many data points".into(),
        })?;
        Ok(FrozenMap::from([
            ("id".to_owned(), FrozenValue::from(BinaryId(bytes).to_hex())),
            ("tags".to_owned(), FrozenValue::from(tags)),
            ("stock".to_owned(), tran_id.to_frozen()),
            (
                "channels".to_owned(),
                FrozenValue::seq(
                    self.config
                        .channels
                        .iter()
                        .map(|c| FrozenValue::from(c.as_str())),
                ),
            ),
            (
                "data".to_owned(),
                FrozenValue::seq(
                    ids.iter()
                        .map(|id| FrozenValue::map([("id", id.to_frozen())])),
                ),
            ),
            ("added".to_owned(), FrozenValue::from(added)),
            ("tier".to_owned(), FrozenValue::from(1)),
            ("len".to_owned(), FrozenValue::from(len)),
        ]))
    }
}

/// Counts detections and limits and reports the brightest magnitude.
pub struct PointCounter;

impl AmpelUnit for PointCounter {
    const NAME: &'static str = "PointCounter";
    const RESOURCES: &'static [&'static str] = &["catalog"];
    type Config = ();

    fn new(_: Arc<dyn Logger>, (): (), _: Resources) -> Result<Self, UnitError> {
        Ok(Self)
    }
}

impl FeatureUnit for PointCounter {
    fn run(
        &mut self,
        light_curve: &LightCurve,
        run_config: Option<&FrozenValue>,
    ) -> Result<FrozenMap, UnitError> {
        let filters = run_config
            .and_then(|cfg| cfg.get("filters"))
            .map(Filters::from_frozen)
            .transpose()
            .map_err(|err| UnitError::Failed {
                unit: Self::NAME,
                reason: err.to_string(),
            })?;
        let points = light_curve
            .get_photopoints(filters.as_ref())
            .as_ref()
            .map_or(0, Vec::len);
        let limits = light_curve
            .get_upperlimits(filters.as_ref())
            .as_ref()
            .map_or(0, Vec::len);
        let brightest = light_curve
            .get_values("mag", filters.as_ref(), false)
            .unwrap_or_default()
            .into_iter()
            .filter_map(FrozenValue::as_f64)
            .reduce(f64::min);
        let count = |n: usize| FrozenValue::from(u64::try_from(n).unwrap_or(u64::MAX));
        Ok(FrozenMap::from([
            ("n_points".to_owned(), count(points)),
            ("n_limits".to_owned(), count(limits)),
            (
                "brightest".to_owned(),
                brightest.map_or(FrozenValue::Null, FrozenValue::from),
            ),
        ]))
    }
}

/// Writes one journal update per view and a summary line when done.
pub struct JournalReporter {
    logger: Arc<dyn Logger>,
    processed: usize,
    /// Number of completed batches.
    pub completed: usize,
}

impl AmpelUnit for JournalReporter {
    const NAME: &'static str = "JournalReporter";
    type Config = ();

    fn new(logger: Arc<dyn Logger>, (): (), _: Resources) -> Result<Self, UnitError> {
        Ok(Self {
            logger,
            processed: 0,
            completed: 0,
        })
    }
}

impl ReactiveUnit for JournalReporter {
    fn add(&mut self, views: &[ItemView]) -> Result<Vec<JournalUpdate>, UnitError> {
        self.processed += views.len();
        Ok(views
            .iter()
            .map(|view| {
                JournalUpdate::new(view.stock().clone()).with("summary", view.content_summary())
            })
            .collect())
    }

    fn done(&mut self) {
        self.completed += 1;
        self.logger
            .info(&format!("reported {} views", self.processed));
        self.processed = 0;
    }
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Item view: everything loaded about one stock, handed to T3 units.
//!
//! Optional collections distinguish "not loaded" (`None`) from "loaded, found
//! nothing" (empty). Accessors over an unloaded collection return `None`.
//! Loaded data points are split into detections and upper limits once, when
//! the view is built, and answer the same [`PhotoQuery`] accessors as the
//! alert and light-curve views.
use std::sync::Arc;

use ampel_base::{Compound, DataPoint, FrozenMap, FrozenValue, RecordId, T2Record};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::warn;

use crate::journal::{self, JournalEntry, JournalQuery};
use crate::keywords::KeywordMap;
use crate::lightcurve::LightCurve;
use crate::photo::PhotoQuery;

/// Requested representation of a journal timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TimeFormat {
    /// Unix seconds as stored.
    #[default]
    Raw,
    /// UTC date-time.
    DateTime,
    /// `DD/MM/YYYY HH:MM:SS` text (UTC).
    Text,
}

/// A journal timestamp in the representation requested by [`TimeFormat`].
#[derive(Debug, Clone, PartialEq)]
pub enum JournalTime {
    /// Unix seconds.
    Raw(f64),
    /// UTC date-time.
    DateTime(OffsetDateTime),
    /// Formatted text.
    Text(String),
}

/// Read-only state of one stock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemView {
    stock: RecordId,
    names: Option<Arc<[FrozenValue]>>,
    tags: Option<Arc<[FrozenValue]>>,
    channels: Arc<[FrozenValue]>,
    journal: Arc<[JournalEntry]>,
    latest_state: Option<RecordId>,
    datapoints: Option<Arc<[DataPoint]>>,
    #[serde(skip)]
    points: Option<Arc<[DataPoint]>>,
    #[serde(skip)]
    limits: Option<Arc<[DataPoint]>>,
    #[serde(skip)]
    keywords: KeywordMap,
    compounds: Option<Arc<[Compound]>>,
    lightcurves: Option<Arc<[LightCurve]>>,
    t2records: Option<Arc<[T2Record]>>,
    extra: Option<Arc<FrozenMap>>,
}

impl ItemView {
    /// Starts a builder for stock `stock`.
    pub fn builder(stock: RecordId) -> ItemViewBuilder {
        ItemViewBuilder::new(stock)
    }

    /// Stock identifier.
    pub const fn stock(&self) -> &RecordId {
        &self.stock
    }

    /// Known alternate names.
    pub fn names(&self) -> Option<&[FrozenValue]> {
        self.names.as_deref()
    }

    /// Stock level tags.
    pub fn tags(&self) -> Option<&[FrozenValue]> {
        self.tags.as_deref()
    }

    /// Channels the stock belongs to.
    pub fn channels(&self) -> &[FrozenValue] {
        &self.channels
    }

    /// Journal in insertion order.
    pub fn journal(&self) -> &[JournalEntry] {
        &self.journal
    }

    /// Every loaded data point.
    pub fn datapoints(&self) -> Option<&[DataPoint]> {
        self.datapoints.as_deref()
    }

    /// Loaded detections.
    pub fn photopoints(&self) -> Option<&[DataPoint]> {
        self.points.as_deref()
    }

    /// Loaded upper limits.
    pub fn upperlimits(&self) -> Option<&[DataPoint]> {
        self.limits.as_deref()
    }

    /// Loaded compounds.
    pub fn compounds(&self) -> Option<&[Compound]> {
        self.compounds.as_deref()
    }

    /// Loaded light curves.
    pub fn lightcurves(&self) -> Option<&[LightCurve]> {
        self.lightcurves.as_deref()
    }

    /// Loaded feature records.
    pub fn t2records(&self) -> Option<&[T2Record]> {
        self.t2records.as_deref()
    }

    /// Extension payloads (spectra, external catalogs, ...).
    pub fn extra(&self) -> Option<&FrozenMap> {
        self.extra.as_deref()
    }

    /// Feature records, optionally restricted to one unit and/or one compound.
    pub fn get_t2_records(
        &self,
        unit: Option<&RecordId>,
        compound: Option<&RecordId>,
    ) -> Option<Vec<&T2Record>> {
        let records = self.t2records()?;
        Some(
            records
                .iter()
                .filter(|r| unit.is_none_or(|u| r.unit() == u))
                .filter(|r| compound.is_none_or(|c| r.link() == c))
                .collect(),
        )
    }

    /// Feature records computed on the latest state.
    pub fn get_latest_t2_records(&self, unit: Option<&RecordId>) -> Option<Vec<&T2Record>> {
        let state = self.latest_state.as_ref()?;
        self.get_t2_records(unit, Some(state))
    }

    /// Journal entries matching `query`, in insertion order.
    pub fn get_journal_entries(&self, query: &JournalQuery) -> Vec<&JournalEntry> {
        self.journal.iter().filter(|e| query.matches(e)).collect()
    }

    /// The matching entry with the largest timestamp.
    pub fn get_latest_journal_entry(&self, query: &JournalQuery) -> Option<&JournalEntry> {
        journal::latest(self.journal.iter().filter(|e| query.matches(e)))
    }

    /// Journal entries accepted by an arbitrary predicate.
    pub fn journal_entries_where<F>(&self, predicate: F) -> Vec<&JournalEntry>
    where
        F: Fn(&JournalEntry) -> bool,
    {
        self.journal.iter().filter(|&e| predicate(e)).collect()
    }

    fn journal_time(entry: Option<&JournalEntry>, format: TimeFormat) -> Option<JournalTime> {
        let entry = entry?;
        match format {
            TimeFormat::Raw => Some(JournalTime::Raw(entry.dt())),
            TimeFormat::DateTime => entry.datetime().map(JournalTime::DateTime),
            TimeFormat::Text => entry.formatted().map(JournalTime::Text),
        }
    }

    /// Timestamp of the first journal entry.
    pub fn get_time_created(&self, format: TimeFormat) -> Option<JournalTime> {
        Self::journal_time(self.journal.first(), format)
    }

    /// Timestamp of the last journal entry.
    pub fn get_time_modified(&self, format: TimeFormat) -> Option<JournalTime> {
        Self::journal_time(self.journal.last(), format)
    }

    /// Identifier of the most recent compound.
    pub const fn get_latest_state(&self) -> Option<&RecordId> {
        self.latest_state.as_ref()
    }

    /// Latest state rendered as hex (binary ids only).
    pub fn get_latest_state_hex(&self) -> Option<String> {
        self.latest_state.as_ref()?.to_hex()
    }

    /// Light curve of the latest state. Logs a warning and returns `None`
    /// when the state is unknown, no light curve was loaded, or none matches.
    pub fn get_latest_lightcurve(&self) -> Option<&LightCurve> {
        let Some(state) = self.latest_state.as_ref() else {
            warn!(stock = %self.stock, "latest lightcurve requested but latest state not set");
            return None;
        };
        let curves = match self.lightcurves() {
            Some(curves) if !curves.is_empty() => curves,
            _ => {
                warn!(stock = %self.stock, "latest lightcurve requested but none was loaded");
                return None;
            }
        };
        let found = curves.iter().find(|lc| lc.id() == state);
        if found.is_none() {
            warn!(stock = %self.stock, state = %state, "latest lightcurve not found");
        }
        found
    }

    /// Compound with identifier `id`.
    pub fn get_compound(&self, id: &RecordId) -> Option<&Compound> {
        self.compounds()?.iter().find(|c| c.id() == id)
    }

    /// Compound looked up by a 32 character hex id.
    pub fn get_compound_by_hex(&self, hex: &str) -> Option<&Compound> {
        self.get_compound(&RecordId::resolve(hex))
    }

    /// Light curve with identifier `id`.
    pub fn get_lightcurve(&self, id: &RecordId) -> Option<&LightCurve> {
        self.lightcurves()?.iter().find(|lc| lc.id() == id)
    }

    /// Light curve looked up by a 32 character hex id.
    pub fn get_lightcurve_by_hex(&self, hex: &str) -> Option<&LightCurve> {
        self.get_lightcurve(&RecordId::resolve(hex))
    }

    /// One line summary of the loaded content.
    pub fn content_summary(&self) -> String {
        format!(
            "DP: {}, CP: {}, LC: {}, T2: {}",
            self.datapoints().map_or(0, <[_]>::len),
            self.compounds().map_or(0, <[_]>::len),
            self.lightcurves().map_or(0, <[_]>::len),
            self.t2records().map_or(0, <[_]>::len),
        )
    }
}

impl PhotoQuery for ItemView {
    type Record = DataPoint;

    fn points(&self) -> Option<&[DataPoint]> {
        self.points.as_deref()
    }

    fn limits(&self) -> Option<&[DataPoint]> {
        self.limits.as_deref()
    }

    fn keywords(&self) -> &KeywordMap {
        &self.keywords
    }
}

/// Assembles an [`ItemView`]; collections left unset stay "not loaded".
#[derive(Debug, Clone)]
pub struct ItemViewBuilder {
    view: ItemView,
}

impl ItemViewBuilder {
    /// Builder for stock `stock` with an empty journal and no channels.
    pub fn new(stock: RecordId) -> Self {
        Self {
            view: ItemView {
                stock,
                names: None,
                tags: None,
                channels: Arc::from(Vec::new()),
                journal: Arc::from(Vec::new()),
                latest_state: None,
                datapoints: None,
                points: None,
                limits: None,
                keywords: KeywordMap::ztf_ipac(),
                compounds: None,
                lightcurves: None,
                t2records: None,
                extra: None,
            },
        }
    }

    /// Alternate names.
    #[must_use]
    pub fn names(mut self, names: Vec<FrozenValue>) -> Self {
        self.view.names = Some(names.into());
        self
    }

    /// Stock tags.
    #[must_use]
    pub fn tags(mut self, tags: Vec<FrozenValue>) -> Self {
        self.view.tags = Some(tags.into());
        self
    }

    /// Channels.
    #[must_use]
    pub fn channels(mut self, channels: Vec<FrozenValue>) -> Self {
        self.view.channels = channels.into();
        self
    }

    /// Journal in insertion order.
    #[must_use]
    pub fn journal(mut self, journal: Vec<JournalEntry>) -> Self {
        self.view.journal = journal.into();
        self
    }

    /// Most recent compound id.
    #[must_use]
    pub fn latest_state(mut self, state: RecordId) -> Self {
        self.view.latest_state = Some(state);
        self
    }

    /// Data points, split into detections and upper limits by tag.
    #[must_use]
    pub fn datapoints(mut self, datapoints: Vec<DataPoint>) -> Self {
        let (limits, points): (Vec<_>, Vec<_>) = datapoints
            .iter()
            .cloned()
            .partition(DataPoint::is_upper_limit);
        self.view.points = Some(points.into());
        self.view.limits = Some(limits.into());
        self.view.datapoints = Some(datapoints.into());
        self
    }

    /// Keyword table used by the photometry accessors (ZTF-IPAC by default).
    #[must_use]
    pub fn keywords(mut self, keywords: KeywordMap) -> Self {
        self.view.keywords = keywords;
        self
    }

    /// Compounds.
    #[must_use]
    pub fn compounds(mut self, compounds: Vec<Compound>) -> Self {
        self.view.compounds = Some(compounds.into());
        self
    }

    /// Light curves.
    #[must_use]
    pub fn lightcurves(mut self, lightcurves: Vec<LightCurve>) -> Self {
        self.view.lightcurves = Some(lightcurves.into());
        self
    }

    /// Feature records.
    #[must_use]
    pub fn t2records(mut self, t2records: Vec<T2Record>) -> Self {
        self.view.t2records = Some(t2records.into());
        self
    }

    /// Extension payloads.
    #[must_use]
    pub fn extra(mut self, extra: FrozenMap) -> Self {
        self.view.extra = Some(Arc::new(extra));
        self
    }

    /// Emits the immutable view.
    pub fn build(self) -> ItemView {
        self.view
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    const STATE: &str = "00112233445566778899aabbccddeeff";

    fn entry(v: serde_json::Value) -> JournalEntry {
        JournalEntry::from_json(&v).unwrap()
    }

    fn t2(id: i64, unit: &str, link: serde_json::Value) -> T2Record {
        T2Record::from_json(&json!({
            "id": id, "unit": unit, "link": link, "stock": 1,
            "channels": [], "results": [], "config": {}, "state": 0
        }))
        .unwrap()
    }

    fn view() -> ItemView {
        ItemView::builder(RecordId::Int(1))
            .journal(vec![
                entry(json!({"dt": 5, "tier": 0, "processName": "alerts"})),
                entry(json!({"dt": 2, "tier": 3, "processName": "daily"})),
                entry(json!({"dt": 9, "tier": 3, "processName": "weekly"})),
            ])
            .latest_state(RecordId::resolve(STATE))
            .t2records(vec![
                t2(1, "SNCOSMO", json!(STATE)),
                t2(2, "SNCOSMO", json!(7)),
                t2(3, "CATALOG", json!(STATE)),
            ])
            .build()
    }

    #[test]
    fn unloaded_collections_are_none() {
        let v = view();
        assert!(v.compounds().is_none());
        assert!(v.get_compound_by_hex(STATE).is_none());
        assert!(v.photopoints().is_none());
        assert!(v.get_latest_lightcurve().is_none());
        assert_eq!(v.content_summary(), "DP: 0, CP: 0, LC: 0, T2: 3");
    }

    #[test]
    fn t2_lookup_by_unit_and_link() {
        let v = view();
        let unit = RecordId::from("SNCOSMO");
        assert_eq!(v.get_t2_records(Some(&unit), None).unwrap().len(), 2);
        assert_eq!(v.get_latest_t2_records(None).unwrap().len(), 2);
        assert_eq!(v.get_latest_t2_records(Some(&unit)).unwrap().len(), 1);
    }

    #[test]
    fn journal_queries() {
        let v = view();
        let t3 = JournalQuery::all().tier(3);
        assert_eq!(v.get_journal_entries(&t3).len(), 2);
        assert_eq!(v.get_latest_journal_entry(&t3).map(JournalEntry::dt), Some(9.0));
        assert_eq!(
            v.get_latest_journal_entry(&JournalQuery::all()).map(JournalEntry::dt),
            Some(9.0)
        );
        assert_eq!(v.journal_entries_where(|e| e.dt() < 3.0).len(), 1);
        assert_eq!(v.get_time_created(TimeFormat::Raw), Some(JournalTime::Raw(5.0)));
        assert_eq!(
            v.get_time_modified(TimeFormat::Text),
            Some(JournalTime::Text("01/01/1970 00:00:09".into()))
        );
    }

    #[test]
    fn loaded_datapoints_answer_photometry_queries() {
        let dp = |v: serde_json::Value| DataPoint::from_json(&v).unwrap();
        let v = ItemView::builder(RecordId::Int(1))
            .datapoints(vec![
                dp(json!({"id": 1, "stock": 1, "body": {"magpsf": 18.0, "jd": 1.0}})),
                dp(json!({
                    "id": -1, "stock": 1, "tags": ["UPPERLIMIT"],
                    "body": {"diffmaglim": 20.0, "jd": 0.5}
                })),
                dp(json!({"id": 2, "stock": 1, "body": {"jd": 2.0}})),
            ])
            .build();
        assert_eq!(v.photopoints().map(<[_]>::len), Some(2));
        assert_eq!(v.upperlimits().map(<[_]>::len), Some(1));
        assert_eq!(
            v.get_values("mag", None, false),
            Some(vec![&FrozenValue::from(18.0)])
        );
        assert_eq!(v.get_values("maglim", None, true).as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn unloaded_datapoints_differ_from_empty_ones() {
        let unloaded = view();
        assert!(unloaded.get_photopoints(None).is_none());
        assert!(unloaded.get_upperlimits(None).is_none());
        assert_eq!(unloaded.get_values("jd", None, false), None);
        assert_eq!(unloaded.get_tuples("ra", "dec", None, false), None);

        let empty = ItemView::builder(RecordId::Int(1)).datapoints(Vec::new()).build();
        assert_eq!(empty.get_values("jd", None, false), Some(Vec::new()));
        assert_eq!(empty.get_values("jd", None, true), Some(Vec::new()));
        assert_eq!(empty.photopoints().map(<[_]>::len), Some(0));
    }

    #[test]
    fn latest_state_renders_as_hex() {
        assert_eq!(view().get_latest_state_hex().as_deref(), Some(STATE));
    }
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Alert view: the read-only content of one incoming alert, as seen by T0
//! filters.
use std::sync::Arc;

use ampel_base::{freeze, FrozenValue, RecordId};
use serde::Serialize;
use thiserror::Error;

use crate::keywords::KeywordMap;
use crate::photo::PhotoQuery;

/// Errors raised while reading an alert packet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlertError {
    /// A required packet key is missing or has the wrong shape.
    #[error("alert packet: {0}")]
    Malformed(&'static str),
}

/// One alert: object identifier plus detections and non-detections.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertView {
    id: RecordId,
    points: Arc<[FrozenValue]>,
    limits: Option<Arc<[FrozenValue]>>,
    #[serde(skip)]
    keywords: KeywordMap,
}

impl AlertView {
    /// Builds an alert view using the ZTF-IPAC keyword table.
    pub fn new(
        id: RecordId,
        points: impl Into<Arc<[FrozenValue]>>,
        limits: Option<Arc<[FrozenValue]>>,
    ) -> Self {
        Self {
            id,
            points: points.into(),
            limits,
            keywords: KeywordMap::ztf_ipac(),
        }
    }

    /// Replaces the keyword table.
    #[must_use]
    pub fn with_keywords(mut self, keywords: KeywordMap) -> Self {
        self.keywords = keywords;
        self
    }

    /// Reads a ZTF-style packet: `objectId`, a `candidate` mapping and an
    /// optional `prv_candidates` sequence. Previous candidates with a `candid`
    /// are detections (listed after the current candidate); the others are
    /// upper limits. Without `prv_candidates` the limits are not loaded.
    pub fn from_ztf_packet(packet: &FrozenValue) -> Result<Self, AlertError> {
        let object = packet
            .get("objectId")
            .ok_or(AlertError::Malformed("missing objectId"))?;
        let id = RecordId::from_frozen(object)
            .map_err(|_| AlertError::Malformed("objectId is not an identifier"))?;
        let candidate = packet
            .get("candidate")
            .filter(|c| c.as_map().is_some())
            .ok_or(AlertError::Malformed("candidate must be a mapping"))?;
        let mut points = vec![candidate.clone()];
        let limits = match packet.get("prv_candidates") {
            None | Some(FrozenValue::Null) => None,
            Some(FrozenValue::Seq(prv)) => {
                let mut limits = Vec::new();
                for entry in prv.iter() {
                    match entry.get("candid") {
                        Some(c) if !c.is_null() => points.push(entry.clone()),
                        _ => limits.push(entry.clone()),
                    }
                }
                Some(Arc::from(limits))
            }
            Some(_) => return Err(AlertError::Malformed("prv_candidates must be a sequence")),
        };
        Ok(Self::new(id, points, limits))
    }

    /// Same as [`AlertView::from_ztf_packet`] for JSON input.
    pub fn from_ztf_json(packet: &serde_json::Value) -> Result<Self, AlertError> {
        Self::from_ztf_packet(&freeze(packet))
    }

    /// Object identifier (ZTF: `objectId`).
    pub const fn id(&self) -> &RecordId {
        &self.id
    }
}

impl PhotoQuery for AlertView {
    type Record = FrozenValue;

    fn points(&self) -> Option<&[FrozenValue]> {
        Some(&self.points)
    }

    fn limits(&self) -> Option<&[FrozenValue]> {
        self.limits.as_deref()
    }

    fn keywords(&self) -> &KeywordMap {
        &self.keywords
    }
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Photometry fixtures: ZTF-like packets, data points and light curves.
//!
//! Detections are `(jd, magpsf)` pairs; upper limits are `jd` values with a
//! fixed `diffmaglim`. Positions drift by 0.001 degree per detection so that
//! positional queries can tell points apart.

use ampel_base::{BinaryId, DataPoint, RecordId, BINARY_ID_LEN};
use ampel_view::LightCurve;
use serde_json::{json, Value};

/// Limiting magnitude given to every fixture upper limit.
pub const FIXTURE_LIMIT_MAG: f64 = 20.5;

/// Right ascension of the first fixture detection.
pub const FIXTURE_RA: f64 = 150.0;

/// Declination of the first fixture detection.
pub const FIXTURE_DEC: f64 = 2.0;

fn offset(index: usize) -> f64 {
    f64::from(u32::try_from(index).unwrap_or(u32::MAX)) * 0.001
}

fn detection_body(index: usize, jd: f64, mag: f64) -> Value {
    json!({
        "candid": 1_000 + index,
        "jd": jd,
        "magpsf": mag,
        "sigmapsf": 0.1,
        "fid": 1 + index % 2,
        "ra": FIXTURE_RA + offset(index),
        "dec": FIXTURE_DEC + offset(index),
    })
}

fn limit_body(jd: f64) -> Value {
    json!({"candid": null, "jd": jd, "diffmaglim": FIXTURE_LIMIT_MAG, "fid": 1})
}

/// ZTF-style alert packet. The last detection is the current candidate, the
/// other detections and the limits form `prv_candidates`.
pub fn ztf_packet(object_id: &str, detections: &[(f64, f64)], limits: &[f64]) -> Value {
    let mut bodies: Vec<Value> = detections
        .iter()
        .enumerate()
        .map(|(i, (jd, mag))| detection_body(i, *jd, *mag))
        .collect();
    let candidate = bodies.pop().unwrap_or_else(|| json!({}));
    bodies.extend(limits.iter().map(|jd| limit_body(*jd)));
    json!({
        "objectId": object_id,
        "candidate": candidate,
        "prv_candidates": bodies,
    })
}

/// Detection data point with id `id` owned by stock 1.
#[allow(clippy::expect_used)]
pub fn detection(id: i64, body: Value) -> DataPoint {
    DataPoint::from_json(&json!({"id": id, "stock": 1, "tags": ["PHOTOPOINT"], "body": body}))
        .expect("fixture detection should bind")
}

/// Upper-limit data point with id `id` owned by stock 1.
#[allow(clippy::expect_used)]
pub fn upper_limit(id: i64, body: Value) -> DataPoint {
    DataPoint::from_json(&json!({"id": id, "stock": 1, "tags": ["UPPERLIMIT"], "body": body}))
        .expect("fixture upper limit should bind")
}

/// Data points for `detections` (ids 1, 2, ...) followed by `limits`
/// (ids -1, -2, ...).
pub fn datapoints(detections: &[(f64, f64)], limits: &[f64]) -> Vec<DataPoint> {
    let points = detections
        .iter()
        .enumerate()
        .zip(1_i64..)
        .map(|((i, (jd, mag)), id)| detection(id, detection_body(i, *jd, *mag)));
    let uls = limits
        .iter()
        .zip(1_i64..)
        .map(|(jd, id)| upper_limit(-id, limit_body(*jd)));
    points.chain(uls).collect()
}

/// Light curve with compound id `id` over [`datapoints`].
pub fn lightcurve(id: RecordId, detections: &[(f64, f64)], limits: &[f64]) -> LightCurve {
    LightCurve::from_datapoints(id, datapoints(detections, limits))
}

/// Deterministic binary id derived from `seed`.
pub fn binary_id(seed: &str) -> BinaryId {
    let digest = blake3::hash(seed.as_bytes());
    let mut bytes = [0u8; BINARY_ID_LEN];
    bytes.copy_from_slice(&digest.as_bytes()[..BINARY_ID_LEN]);
    BinaryId(bytes)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use ampel_view::{AlertView, PhotoQuery};

    #[test]
    fn packet_splits_into_points_and_limits() {
        let packet = ztf_packet("ZTF21abc", &[(1.0, 19.0), (2.0, 18.5)], &[0.5]);
        let alert = AlertView::from_ztf_json(&packet).unwrap();
        assert_eq!(alert.get_photopoints(None).unwrap().len(), 2);
        assert_eq!(alert.get_upperlimits(None).unwrap().len(), 1);
    }

    #[test]
    fn binary_ids_are_stable() {
        assert_eq!(binary_id("a"), binary_id("a"));
        assert_ne!(binary_id("a"), binary_id("b"));
        assert_eq!(binary_id("a").to_hex().len(), 2 * BINARY_ID_LEN);
    }
}

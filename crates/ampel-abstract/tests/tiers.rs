// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use ampel_abstract::{
    instantiate, AlertFilter, CatalogError, ClassDecl, ContractError, DataShaper, FeatureUnit,
    ReactiveUnit, Resources, SignaturePolicy, StateBuilder, Tier, UnitCatalog,
};
use ampel_base::{freeze, Compound, DataPoint, FrozenValue, LogLevel, RecordId};
use ampel_dry_tests::{
    binary_id, datapoints, init_test_tracing, lightcurve, ztf_packet, JournalReporter,
    MagnitudeFilter, PointCounter, RecordingLogger, SimpleStateBuilder, ZtfShaper,
};
use ampel_view::{AlertView, ItemView};
use serde_json::json;

fn no_resources() -> Resources {
    Resources::new()
}

#[test]
fn alert_filter_accepts_or_rejects() {
    init_test_tracing();
    let log = RecordingLogger::new();
    let cfg = freeze(&json!({
        "max_mag": 19.0,
        "min_detections": 2,
        "schedule": ["PointCounter"]
    }));
    let mut filter: MagnitudeFilter =
        instantiate(log.shared(), Some(&cfg), &no_resources()).unwrap();

    let bright =
        AlertView::from_ztf_json(&ztf_packet("ZTF1", &[(1.0, 18.0), (2.0, 18.5)], &[])).unwrap();
    assert_eq!(
        filter.apply(&bright).unwrap().into_iter().collect::<Vec<_>>(),
        vec![RecordId::from("PointCounter")]
    );

    let faint =
        AlertView::from_ztf_json(&ztf_packet("ZTF2", &[(1.0, 18.0), (2.0, 19.5)], &[])).unwrap();
    assert!(filter.apply(&faint).is_none());
    assert_eq!(log.messages(LogLevel::Info).len(), 1);
    assert!(log.contains("ZTF2"));
}

#[test]
fn shaper_output_binds_as_datapoints() {
    let mut shaper: ZtfShaper =
        instantiate(RecordingLogger::new().shared(), None, &no_resources()).unwrap();
    let alert = freeze(&ztf_packet("ZTF1", &[(1.0, 18.0), (2.0, 18.2)], &[0.5]));
    let mut records: Vec<FrozenValue> = alert
        .get("prv_candidates")
        .and_then(FrozenValue::as_seq)
        .unwrap()
        .to_vec();
    records.push(alert.get("candidate").unwrap().clone());

    let shaped = shaper.shape(&records, "candid").unwrap();
    let dps: Vec<DataPoint> = shaped
        .into_iter()
        .map(|mut m| {
            m.insert("stock".into(), FrozenValue::from(1));
            DataPoint::from_raw(&FrozenValue::from(m)).unwrap()
        })
        .collect();
    assert_eq!(dps.iter().filter(|dp| dp.is_upper_limit()).count(), 1);
    assert_eq!(dps.iter().filter(|dp| !dp.is_upper_limit()).count(), 2);
    assert!(shaper.shape(&[FrozenValue::from(3)], "candid").is_err());
}

#[test]
fn state_builder_produces_a_compound() {
    let cfg = freeze(&json!({"channels": ["HU_RAPID"]}));
    let mut t1: SimpleStateBuilder =
        instantiate(RecordingLogger::new().shared(), Some(&cfg), &no_resources()).unwrap();
    let dps = datapoints(&[(1.0, 18.0), (3.0, 18.4)], &[2.0]);
    let raw = t1.create_state(&RecordId::Int(1), &dps).unwrap();
    let compound = Compound::from_raw(&FrozenValue::from(raw.clone())).unwrap();
    assert_eq!(compound.len(), 3);
    assert!((compound.added() - 3.0).abs() < f64::EPSILON);
    assert_eq!(compound.datapoint_ids().count(), 3);
    assert!(compound.id().to_hex().is_some());

    let mut reversed = dps;
    reversed.reverse();
    assert_eq!(t1.create_state(&RecordId::Int(1), &reversed).unwrap(), raw);
}

#[test]
fn feature_unit_requires_its_resource() {
    let log = RecordingLogger::new();
    assert!(instantiate::<PointCounter>(log.shared(), None, &no_resources()).is_err());
    let resources = Resources::from([("catalog".to_owned(), FrozenValue::from("catsHTM"))]);
    let mut t2: PointCounter = instantiate(log.shared(), None, &resources).unwrap();
    let lc = lightcurve(
        RecordId::Binary(binary_id("state")),
        &[(1.0, 18.0), (2.0, 17.5), (3.0, 19.0)],
        &[0.5],
    );
    let out = t2.run(&lc, None).unwrap();
    assert_eq!(out.get("n_points"), Some(&FrozenValue::from(3_u64)));
    assert_eq!(out.get("n_limits"), Some(&FrozenValue::from(1_u64)));
    assert_eq!(out.get("brightest"), Some(&FrozenValue::from(17.5)));

    let run_config = freeze(&json!({
        "filters": {"attribute": "jd", "operator": ">=", "value": 3}
    }));
    let out = t2.run(&lc, Some(&run_config)).unwrap();
    assert_eq!(out.get("n_points"), Some(&FrozenValue::from(1_u64)));
    let bad = freeze(&json!({"filters": {"attribute": "jd", "operator": "~", "value": 3}}));
    assert!(t2.run(&lc, Some(&bad)).is_err());
}

#[test]
fn reactive_unit_runs_completion_hook_once_per_batch() {
    let log = RecordingLogger::new();
    let mut t3: JournalReporter = instantiate(log.shared(), None, &no_resources()).unwrap();
    let views: Vec<ItemView> = (0..3)
        .map(|i| ItemView::builder(RecordId::Int(i)).build())
        .collect();
    let updates = t3.process(&views, 2).unwrap();
    assert_eq!(updates.len(), 3);
    assert_eq!(
        updates[0].content.get("summary"),
        Some(&FrozenValue::from("DP: 0, CP: 0, LC: 0, T2: 0"))
    );
    assert_eq!(t3.completed, 1);
    assert_eq!(log.messages(LogLevel::Info), vec!["reported 3 views".to_owned()]);
}

#[test]
fn catalog_registers_rust_units_and_checks_declared_ones() {
    let mut catalog = UnitCatalog::new(SignaturePolicy::Exact).unwrap();
    catalog.register::<MagnitudeFilter>(Tier::AlertFilter).unwrap();
    catalog.register::<JournalReporter>(Tier::ReactiveUnit).unwrap();
    assert!(catalog.instantiate("JournalReporter").is_ok());

    let t3 = std::sync::Arc::clone(catalog.interfaces().tier(Tier::ReactiveUnit));
    let without_done = ClassDecl::new("Forgetful")
        .extends(&t3)
        .method("new", &["logger", "init_config", "resources"])
        .method("add", &["transients"]);
    assert_eq!(
        catalog.define(without_done).unwrap_err(),
        CatalogError::Contract(ContractError::UnimplementedAbstractMethod {
            class: "Forgetful".into(),
            method: "done".into(),
            declared_in: "AbstractReactiveUnit".into(),
        })
    );
    let wrong_arity = ClassDecl::new("Chatty")
        .extends(&t3)
        .method("new", &["logger", "init_config", "resources"])
        .method("add", &["transients", "extra"])
        .method("done", &[]);
    assert!(matches!(
        catalog.define(wrong_arity),
        Err(CatalogError::Contract(ContractError::SignatureMismatch { .. }))
    ));
    assert!(matches!(
        catalog.instantiate("AbstractReactiveUnit"),
        Err(CatalogError::Contract(ContractError::AbstractInstantiation { .. }))
    ));

    catalog.seal();
    assert!(catalog.register::<PointCounter>(Tier::FeatureUnit).is_err());
    assert_eq!(catalog.names(), vec!["JournalReporter", "MagnitudeFilter"]);
}

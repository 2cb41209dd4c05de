// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use ampel_base::FrozenValue;
use ampel_config::{AmpelConfig, ConfigError, ConfigSource};
use ampel_dry_tests::InMemoryConfigSource;
use serde_json::json;

#[test]
fn load_returns_none_for_missing_key() {
    let source = InMemoryConfigSource::new();
    assert!(AmpelConfig::load(&source, "ampel", true).unwrap().is_none());
    assert_eq!(source.fetch_count(), 1);
}

#[test]
fn null_tree_reads_as_missing() {
    let source = InMemoryConfigSource::new();
    source.store("ampel", &FrozenValue::Null).unwrap();
    assert!(AmpelConfig::load(&source, "ampel", true).unwrap().is_none());
}

#[test]
fn load_surfaces_source_failures() {
    let source = InMemoryConfigSource::with_json("ampel", &json!({"a": 1}));
    source.set_fail_on_fetch(true);
    assert!(matches!(
        AmpelConfig::load(&source, "ampel", true),
        Err(ConfigError::Source(_))
    ));
}

#[test]
fn loaded_tree_honours_the_freeze_flag() {
    let source = InMemoryConfigSource::with_json(
        "ampel",
        &json!({"channel": {"HU_RAPID": {"active": true}}}),
    );
    let mut frozen = AmpelConfig::load(&source, "ampel", true).unwrap().unwrap();
    assert!(frozen.is_frozen());
    assert!(matches!(
        frozen.set("channel.HU_RAPID.active", false),
        Err(ConfigError::ReadOnly(_))
    ));
    let mut open = AmpelConfig::load(&source, "ampel", false).unwrap().unwrap();
    open.set("channel.HU_RAPID.active", false).unwrap();
    assert_eq!(
        open.get("channel.HU_RAPID.active"),
        Some(&FrozenValue::Bool(false))
    );
}

#[test]
fn saved_tree_reloads_with_same_lookups() {
    let source = InMemoryConfigSource::new();
    let mut cfg = AmpelConfig::default();
    cfg.set("channel.HU_RAPID.sources", vec![FrozenValue::from("ZTF")])
        .unwrap();
    cfg.set("channel.HU_RAPID.sources.1", "ATLAS").unwrap();
    cfg.freeze();
    cfg.save(&source, "ampel").unwrap();
    assert_eq!(source.tree("ampel").as_ref(), Some(cfg.tree()));

    let loaded = AmpelConfig::load(&source, "ampel", false).unwrap().unwrap();
    assert!(!loaded.is_frozen());
    assert_eq!(loaded.tree(), cfg.tree());
    assert_eq!(
        loaded.get("channel.HU_RAPID.sources.1"),
        Some(&FrozenValue::from("ATLAS"))
    );
    assert_eq!(loaded.get("channel.HU_RAPID.sources.1.x"), None);
}

#[test]
fn failed_store_is_reported() {
    let source = InMemoryConfigSource::new();
    source.set_fail_on_store(true);
    let cfg = AmpelConfig::from_json(&json!({}), true);
    assert!(matches!(cfg.save(&source, "ampel"), Err(ConfigError::Source(_))));
    assert!(!source.contains_key("ampel"));
}

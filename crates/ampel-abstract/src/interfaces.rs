// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The abstract unit classes of every pipeline tier.
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::contract::{Class, ClassDecl, ContractChecker, ContractError};

/// Pipeline stage a unit interface belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    /// T0 alert filter.
    AlertFilter,
    /// T0 data shaper.
    DataShaper,
    /// T1 state builder.
    StateBuilder,
    /// T2 feature unit.
    FeatureUnit,
    /// T3 reactive unit.
    ReactiveUnit,
}

impl Tier {
    /// Every tier interface.
    pub const ALL: [Self; 5] = [
        Self::AlertFilter,
        Self::DataShaper,
        Self::StateBuilder,
        Self::FeatureUnit,
        Self::ReactiveUnit,
    ];

    /// Tier number (0 to 3).
    pub const fn number(self) -> u8 {
        match self {
            Self::AlertFilter | Self::DataShaper => 0,
            Self::StateBuilder => 1,
            Self::FeatureUnit => 2,
            Self::ReactiveUnit => 3,
        }
    }

    /// Name of the interface class.
    pub const fn class_name(self) -> &'static str {
        match self {
            Self::AlertFilter => "AbstractAlertFilter",
            Self::DataShaper => "AbstractDataShaper",
            Self::StateBuilder => "AbstractStateBuilder",
            Self::FeatureUnit => "AbstractFeatureUnit",
            Self::ReactiveUnit => "AbstractReactiveUnit",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (T{})", self.class_name(), self.number())
    }
}

type MethodTable = &'static [(&'static str, &'static [&'static str])];

const fn tier_methods(tier: Tier) -> MethodTable {
    const FILTER: MethodTable = &[("apply", &["ampel_alert"])];
    const SHAPER: MethodTable = &[("shape", &["data_list", "id_field_name"])];
    const STATE: MethodTable = &[("create_state", &["tran_id", "photo_data"])];
    const FEATURE: MethodTable = &[("run", &["light_curve", "run_config"])];
    const REACTIVE: MethodTable = &[("add", &["transients"]), ("done", &[])];
    match tier {
        Tier::AlertFilter => FILTER,
        Tier::DataShaper => SHAPER,
        Tier::StateBuilder => STATE,
        Tier::FeatureUnit => FEATURE,
        Tier::ReactiveUnit => REACTIVE,
    }
}

/// Name of the root unit class.
pub const AMPEL_UNIT: &str = "AmpelUnit";

/// The root class and one abstract class per tier.
#[derive(Debug)]
pub struct Interfaces {
    root: Arc<Class>,
    tiers: [Arc<Class>; 5],
}

impl Interfaces {
    /// Defines the interface classes with `checker`.
    pub fn define(checker: &ContractChecker) -> Result<Self, ContractError> {
        let root = checker.define(
            ClassDecl::new(AMPEL_UNIT).abstract_method("new", &["logger", "init_config", "resources"]),
        )?;
        let tier = |t: Tier| {
            let decl = tier_methods(t).iter().fold(
                ClassDecl::new(t.class_name()).extends(&root).mark_abstract(),
                |decl, (name, params)| decl.abstract_method(name, params),
            );
            checker.define(decl)
        };
        let tiers = [
            tier(Tier::AlertFilter)?,
            tier(Tier::DataShaper)?,
            tier(Tier::StateBuilder)?,
            tier(Tier::FeatureUnit)?,
            tier(Tier::ReactiveUnit)?,
        ];
        Ok(Self { root, tiers })
    }

    /// The root unit class.
    pub const fn root(&self) -> &Arc<Class> {
        &self.root
    }

    /// Interface class of `tier`.
    pub const fn tier(&self, tier: Tier) -> &Arc<Class> {
        match tier {
            Tier::AlertFilter => &self.tiers[0],
            Tier::DataShaper => &self.tiers[1],
            Tier::StateBuilder => &self.tiers[2],
            Tier::FeatureUnit => &self.tiers[3],
            Tier::ReactiveUnit => &self.tiers[4],
        }
    }

    /// Root and tier classes.
    pub fn classes(&self) -> impl Iterator<Item = &Arc<Class>> {
        std::iter::once(&self.root).chain(self.tiers.iter())
    }
}

static INTERFACES: OnceLock<Result<Interfaces, ContractError>> = OnceLock::new();

/// Interface classes checked with the default (exact) signature policy,
/// built on first access.
pub fn interfaces() -> Result<&'static Interfaces, ContractError> {
    INTERFACES
        .get_or_init(|| Interfaces::define(&ContractChecker::default()))
        .as_ref()
        .map_err(Clone::clone)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn every_interface_is_abstract_and_derives_from_the_root() {
        let ifaces = interfaces().unwrap();
        for class in ifaces.classes() {
            assert!(class.is_abstract());
            assert!(class.is_subclass_of(ifaces.root()));
        }
        assert_eq!(
            ifaces.tier(Tier::FeatureUnit).mro(),
            vec!["AbstractFeatureUnit", AMPEL_UNIT]
        );
    }

    #[test]
    fn reactive_interface_requires_completion_hook() {
        let names: Vec<_> = interfaces()
            .unwrap()
            .tier(Tier::ReactiveUnit)
            .abstract_methods()
            .into_iter()
            .map(|m| m.name().to_owned())
            .collect();
        assert_eq!(names, vec!["add", "done", "new"]);
    }

    #[test]
    fn state_builder_declares_create_state() {
        let t1 = interfaces().unwrap().tier(Tier::StateBuilder);
        let (declared_in, method) = t1.resolve("create_state").unwrap();
        assert_eq!(declared_in, "AbstractStateBuilder");
        assert_eq!(method.params(), ["tran_id", "photo_data"]);
        assert!(t1.resolve("combine").is_none());
    }

    #[test]
    fn renamed_state_builder_parameters_are_rejected() {
        let checker = ContractChecker::default();
        let ifaces = Interfaces::define(&checker).unwrap();
        let renamed = ClassDecl::new("T1Renamed")
            .extends(ifaces.tier(Tier::StateBuilder))
            .method("new", &["logger", "init_config", "resources"])
            .method("create_state", &["stock", "datapoints"]);
        assert!(matches!(
            checker.define(renamed),
            Err(ContractError::SignatureMismatch { method, .. }) if method == "create_state"
        ));
        let matching = ClassDecl::new("T1Matching")
            .extends(ifaces.tier(Tier::StateBuilder))
            .method("new", &["logger", "init_config", "resources"])
            .method("create_state", &["tran_id", "photo_data"]);
        assert!(checker.define(matching).unwrap().instantiate().is_ok());
    }
}

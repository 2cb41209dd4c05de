// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Unit catalog: every known unit class, populated at startup then sealed.
use std::collections::BTreeMap;
use std::sync::Arc;

use ampel_base::{Freezable, ImmutabilityError};
use thiserror::Error;
use tracing::info;

use crate::contract::{Class, ClassDecl, ContractChecker, ContractError, Instance, SignaturePolicy};
use crate::interfaces::{Interfaces, Tier};
use crate::unit::AmpelUnit;

/// Errors raised by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// The declaration failed its contract check.
    #[error(transparent)]
    Contract(#[from] ContractError),
    /// A class with that name is already known.
    #[error("unit class {name} is already registered")]
    Duplicate {
        /// Class name.
        name: String,
    },
    /// No class with that name is known.
    #[error("unknown unit class {name}")]
    Unknown {
        /// Class name.
        name: String,
    },
    /// The catalog was sealed.
    #[error(transparent)]
    Sealed(#[from] ImmutabilityError),
}

/// Named unit classes derived from the tier interfaces.
#[derive(Debug)]
pub struct UnitCatalog {
    checker: ContractChecker,
    interfaces: Interfaces,
    classes: Freezable<BTreeMap<String, Arc<Class>>>,
}

impl UnitCatalog {
    /// Empty catalog whose interfaces and classes are checked with `policy`.
    pub fn new(policy: SignaturePolicy) -> Result<Self, CatalogError> {
        let checker = ContractChecker::new(policy);
        Ok(Self {
            interfaces: Interfaces::define(&checker)?,
            checker,
            classes: Freezable::new(BTreeMap::new()),
        })
    }

    /// The tier interfaces classes derive from.
    pub const fn interfaces(&self) -> &Interfaces {
        &self.interfaces
    }

    /// Contract-checks `decl` and registers the resulting class.
    pub fn define(&mut self, decl: ClassDecl) -> Result<Arc<Class>, CatalogError> {
        let name = decl.name().to_owned();
        let reserved = self.interfaces.classes().any(|c| c.name() == name);
        let classes = self.classes.try_mut()?;
        if reserved || classes.contains_key(&name) {
            return Err(CatalogError::Duplicate { name });
        }
        let class = self.checker.define(decl)?;
        classes.insert(name, Arc::clone(&class));
        info!(class = %class.name(), is_abstract = class.is_abstract(), "unit class registered");
        Ok(class)
    }

    /// Registers the Rust unit `U` as an implementation of `tier`.
    ///
    /// The trait bound already guarantees the methods, so the class simply
    /// implements every abstract method of the interface as declared.
    pub fn register<U: AmpelUnit>(&mut self, tier: Tier) -> Result<Arc<Class>, CatalogError> {
        let iface = self.interfaces.tier(tier);
        let decl = iface
            .abstract_methods()
            .into_iter()
            .fold(ClassDecl::new(U::NAME).extends(iface), |decl, m| {
                decl.with(m.implemented())
            });
        self.define(decl)
    }

    /// Class named `name` (registered classes and interfaces).
    pub fn get(&self, name: &str) -> Option<&Arc<Class>> {
        self.classes
            .get()
            .get(name)
            .or_else(|| self.interfaces.classes().find(|c| c.name() == name))
    }

    /// Instantiates the class named `name`.
    pub fn instantiate(&self, name: &str) -> Result<Instance, CatalogError> {
        let class = self.get(name).ok_or_else(|| CatalogError::Unknown {
            name: name.to_owned(),
        })?;
        Ok(class.instantiate()?)
    }

    /// Registered classes deriving from the interface of `tier`.
    pub fn units_of(&self, tier: Tier) -> Vec<&Arc<Class>> {
        let iface = self.interfaces.tier(tier);
        self.classes
            .get()
            .values()
            .filter(|c| c.is_subclass_of(iface))
            .collect()
    }

    /// Rejects any further registration.
    pub fn seal(&mut self) {
        self.classes.freeze();
    }

    /// Whether [`UnitCatalog::seal`] was called.
    pub const fn is_sealed(&self) -> bool {
        self.classes.is_frozen()
    }

    /// Registered class names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.classes.get().keys().map(String::as_str).collect()
    }

    /// Number of registered classes (interfaces excluded).
    pub fn len(&self) -> usize {
        self.classes.get().len()
    }

    /// Whether no class was registered.
    pub fn is_empty(&self) -> bool {
        self.classes.get().is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn catalog() -> UnitCatalog {
        UnitCatalog::new(SignaturePolicy::Exact).unwrap()
    }

    #[test]
    fn runtime_declared_feature_unit() {
        let mut cat = catalog();
        let iface = Arc::clone(cat.interfaces().tier(Tier::FeatureUnit));
        let ok = ClassDecl::new("T2Fit")
            .extends(&iface)
            .method("new", &["logger", "init_config", "resources"])
            .method("run", &["light_curve", "run_config"]);
        cat.define(ok).unwrap();
        assert!(cat.instantiate("T2Fit").is_ok());
        assert!(matches!(
            cat.instantiate("AbstractFeatureUnit"),
            Err(CatalogError::Contract(ContractError::AbstractInstantiation { .. }))
        ));
        assert_eq!(cat.units_of(Tier::FeatureUnit).len(), 1);
        assert!(cat.units_of(Tier::AlertFilter).is_empty());
    }

    #[test]
    fn names_are_unique_and_interfaces_reserved() {
        let mut cat = catalog();
        let iface = Arc::clone(cat.interfaces().tier(Tier::ReactiveUnit));
        let decl = || {
            ClassDecl::new("Notifier")
                .extends(&iface)
                .mark_abstract()
        };
        cat.define(decl()).unwrap();
        assert_eq!(
            cat.define(decl()).unwrap_err(),
            CatalogError::Duplicate {
                name: "Notifier".into()
            }
        );
        assert!(matches!(
            cat.define(ClassDecl::new("AmpelUnit")),
            Err(CatalogError::Duplicate { .. })
        ));
    }

    #[test]
    fn sealed_catalog_rejects_registration() {
        let mut cat = catalog();
        cat.seal();
        assert!(cat.is_sealed());
        assert!(matches!(
            cat.define(ClassDecl::new("Late")),
            Err(CatalogError::Sealed(_))
        ));
        assert!(cat.is_empty());
        assert!(matches!(
            cat.instantiate("Late"),
            Err(CatalogError::Unknown { .. })
        ));
    }
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! ampel-abstract: unit contracts for every pipeline tier.
//!
//! Two ways to define a unit coexist:
//!
//! - Rust units implement [`AmpelUnit`] and one tier trait ([`AlertFilter`],
//!   [`DataShaper`], [`StateBuilder`], [`FeatureUnit`], [`ReactiveUnit`]);
//!   the compiler checks conformance.
//! - Runtime-declared classes ([`ClassDecl`]) are checked by
//!   [`ContractChecker`] when defined, against the interface classes in
//!   [`Interfaces`].
//!
//! [`UnitCatalog`] holds both kinds under their interface.
#![forbid(unsafe_code)]

mod catalog;
mod contract;
mod interfaces;
mod unit;

/// Startup unit registry.
pub use catalog::{CatalogError, UnitCatalog};
/// Definition-time contract checks.
pub use contract::{
    Class, ClassDecl, ContractChecker, ContractError, Instance, MethodDecl, SignaturePolicy,
};
/// Interface classes per tier.
pub use interfaces::{interfaces, Interfaces, Tier, AMPEL_UNIT};
/// Unit traits.
pub use unit::{
    instantiate, AlertFilter, AmpelUnit, DataShaper, FeatureUnit, JournalUpdate, ReactiveUnit,
    Resources, StateBuilder, UnitError,
};

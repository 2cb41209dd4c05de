// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Record types built from raw loader mappings.
mod compound;
mod datapoint;
pub mod schema;
mod t2record;

pub use compound::{Compound, COMPOUND_SCHEMA};
pub use datapoint::{DataPoint, DATAPOINT_SCHEMA};
pub use t2record::{T2Record, T2RECORD_SCHEMA};

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared test doubles and fixtures for Ampel crates.
//!
//! # Modules
//!
//! - [`config`] - In-memory configuration source
//! - [`logger`] - Recording unit logger and test tracing setup
//! - [`photometry`] - ZTF-like packets, data points and light curves
//! - [`units`] - One sample unit per tier
#![forbid(unsafe_code)]

pub mod config;
pub mod logger;
pub mod photometry;
pub mod units;

pub use config::InMemoryConfigSource;
pub use logger::{init_test_tracing, RecordingLogger};
pub use photometry::{binary_id, datapoints, lightcurve, ztf_packet};
pub use units::{JournalReporter, MagnitudeFilter, PointCounter, SimpleStateBuilder, ZtfShaper};

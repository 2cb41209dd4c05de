// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! ampel-config: the dotted-path configuration tree and the port it is
//! loaded through.
#![forbid(unsafe_code)]

pub mod source;
mod tree;

/// Loading port.
pub use source::{ConfigError, ConfigSource};
/// Configuration tree.
pub use tree::AmpelConfig;

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! ampel-view: read-only views over records, with filter and keyword-aware
//! queries.
#![forbid(unsafe_code)]

mod alert;
mod filter;
mod item;
mod journal;
mod keywords;
mod lightcurve;
mod photo;

pub use alert::{AlertError, AlertView};
pub use filter::{Filter, FilterError, Filters, Operator};
pub use item::{ItemView, ItemViewBuilder, JournalTime, TimeFormat};
pub use journal::{latest as latest_journal_entry, JournalEntry, JournalQuery};
pub use keywords::KeywordMap;
pub use lightcurve::{LightCurve, PosMode, Position};
pub use photo::{PhotoQuery, Photometry};

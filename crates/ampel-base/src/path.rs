// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Dotted key paths into frozen trees (`"channel.NAME.sources.0"`).

use std::fmt;
use std::sync::Arc;

use crate::freeze::{FrozenMap, FrozenValue};

/// One step of a [`KeyPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Mapping key.
    Key(String),
    /// Purely numeric segment: a sequence index, or the mapping key spelled
    /// exactly as `text` (leading zeros included) when the parent is a
    /// mapping.
    Index {
        /// Parsed index.
        index: usize,
        /// Segment as written.
        text: String,
    },
}

impl PathSegment {
    /// The segment as written in the path.
    #[must_use]
    pub fn as_key(&self) -> &str {
        match self {
            Self::Key(text) | Self::Index { text, .. } => text,
        }
    }
}

/// A parsed dotted path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct KeyPath {
    segments: Vec<PathSegment>,
}

impl KeyPath {
    /// Splits `path` on `.`; segments made only of ASCII digits become
    /// [`PathSegment::Index`]. The empty string is the root path.
    #[must_use]
    pub fn parse(path: &str) -> Self {
        if path.is_empty() {
            return Self::default();
        }
        let segments = path
            .split('.')
            .map(|seg| {
                if !seg.is_empty() && seg.bytes().all(|b| b.is_ascii_digit()) {
                    seg.parse::<usize>().map_or_else(
                        |_| PathSegment::Key(seg.to_owned()),
                        |index| PathSegment::Index {
                            index,
                            text: seg.to_owned(),
                        },
                    )
                } else {
                    PathSegment::Key(seg.to_owned())
                }
            })
            .collect();
        Self { segments }
    }

    /// The parsed segments in order.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Whether this is the root path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

impl From<&str> for KeyPath {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{seg}")?;
        }
        Ok(())
    }
}

fn step<'a>(node: &'a FrozenValue, seg: &PathSegment) -> Option<&'a FrozenValue> {
    match (node, seg) {
        (FrozenValue::Map(m), seg) => m.get(seg.as_key()),
        (FrozenValue::Seq(items), PathSegment::Index { index, .. }) => items.get(*index),
        _ => None,
    }
}

impl FrozenValue {
    /// Resolves `path` against this value, returning `None` as soon as any
    /// segment is missing or the current node cannot be indexed.
    pub fn lookup<'a>(&'a self, path: &KeyPath) -> Option<&'a FrozenValue> {
        path.segments.iter().try_fold(self, step)
    }

    /// Returns a copy of this tree with `value` stored at `path`.
    ///
    /// Missing intermediate mappings are created. Existing sequences accept
    /// an index within bounds or one past the end (append). Returns `None`
    /// when the path crosses a scalar or an out-of-range index.
    #[must_use]
    pub fn with_value_at(&self, path: &KeyPath, value: Self) -> Option<Self> {
        set_at(self, path.segments(), value)
    }
}

fn set_at(node: &FrozenValue, segments: &[PathSegment], value: FrozenValue) -> Option<FrozenValue> {
    let Some((head, rest)) = segments.split_first() else {
        return Some(value);
    };
    match node {
        FrozenValue::Map(map) => {
            let key = head.as_key().to_owned();
            let child = map.get(&key).cloned().unwrap_or_default();
            let updated = set_at(&child, rest, value)?;
            let mut next: FrozenMap = (**map).clone();
            next.insert(key, updated);
            Some(FrozenValue::Map(Arc::new(next)))
        }
        FrozenValue::Seq(items) => {
            let PathSegment::Index { index: i, .. } = head else {
                return None;
            };
            let i = *i;
            let mut next = items.to_vec();
            let child = next.get(i).cloned().unwrap_or_default();
            let updated = set_at(&child, rest, value)?;
            match i.cmp(&next.len()) {
                std::cmp::Ordering::Less => next[i] = updated,
                std::cmp::Ordering::Equal => next.push(updated),
                std::cmp::Ordering::Greater => return None,
            }
            Some(FrozenValue::from(next))
        }
        FrozenValue::Null => {
            let child = set_at(&FrozenValue::Null, rest, value)?;
            Some(FrozenValue::map([(head.as_key().to_owned(), child)]))
        }
        _ => None,
    }
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Deeply immutable values.
//!
//! [`FrozenValue`] is the read-only counterpart of [`serde_json::Value`]:
//! mappings become immutable sorted maps, sequences become fixed-length slices
//! and sets become immutable ordered sets. Every container is reference
//! counted, so cloning a frozen value shares the underlying data instead of
//! copying it.
//!
//! [`freeze`] and [`thaw`] are exact inverses over JSON values:
//! `thaw(&freeze(&x)) == x` for every `x: serde_json::Value`. The two
//! non-JSON variants thaw lossily: sets become arrays in canonical order and
//! byte strings become lowercase hex text.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use serde::ser::{Serialize, Serializer};
use serde_json::{Map, Number, Value};

/// Immutable mapping type held by [`FrozenValue::Map`].
pub type FrozenMap = BTreeMap<String, FrozenValue>;

/// A deeply read-only value.
///
/// Equality is structural and representation-aware (`1` and `1.0` differ);
/// use [`FrozenValue::loose_eq`] and [`FrozenValue::compare`] for the numeric
/// comparisons applied by query filters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum FrozenValue {
    /// Absent / null.
    #[default]
    Null,
    /// Boolean scalar.
    Bool(bool),
    /// Integer or float scalar.
    Number(Number),
    /// UTF-8 text.
    Text(Arc<str>),
    /// Opaque byte string (binary identifiers).
    Bytes(Arc<[u8]>),
    /// Fixed-length ordered sequence.
    Seq(Arc<[FrozenValue]>),
    /// Immutable ordered set.
    Set(Arc<BTreeSet<FrozenValue>>),
    /// Immutable mapping with sorted keys.
    Map(Arc<FrozenMap>),
}

/// Recursively converts a JSON value into its frozen form.
pub fn freeze(value: &Value) -> FrozenValue {
    match value {
        Value::Null => FrozenValue::Null,
        Value::Bool(b) => FrozenValue::Bool(*b),
        Value::Number(n) => FrozenValue::Number(n.clone()),
        Value::String(s) => FrozenValue::Text(Arc::from(s.as_str())),
        Value::Array(items) => FrozenValue::Seq(items.iter().map(freeze).collect()),
        Value::Object(entries) => FrozenValue::Map(Arc::new(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), freeze(v)))
                .collect(),
        )),
    }
}

/// Recursively converts a frozen value back into an ordinary JSON value.
pub fn thaw(value: &FrozenValue) -> Value {
    match value {
        FrozenValue::Null => Value::Null,
        FrozenValue::Bool(b) => Value::Bool(*b),
        FrozenValue::Number(n) => Value::Number(n.clone()),
        FrozenValue::Text(s) => Value::String(s.to_string()),
        FrozenValue::Bytes(b) => Value::String(hex::encode(b)),
        FrozenValue::Seq(items) => Value::Array(items.iter().map(thaw).collect()),
        FrozenValue::Set(items) => Value::Array(items.iter().map(thaw).collect()),
        FrozenValue::Map(entries) => Value::Object(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), thaw(v)))
                .collect::<Map<String, Value>>(),
        ),
    }
}

impl FrozenValue {
    /// Builds a frozen mapping from key/value pairs.
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, FrozenValue)>,
    {
        Self::Map(Arc::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    /// Builds a frozen sequence.
    pub fn seq<I>(items: I) -> Self
    where
        I: IntoIterator<Item = FrozenValue>,
    {
        Self::Seq(items.into_iter().collect())
    }

    /// Builds a frozen set (duplicates collapse).
    pub fn set<I>(items: I) -> Self
    where
        I: IntoIterator<Item = FrozenValue>,
    {
        Self::Set(Arc::new(items.into_iter().collect()))
    }

    /// Builds a frozen byte string.
    pub fn bytes(bytes: impl AsRef<[u8]>) -> Self {
        Self::Bytes(Arc::from(bytes.as_ref()))
    }

    /// Returns a short name for the variant, used in error messages.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Seq(_) => "sequence",
            Self::Set(_) => "set",
            Self::Map(_) => "mapping",
        }
    }

    /// Returns `true` for [`FrozenValue::Null`].
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the boolean payload.
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the value as `i64` when it is an integer in range.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    /// Returns the value as `u64` when it is a non-negative integer.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    /// Returns the value as `f64` for any number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// Returns the text payload.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    /// Returns the byte payload.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b.as_ref()),
            _ => None,
        }
    }

    /// Returns the items of a sequence.
    pub fn as_seq(&self) -> Option<&[FrozenValue]> {
        match self {
            Self::Seq(items) => Some(items.as_ref()),
            _ => None,
        }
    }

    /// Returns the members of a set.
    pub fn as_set(&self) -> Option<&BTreeSet<FrozenValue>> {
        match self {
            Self::Set(items) => Some(items.as_ref()),
            _ => None,
        }
    }

    /// Returns the entries of a mapping.
    pub fn as_map(&self) -> Option<&FrozenMap> {
        match self {
            Self::Map(entries) => Some(entries.as_ref()),
            _ => None,
        }
    }

    /// Looks up `key` when `self` is a mapping.
    pub fn get(&self, key: &str) -> Option<&FrozenValue> {
        self.as_map().and_then(|m| m.get(key))
    }

    /// Looks up position `index` when `self` is a sequence.
    pub fn get_index(&self, index: usize) -> Option<&FrozenValue> {
        self.as_seq().and_then(|s| s.get(index))
    }

    /// Equality with numeric coercion (`1 == 1.0`), as used by the `==`
    /// and `!=` filter operators. Non-numeric values compare structurally.
    pub fn loose_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Number(_), Self::Number(_)) => self.compare(other) == Some(Ordering::Equal),
            _ => self == other,
        }
    }

    /// Semantic ordering between comparable values.
    ///
    /// Numbers compare numerically, text and bytes lexicographically, booleans
    /// `false < true`, sequences element-wise. Any other pairing (including
    /// mixed kinds) is incomparable and yields `None`.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::Number(a), Self::Number(b)) => numeric_cmp(a, b),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::Bytes(a), Self::Bytes(b)) => Some(a.cmp(b)),
            (Self::Seq(a), Self::Seq(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.compare(y)? {
                        Ordering::Equal => {}
                        ord => return Some(ord),
                    }
                }
                Some(a.len().cmp(&b.len()))
            }
            _ => None,
        }
    }

    const fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Number(_) => 2,
            Self::Text(_) => 3,
            Self::Bytes(_) => 4,
            Self::Seq(_) => 5,
            Self::Set(_) => 6,
            Self::Map(_) => 7,
        }
    }
}

fn numeric_cmp(a: &Number, b: &Number) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return Some(x.cmp(&y));
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return Some(x.cmp(&y));
    }
    a.as_f64()?.partial_cmp(&b.as_f64()?)
}

fn number_repr(n: &Number) -> u8 {
    if n.is_u64() {
        0
    } else if n.is_i64() {
        1
    } else {
        2
    }
}

// Total order used for set membership: kinds rank first, numbers compare by
// value and then by representation so that `Ord` agrees with `Eq`.
impl Ord for FrozenValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Number(a), Self::Number(b)) => match numeric_cmp(a, b) {
                Some(Ordering::Equal) | None => number_repr(a).cmp(&number_repr(b)),
                Some(ord) => ord,
            },
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Bytes(a), Self::Bytes(b)) => a.cmp(b),
            (Self::Seq(a), Self::Seq(b)) => a.iter().cmp(b.iter()),
            (Self::Set(a), Self::Set(b)) => a.iter().cmp(b.iter()),
            (Self::Map(a), Self::Map(b)) => a.iter().cmp(b.iter()),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for FrozenValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<Value> for FrozenValue {
    fn from(value: Value) -> Self {
        freeze(&value)
    }
}

impl From<&FrozenValue> for Value {
    fn from(value: &FrozenValue) -> Self {
        thaw(value)
    }
}

impl From<bool> for FrozenValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FrozenValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<i32> for FrozenValue {
    fn from(value: i32) -> Self {
        Self::Number(value.into())
    }
}

impl From<u64> for FrozenValue {
    fn from(value: u64) -> Self {
        Self::Number(value.into())
    }
}

/// Non-finite floats have no JSON representation and freeze to `Null`.
impl From<f64> for FrozenValue {
    fn from(value: f64) -> Self {
        Number::from_f64(value).map_or(Self::Null, Self::Number)
    }
}

impl From<&str> for FrozenValue {
    fn from(value: &str) -> Self {
        Self::Text(Arc::from(value))
    }
}

impl From<String> for FrozenValue {
    fn from(value: String) -> Self {
        Self::Text(Arc::from(value))
    }
}

impl From<Vec<FrozenValue>> for FrozenValue {
    fn from(items: Vec<FrozenValue>) -> Self {
        Self::Seq(Arc::from(items))
    }
}

impl From<FrozenMap> for FrozenValue {
    fn from(entries: FrozenMap) -> Self {
        Self::Map(Arc::new(entries))
    }
}

impl fmt::Display for FrozenValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", thaw(self))
    }
}

impl Serialize for FrozenValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => n.serialize(serializer),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Bytes(b) => serializer.serialize_str(&hex::encode(b)),
            Self::Seq(items) => serializer.collect_seq(items.iter()),
            Self::Set(items) => serializer.collect_seq(items.iter()),
            Self::Map(entries) => serializer.collect_map(entries.iter()),
        }
    }
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Attribute filters: `{attribute, operator, value}` triples combined with AND.
//!
//! A record lacking the filtered attribute fails that filter. Ordered
//! operators only match comparable values (numbers with numbers, text with
//! text); anything else is a non-match rather than an error.
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use ampel_base::{freeze, FrozenValue};
use serde::Serialize;
use thiserror::Error;

use crate::keywords::KeywordMap;
use crate::photo::Photometry;

/// Errors raised while parsing filter specifications.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// Operator text is not one of the supported operators.
    #[error("unknown filter operator {0:?}")]
    UnknownOperator(String),
    /// Filter specification has the wrong shape.
    #[error("malformed filter: {0}")]
    Malformed(&'static str),
}

/// Comparison applied by a [`Filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `>`
    Gt,
    /// `<`
    Lt,
    /// `>=`
    Ge,
    /// `<=`
    Le,
    /// `==`, numbers compare by value (`1 == 1.0`).
    Eq,
    /// `!=`
    Ne,
    /// `is`, strict equality without numeric coercion.
    Is,
    /// `is not`
    IsNot,
}

impl Operator {
    /// Operator symbol.
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Is => "is",
            Self::IsNot => "is not",
        }
    }

    /// Evaluates `lhs <op> rhs`.
    pub fn apply(self, lhs: &FrozenValue, rhs: &FrozenValue) -> bool {
        let ord = || lhs.compare(rhs);
        match self {
            Self::Gt => ord() == Some(Ordering::Greater),
            Self::Lt => ord() == Some(Ordering::Less),
            Self::Ge => matches!(ord(), Some(Ordering::Greater | Ordering::Equal)),
            Self::Le => matches!(ord(), Some(Ordering::Less | Ordering::Equal)),
            Self::Eq => lhs.loose_eq(rhs),
            Self::Ne => !lhs.loose_eq(rhs),
            Self::Is => lhs == rhs,
            Self::IsNot => lhs != rhs,
        }
    }
}

impl FromStr for Operator {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            ">" => Self::Gt,
            "<" => Self::Lt,
            ">=" => Self::Ge,
            "<=" => Self::Le,
            "==" => Self::Eq,
            "!=" => Self::Ne,
            "is" => Self::Is,
            "is not" => Self::IsNot,
            other => return Err(FilterError::UnknownOperator(other.to_owned())),
        })
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl Serialize for Operator {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.symbol())
    }
}

/// One attribute test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Filter {
    /// Field name, translated through the view's keyword table.
    pub attribute: String,
    /// Comparison.
    pub operator: Operator,
    /// Right-hand side.
    pub value: FrozenValue,
}

impl Filter {
    /// Builds a filter.
    pub fn new(
        attribute: impl Into<String>,
        operator: Operator,
        value: impl Into<FrozenValue>,
    ) -> Self {
        Self {
            attribute: attribute.into(),
            operator,
            value: value.into(),
        }
    }

    /// Parses `{"attribute": .., "operator": .., "value": ..}`.
    pub fn from_frozen(spec: &FrozenValue) -> Result<Self, FilterError> {
        let map = spec
            .as_map()
            .ok_or(FilterError::Malformed("filter must be a mapping"))?;
        let attribute = map
            .get("attribute")
            .and_then(FrozenValue::as_str)
            .ok_or(FilterError::Malformed("'attribute' must be text"))?;
        let operator = map
            .get("operator")
            .and_then(FrozenValue::as_str)
            .ok_or(FilterError::Malformed("'operator' must be text"))?
            .parse()?;
        let value = map
            .get("value")
            .cloned()
            .ok_or(FilterError::Malformed("'value' is missing"))?;
        Ok(Self {
            attribute: attribute.to_owned(),
            operator,
            value,
        })
    }

    /// Whether `record` passes this filter.
    pub fn matches<R: Photometry + ?Sized>(&self, record: &R, keywords: &KeywordMap) -> bool {
        record
            .field(keywords.translate(&self.attribute))
            .is_some_and(|v| self.operator.apply(v, &self.value))
    }
}

/// Conjunction of filters, evaluated left to right.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Filters(Vec<Filter>);

impl Filters {
    /// Accepts a single filter mapping or a sequence of them.
    pub fn from_frozen(spec: &FrozenValue) -> Result<Self, FilterError> {
        match spec {
            FrozenValue::Map(_) => Ok(Self(vec![Filter::from_frozen(spec)?])),
            FrozenValue::Seq(items) => items
                .iter()
                .map(Filter::from_frozen)
                .collect::<Result<Vec<_>, _>>()
                .map(Self),
            _ => Err(FilterError::Malformed(
                "filters must be a mapping or a sequence",
            )),
        }
    }

    /// Same as [`Filters::from_frozen`] for JSON input.
    pub fn from_json(spec: &serde_json::Value) -> Result<Self, FilterError> {
        Self::from_frozen(&freeze(spec))
    }

    /// The filters in evaluation order.
    pub fn as_slice(&self) -> &[Filter] {
        &self.0
    }

    /// Whether every filter passes.
    pub fn matches<R: Photometry + ?Sized>(&self, record: &R, keywords: &KeywordMap) -> bool {
        self.0.iter().all(|f| f.matches(record, keywords))
    }
}

impl From<Filter> for Filters {
    fn from(filter: Filter) -> Self {
        Self(vec![filter])
    }
}

impl From<Vec<Filter>> for Filters {
    fn from(filters: Vec<Filter>) -> Self {
        Self(filters)
    }
}

impl FromIterator<Filter> for Filters {
    fn from_iter<I: IntoIterator<Item = Filter>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

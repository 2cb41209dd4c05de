// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Freeze guard: a wrapper that rejects mutation once frozen.

use std::any::type_name;
use std::ops::Deref;

use thiserror::Error;

/// Returned when something attempts to modify a frozen object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{type_name} is read only")]
pub struct ImmutabilityError {
    /// Type name of the frozen object.
    pub type_name: &'static str,
}

/// Wraps a value and tracks whether it has been frozen.
///
/// Reads are always permitted. Mutation goes through [`Freezable::try_mut`]
/// or [`Freezable::update`], both of which fail with [`ImmutabilityError`]
/// after [`Freezable::freeze`] has been called. Freezing is one way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Freezable<T> {
    value: T,
    frozen: bool,
}

impl<T> Freezable<T> {
    /// Wraps `value` in the mutable state.
    pub const fn new(value: T) -> Self {
        Self {
            value,
            frozen: false,
        }
    }

    /// Wraps `value` already frozen.
    pub const fn frozen(value: T) -> Self {
        Self {
            value,
            frozen: true,
        }
    }

    /// Whether mutation is currently rejected.
    pub const fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Locks the value. Calling this on an already frozen object is a no-op.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Shared access to the wrapped value.
    pub const fn get(&self) -> &T {
        &self.value
    }

    /// Exclusive access, refused once frozen.
    pub fn try_mut(&mut self) -> Result<&mut T, ImmutabilityError> {
        if self.frozen {
            return Err(self.error());
        }
        Ok(&mut self.value)
    }

    /// Applies `f` to the wrapped value unless frozen.
    pub fn update<R>(&mut self, f: impl FnOnce(&mut T) -> R) -> Result<R, ImmutabilityError> {
        self.try_mut().map(f)
    }

    /// Unwraps the value, discarding the frozen flag.
    pub fn into_inner(self) -> T {
        self.value
    }

    fn error(&self) -> ImmutabilityError {
        ImmutabilityError {
            type_name: short_type_name::<T>(),
        }
    }
}

impl<T> Deref for Freezable<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

fn short_type_name<T>() -> &'static str {
    let full = type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn mutation_allowed_until_frozen() {
        let mut guard = Freezable::new(BTreeMap::new());
        guard.try_mut().unwrap().insert("a", 1);
        guard.freeze();
        let err = guard.update(|m| m.insert("b", 2)).unwrap_err();
        assert_eq!(err.type_name, "BTreeMap");
        assert_eq!(err.to_string(), "BTreeMap is read only");
        assert_eq!(guard.get().len(), 1);
        assert_eq!(guard.get().get("a"), Some(&1));
    }

    #[test]
    fn refreezing_is_allowed() {
        let mut guard = Freezable::frozen(5_u8);
        guard.freeze();
        assert!(guard.is_frozen());
        assert_eq!(guard.into_inner(), 5);
    }
}

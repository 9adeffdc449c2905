//! Typed property bag carried by the execution context.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

/// A statically-declared key for a value of type `T` in [`ResilienceProperties`].
///
/// Keys with the same name but different value types address different entries.
///
/// ```
/// use resiliflow::context::PropertyKey;
///
/// const ATTEMPT: PropertyKey<u32> = PropertyKey::new("attempt");
/// assert_eq!(ATTEMPT.name(), "attempt");
/// ```
pub struct PropertyKey<T> {
    name: &'static str,
    _value: PhantomData<fn() -> T>,
}

impl<T> PropertyKey<T> {
    /// Creates a new key.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _value: PhantomData,
        }
    }

    /// Returns the key name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for PropertyKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for PropertyKey<T> {}

impl<T> fmt::Debug for PropertyKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyKey")
            .field("name", &self.name)
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PropertyId {
    type_id: TypeId,
    name: &'static str,
}

impl PropertyId {
    fn of<T: 'static>(key: PropertyKey<T>) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: key.name,
        }
    }
}

/// A property bag whose entries are addressed by [`PropertyKey`] tokens.
///
/// The bag is owned by a single execution at a time, so no locking is needed.
#[derive(Default)]
pub struct ResilienceProperties {
    entries: HashMap<PropertyId, Box<dyn Any + Send + Sync>>,
}

impl ResilienceProperties {
    /// Creates a new empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a value, replacing any previous value stored under the same key.
    pub fn set<T: Send + Sync + 'static>(&mut self, key: PropertyKey<T>, value: T) {
        self.entries.insert(PropertyId::of(key), Box::new(value));
    }

    /// Gets a value.
    #[must_use]
    pub fn get<T: 'static>(&self, key: PropertyKey<T>) -> Option<&T> {
        self.entries
            .get(&PropertyId::of(key))
            .and_then(|value| value.downcast_ref::<T>())
    }

    /// Gets a mutable reference to a value.
    pub fn get_mut<T: 'static>(&mut self, key: PropertyKey<T>) -> Option<&mut T> {
        self.entries
            .get_mut(&PropertyId::of(key))
            .and_then(|value| value.downcast_mut::<T>())
    }

    /// Gets a copy of a value, or `default` if absent.
    #[must_use]
    pub fn get_or<T: Clone + 'static>(&self, key: PropertyKey<T>, default: T) -> T {
        self.get(key).cloned().unwrap_or(default)
    }

    /// Gets a copy of a value, or `T::default()` if absent.
    #[must_use]
    pub fn get_or_default<T: Clone + Default + 'static>(&self, key: PropertyKey<T>) -> T {
        self.get(key).cloned().unwrap_or_default()
    }

    /// Removes and returns a value.
    pub fn remove<T: 'static>(&mut self, key: PropertyKey<T>) -> Option<T> {
        self.entries
            .remove(&PropertyId::of(key))
            .and_then(|value| value.downcast::<T>().ok())
            .map(|value| *value)
    }

    /// Checks if a value is stored under the key.
    #[must_use]
    pub fn contains<T: 'static>(&self, key: PropertyKey<T>) -> bool {
        self.entries.contains_key(&PropertyId::of(key))
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the bag is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every entry, keeping the allocation for reuse.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl fmt::Debug for ResilienceProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.entries.keys().map(|id| id.name).collect();
        names.sort_unstable();
        f.debug_struct("ResilienceProperties")
            .field("keys", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ATTEMPTS: PropertyKey<u32> = PropertyKey::new("attempts");
    const ATTEMPTS_TEXT: PropertyKey<String> = PropertyKey::new("attempts");
    const TENANT: PropertyKey<String> = PropertyKey::new("tenant");

    #[test]
    fn test_set_and_get() {
        let mut props = ResilienceProperties::new();
        props.set(ATTEMPTS, 3);

        assert_eq!(props.get(ATTEMPTS), Some(&3));
        assert!(props.contains(ATTEMPTS));
        assert!(!props.contains(TENANT));
    }

    #[test]
    fn test_same_name_different_type_are_distinct() {
        let mut props = ResilienceProperties::new();
        props.set(ATTEMPTS, 3);
        props.set(ATTEMPTS_TEXT, "three".to_string());

        assert_eq!(props.len(), 2);
        assert_eq!(props.get(ATTEMPTS), Some(&3));
        assert_eq!(props.get(ATTEMPTS_TEXT).map(String::as_str), Some("three"));
    }

    #[test]
    fn test_set_overwrites() {
        let mut props = ResilienceProperties::new();
        props.set(TENANT, "a".to_string());
        props.set(TENANT, "b".to_string());

        assert_eq!(props.len(), 1);
        assert_eq!(props.get_or(TENANT, String::new()), "b");
    }

    #[test]
    fn test_defaults_when_absent() {
        let props = ResilienceProperties::new();

        assert_eq!(props.get_or(ATTEMPTS, 7), 7);
        assert_eq!(props.get_or_default(TENANT), String::new());
    }

    #[test]
    fn test_get_mut_and_remove() {
        let mut props = ResilienceProperties::new();
        props.set(ATTEMPTS, 1);

        if let Some(attempts) = props.get_mut(ATTEMPTS) {
            *attempts += 1;
        }

        assert_eq!(props.remove(ATTEMPTS), Some(2));
        assert!(props.is_empty());
        assert_eq!(props.remove(ATTEMPTS), None);
    }

    #[test]
    fn test_clear() {
        let mut props = ResilienceProperties::new();
        props.set(ATTEMPTS, 1);
        props.set(TENANT, "t".to_string());

        props.clear();

        assert!(props.is_empty());
        assert_eq!(format!("{props:?}"), "ResilienceProperties { keys: [] }");
    }
}

//! Property bag shared between conventions
//!
//! Conventions pass information to later conventions through a
//! [`PropertyBag`]. Entries are keyed either by the value's type (one value
//! per type) or by a [`PropertyKey`], an opaque key object that callers agree
//! on out of band.
//!
//! The bag is not safe for concurrent mutation without external
//! synchronization; a composition run owns its bag exclusively.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

/// A well-known key for a value of type `T`.
///
/// Two keys are the same key when both their name and value type match.
pub struct PropertyKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> PropertyKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> fmt::Debug for PropertyKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PropertyKey").field(&self.name).finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Slot {
    Typed(TypeId),
    Keyed(&'static str, TypeId),
}

trait PropertyValue: Any + Send + Sync {
    fn clone_boxed(&self) -> Box<dyn PropertyValue>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn type_name(&self) -> &'static str;
}

impl<T: Any + Clone + Send + Sync> PropertyValue for T {
    fn clone_boxed(&self) -> Box<dyn PropertyValue> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        type_name::<T>()
    }
}

/// Heterogeneous map of shared values.
#[derive(Default)]
pub struct PropertyBag {
    values: HashMap<Slot, Box<dyn PropertyValue>>,
}

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    fn typed<T: 'static>() -> Slot {
        Slot::Typed(TypeId::of::<T>())
    }

    fn keyed<T: 'static>(key: &PropertyKey<T>) -> Slot {
        Slot::Keyed(key.name, TypeId::of::<T>())
    }

    fn get_slot<T: 'static>(&self, slot: Slot) -> Option<&T> {
        let value: &dyn PropertyValue = &**self.values.get(&slot)?;
        value.as_any().downcast_ref::<T>()
    }

    fn get_slot_mut<T: 'static>(&mut self, slot: Slot) -> Option<&mut T> {
        let value: &mut dyn PropertyValue = &mut **self.values.get_mut(&slot)?;
        value.as_any_mut().downcast_mut::<T>()
    }

    fn get_or_insert_slot<T, F>(&mut self, slot: Slot, f: F) -> &mut T
    where
        T: Any + Clone + Send + Sync,
        F: FnOnce() -> T,
    {
        let value: &mut dyn PropertyValue = &mut **self
            .values
            .entry(slot)
            .or_insert_with(|| Box::new(f()) as Box<dyn PropertyValue>);
        match value.as_any_mut().downcast_mut::<T>() {
            Some(value) => value,
            // Slots embed the value's TypeId, so the stored type always matches.
            None => unreachable!("property slot holds a different type"),
        }
    }

    /// Store a value keyed by its type, replacing any previous value.
    pub fn insert<T: Any + Clone + Send + Sync>(&mut self, value: T) -> &mut Self {
        self.values.insert(Self::typed::<T>(), Box::new(value));
        self
    }

    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.get_slot(Self::typed::<T>())
    }

    pub fn get_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.get_slot_mut(Self::typed::<T>())
    }

    pub fn get_or_insert_with<T, F>(&mut self, f: F) -> &mut T
    where
        T: Any + Clone + Send + Sync,
        F: FnOnce() -> T,
    {
        self.get_or_insert_slot(Self::typed::<T>(), f)
    }

    pub fn remove<T: 'static>(&mut self) -> bool {
        self.values.remove(&Self::typed::<T>()).is_some()
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.values.contains_key(&Self::typed::<T>())
    }

    /// Store a value under a well-known key, replacing any previous value.
    pub fn insert_keyed<T: Any + Clone + Send + Sync>(
        &mut self,
        key: &PropertyKey<T>,
        value: T,
    ) -> &mut Self {
        self.values.insert(Self::keyed(key), Box::new(value));
        self
    }

    pub fn get_keyed<T: 'static>(&self, key: &PropertyKey<T>) -> Option<&T> {
        self.get_slot(Self::keyed(key))
    }

    pub fn get_keyed_mut<T: 'static>(&mut self, key: &PropertyKey<T>) -> Option<&mut T> {
        self.get_slot_mut(Self::keyed(key))
    }

    pub fn get_or_insert_keyed<T, F>(&mut self, key: &PropertyKey<T>, f: F) -> &mut T
    where
        T: Any + Clone + Send + Sync,
        F: FnOnce() -> T,
    {
        self.get_or_insert_slot(Self::keyed(key), f)
    }

    pub fn remove_keyed<T: 'static>(&mut self, key: &PropertyKey<T>) -> bool {
        self.values.remove(&Self::keyed(key)).is_some()
    }

    pub fn contains_keyed<T: 'static>(&self, key: &PropertyKey<T>) -> bool {
        self.values.contains_key(&Self::keyed(key))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copy every entry of `other` into this bag, overwriting on conflict.
    pub fn extend_from(&mut self, other: &PropertyBag) {
        for (slot, value) in &other.values {
            self.values.insert(*slot, (**value).clone_boxed());
        }
    }
}

impl Clone for PropertyBag {
    fn clone(&self) -> Self {
        Self {
            values: self
                .values
                .iter()
                .map(|(slot, value)| (*slot, (**value).clone_boxed()))
                .collect(),
        }
    }
}

impl fmt::Debug for PropertyBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<String> = self
            .values
            .iter()
            .map(|(slot, value)| match slot {
                Slot::Typed(_) => (**value).type_name().to_string(),
                Slot::Keyed(name, _) => format!("{name}: {}", (**value).type_name()),
            })
            .collect();
        entries.sort();
        f.debug_set().entries(entries).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Marker(u32);

    const FIRST: PropertyKey<String> = PropertyKey::new("first");
    const SECOND: PropertyKey<String> = PropertyKey::new("second");
    const FIRST_AS_NUMBER: PropertyKey<u32> = PropertyKey::new("first");

    #[test]
    fn test_typed_insert_overwrites() {
        let mut bag = PropertyBag::new();
        bag.insert(Marker(1));
        bag.insert(Marker(2));

        assert_eq!(bag.get::<Marker>(), Some(&Marker(2)));
        assert_eq!(bag.len(), 1);
    }

    #[test]
    fn test_keyed_entries_are_independent() {
        let mut bag = PropertyBag::new();
        bag.insert_keyed(&FIRST, "a".to_string())
            .insert_keyed(&SECOND, "b".to_string())
            .insert_keyed(&FIRST_AS_NUMBER, 7);

        assert_eq!(bag.get_keyed(&FIRST).map(String::as_str), Some("a"));
        assert_eq!(bag.get_keyed(&SECOND).map(String::as_str), Some("b"));
        assert_eq!(bag.get_keyed(&FIRST_AS_NUMBER), Some(&7));
        assert!(bag.get::<String>().is_none());
        assert_eq!(bag.len(), 3);
    }

    #[test]
    fn test_get_or_insert_runs_factory_once() {
        let mut bag = PropertyBag::new();
        let mut calls = 0;
        *bag.get_or_insert_with(|| {
            calls += 1;
            Marker(1)
        }) = Marker(5);
        let value = bag.get_or_insert_with(|| {
            calls += 1;
            Marker(9)
        });

        assert_eq!(*value, Marker(5));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_clone_is_deep() {
        let mut original = PropertyBag::new();
        original.insert(vec![1, 2]);

        let mut copy = original.clone();
        copy.get_mut::<Vec<i32>>().unwrap().push(3);

        assert_eq!(original.get::<Vec<i32>>(), Some(&vec![1, 2]));
        assert_eq!(copy.get::<Vec<i32>>(), Some(&vec![1, 2, 3]));
    }

    #[test]
    fn test_remove_and_contains() {
        let mut bag = PropertyBag::new();
        bag.insert(Marker(1)).insert_keyed(&FIRST, "x".to_string());

        assert!(bag.contains::<Marker>());
        assert!(bag.remove::<Marker>());
        assert!(!bag.remove::<Marker>());
        assert!(bag.remove_keyed(&FIRST));
        assert!(bag.is_empty());
    }

    #[test]
    fn test_extend_from_overwrites() {
        let mut target = PropertyBag::new();
        target.insert(Marker(1)).insert(true);
        let mut source = PropertyBag::new();
        source.insert(Marker(2));

        target.extend_from(&source);
        assert_eq!(target.get::<Marker>(), Some(&Marker(2)));
        assert_eq!(target.get::<bool>(), Some(&true));
    }
}

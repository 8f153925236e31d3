//! Persistent set over the map machinery
//!
//! A set is a map from element to unit; the array/HAMT split and the
//! transient story carry over unchanged.

use std::hash::Hash;

use crate::map::{MapIter, PersistentMap, TransientMap};

pub struct PersistentSet<T> {
    map: PersistentMap<T, ()>,
}

impl<T> Clone for PersistentSet<T> {
    fn clone(&self) -> Self {
        PersistentSet {
            map: self.map.clone(),
        }
    }
}

impl<T: Hash + Eq + Clone> Default for PersistentSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Hash + Eq + Clone> PersistentSet<T> {
    pub fn new() -> Self {
        PersistentSet {
            map: PersistentMap::new(),
        }
    }

    pub fn from_items(items: Vec<T>) -> Self {
        let mut t = Self::new().transient();
        for item in items {
            t.conj(item);
        }
        t.persistent()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn contains(&self, item: &T) -> bool {
        self.map.contains_key(item)
    }

    pub fn conj(&self, item: T) -> Self {
        PersistentSet {
            map: self.map.assoc(item, ()),
        }
    }

    pub fn disj(&self, item: &T) -> Self {
        PersistentSet {
            map: self.map.dissoc(item),
        }
    }

    pub fn iter(&self) -> SetIter<'_, T> {
        SetIter {
            inner: self.map.iter(),
        }
    }

    pub fn transient(&self) -> TransientSet<T> {
        TransientSet {
            map: self.map.transient(),
        }
    }
}

pub struct SetIter<'a, T> {
    inner: MapIter<'a, T, ()>,
}

impl<'a, T> Iterator for SetIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        self.inner.next().map(|(k, _)| k)
    }
}

impl<'a, T: Hash + Eq + Clone> IntoIterator for &'a PersistentSet<T> {
    type Item = &'a T;
    type IntoIter = SetIter<'a, T>;

    fn into_iter(self) -> SetIter<'a, T> {
        self.iter()
    }
}

/// Mutable set builder; same ownership rules as [`TransientMap`].
pub struct TransientSet<T> {
    map: TransientMap<T, ()>,
}

impl<T: Hash + Eq + Clone> TransientSet<T> {
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn contains(&self, item: &T) -> bool {
        self.map.get(item).is_some()
    }

    pub fn conj(&mut self, item: T) {
        self.map.assoc(item, ());
    }

    pub fn disj(&mut self, item: &T) {
        self.map.dissoc(item);
    }

    pub fn persistent(self) -> PersistentSet<T> {
        PersistentSet {
            map: self.map.persistent(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conj_disj() {
        let s = PersistentSet::from_items(vec![1, 2, 3]);
        assert_eq!(s.len(), 3);
        assert!(s.contains(&2));
        let s2 = s.conj(4);
        assert!(!s.contains(&4));
        assert!(s2.contains(&4));
        let s3 = s2.disj(&1);
        assert!(!s3.contains(&1));
        assert_eq!(s3.len(), 3);
    }

    #[test]
    fn test_duplicates_collapse() {
        let s = PersistentSet::from_items(vec![1, 1, 2, 2, 2, 3]);
        assert_eq!(s.len(), 3);
    }

    #[test]
    fn test_large_set() {
        let s = PersistentSet::from_items((0..5000).collect());
        assert_eq!(s.len(), 5000);
        assert!(s.contains(&4999));
        assert!(!s.contains(&5000));
    }

    #[test]
    fn test_transient_roundtrip() {
        let mut t = PersistentSet::new().transient();
        for i in 0..100 {
            t.conj(i % 10);
        }
        let s = t.persistent();
        assert_eq!(s.len(), 10);
    }
}

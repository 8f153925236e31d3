//! Persistent map: array-map for small sizes, HAMT beyond
//!
//! Maps up to [`ARRAY_MAP_MAX`] entries are a flat insertion-ordered pair
//! vector (linear scan beats hashing at that size and preserves literal
//! entry order). The first assoc of a new key past the threshold promotes
//! to a hash-array-mapped trie with 32-way bitmap nodes and collision
//! leaves. Hashing uses the std `Hash` trait through a deterministic
//! hasher so tree shape is reproducible within a process.
//!
//! Node layout splits the bitmap in two (`datamap` for inline pairs,
//! `nodemap` for children) so a slot is always exactly one of: empty,
//! pair, subnode.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

const BITS: u32 = 5;
const MASK: u32 = 31;

/// Entry-count threshold at which an array-map becomes a HAMT.
pub const ARRAY_MAP_MAX: usize = 8;

fn key_hash<K: Hash>(k: &K) -> u32 {
    // DefaultHasher::new() is keyed with constants, so hashes are stable
    // for the life of the process (required for structural sharing between
    // values built at different times).
    let mut h = DefaultHasher::new();
    k.hash(&mut h);
    let full = h.finish();
    (full ^ (full >> 32)) as u32
}

#[derive(Clone)]
enum Node<K, V> {
    Bitmap {
        datamap: u32,
        nodemap: u32,
        /// Pairs in ascending bit-position order of their datamap bits.
        pairs: Vec<(K, V)>,
        /// Children in ascending bit-position order of their nodemap bits.
        children: Vec<Rc<Node<K, V>>>,
    },
    Collision {
        hash: u32,
        pairs: Vec<(K, V)>,
    },
}

#[inline]
fn bit_index(bitmap: u32, bit: u32) -> usize {
    (bitmap & (bit - 1)).count_ones() as usize
}

impl<K: Hash + Eq + Clone, V: Clone> Node<K, V> {
    fn empty_bitmap() -> Self {
        Node::Bitmap {
            datamap: 0,
            nodemap: 0,
            pairs: Vec::new(),
            children: Vec::new(),
        }
    }

    fn get<'a>(&'a self, hash: u32, shift: u32, key: &K) -> Option<&'a V> {
        match self {
            Node::Bitmap {
                datamap,
                nodemap,
                pairs,
                children,
            } => {
                let bit = 1u32 << ((hash >> shift) & MASK);
                if datamap & bit != 0 {
                    let (k, v) = &pairs[bit_index(*datamap, bit)];
                    if k == key {
                        return Some(v);
                    }
                    return None;
                }
                if nodemap & bit != 0 {
                    return children[bit_index(*nodemap, bit)].get(hash, shift + BITS, key);
                }
                None
            }
            Node::Collision { pairs, .. } => {
                pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v)
            }
        }
    }

    /// Returns the updated node and whether a new key was added.
    fn assoc(&self, hash: u32, shift: u32, key: K, value: V) -> (Rc<Node<K, V>>, bool) {
        match self {
            Node::Bitmap {
                datamap,
                nodemap,
                pairs,
                children,
            } => {
                let bit = 1u32 << ((hash >> shift) & MASK);
                if datamap & bit != 0 {
                    let idx = bit_index(*datamap, bit);
                    let (existing_k, existing_v) = &pairs[idx];
                    if *existing_k == key {
                        let mut pairs = pairs.clone();
                        pairs[idx] = (key, value);
                        return (
                            Rc::new(Node::Bitmap {
                                datamap: *datamap,
                                nodemap: *nodemap,
                                pairs,
                                children: children.clone(),
                            }),
                            false,
                        );
                    }
                    // Same 5-bit slice, different key: both pairs sink into
                    // a new subnode.
                    let child = merge_pairs(
                        (existing_k.clone(), existing_v.clone()),
                        key_hash(existing_k),
                        (key, value),
                        hash,
                        shift + BITS,
                    );
                    let mut pairs = pairs.clone();
                    pairs.remove(idx);
                    let nodemap = nodemap | bit;
                    let mut children = children.clone();
                    children.insert(bit_index(nodemap, bit), child);
                    return (
                        Rc::new(Node::Bitmap {
                            datamap: datamap & !bit,
                            nodemap,
                            pairs,
                            children,
                        }),
                        true,
                    );
                }
                if nodemap & bit != 0 {
                    let idx = bit_index(*nodemap, bit);
                    let (child, added) = children[idx].assoc(hash, shift + BITS, key, value);
                    let mut children = children.clone();
                    children[idx] = child;
                    return (
                        Rc::new(Node::Bitmap {
                            datamap: *datamap,
                            nodemap: *nodemap,
                            pairs: pairs.clone(),
                            children,
                        }),
                        added,
                    );
                }
                let datamap = datamap | bit;
                let mut pairs = pairs.clone();
                pairs.insert(bit_index(datamap, bit), (key, value));
                (
                    Rc::new(Node::Bitmap {
                        datamap,
                        nodemap: *nodemap,
                        pairs,
                        children: children.clone(),
                    }),
                    true,
                )
            }
            Node::Collision { hash: chash, pairs } => {
                if hash == *chash {
                    let mut pairs = pairs.clone();
                    if let Some(idx) = pairs.iter().position(|(k, _)| *k == key) {
                        pairs[idx] = (key, value);
                        return (
                            Rc::new(Node::Collision {
                                hash: *chash,
                                pairs,
                            }),
                            false,
                        );
                    }
                    pairs.push((key, value));
                    return (
                        Rc::new(Node::Collision {
                            hash: *chash,
                            pairs,
                        }),
                        true,
                    );
                }
                // Different hash: wrap the collision node in a bitmap node
                // and retry from there.
                let cbit = 1u32 << ((chash >> shift) & MASK);
                let wrapper = Node::Bitmap {
                    datamap: 0,
                    nodemap: cbit,
                    pairs: Vec::new(),
                    children: vec![Rc::new(self.clone())],
                };
                wrapper.assoc(hash, shift, key, value)
            }
        }
    }

    /// Returns `(replacement, removed)`; `None` replacement means the node
    /// became empty.
    fn dissoc(&self, hash: u32, shift: u32, key: &K) -> (Option<Rc<Node<K, V>>>, bool) {
        match self {
            Node::Bitmap {
                datamap,
                nodemap,
                pairs,
                children,
            } => {
                let bit = 1u32 << ((hash >> shift) & MASK);
                if datamap & bit != 0 {
                    let idx = bit_index(*datamap, bit);
                    if pairs[idx].0 != *key {
                        return (Some(Rc::new(self.clone())), false);
                    }
                    let datamap = datamap & !bit;
                    if datamap == 0 && *nodemap == 0 {
                        return (None, true);
                    }
                    let mut pairs = pairs.clone();
                    pairs.remove(idx);
                    return (
                        Some(Rc::new(Node::Bitmap {
                            datamap,
                            nodemap: *nodemap,
                            pairs,
                            children: children.clone(),
                        })),
                        true,
                    );
                }
                if nodemap & bit != 0 {
                    let idx = bit_index(*nodemap, bit);
                    let (child, removed) = children[idx].dissoc(hash, shift + BITS, key);
                    if !removed {
                        return (Some(Rc::new(self.clone())), false);
                    }
                    match child {
                        None => {
                            let nodemap = nodemap & !bit;
                            if *datamap == 0 && nodemap == 0 {
                                return (None, true);
                            }
                            let mut children = children.clone();
                            children.remove(idx);
                            (
                                Some(Rc::new(Node::Bitmap {
                                    datamap: *datamap,
                                    nodemap,
                                    pairs: pairs.clone(),
                                    children,
                                })),
                                true,
                            )
                        }
                        Some(child) => {
                            if let Some(pair) = child.single_pair() {
                                // Canonicalize: a subtree holding one pair
                                // collapses back into this node.
                                let nodemap = nodemap & !bit;
                                let datamap = datamap | bit;
                                let mut children = children.clone();
                                children.remove(idx);
                                let mut pairs = pairs.clone();
                                pairs.insert(bit_index(datamap, bit), pair);
                                (
                                    Some(Rc::new(Node::Bitmap {
                                        datamap,
                                        nodemap,
                                        pairs,
                                        children,
                                    })),
                                    true,
                                )
                            } else {
                                let mut children = children.clone();
                                children[idx] = child;
                                (
                                    Some(Rc::new(Node::Bitmap {
                                        datamap: *datamap,
                                        nodemap: *nodemap,
                                        pairs: pairs.clone(),
                                        children,
                                    })),
                                    true,
                                )
                            }
                        }
                    }
                } else {
                    (Some(Rc::new(self.clone())), false)
                }
            }
            Node::Collision { hash: chash, pairs } => {
                match pairs.iter().position(|(k, _)| k == key) {
                    None => (Some(Rc::new(self.clone())), false),
                    Some(idx) => {
                        if pairs.len() == 1 {
                            return (None, true);
                        }
                        let mut pairs = pairs.clone();
                        pairs.remove(idx);
                        (
                            Some(Rc::new(Node::Collision {
                                hash: *chash,
                                pairs,
                            })),
                            true,
                        )
                    }
                }
            }
        }
    }

    fn single_pair(&self) -> Option<(K, V)> {
        match self {
            Node::Bitmap {
                datamap,
                nodemap,
                pairs,
                ..
            } if *nodemap == 0 && datamap.count_ones() == 1 => Some(pairs[0].clone()),
            Node::Collision { pairs, .. } if pairs.len() == 1 => Some(pairs[0].clone()),
            _ => None,
        }
    }
}

/// Build the smallest subtree distinguishing two pairs from `shift` down.
fn merge_pairs<K: Hash + Eq + Clone, V: Clone>(
    p1: (K, V),
    h1: u32,
    p2: (K, V),
    h2: u32,
    shift: u32,
) -> Rc<Node<K, V>> {
    if h1 == h2 {
        return Rc::new(Node::Collision {
            hash: h1,
            pairs: vec![p1, p2],
        });
    }
    let i1 = (h1 >> shift) & MASK;
    let i2 = (h2 >> shift) & MASK;
    if i1 == i2 {
        let child = merge_pairs(p1, h1, p2, h2, shift + BITS);
        Rc::new(Node::Bitmap {
            datamap: 0,
            nodemap: 1u32 << i1,
            pairs: Vec::new(),
            children: vec![child],
        })
    } else {
        let (pairs, datamap) = if i1 < i2 {
            (vec![p1, p2], (1u32 << i1) | (1u32 << i2))
        } else {
            (vec![p2, p1], (1u32 << i1) | (1u32 << i2))
        };
        Rc::new(Node::Bitmap {
            datamap,
            nodemap: 0,
            pairs,
            children: Vec::new(),
        })
    }
}

enum Repr<K, V> {
    Array(Rc<Vec<(K, V)>>),
    Hamt { count: usize, root: Rc<Node<K, V>> },
}

impl<K, V> Clone for Repr<K, V> {
    fn clone(&self) -> Self {
        match self {
            Repr::Array(pairs) => Repr::Array(pairs.clone()),
            Repr::Hamt { count, root } => Repr::Hamt {
                count: *count,
                root: root.clone(),
            },
        }
    }
}

pub struct PersistentMap<K, V> {
    repr: Repr<K, V>,
}

impl<K, V> Clone for PersistentMap<K, V> {
    fn clone(&self) -> Self {
        PersistentMap {
            repr: self.repr.clone(),
        }
    }
}

impl<K: Hash + Eq + Clone, V: Clone> Default for PersistentMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Hash + Eq + Clone, V: Clone> PersistentMap<K, V> {
    pub fn new() -> Self {
        PersistentMap {
            repr: Repr::Array(Rc::new(Vec::new())),
        }
    }

    pub fn from_pairs(pairs: Vec<(K, V)>) -> Self {
        let mut t = Self::new().transient();
        for (k, v) in pairs {
            t.assoc(k, v);
        }
        t.persistent()
    }

    pub fn len(&self) -> usize {
        match &self.repr {
            Repr::Array(pairs) => pairs.len(),
            Repr::Hamt { count, .. } => *count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        match &self.repr {
            Repr::Array(pairs) => pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            Repr::Hamt { root, .. } => root.get(key_hash(key), 0, key),
        }
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    pub fn assoc(&self, key: K, value: V) -> Self {
        match &self.repr {
            Repr::Array(pairs) => {
                if let Some(idx) = pairs.iter().position(|(k, _)| *k == key) {
                    let mut pairs = (**pairs).clone();
                    pairs[idx] = (key, value);
                    return PersistentMap {
                        repr: Repr::Array(Rc::new(pairs)),
                    };
                }
                if pairs.len() < ARRAY_MAP_MAX {
                    let mut pairs = (**pairs).clone();
                    pairs.push((key, value));
                    return PersistentMap {
                        repr: Repr::Array(Rc::new(pairs)),
                    };
                }
                // Promote to HAMT.
                let mut root = Rc::new(Node::empty_bitmap());
                let mut count = 0;
                for (k, v) in pairs.iter() {
                    let (r, added) = root.assoc(key_hash(k), 0, k.clone(), v.clone());
                    root = r;
                    if added {
                        count += 1;
                    }
                }
                let (root, added) = root.assoc(key_hash(&key), 0, key, value);
                if added {
                    count += 1;
                }
                PersistentMap {
                    repr: Repr::Hamt { count, root },
                }
            }
            Repr::Hamt { count, root } => {
                let (root, added) = root.assoc(key_hash(&key), 0, key, value);
                PersistentMap {
                    repr: Repr::Hamt {
                        count: count + usize::from(added),
                        root,
                    },
                }
            }
        }
    }

    pub fn dissoc(&self, key: &K) -> Self {
        match &self.repr {
            Repr::Array(pairs) => match pairs.iter().position(|(k, _)| k == key) {
                None => self.clone(),
                Some(idx) => {
                    let mut pairs = (**pairs).clone();
                    pairs.remove(idx);
                    PersistentMap {
                        repr: Repr::Array(Rc::new(pairs)),
                    }
                }
            },
            Repr::Hamt { count, root } => {
                let (root, removed) = root.dissoc(key_hash(key), 0, key);
                if !removed {
                    return self.clone();
                }
                PersistentMap {
                    repr: Repr::Hamt {
                        count: count - 1,
                        root: root.unwrap_or_else(|| Rc::new(Node::empty_bitmap())),
                    },
                }
            }
        }
    }

    pub fn iter(&self) -> MapIter<'_, K, V> {
        match &self.repr {
            Repr::Array(pairs) => MapIter {
                array: Some(pairs.iter()),
                stack: Vec::new(),
            },
            Repr::Hamt { root, .. } => MapIter {
                array: None,
                stack: vec![Frame {
                    node: root,
                    pair_idx: 0,
                    child_idx: 0,
                }],
            },
        }
    }

    pub fn transient(&self) -> TransientMap<K, V> {
        match &self.repr {
            Repr::Array(pairs) => TransientMap {
                repr: TransientRepr::Array((**pairs).clone()),
            },
            Repr::Hamt { count, root } => TransientMap {
                repr: TransientRepr::Hamt {
                    count: *count,
                    root: root.clone(),
                },
            },
        }
    }
}

struct Frame<'a, K, V> {
    node: &'a Node<K, V>,
    pair_idx: usize,
    child_idx: usize,
}

pub struct MapIter<'a, K, V> {
    array: Option<std::slice::Iter<'a, (K, V)>>,
    stack: Vec<Frame<'a, K, V>>,
}

impl<'a, K, V> Iterator for MapIter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<(&'a K, &'a V)> {
        if let Some(iter) = &mut self.array {
            return iter.next().map(|(k, v)| (k, v));
        }
        while let Some(frame) = self.stack.last_mut() {
            match frame.node {
                Node::Bitmap {
                    pairs, children, ..
                } => {
                    if frame.pair_idx < pairs.len() {
                        let (k, v) = &pairs[frame.pair_idx];
                        frame.pair_idx += 1;
                        return Some((k, v));
                    }
                    if frame.child_idx < children.len() {
                        let child = &children[frame.child_idx];
                        frame.child_idx += 1;
                        self.stack.push(Frame {
                            node: child,
                            pair_idx: 0,
                            child_idx: 0,
                        });
                        continue;
                    }
                    self.stack.pop();
                }
                Node::Collision { pairs, .. } => {
                    if frame.pair_idx < pairs.len() {
                        let (k, v) = &pairs[frame.pair_idx];
                        frame.pair_idx += 1;
                        return Some((k, v));
                    }
                    self.stack.pop();
                }
            }
        }
        None
    }
}

enum TransientRepr<K, V> {
    Array(Vec<(K, V)>),
    Hamt { count: usize, root: Rc<Node<K, V>> },
}

/// Mutable map builder. Nodes uniquely owned by the builder are mutated in
/// place (`Rc::make_mut`); shared nodes are copied on first write.
pub struct TransientMap<K, V> {
    repr: TransientRepr<K, V>,
}

impl<K: Hash + Eq + Clone, V: Clone> TransientMap<K, V> {
    pub fn len(&self) -> usize {
        match &self.repr {
            TransientRepr::Array(pairs) => pairs.len(),
            TransientRepr::Hamt { count, .. } => *count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        match &self.repr {
            TransientRepr::Array(pairs) => {
                pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v)
            }
            TransientRepr::Hamt { root, .. } => root.get(key_hash(key), 0, key),
        }
    }

    pub fn assoc(&mut self, key: K, value: V) {
        match &mut self.repr {
            TransientRepr::Array(pairs) => {
                if let Some(idx) = pairs.iter().position(|(k, _)| *k == key) {
                    pairs[idx] = (key, value);
                    return;
                }
                if pairs.len() < ARRAY_MAP_MAX {
                    pairs.push((key, value));
                    return;
                }
                let mut root = Rc::new(Node::empty_bitmap());
                let mut count = 0;
                for (k, v) in pairs.drain(..) {
                    if assoc_mut(&mut root, key_hash(&k), 0, k, v) {
                        count += 1;
                    }
                }
                if assoc_mut(&mut root, key_hash(&key), 0, key, value) {
                    count += 1;
                }
                self.repr = TransientRepr::Hamt { count, root };
            }
            TransientRepr::Hamt { count, root } => {
                if assoc_mut(root, key_hash(&key), 0, key, value) {
                    *count += 1;
                }
            }
        }
    }

    pub fn dissoc(&mut self, key: &K) {
        match &mut self.repr {
            TransientRepr::Array(pairs) => {
                if let Some(idx) = pairs.iter().position(|(k, _)| k == key) {
                    pairs.remove(idx);
                }
            }
            TransientRepr::Hamt { count, root } => {
                let (replacement, removed) = root.dissoc(key_hash(key), 0, key);
                if removed {
                    *count -= 1;
                    *root = replacement.unwrap_or_else(|| Rc::new(Node::empty_bitmap()));
                }
            }
        }
    }

    pub fn persistent(self) -> PersistentMap<K, V> {
        match self.repr {
            TransientRepr::Array(pairs) => PersistentMap {
                repr: Repr::Array(Rc::new(pairs)),
            },
            TransientRepr::Hamt { count, root } => PersistentMap {
                repr: Repr::Hamt { count, root },
            },
        }
    }
}

/// In-place assoc for the transient path. Returns whether a key was added.
fn assoc_mut<K: Hash + Eq + Clone, V: Clone>(
    node: &mut Rc<Node<K, V>>,
    hash: u32,
    shift: u32,
    key: K,
    value: V,
) -> bool {
    // Collision nodes and pair-to-subnode splits restructure the node, so
    // fall back to the persistent algorithm for those; the common
    // replace/insert/descend cases mutate in place.
    let needs_rebuild = match Rc::make_mut(node) {
        Node::Bitmap {
            datamap,
            nodemap,
            pairs,
            children,
        } => {
            let bit = 1u32 << ((hash >> shift) & MASK);
            if *datamap & bit != 0 {
                let idx = bit_index(*datamap, bit);
                if pairs[idx].0 == key {
                    pairs[idx] = (key, value);
                    return false;
                }
                true
            } else if *nodemap & bit != 0 {
                let idx = bit_index(*nodemap, bit);
                return assoc_mut(&mut children[idx], hash, shift + BITS, key, value);
            } else {
                *datamap |= bit;
                pairs.insert(bit_index(*datamap, bit), (key, value));
                return true;
            }
        }
        Node::Collision { .. } => true,
    };
    debug_assert!(needs_rebuild);
    let (replacement, added) = node.assoc(hash, shift, key, value);
    *node = replacement;
    added
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_map_insertion_order() {
        let m = PersistentMap::new().assoc("b", 1).assoc("a", 2).assoc("c", 3);
        let keys: Vec<&str> = m.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_array_map_replace_keeps_position() {
        let m = PersistentMap::new().assoc("a", 1).assoc("b", 2).assoc("a", 9);
        assert_eq!(m.len(), 2);
        assert_eq!(m.get(&"a"), Some(&9));
        let keys: Vec<&str> = m.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_promotion_to_hamt() {
        let mut m = PersistentMap::new();
        for i in 0..20 {
            m = m.assoc(i, i * 10);
        }
        assert_eq!(m.len(), 20);
        for i in 0..20 {
            assert_eq!(m.get(&i), Some(&(i * 10)));
        }
        assert_eq!(m.get(&99), None);
    }

    #[test]
    fn test_large_map() {
        let mut m = PersistentMap::new();
        for i in 0..10_000 {
            m = m.assoc(i, i + 1);
        }
        assert_eq!(m.len(), 10_000);
        for i in (0..10_000).step_by(97) {
            assert_eq!(m.get(&i), Some(&(i + 1)));
        }
    }

    #[test]
    fn test_assoc_does_not_mutate() {
        let m1 = PersistentMap::from_pairs((0..100).map(|i| (i, i)).collect());
        let m2 = m1.assoc(5, 999);
        assert_eq!(m1.get(&5), Some(&5));
        assert_eq!(m2.get(&5), Some(&999));
        assert_eq!(m1.len(), m2.len());
    }

    #[test]
    fn test_dissoc() {
        let mut m = PersistentMap::from_pairs((0..100).map(|i| (i, i)).collect());
        let snapshot = m.clone();
        for i in 0..50 {
            m = m.dissoc(&i);
        }
        assert_eq!(m.len(), 50);
        assert_eq!(m.get(&10), None);
        assert_eq!(m.get(&75), Some(&75));
        // Original untouched.
        assert_eq!(snapshot.len(), 100);
        assert_eq!(snapshot.get(&10), Some(&10));
    }

    #[test]
    fn test_dissoc_missing_key_is_identity() {
        let m = PersistentMap::from_pairs(vec![("x", 1)]);
        let m2 = m.dissoc(&"nope");
        assert_eq!(m2.len(), 1);
        assert_eq!(m2.get(&"x"), Some(&1));
    }

    #[test]
    fn test_dissoc_to_empty() {
        let mut m = PersistentMap::from_pairs((0..40).map(|i| (i, ())).collect());
        for i in 0..40 {
            m = m.dissoc(&i);
        }
        assert_eq!(m.len(), 0);
        assert!(m.is_empty());
    }

    #[derive(Clone, PartialEq, Eq, Debug)]
    struct Colliding(u8);

    impl Hash for Colliding {
        fn hash<H: Hasher>(&self, _state: &mut H) {
            // Every value hashes identically: exercises collision leaves.
        }
    }

    #[test]
    fn test_hash_collisions() {
        let mut m = PersistentMap::new();
        for i in 0..20u8 {
            m = m.assoc(Colliding(i), i);
        }
        assert_eq!(m.len(), 20);
        for i in 0..20u8 {
            assert_eq!(m.get(&Colliding(i)), Some(&i));
        }
        let m = m.dissoc(&Colliding(3));
        assert_eq!(m.len(), 19);
        assert_eq!(m.get(&Colliding(3)), None);
        assert_eq!(m.get(&Colliding(4)), Some(&4));
    }

    #[test]
    fn test_iter_covers_all_entries() {
        let m = PersistentMap::from_pairs((0..500).map(|i| (i, i * 2)).collect());
        let mut seen: Vec<i32> = m.iter().map(|(k, _)| *k).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..500).collect::<Vec<_>>());
    }

    #[test]
    fn test_transient_build() {
        let mut t = PersistentMap::new().transient();
        for i in 0..1000 {
            t.assoc(i, i);
        }
        assert_eq!(t.len(), 1000);
        t.dissoc(&500);
        assert_eq!(t.len(), 999);
        let m = t.persistent();
        assert_eq!(m.get(&499), Some(&499));
        assert_eq!(m.get(&500), None);
    }

    #[test]
    fn test_transient_does_not_disturb_source() {
        let m = PersistentMap::from_pairs((0..100).map(|i| (i, i)).collect());
        let mut t = m.transient();
        for i in 0..100 {
            t.assoc(i, 0);
        }
        let m2 = t.persistent();
        assert_eq!(m.get(&42), Some(&42));
        assert_eq!(m2.get(&42), Some(&0));
    }

    #[test]
    fn test_transient_array_stage() {
        let mut t = PersistentMap::new().transient();
        t.assoc("a", 1);
        t.assoc("b", 2);
        t.assoc("a", 3);
        assert_eq!(t.len(), 2);
        assert_eq!(t.get(&"a"), Some(&3));
        let m = t.persistent();
        let keys: Vec<&str> = m.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }
}

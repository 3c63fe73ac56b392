//! [`AvlMap`], an ordered map similar to [`std::collections::BTreeMap`],
//! built on a height-balanced search tree that can be split and joined in
//! logarithmic time.
//!
//! # Differences compared to [`std::collections::BTreeMap`]
//!
//! [`AvlMap::split`] and [`AvlMap::merge`] restructure whole trees in
//! O(log n), where `split_off`/`append` on the std map degrade to per-element
//! work. Every node additionally tracks its subtree size, so rank queries
//! ([`AvlMap::get_by_index`]) are O(log n) as well, and an [`Augment`]
//! strategy slot lets derived collections cache a per-subtree summary that is
//! maintained through every rotation.
//!
//! Lookups that can fail return a typed [`TreeError`] rather than a bare
//! `Option`, so callers can distinguish a missing key from an empty map from
//! an out-of-range rank.
//!
//! # Example
//!
//! ```
//!     use jointree::collections::AvlMap;
//!     let mut mymap = AvlMap::new();
//!     mymap.insert("England", "London");
//!     mymap.insert("France", "Paris");
//!     println!("The capital of France is {}", mymap["France"]);
//! ```

use std::{
    borrow::Borrow,
    cmp::Ordering,
    fmt,
    fmt::Debug,
    hash::{Hash, Hasher},
    iter::FusedIterator,
    ops::Bound,
};

use crate::collections::TreeError;

pub(crate) mod node;

pub use node::{Augment, Plain};

use node::{
    aug, clone_subtree, extract_max, extract_min, free_subtree, merge_with_root, repair, size,
    unwind_split, Link, NodeIter, NodePtr, SplitFrame, StkVec,
};

/// An ordered map based on a height-balanced search tree with logarithmic
/// split and merge.
///
/// General guide to implementation:
///
/// [`AvlMap`] wraps a single optional root node. Nodes own their children;
/// parent back-references are non-owning and only used for the upward repair
/// walk after a structural change and for in-order iteration. The raw pointer
/// surgery lives in the `node` module; this module implements the map
/// operations on top of it.
///
/// The third type parameter selects an [`Augment`] strategy: a per-subtree
/// summary recomputed alongside height and size. The default [`Plain`] stores
/// nothing; `SumSet` uses it to cache subtree key sums.
pub struct AvlMap<K, V, A: Augment<K> = Plain> {
    root: Link<K, V, A>,
}

unsafe impl<K: Send, V: Send, A: Augment<K> + Send> Send for AvlMap<K, V, A> {}
unsafe impl<K: Sync, V: Sync, A: Augment<K> + Sync> Sync for AvlMap<K, V, A> {}

impl<K, V, A: Augment<K>> Default for AvlMap<K, V, A> {
    /// Creates an empty map.
    fn default() -> Self {
        AvlMap { root: None }
    }
}

impl<K, V, A: Augment<K>> Drop for AvlMap<K, V, A> {
    fn drop(&mut self) {
        free_subtree(self.root.take());
    }
}

impl<K: Clone, V: Clone, A: Augment<K>> Clone for AvlMap<K, V, A> {
    fn clone(&self) -> Self {
        AvlMap {
            root: clone_subtree(self.root),
        }
    }
}

impl<K, V> AvlMap<K, V> {
    /// Returns a new, empty map.
    #[must_use]
    pub fn new() -> Self {
        AvlMap { root: None }
    }
}

impl<K, V, A: Augment<K>> AvlMap<K, V, A> {
    #[cfg(test)]
    pub(crate) fn check(&self)
    where
        K: Ord,
        A: PartialEq + Debug,
    {
        if let Some(root) = self.root {
            assert!(root.parent().is_none(), "root has a parent");
        }
        node::check_subtree(self.root, None);
        node::check_order(self.root);
    }

    /// Get number of key-value pairs in the map.
    #[must_use]
    pub fn len(&self) -> usize {
        size(self.root)
    }

    /// Is the map empty?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Clear the map.
    pub fn clear(&mut self) {
        free_subtree(self.root.take());
    }

    /// Summary of the whole map under the augmentation strategy.
    pub(crate) fn summary(&self) -> A {
        aug(self.root)
    }

    fn find_node<Q>(&self, key: &Q) -> Link<K, V, A>
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let mut cur = self.root;
        while let Some(n) = cur {
            cur = match key.cmp(n.key().borrow()) {
                Ordering::Less => n.left(),
                Ordering::Greater => n.right(),
                Ordering::Equal => return Some(n),
            };
        }
        None
    }

    /// Insert key-value pair into map, or if key is already in map, replaces
    /// value and returns old value. The key itself is never replaced.
    pub fn insert(&mut self, key: K, value: V) -> Option<V>
    where
        K: Ord,
    {
        let Some(root) = self.root else {
            self.root = Some(NodePtr::new(key, value));
            return None;
        };
        let mut cur = root;
        loop {
            match key.cmp(cur.key()) {
                Ordering::Equal => return Some(cur.replace_value(value)),
                Ordering::Less => match cur.left() {
                    Some(l) => cur = l,
                    None => {
                        let leaf = NodePtr::new(key, value);
                        cur.hang_left(Some(leaf));
                        self.root = Some(repair(cur));
                        return None;
                    }
                },
                Ordering::Greater => match cur.right() {
                    Some(r) => cur = r,
                    None => {
                        let leaf = NodePtr::new(key, value);
                        cur.hang_right(Some(leaf));
                        self.root = Some(repair(cur));
                        return None;
                    }
                },
            }
        }
    }

    /// Get reference to the value corresponding to the key.
    pub fn get<Q>(&self, key: &Q) -> Result<&V, TreeError>
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        self.find_node(key)
            .map(|n| n.value())
            .ok_or(TreeError::NotFound)
    }

    /// Get a mutable reference to the value corresponding to the key.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Result<&mut V, TreeError>
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        self.find_node(key)
            .map(|n| n.value_mut())
            .ok_or(TreeError::NotFound)
    }

    /// Get references to the corresponding key and value.
    pub fn get_key_value<Q>(&self, key: &Q) -> Result<(&K, &V), TreeError>
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        self.find_node(key)
            .map(|n| n.key_value())
            .ok_or(TreeError::NotFound)
    }

    /// Does the map have an entry for the specified key.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        self.find_node(key).is_some()
    }

    /// Remove key-value pair from map, returning just the value.
    pub fn remove<Q>(&mut self, key: &Q) -> Result<V, TreeError>
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        self.remove_entry(key).map(|(_k, v)| v)
    }

    /// Remove key-value pair from map.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Result<(K, V), TreeError>
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let node = self.find_node(key).ok_or(TreeError::NotFound)?;
        Ok(self.remove_node(node))
    }

    fn remove_node(&mut self, node: NodePtr<K, V, A>) -> (K, V) {
        if node.left().is_some() && node.right().is_some() {
            // Exchange payloads with the in-order predecessor, then unlink
            // that node instead; it has at most a left child.
            let pred = node.left().expect("node has two children").max_in_subtree();
            node.swap_payload(pred);
            self.unlink_simple(pred);
            pred.into_inner()
        } else {
            self.unlink_simple(node);
            node.into_inner()
        }
    }

    /// Unlink a node with at most one child, splicing the child into its
    /// place and repairing from the splice point.
    fn unlink_simple(&mut self, node: NodePtr<K, V, A>) {
        let child = match (node.take_left(), node.take_right()) {
            (None, r) => r,
            (l, None) => l,
            _ => unreachable!("node has at most one child"),
        };
        match node.parent() {
            None => self.root = child,
            Some(p) => {
                if p.left() == Some(node) {
                    p.hang_left(child);
                } else {
                    p.hang_right(child);
                }
                node.set_parent(None);
                self.root = Some(repair(child.unwrap_or(p)));
            }
        }
    }

    /// Remove first key-value pair from map.
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        let root = self.root.take()?;
        let (rest, min) = extract_min(root);
        self.root = rest;
        Some(min.into_inner())
    }

    /// Remove last key-value pair from map.
    pub fn pop_last(&mut self) -> Option<(K, V)> {
        let root = self.root.take()?;
        let (rest, max) = extract_max(root);
        self.root = rest;
        Some(max.into_inner())
    }

    /// Get the value for the smallest key in the map.
    pub fn min(&self) -> Result<&V, TreeError> {
        self.root
            .map(|r| r.min_in_subtree().value())
            .ok_or(TreeError::Empty)
    }

    /// Get the value for the largest key in the map.
    pub fn max(&self) -> Result<&V, TreeError> {
        self.root
            .map(|r| r.max_in_subtree().value())
            .ok_or(TreeError::Empty)
    }

    /// Get references to first key and value.
    #[must_use]
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.root.map(|r| r.min_in_subtree().key_value())
    }

    /// Get references to last key and value.
    #[must_use]
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.root.map(|r| r.max_in_subtree().key_value())
    }

    /// Get the value for the key immediately after `key`, or `None` if `key`
    /// is the maximum. Fails if `key` itself is absent.
    pub fn next<Q>(&self, key: &Q) -> Result<Option<&V>, TreeError>
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let node = self.find_node(key).ok_or(TreeError::NotFound)?;
        Ok(node.successor().map(|n| n.value()))
    }

    /// Get the value for the key immediately before `key`, or `None` if `key`
    /// is the minimum. Fails if `key` itself is absent.
    pub fn prev<Q>(&self, key: &Q) -> Result<Option<&V>, TreeError>
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let node = self.find_node(key).ok_or(TreeError::NotFound)?;
        Ok(node.predecessor().map(|n| n.value()))
    }

    /// Get the value for the key with the given in-order rank, 0-based.
    pub fn get_by_index(&self, index: usize) -> Result<&V, TreeError> {
        if index >= self.len() {
            return Err(TreeError::OutOfRange);
        }
        let root = self.root.expect("rank checked against size");
        Ok(node::node_by_rank(root, index).value())
    }

    /// Get the key-value pair with the given in-order rank, 0-based.
    pub fn get_index(&self, index: usize) -> Result<(&K, &V), TreeError> {
        if index >= self.len() {
            return Err(TreeError::OutOfRange);
        }
        let root = self.root.expect("rank checked against size");
        Ok(node::node_by_rank(root, index).key_value())
    }

    /// Split the map into entries with keys up to and including `key`, and
    /// entries with keys above it. Consumes the map; both results are
    /// independently balanced.
    pub fn split<Q>(self, key: &Q) -> (Self, Self)
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        self.split_bound(Bound::Included(key))
    }

    /// Split the map just above `Included(key)`, just below `Excluded(key)`,
    /// or keep everything in the first map for `Unbounded`.
    ///
    /// The descent detaches the subtree that lies entirely on one side of the
    /// cut at each step and records the node as a pending join pivot; the
    /// unwind re-joins each detached subtree onto the growing halves. The
    /// per-level joins cost the height difference of their operands, which
    /// telescopes to O(log n) overall.
    pub fn split_bound<Q>(mut self, bound: Bound<&Q>) -> (Self, Self)
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let mut stack: StkVec<SplitFrame<K, V, A>> = StkVec::new();
        let mut cur = self.root.take();
        let mut low = None;
        let mut high = None;
        while let Some(node) = cur {
            node.set_parent(None);
            let side = match bound {
                Bound::Unbounded => Ordering::Less,
                Bound::Included(key) => node.key().borrow().cmp(key),
                Bound::Excluded(key) => match node.key().borrow().cmp(key) {
                    Ordering::Equal => Ordering::Greater,
                    other => other,
                },
            };
            match side {
                Ordering::Less => {
                    let intact = node.take_left();
                    cur = node.take_right();
                    stack.push((node, intact, true));
                }
                Ordering::Greater => {
                    let intact = node.take_right();
                    cur = node.take_left();
                    stack.push((node, intact, false));
                }
                Ordering::Equal => {
                    // The node itself is the cut point: its right subtree is
                    // the seed of the upper half, the node becomes the new
                    // maximum of the lower half.
                    high = node.take_right();
                    let left = node.take_left();
                    low = Some(merge_with_root(left, None, node));
                    cur = None;
                }
            }
        }
        let (low, high) = unwind_split(stack, low, high);
        (AvlMap { root: low }, AvlMap { root: high })
    }

    /// Move all entries of `other` into `self`.
    ///
    /// Every key in `self` must precede every key in `other`; this is the
    /// caller's obligation and is only checked in debug builds. The maximum
    /// entry of `self` is detached and re-used as the join pivot, so the
    /// whole operation costs O(log n).
    pub fn merge(&mut self, mut other: Self)
    where
        K: Ord,
    {
        if let (Some(a), Some(b)) = (self.root, other.root) {
            debug_assert!(
                a.max_in_subtree().key() < b.min_in_subtree().key(),
                "every key in `self` must precede every key in `other`"
            );
        }
        let Some(b) = other.root.take() else { return };
        let Some(a) = self.root.take() else {
            self.root = Some(b);
            return;
        };
        let (rest, pivot) = extract_max(a);
        self.root = Some(merge_with_root(rest, Some(b), pivot));
    }

    /// Get iterator of references to key-value pairs, in ascending key order.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, K, V, A> {
        Iter {
            inner: NodeIter::new(self.root),
        }
    }

    /// Get iterator of references to keys, in ascending order.
    #[must_use]
    pub fn keys(&self) -> Keys<'_, K, V, A> {
        Keys(self.iter())
    }

    /// Get iterator of references to values, in ascending key order.
    #[must_use]
    pub fn values(&self) -> Values<'_, K, V, A> {
        Values(self.iter())
    }
} // End impl AvlMap

impl<K: Hash, V: Hash, A: Augment<K>> Hash for AvlMap<K, V, A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for elt in self {
            elt.hash(state);
        }
    }
}
impl<K: PartialEq, V: PartialEq, A: Augment<K>> PartialEq for AvlMap<K, V, A> {
    fn eq(&self, other: &AvlMap<K, V, A>) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}
impl<K: Eq, V: Eq, A: Augment<K>> Eq for AvlMap<K, V, A> {}

impl<K: PartialOrd, V: PartialOrd, A: Augment<K>> PartialOrd for AvlMap<K, V, A> {
    fn partial_cmp(&self, other: &AvlMap<K, V, A>) -> Option<Ordering> {
        self.iter().partial_cmp(other.iter())
    }
}
impl<K: Ord, V: Ord, A: Augment<K>> Ord for AvlMap<K, V, A> {
    fn cmp(&self, other: &AvlMap<K, V, A>) -> Ordering {
        self.iter().cmp(other.iter())
    }
}

impl<K, V, A: Augment<K>> IntoIterator for AvlMap<K, V, A> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V, A>;

    /// Convert `AvlMap` to [`IntoIter`].
    fn into_iter(self) -> IntoIter<K, V, A> {
        IntoIter { map: self }
    }
}
impl<'a, K, V, A: Augment<K>> IntoIterator for &'a AvlMap<K, V, A> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, A>;
    fn into_iter(self) -> Iter<'a, K, V, A> {
        self.iter()
    }
}
impl<K: Ord, V> FromIterator<(K, V)> for AvlMap<K, V> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> AvlMap<K, V> {
        let mut map = AvlMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}
impl<K: Ord, V, const N: usize> From<[(K, V); N]> for AvlMap<K, V> {
    fn from(arr: [(K, V); N]) -> AvlMap<K, V> {
        let mut map = AvlMap::new();
        for (k, v) in arr {
            map.insert(k, v);
        }
        map
    }
}
impl<K: Ord, V, A: Augment<K>> Extend<(K, V)> for AvlMap<K, V, A> {
    fn extend<T>(&mut self, iter: T)
    where
        T: IntoIterator<Item = (K, V)>,
    {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}
impl<'a, K: Ord + Copy, V: Copy, A: Augment<K>> Extend<(&'a K, &'a V)> for AvlMap<K, V, A> {
    fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = (&'a K, &'a V)>,
    {
        for (&k, &v) in iter {
            self.insert(k, v);
        }
    }
}
impl<K, Q, V, A: Augment<K>> std::ops::Index<&Q> for AvlMap<K, V, A>
where
    K: Borrow<Q> + Ord,
    Q: Ord + ?Sized,
{
    type Output = V;

    /// Returns a reference to the value corresponding to the supplied key.
    ///
    /// Panics if the key is not present in the `AvlMap`.
    #[inline]
    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("no entry found for key")
    }
}
impl<K: Debug, V: Debug, A: Augment<K>> Debug for AvlMap<K, V, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Iterator of references to key-value pairs returned by [`AvlMap::iter`].
pub struct Iter<'a, K, V, A: Augment<K> = Plain> {
    inner: NodeIter<'a, K, V, A>,
}
impl<'a, K, V, A: Augment<K>> Iterator for Iter<'a, K, V, A> {
    type Item = (&'a K, &'a V);
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next_node().map(|n| n.key_value())
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.inner.remaining(), Some(self.inner.remaining()))
    }
}
impl<K, V, A: Augment<K>> DoubleEndedIterator for Iter<'_, K, V, A> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_node_back().map(|n| n.key_value())
    }
}
impl<K, V, A: Augment<K>> ExactSizeIterator for Iter<'_, K, V, A> {
    fn len(&self) -> usize {
        self.inner.remaining()
    }
}
impl<K, V, A: Augment<K>> FusedIterator for Iter<'_, K, V, A> {}

/// Iterator of references to keys returned by [`AvlMap::keys`].
pub struct Keys<'a, K, V, A: Augment<K> = Plain>(Iter<'a, K, V, A>);
impl<'a, K, V, A: Augment<K>> Iterator for Keys<'a, K, V, A> {
    type Item = &'a K;
    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(k, _v)| k)
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}
impl<K, V, A: Augment<K>> DoubleEndedIterator for Keys<'_, K, V, A> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.0.next_back().map(|(k, _v)| k)
    }
}
impl<K, V, A: Augment<K>> ExactSizeIterator for Keys<'_, K, V, A> {
    fn len(&self) -> usize {
        self.0.len()
    }
}
impl<K, V, A: Augment<K>> FusedIterator for Keys<'_, K, V, A> {}

/// Iterator of references to values returned by [`AvlMap::values`].
pub struct Values<'a, K, V, A: Augment<K> = Plain>(Iter<'a, K, V, A>);
impl<'a, K, V, A: Augment<K>> Iterator for Values<'a, K, V, A> {
    type Item = &'a V;
    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(_k, v)| v)
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}
impl<K, V, A: Augment<K>> DoubleEndedIterator for Values<'_, K, V, A> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.0.next_back().map(|(_k, v)| v)
    }
}
impl<K, V, A: Augment<K>> ExactSizeIterator for Values<'_, K, V, A> {
    fn len(&self) -> usize {
        self.0.len()
    }
}
impl<K, V, A: Augment<K>> FusedIterator for Values<'_, K, V, A> {}

/// Consuming iterator returned by [`AvlMap::into_iter`][IntoIterator].
pub struct IntoIter<K, V, A: Augment<K> = Plain> {
    map: AvlMap<K, V, A>,
}
impl<K, V, A: Augment<K>> Iterator for IntoIter<K, V, A> {
    type Item = (K, V);
    fn next(&mut self) -> Option<Self::Item> {
        self.map.pop_first()
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.map.len(), Some(self.map.len()))
    }
}
impl<K, V, A: Augment<K>> DoubleEndedIterator for IntoIter<K, V, A> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.map.pop_last()
    }
}
impl<K, V, A: Augment<K>> ExactSizeIterator for IntoIter<K, V, A> {
    fn len(&self) -> usize {
        self.map.len()
    }
}
impl<K, V, A: Augment<K>> FusedIterator for IntoIter<K, V, A> {}

#[cfg(test)]
mod mytests;

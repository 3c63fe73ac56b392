//! [`SplayMap`], an ordered map on a self-adjusting search tree.
//!
//! The same map/split/merge contract as [`AvlMap`][crate::collections::AvlMap]
//! under a simpler balancing policy: no heights or sizes are tracked, and
//! instead of a repair walk every access moves the touched node to the root
//! with splay steps. Operations are amortized logarithmic, and recently used
//! keys are cheap to reach again. Because lookups restructure the tree, they
//! take `&mut self`.
//!
//! # Example
//!
//! ```
//!     use jointree::collections::SplayMap;
//!     let mut map = SplayMap::new();
//!     map.insert(1, "one");
//!     assert_eq!(map.get(&1), Ok(&"one"));
//! ```

use std::{
    borrow::Borrow,
    cmp::Ordering,
    fmt,
    fmt::Debug,
    iter::FusedIterator,
    marker::PhantomData,
    mem,
    ptr::NonNull,
};

use crate::collections::TreeError;

struct SplayNode<K, V> {
    key: K,
    value: V,
    left: SLink<K, V>,
    right: SLink<K, V>,
    parent: SLink<K, V>,
}

type SLink<K, V> = Option<SplayPtr<K, V>>;

/// Unchecked handle to a heap-allocated [`SplayNode`]; same link discipline
/// as the balanced tree engine, minus the cached invariants.
struct SplayPtr<K, V>(NonNull<SplayNode<K, V>>);

impl<K, V> Clone for SplayPtr<K, V> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<K, V> Copy for SplayPtr<K, V> {}
impl<K, V> PartialEq for SplayPtr<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<K, V> SplayPtr<K, V> {
    fn new(key: K, value: V) -> Self {
        let node = Box::new(SplayNode {
            key,
            value,
            left: None,
            right: None,
            parent: None,
        });
        SplayPtr(NonNull::from(Box::leak(node)))
    }

    fn into_inner(self) -> (K, V) {
        let node = unsafe { Box::from_raw(self.ptr()) };
        (node.key, node.value)
    }

    fn ptr(self) -> *mut SplayNode<K, V> {
        self.0.as_ptr()
    }

    fn key<'a>(self) -> &'a K {
        unsafe { &(*self.ptr()).key }
    }

    fn value<'a>(self) -> &'a V {
        unsafe { &(*self.ptr()).value }
    }

    fn value_mut<'a>(self) -> &'a mut V {
        unsafe { &mut (*self.ptr()).value }
    }

    fn key_value<'a>(self) -> (&'a K, &'a V) {
        unsafe {
            let node = &*self.ptr();
            (&node.key, &node.value)
        }
    }

    fn replace_value(self, value: V) -> V {
        mem::replace(self.value_mut(), value)
    }

    fn left(self) -> SLink<K, V> {
        unsafe { (*self.ptr()).left }
    }

    fn right(self) -> SLink<K, V> {
        unsafe { (*self.ptr()).right }
    }

    fn parent(self) -> SLink<K, V> {
        unsafe { (*self.ptr()).parent }
    }

    fn set_left(self, link: SLink<K, V>) {
        unsafe { (*self.ptr()).left = link }
    }

    fn set_right(self, link: SLink<K, V>) {
        unsafe { (*self.ptr()).right = link }
    }

    fn set_parent(self, link: SLink<K, V>) {
        unsafe { (*self.ptr()).parent = link }
    }

    fn hang_right(self, child: SLink<K, V>) {
        self.set_right(child);
        if let Some(c) = child {
            c.set_parent(Some(self));
        }
    }

    fn take_left(self) -> SLink<K, V> {
        let child = self.left();
        if let Some(c) = child {
            c.set_parent(None);
        }
        self.set_left(None);
        child
    }

    fn take_right(self) -> SLink<K, V> {
        let child = self.right();
        if let Some(c) = child {
            c.set_parent(None);
        }
        self.set_right(None);
        child
    }

    fn replace_child(self, old: Self, new: Self) {
        if self.left() == Some(old) {
            self.set_left(Some(new));
        } else {
            self.set_right(Some(new));
        }
    }

    fn min_in_subtree(self) -> Self {
        let mut node = self;
        while let Some(l) = node.left() {
            node = l;
        }
        node
    }

    fn max_in_subtree(self) -> Self {
        let mut node = self;
        while let Some(r) = node.right() {
            node = r;
        }
        node
    }

    fn successor(self) -> SLink<K, V> {
        if let Some(r) = self.right() {
            return Some(r.min_in_subtree());
        }
        let mut node = self;
        while let Some(p) = node.parent() {
            if p.left() == Some(node) {
                return Some(p);
            }
            node = p;
        }
        None
    }

    fn predecessor(self) -> SLink<K, V> {
        if let Some(l) = self.left() {
            return Some(l.max_in_subtree());
        }
        let mut node = self;
        while let Some(p) = node.parent() {
            if p.right() == Some(node) {
                return Some(p);
            }
            node = p;
        }
        None
    }
}

/// Rotate the edge between `u` and its parent, lifting `u` one level.
fn rotate_up<K, V>(u: SplayPtr<K, V>) {
    let p = u.parent().expect("rotation requires a parent");
    let g = p.parent();
    if p.left() == Some(u) {
        let mid = u.right();
        p.set_left(mid);
        if let Some(m) = mid {
            m.set_parent(Some(p));
        }
        u.set_right(Some(p));
    } else {
        let mid = u.left();
        p.set_right(mid);
        if let Some(m) = mid {
            m.set_parent(Some(p));
        }
        u.set_left(Some(p));
    }
    p.set_parent(Some(u));
    u.set_parent(g);
    if let Some(g) = g {
        g.replace_child(p, u);
    }
}

/// Move `u` to the root of its tree with zig/zig-zig/zig-zag steps.
fn splay<K, V>(u: SplayPtr<K, V>) {
    while let Some(p) = u.parent() {
        match p.parent() {
            None => rotate_up(u),
            Some(g) => {
                let u_left = p.left() == Some(u);
                let p_left = g.left() == Some(p);
                if u_left == p_left {
                    rotate_up(p);
                    rotate_up(u);
                } else {
                    rotate_up(u);
                    rotate_up(u);
                }
            }
        }
    }
}

/// An ordered map based on a splay tree.
///
/// Keeps no per-node bookkeeping at all, so there is no O(1) length; the
/// trade for that simplicity is that every operation, lookups included,
/// reshapes the tree around the accessed key.
pub struct SplayMap<K, V> {
    root: SLink<K, V>,
}

unsafe impl<K: Send, V: Send> Send for SplayMap<K, V> {}
unsafe impl<K: Sync, V: Sync> Sync for SplayMap<K, V> {}

impl<K, V> Default for SplayMap<K, V> {
    /// Creates an empty map.
    fn default() -> Self {
        SplayMap { root: None }
    }
}

impl<K, V> Drop for SplayMap<K, V> {
    fn drop(&mut self) {
        let Some(mut node) = self.root.take() else {
            return;
        };
        loop {
            if let Some(l) = node.left() {
                node = l;
                continue;
            }
            if let Some(r) = node.right() {
                node = r;
                continue;
            }
            let parent = node.parent();
            let was_left = parent.map(|p| p.left() == Some(node));
            drop(node.into_inner());
            match parent {
                None => return,
                Some(p) => {
                    if was_left == Some(true) {
                        p.set_left(None);
                    } else {
                        p.set_right(None);
                    }
                    node = p;
                }
            }
        }
    }
}

impl<K, V> SplayMap<K, V> {
    /// Returns a new, empty map.
    #[must_use]
    pub fn new() -> Self {
        SplayMap { root: None }
    }

    /// Is the map empty?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Descend towards `key`, splay the last visited node to the root, and
    /// return it: the node holding `key` when present, otherwise its would-be
    /// parent. Splaying on failed searches is what gives the amortized bound.
    fn splay_closest<Q>(&mut self, key: &Q) -> SLink<K, V>
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let Some(mut cur) = self.root else {
            return None;
        };
        loop {
            let next = match key.cmp(cur.key().borrow()) {
                Ordering::Less => cur.left(),
                Ordering::Greater => cur.right(),
                Ordering::Equal => None,
            };
            match next {
                Some(n) => cur = n,
                None => break,
            }
        }
        splay(cur);
        self.root = Some(cur);
        Some(cur)
    }

    /// Insert key-value pair into map, or if key is already in map, replaces
    /// value and returns old value. The touched node becomes the root.
    pub fn insert(&mut self, key: K, value: V) -> Option<V>
    where
        K: Ord,
    {
        let Some(root) = self.root else {
            self.root = Some(SplayPtr::new(key, value));
            return None;
        };
        let mut cur = root;
        loop {
            match key.cmp(cur.key()) {
                Ordering::Equal => {
                    let old = cur.replace_value(value);
                    splay(cur);
                    self.root = Some(cur);
                    return Some(old);
                }
                Ordering::Less => match cur.left() {
                    Some(l) => cur = l,
                    None => {
                        let leaf = SplayPtr::new(key, value);
                        cur.set_left(Some(leaf));
                        leaf.set_parent(Some(cur));
                        splay(leaf);
                        self.root = Some(leaf);
                        return None;
                    }
                },
                Ordering::Greater => match cur.right() {
                    Some(r) => cur = r,
                    None => {
                        let leaf = SplayPtr::new(key, value);
                        cur.set_right(Some(leaf));
                        leaf.set_parent(Some(cur));
                        splay(leaf);
                        self.root = Some(leaf);
                        return None;
                    }
                },
            }
        }
    }

    /// Get reference to the value corresponding to the key, splaying the
    /// search path.
    pub fn get<Q>(&mut self, key: &Q) -> Result<&V, TreeError>
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let node = self.splay_closest(key).ok_or(TreeError::NotFound)?;
        if node.key().borrow() == key {
            Ok(node.value())
        } else {
            Err(TreeError::NotFound)
        }
    }

    /// Does the map have an entry for the specified key. Splays the search
    /// path.
    pub fn contains<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        self.get(key).is_ok()
    }

    /// Remove key-value pair from map, returning just the value.
    pub fn remove<Q>(&mut self, key: &Q) -> Result<V, TreeError>
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let node = self.splay_closest(key).ok_or(TreeError::NotFound)?;
        if node.key().borrow() != key {
            return Err(TreeError::NotFound);
        }
        let left = node.take_left();
        let right = node.take_right();
        node.set_parent(None);
        self.root = match (left, right) {
            (None, r) => r,
            (l, None) => l,
            (Some(l), Some(r)) => {
                // After splaying its maximum, the left part has no right
                // child; the right part hangs there.
                let max = l.max_in_subtree();
                splay(max);
                max.hang_right(Some(r));
                Some(max)
            }
        };
        let (_k, v) = node.into_inner();
        Ok(v)
    }

    /// Split the map into entries with keys up to and including `key`, and
    /// entries with keys above it. Consumes the map.
    pub fn split<Q>(mut self, key: &Q) -> (Self, Self)
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let Some(node) = self.splay_closest(key) else {
            return (SplayMap::new(), SplayMap::new());
        };
        self.root = None;
        if node.key().borrow() <= key {
            let right = node.take_right();
            (SplayMap { root: Some(node) }, SplayMap { root: right })
        } else {
            let left = node.take_left();
            (SplayMap { root: left }, SplayMap { root: Some(node) })
        }
    }

    /// Move all entries of `other` into `self`. Every key in `self` must
    /// precede every key in `other` (checked only in debug builds).
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
        let Some(root) = self.root else {
            self.root = Some(b);
            return;
        };
        let max = root.max_in_subtree();
        splay(max);
        max.hang_right(Some(b));
        self.root = Some(max);
    }

    /// Get iterator of references to key-value pairs in ascending key order.
    /// Iteration does not splay.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            front: self.root.map(|r| r.min_in_subtree()),
            back: self.root.map(|r| r.max_in_subtree()),
            marker: PhantomData,
        }
    }
}

impl<K: Debug, V: Debug> Debug for SplayMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
impl<K: Ord, V> FromIterator<(K, V)> for SplayMap<K, V> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> SplayMap<K, V> {
        let mut map = SplayMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}
impl<K: Ord, V> Extend<(K, V)> for SplayMap<K, V> {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}
impl<'a, K, V> IntoIterator for &'a SplayMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;
    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

/// Iterator of references to key-value pairs returned by [`SplayMap::iter`].
pub struct Iter<'a, K, V> {
    front: SLink<K, V>,
    back: SLink<K, V>,
    marker: PhantomData<&'a (K, V)>,
}
impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);
    fn next(&mut self) -> Option<Self::Item> {
        let node = self.front?;
        if self.back == Some(node) {
            self.front = None;
            self.back = None;
        } else {
            self.front = node.successor();
        }
        Some(node.key_value())
    }
}
impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let node = self.back?;
        if self.front == Some(node) {
            self.front = None;
            self.back = None;
        } else {
            self.back = node.predecessor();
        }
        Some(node.key_value())
    }
}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

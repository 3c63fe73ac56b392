//! Node storage and rebalancing engine shared by the tree collections.
//!
//! Child links own their subtrees; parent links are non-owning back-references
//! used only for upward repair walks and iteration. All raw pointer surgery is
//! confined to this module: the collection modules above it only see
//! [`NodePtr`] and the structural operations defined here.

use std::marker::PhantomData;
use std::mem;
use std::ptr::NonNull;

/// Stack of nodes on a root-to-leaf path, length is maximum tree height.
pub(crate) type StkVec<T> = arrayvec::ArrayVec<T, 72>;

/// Per-node summary recomputed whenever a subtree changes shape.
///
/// This is the strategy slot that lets one rebalancing engine serve several
/// node disciplines: the plain map stores nothing extra ([`Plain`]), while the
/// sum-augmented set caches a subtree key sum used for range queries.
pub trait Augment<K>: Copy {
    /// Summary of an empty subtree.
    fn empty() -> Self;
    /// Summary of a single key with no children.
    fn from_key(key: &K) -> Self;
    /// Summary of a node from its children's summaries and its own key.
    fn combine(left: Self, key: &K, right: Self) -> Self;
}

/// The no-op augmentation used by the plain map and the sequence trees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Plain;

impl<K> Augment<K> for Plain {
    fn empty() -> Self {
        Plain
    }
    fn from_key(_key: &K) -> Self {
        Plain
    }
    fn combine(_left: Self, _key: &K, _right: Self) -> Self {
        Plain
    }
}

pub(crate) struct Node<K, V, A> {
    key: K,
    value: V,
    left: Link<K, V, A>,
    right: Link<K, V, A>,
    parent: Link<K, V, A>,
    height: usize,
    size: usize,
    aug: A,
}

pub(crate) type Link<K, V, A> = Option<NodePtr<K, V, A>>;

/// Unchecked handle to a heap-allocated [`Node`].
///
/// Copyable so that parent/child links can alias; the single-owner discipline
/// (each node is reachable from exactly one root via child links) is upheld by
/// the collection modules.
pub(crate) struct NodePtr<K, V, A>(NonNull<Node<K, V, A>>);

impl<K, V, A> Clone for NodePtr<K, V, A> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<K, V, A> Copy for NodePtr<K, V, A> {}
impl<K, V, A> PartialEq for NodePtr<K, V, A> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl<K, V, A> Eq for NodePtr<K, V, A> {}

pub(crate) fn height<K, V, A: Augment<K>>(link: Link<K, V, A>) -> usize {
    link.map_or(0, |n| n.height())
}

pub(crate) fn size<K, V, A: Augment<K>>(link: Link<K, V, A>) -> usize {
    link.map_or(0, |n| n.size())
}

pub(crate) fn aug<K, V, A: Augment<K>>(link: Link<K, V, A>) -> A {
    link.map_or_else(A::empty, |n| n.aug())
}

impl<K, V, A: Augment<K>> NodePtr<K, V, A> {
    /// Allocate a fresh childless node.
    pub(crate) fn new(key: K, value: V) -> Self {
        let aug = A::from_key(&key);
        let node = Box::new(Node {
            key,
            value,
            left: None,
            right: None,
            parent: None,
            height: 1,
            size: 1,
            aug,
        });
        NodePtr(NonNull::from(Box::leak(node)))
    }

    /// Free the node, returning its payload. The node must be fully detached.
    pub(crate) fn into_inner(self) -> (K, V) {
        let node = unsafe { Box::from_raw(self.ptr()) };
        (node.key, node.value)
    }

    fn ptr(self) -> *mut Node<K, V, A> {
        self.0.as_ptr()
    }

    pub(crate) fn key<'a>(self) -> &'a K {
        unsafe { &(*self.ptr()).key }
    }

    pub(crate) fn value<'a>(self) -> &'a V {
        unsafe { &(*self.ptr()).value }
    }

    pub(crate) fn value_mut<'a>(self) -> &'a mut V {
        unsafe { &mut (*self.ptr()).value }
    }

    pub(crate) fn key_value<'a>(self) -> (&'a K, &'a V) {
        unsafe {
            let node = &*self.ptr();
            (&node.key, &node.value)
        }
    }

    pub(crate) fn replace_value(self, value: V) -> V {
        mem::replace(self.value_mut(), value)
    }

    pub(crate) fn left(self) -> Link<K, V, A> {
        unsafe { (*self.ptr()).left }
    }

    pub(crate) fn right(self) -> Link<K, V, A> {
        unsafe { (*self.ptr()).right }
    }

    pub(crate) fn parent(self) -> Link<K, V, A> {
        unsafe { (*self.ptr()).parent }
    }

    pub(crate) fn height(self) -> usize {
        unsafe { (*self.ptr()).height }
    }

    pub(crate) fn size(self) -> usize {
        unsafe { (*self.ptr()).size }
    }

    pub(crate) fn aug(self) -> A {
        unsafe { (*self.ptr()).aug }
    }

    fn set_left(self, link: Link<K, V, A>) {
        unsafe { (*self.ptr()).left = link }
    }

    fn set_right(self, link: Link<K, V, A>) {
        unsafe { (*self.ptr()).right = link }
    }

    pub(crate) fn set_parent(self, link: Link<K, V, A>) {
        unsafe { (*self.ptr()).parent = link }
    }

    /// Hang `child` as the left subtree, re-parenting it here.
    pub(crate) fn hang_left(self, child: Link<K, V, A>) {
        self.set_left(child);
        if let Some(c) = child {
            c.set_parent(Some(self));
        }
    }

    /// Hang `child` as the right subtree, re-parenting it here.
    pub(crate) fn hang_right(self, child: Link<K, V, A>) {
        self.set_right(child);
        if let Some(c) = child {
            c.set_parent(Some(self));
        }
    }

    /// Detach and return the left subtree.
    pub(crate) fn take_left(self) -> Link<K, V, A> {
        let child = self.left();
        if let Some(c) = child {
            c.set_parent(None);
        }
        self.set_left(None);
        child
    }

    /// Detach and return the right subtree.
    pub(crate) fn take_right(self) -> Link<K, V, A> {
        let child = self.right();
        if let Some(c) = child {
            c.set_parent(None);
        }
        self.set_right(None);
        child
    }

    /// Sever all links and reset the cached invariants to a singleton's.
    pub(crate) fn clear_links(self) {
        self.set_left(None);
        self.set_right(None);
        self.set_parent(None);
        self.update();
    }

    /// Swap which child slot of `self` holds `old` to hold `new` instead.
    /// Does not touch `new`'s parent link.
    fn replace_child(self, old: Self, new: Self) {
        if self.left() == Some(old) {
            self.set_left(Some(new));
        } else {
            self.set_right(Some(new));
        }
    }

    /// Recompute height, size and the augmented summary from the children.
    pub(crate) fn update(self) {
        unsafe {
            let node = &mut *self.ptr();
            node.height = height(node.left).max(height(node.right)) + 1;
            node.size = size(node.left) + size(node.right) + 1;
            node.aug = A::combine(aug(node.left), &node.key, aug(node.right));
        }
    }

    /// Exchange the payloads of two nodes, leaving the links untouched.
    /// Cached invariants go stale; the caller repairs afterwards.
    pub(crate) fn swap_payload(self, other: Self) {
        unsafe {
            let a = self.ptr();
            let b = other.ptr();
            mem::swap(&mut (*a).key, &mut (*b).key);
            mem::swap(&mut (*a).value, &mut (*b).value);
        }
    }

    pub(crate) fn min_in_subtree(self) -> Self {
        let mut node = self;
        while let Some(l) = node.left() {
            node = l;
        }
        node
    }

    pub(crate) fn max_in_subtree(self) -> Self {
        let mut node = self;
        while let Some(r) = node.right() {
            node = r;
        }
        node
    }

    /// In-order successor: leftmost node of the right subtree, or the first
    /// ancestor reached from a left child.
    pub(crate) fn successor(self) -> Link<K, V, A> {
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

    /// In-order predecessor, mirror of [`NodePtr::successor`].
    pub(crate) fn predecessor(self) -> Link<K, V, A> {
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

/// Rotate the edge between `a` and its right child, lifting the child:
///
/// ```text
///     a                b
///    / \              / \
///   x   b     ==>    a   z
///      / \          / \
///     y   z        x   y
/// ```
///
/// Returns the new subtree root `b`, with `a`'s old parent link transferred.
fn rotate_left<K, V, A: Augment<K>>(a: NodePtr<K, V, A>) -> NodePtr<K, V, A> {
    let parent = a.parent();
    let b = a.right().expect("rotation requires a right child");
    let mid = b.left();
    a.set_right(mid);
    if let Some(m) = mid {
        m.set_parent(Some(a));
    }
    b.set_left(Some(a));
    a.set_parent(Some(b));
    b.set_parent(parent);
    if let Some(p) = parent {
        p.replace_child(a, b);
    }
    a.update();
    b.update();
    b
}

/// Mirror of [`rotate_left`].
fn rotate_right<K, V, A: Augment<K>>(a: NodePtr<K, V, A>) -> NodePtr<K, V, A> {
    let parent = a.parent();
    let b = a.left().expect("rotation requires a left child");
    let mid = b.right();
    a.set_left(mid);
    if let Some(m) = mid {
        m.set_parent(Some(a));
    }
    b.set_right(Some(a));
    a.set_parent(Some(b));
    b.set_parent(parent);
    if let Some(p) = parent {
        p.replace_child(a, b);
    }
    a.update();
    b.update();
    b
}

/// Restore balance at a node whose child heights differ by exactly two.
/// Classifies into single or double rotation by the grandchild heights on the
/// heavier side and returns the new subtree root.
fn rebalance<K, V, A: Augment<K>>(node: NodePtr<K, V, A>) -> NodePtr<K, V, A> {
    let lh = height(node.left());
    let rh = height(node.right());
    if rh > lh {
        let r = node.right().expect("right-heavy node has a right child");
        if lh < height(r.right()) {
            rotate_left(node)
        } else if lh < height(r.left()) {
            rotate_right(r);
            rotate_left(node)
        } else {
            panic!("unbalanced node matches no rotation case");
        }
    } else {
        let l = node.left().expect("left-heavy node has a left child");
        if rh < height(l.left()) {
            rotate_right(node)
        } else if rh < height(l.right()) {
            rotate_left(l);
            rotate_right(node)
        } else {
            panic!("unbalanced node matches no rotation case");
        }
    }
}

/// Recompute invariants and repair balance from `node` up to the root of its
/// tree. Returns the (possibly new) root. A single structural change never
/// skews any node by more than two, so one rotation pass per level suffices.
pub(crate) fn repair<K, V, A: Augment<K>>(node: NodePtr<K, V, A>) -> NodePtr<K, V, A> {
    let mut node = node;
    loop {
        node.update();
        let lh = height(node.left());
        let rh = height(node.right());
        if lh.abs_diff(rh) == 2 {
            node = rebalance(node);
        }
        match node.parent() {
            Some(p) => node = p,
            None => return node,
        }
    }
}

/// Join two trees around a pivot node: `max(a) < pivot < min(b)` is the
/// caller's obligation. Runs in time proportional to the height difference of
/// the operands. Returns the root of the combined tree.
pub(crate) fn merge_with_root<K, V, A: Augment<K>>(
    a: Link<K, V, A>,
    b: Link<K, V, A>,
    pivot: NodePtr<K, V, A>,
) -> NodePtr<K, V, A> {
    pivot.clear_links();
    match (a, b) {
        (None, None) => pivot,
        (None, Some(b)) => {
            let min = b.min_in_subtree();
            min.hang_left(Some(pivot));
            repair(min)
        }
        (Some(a), None) => {
            let max = a.max_in_subtree();
            max.hang_right(Some(pivot));
            repair(max)
        }
        (Some(a), Some(b)) => {
            let (ah, bh) = (a.height(), b.height());
            if ah.abs_diff(bh) <= 1 {
                pivot.hang_left(Some(a));
                pivot.hang_right(Some(b));
                pivot.update();
                pivot
            } else if ah > bh {
                // Walk a's right spine down to the first subtree the shorter
                // tree can be joined with, splice the pivot in there.
                let mut spine = a;
                while spine.height() > bh + 1 {
                    spine = spine.right().expect("spine node above join height");
                }
                let attach = spine.parent().expect("spine walk descended at least once");
                pivot.hang_left(Some(spine));
                pivot.hang_right(Some(b));
                pivot.update();
                attach.hang_right(Some(pivot));
                repair(pivot)
            } else {
                let mut spine = b;
                while spine.height() > ah + 1 {
                    spine = spine.left().expect("spine node above join height");
                }
                let attach = spine.parent().expect("spine walk descended at least once");
                pivot.hang_right(Some(spine));
                pivot.hang_left(Some(a));
                pivot.update();
                attach.hang_left(Some(pivot));
                repair(pivot)
            }
        }
    }
}

/// Detach the maximum node of the tree rooted at `root`. Returns the repaired
/// remainder and the detached node. The node keeps its payload only.
pub(crate) fn extract_max<K, V, A: Augment<K>>(
    root: NodePtr<K, V, A>,
) -> (Link<K, V, A>, NodePtr<K, V, A>) {
    let max = root.max_in_subtree();
    let left = max.take_left();
    match max.parent() {
        None => (left, max),
        Some(p) => {
            p.hang_right(left);
            max.set_parent(None);
            (Some(repair(p)), max)
        }
    }
}

/// Mirror of [`extract_max`].
pub(crate) fn extract_min<K, V, A: Augment<K>>(
    root: NodePtr<K, V, A>,
) -> (Link<K, V, A>, NodePtr<K, V, A>) {
    let min = root.min_in_subtree();
    let right = min.take_right();
    match min.parent() {
        None => (right, min),
        Some(p) => {
            p.hang_left(right);
            min.set_parent(None);
            (Some(repair(p)), min)
        }
    }
}

/// Attach a detached node as the new maximum of the tree rooted at `root`,
/// used by the implicit-key discipline where every insert appends. Returns the
/// repaired root.
pub(crate) fn push_max<K, V, A: Augment<K>>(
    root: NodePtr<K, V, A>,
    node: NodePtr<K, V, A>,
) -> NodePtr<K, V, A> {
    let max = root.max_in_subtree();
    max.hang_right(Some(node));
    repair(max)
}

/// Descend to the node with the given in-order rank, steering by the cached
/// subtree sizes. `rank` must be smaller than the subtree size.
pub(crate) fn node_by_rank<K, V, A: Augment<K>>(
    root: NodePtr<K, V, A>,
    mut rank: usize,
) -> NodePtr<K, V, A> {
    let mut node = root;
    loop {
        let left_size = size(node.left());
        match rank.cmp(&left_size) {
            std::cmp::Ordering::Equal => return node,
            std::cmp::Ordering::Less => {
                node = node.left().expect("rank within left subtree");
            }
            std::cmp::Ordering::Greater => {
                rank -= left_size + 1;
                node = node.right().expect("rank within right subtree");
            }
        }
    }
}

/// One pending join recorded while descending a split path: the pivot node,
/// the subtree that was detached intact, and whether the pair belongs to the
/// first (lower) output tree.
pub(crate) type SplitFrame<K, V, A> = (NodePtr<K, V, A>, Link<K, V, A>, bool);

/// Unwind a split descent, joining each recorded pivot and intact subtree onto
/// the accumulating output trees. The per-level joins telescope to a
/// logarithmic total cost.
pub(crate) fn unwind_split<K, V, A: Augment<K>>(
    mut stack: StkVec<SplitFrame<K, V, A>>,
    mut first: Link<K, V, A>,
    mut second: Link<K, V, A>,
) -> (Link<K, V, A>, Link<K, V, A>) {
    while let Some((pivot, intact, to_first)) = stack.pop() {
        if to_first {
            first = Some(merge_with_root(intact, first, pivot));
        } else {
            second = Some(merge_with_root(second, intact, pivot));
        }
    }
    (first, second)
}

/// Free every node in the subtree without recursing.
pub(crate) fn free_subtree<K, V, A: Augment<K>>(link: Link<K, V, A>) {
    let Some(mut node) = link else { return };
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

/// Structurally clone a subtree. Recursion depth is the tree height.
pub(crate) fn clone_subtree<K: Clone, V: Clone, A: Augment<K>>(
    link: Link<K, V, A>,
) -> Link<K, V, A> {
    link.map(|node| {
        let copy = NodePtr::new(node.key().clone(), node.value().clone());
        copy.hang_left(clone_subtree(node.left()));
        copy.hang_right(clone_subtree(node.right()));
        copy.update();
        copy
    })
}

/// Borrowing in-order cursor over a subtree, shared by the collection
/// iterators. Walks successor/predecessor chains between the recorded ends.
pub(crate) struct NodeIter<'a, K, V, A> {
    front: Link<K, V, A>,
    back: Link<K, V, A>,
    remaining: usize,
    marker: PhantomData<&'a (K, V)>,
}

impl<K, V, A: Augment<K>> NodeIter<'_, K, V, A> {
    pub(crate) fn new(root: Link<K, V, A>) -> Self {
        NodeIter {
            front: root.map(|r| r.min_in_subtree()),
            back: root.map(|r| r.max_in_subtree()),
            remaining: size(root),
            marker: PhantomData,
        }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.remaining
    }

    pub(crate) fn next_node(&mut self) -> Link<K, V, A> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.front.expect("length and cursor agree");
        self.front = node.successor();
        self.remaining -= 1;
        Some(node)
    }

    pub(crate) fn next_node_back(&mut self) -> Link<K, V, A> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.back.expect("length and cursor agree");
        self.back = node.predecessor();
        self.remaining -= 1;
        Some(node)
    }
}

#[cfg(test)]
pub(crate) fn check_subtree<K, V, A>(link: Link<K, V, A>, parent: Link<K, V, A>) -> (usize, usize)
where
    A: Augment<K> + PartialEq + std::fmt::Debug,
{
    let Some(node) = link else { return (0, 0) };
    assert!(node.parent() == parent, "parent back-reference is inconsistent");
    let (lh, ls) = check_subtree(node.left(), link);
    let (rh, rs) = check_subtree(node.right(), link);
    assert!(lh.abs_diff(rh) <= 1, "height balance violated");
    assert_eq!(node.height(), lh.max(rh) + 1, "cached height is stale");
    assert_eq!(node.size(), ls + rs + 1, "cached size is stale");
    let expected = A::combine(aug(node.left()), node.key(), aug(node.right()));
    assert_eq!(node.aug(), expected, "cached summary is stale");
    (node.height(), node.size())
}

#[cfg(test)]
pub(crate) fn check_order<K: Ord, V, A: Augment<K>>(root: Link<K, V, A>) {
    let Some(root) = root else { return };
    let mut node = root.min_in_subtree();
    while let Some(next) = node.successor() {
        assert!(node.key() < next.key(), "keys out of order");
        node = next;
    }
}

//! Persistent B+tree list.
//!
//! A list stored as a B+tree of `Arc`-shared nodes. Nothing is ever modified
//! in place: an update clones the nodes on the path from the root down to the
//! affected leaf and points them at the untouched siblings of the old tree.
//!
//! Structure:
//! - Leaves store up to LEAF_SIZE items
//! - Branches store up to NODE_SIZE children plus the item count of each child
//! - Every leaf sits at the same depth
//! - Every node except the root is at least half full
//!
//! Operations:
//! - get: O(log n), walk the child counts down to a leaf
//! - insert / remove / set: O(log n) new nodes, the rest is shared
//! - iter: O(1) amortized per item, with an explicit stack of branches

use std::fmt;
use std::ops::Index;
use std::sync::Arc;

use smallvec::SmallVec;

use super::PersistentSeq;
use crate::error::Error;
use crate::error::Result;

const LEAF_SIZE: usize = 32;
const NODE_SIZE: usize = 16;
const MIN_LEAF: usize = LEAF_SIZE / 2;
const MIN_NODE: usize = NODE_SIZE / 2;

enum Node<T> {
    Leaf(Vec<T>),
    Branch(Branch<T>),
}

/// An internal node with children and the number of items below each child.
struct Branch<T> {
    children: Vec<Arc<Node<T>>>,
    counts: Vec<usize>,
    /// Total item count in this subtree.
    len: usize,
}

// Derived `Clone` would demand `T: Clone`; children are only `Arc` bumps.
impl<T> Clone for Branch<T> {
    fn clone(&self) -> Self {
        return Branch {
            children: self.children.clone(),
            counts: self.counts.clone(),
            len: self.len,
        };
    }
}

impl<T> Branch<T> {
    fn from_children(children: Vec<Arc<Node<T>>>) -> Branch<T> {
        let counts: Vec<usize> = children.iter().map(|child| child.len()).collect();
        let len = counts.iter().sum();
        return Branch { children, counts, len };
    }

    /// Find the child containing the given item index.
    /// Returns (child_slot, index_within_child). An index equal to `len`
    /// lands at the end of the last child, which is what appending wants.
    #[inline]
    fn locate(&self, mut index: usize) -> (usize, usize) {
        let last = self.counts.len() - 1;
        for (slot, &count) in self.counts[..last].iter().enumerate() {
            if index < count {
                return (slot, index);
            }
            index -= count;
        }
        return (last, index);
    }

    fn replace(&mut self, slot: usize, node: Node<T>) {
        let count = node.len();
        self.len = self.len - self.counts[slot] + count;
        self.counts[slot] = count;
        self.children[slot] = Arc::new(node);
    }

    fn insert_child(&mut self, slot: usize, node: Node<T>) {
        let count = node.len();
        self.len += count;
        self.counts.insert(slot, count);
        self.children.insert(slot, Arc::new(node));
    }

    fn remove_child(&mut self, slot: usize) -> Arc<Node<T>> {
        self.len -= self.counts.remove(slot);
        return self.children.remove(slot);
    }

    /// Split this branch, returning the right half.
    fn split(&mut self) -> Branch<T> {
        let mid = self.children.len() / 2;
        let right = Branch::from_children(self.children.drain(mid..).collect());
        self.counts.truncate(mid);
        self.len -= right.len;
        return right;
    }
}

impl<T: Clone> Branch<T> {
    /// Repair an underfull child by merging it with a neighbour, splitting
    /// the result again if the two together overflow.
    fn rebalance(&mut self, slot: usize) {
        if self.children.len() < 2 {
            return;
        }
        let left = if slot > 0 { slot - 1 } else { slot };
        let right = self.remove_child(left + 1);
        let merged = Node::concat(&self.children[left], &right);

        if merged.is_overfull() {
            let (a, b) = merged.split_half();
            self.replace(left, a);
            self.insert_child(left + 1, b);
        } else {
            self.replace(left, merged);
        }
    }
}

impl<T> Node<T> {
    #[inline(always)]
    fn len(&self) -> usize {
        return match self {
            Node::Leaf(items) => items.len(),
            Node::Branch(branch) => branch.len,
        };
    }

    #[inline(always)]
    fn width(&self) -> usize {
        return match self {
            Node::Leaf(items) => items.len(),
            Node::Branch(branch) => branch.children.len(),
        };
    }

    #[inline(always)]
    fn is_overfull(&self) -> bool {
        return match self {
            Node::Leaf(_) => self.width() > LEAF_SIZE,
            Node::Branch(_) => self.width() > NODE_SIZE,
        };
    }

    #[inline(always)]
    fn is_underfull(&self) -> bool {
        return match self {
            Node::Leaf(_) => self.width() < MIN_LEAF,
            Node::Branch(_) => self.width() < MIN_NODE,
        };
    }

    /// Split an owned node down the middle.
    fn split_half(self) -> (Node<T>, Node<T>) {
        return match self {
            Node::Leaf(mut items) => {
                let right = items.split_off(items.len() / 2);
                (Node::Leaf(items), Node::Leaf(right))
            }
            Node::Branch(mut branch) => {
                let right = branch.split();
                (Node::Branch(branch), Node::Branch(right))
            }
        };
    }
}

impl<T: Clone> Node<T> {
    fn concat(left: &Node<T>, right: &Node<T>) -> Node<T> {
        return match (left, right) {
            (Node::Leaf(a), Node::Leaf(b)) => Node::Leaf(a.iter().chain(b).cloned().collect()),
            (Node::Branch(a), Node::Branch(b)) => Node::Branch(Branch::from_children(
                a.children.iter().chain(&b.children).cloned().collect(),
            )),
            _ => unreachable!("siblings always share a height"),
        };
    }

    /// Insert below this node. Returns the replacement node and, when it
    /// overflowed, the right half that the parent must adopt.
    fn insert(&self, index: usize, value: T) -> (Node<T>, Option<Node<T>>) {
        let next = match self {
            Node::Leaf(items) => {
                let mut items = items.clone();
                items.insert(index, value);
                Node::Leaf(items)
            }
            Node::Branch(branch) => {
                let (slot, offset) = branch.locate(index);
                let (child, split) = branch.children[slot].insert(offset, value);
                let mut next = branch.clone();
                next.replace(slot, child);
                if let Some(right) = split {
                    next.insert_child(slot + 1, right);
                }
                Node::Branch(next)
            }
        };

        if next.is_overfull() {
            let (left, right) = next.split_half();
            return (left, Some(right));
        }
        return (next, None);
    }

    fn remove(&self, index: usize) -> (Node<T>, T) {
        match self {
            Node::Leaf(items) => {
                let mut items = items.clone();
                let removed = items.remove(index);
                return (Node::Leaf(items), removed);
            }
            Node::Branch(branch) => {
                let (slot, offset) = branch.locate(index);
                let (child, removed) = branch.children[slot].remove(offset);
                let underfull = child.is_underfull();
                let mut next = branch.clone();
                next.replace(slot, child);
                if underfull {
                    next.rebalance(slot);
                }
                return (Node::Branch(next), removed);
            }
        }
    }

    fn set(&self, index: usize, value: T) -> Node<T> {
        match self {
            Node::Leaf(items) => {
                let mut items = items.clone();
                items[index] = value;
                return Node::Leaf(items);
            }
            Node::Branch(branch) => {
                let (slot, offset) = branch.locate(index);
                let child = branch.children[slot].set(offset, value);
                let mut next = branch.clone();
                next.replace(slot, child);
                return Node::Branch(next);
            }
        }
    }
}

/// A persistent list implemented as a B+tree with shared nodes.
///
/// Cloning is O(1). Updates return a new list and never disturb existing
/// ones, which may be read from other threads at the same time.
pub struct TreeList<T> {
    /// `None` for the empty list, so `default()` never allocates.
    root: Option<Arc<Node<T>>>,
}

impl<T> TreeList<T> {
    pub const fn new() -> TreeList<T> {
        return TreeList { root: None };
    }

    /// Wrap a freshly built root, peeling off branches with a single child.
    fn from_root(node: Node<T>) -> TreeList<T> {
        let mut root = Arc::new(node);
        loop {
            let child = match &*root {
                Node::Leaf(items) if items.is_empty() => return TreeList { root: None },
                Node::Branch(branch) if branch.children.len() == 1 => Arc::clone(&branch.children[0]),
                _ => return TreeList { root: Some(root) },
            };
            root = child;
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        return self.root.as_ref().map_or(0, |root| root.len());
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        return self.root.is_none();
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        let (items, offset) = self.leaf_at(index)?;
        return items.get(offset);
    }

    /// The leaf holding `index` and the position of `index` within it.
    fn leaf_at(&self, mut index: usize) -> Option<(&[T], usize)> {
        if index >= self.len() {
            return None;
        }
        let mut node = self.root.as_deref()?;
        loop {
            match node {
                Node::Leaf(items) => return Some((items.as_slice(), index)),
                Node::Branch(branch) => {
                    let (slot, offset) = branch.locate(index);
                    node = &*branch.children[slot];
                    index = offset;
                }
            }
        }
    }

    pub fn iter(&self) -> Iter<'_, T> {
        let mut iter = Iter {
            stack: SmallVec::new(),
            leaf: Default::default(),
            remaining: self.len(),
        };
        if let Some(root) = self.root.as_deref() {
            iter.descend(root);
        }
        return iter;
    }

    /// True when both lists share the same root node. Two lists for which
    /// this holds are guaranteed to be equal.
    pub fn ptr_eq(&self, other: &TreeList<T>) -> bool {
        return match (&self.root, &other.root) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
    }

    /// Build a list from `values`, filling leaves and branches evenly from
    /// the bottom up.
    pub fn from_vec(values: Vec<T>) -> TreeList<T> {
        if values.is_empty() {
            return TreeList::new();
        }

        let mut level: Vec<Node<T>> = even_chunks(values, LEAF_SIZE)
            .into_iter()
            .map(Node::Leaf)
            .collect();

        while level.len() > 1 {
            level = even_chunks(level, NODE_SIZE)
                .into_iter()
                .map(|children| {
                    let children = children.into_iter().map(Arc::new).collect();
                    Node::Branch(Branch::from_children(children))
                })
                .collect();
        }

        return match level.pop() {
            Some(root) => TreeList::from_root(root),
            None => TreeList::new(),
        };
    }
}

impl<T: Clone> TreeList<T> {
    /// Insert without a bounds check. Callers guarantee `index <= len`.
    fn inserted(&self, index: usize, value: T) -> TreeList<T> {
        let Some(root) = self.root.as_deref() else {
            return TreeList::from_root(Node::Leaf(vec![value]));
        };
        let (left, split) = root.insert(index, value);
        return match split {
            None => TreeList::from_root(left),
            Some(right) => TreeList::from_root(Node::Branch(Branch::from_children(vec![
                Arc::new(left),
                Arc::new(right),
            ]))),
        };
    }

    pub fn insert(&self, index: usize, value: T) -> Result<TreeList<T>> {
        let len = self.len();
        if index > len {
            return Err(Error::out_of_range(index, len));
        }
        return Ok(self.inserted(index, value));
    }

    pub fn push(&self, value: T) -> TreeList<T> {
        return self.inserted(self.len(), value);
    }

    pub fn remove(&self, index: usize) -> Result<(TreeList<T>, T)> {
        let len = self.len();
        let root = match self.root.as_deref() {
            Some(root) if index < len => root,
            _ => return Err(Error::out_of_range(index, len)),
        };
        let (node, removed) = root.remove(index);
        return Ok((TreeList::from_root(node), removed));
    }

    pub fn set(&self, index: usize, value: T) -> Result<TreeList<T>> {
        let len = self.len();
        let root = match self.root.as_deref() {
            Some(root) if index < len => root,
            _ => return Err(Error::out_of_range(index, len)),
        };
        return Ok(TreeList::from_root(root.set(index, value)));
    }
}

/// Split `items` into the fewest chunks of at most `max` elements whose sizes
/// differ by at most one. With more than one chunk, each holds at least
/// `max / 2` elements.
fn even_chunks<U>(items: Vec<U>, max: usize) -> Vec<Vec<U>> {
    let count = items.len().div_ceil(max);
    let base = items.len() / count;
    let extra = items.len() % count;

    let mut rest = items.into_iter();
    let mut chunks = Vec::with_capacity(count);
    for i in 0..count {
        let size = base + usize::from(i < extra);
        chunks.push(rest.by_ref().take(size).collect());
    }
    return chunks;
}

impl<T> Clone for TreeList<T> {
    fn clone(&self) -> Self {
        return TreeList {
            root: self.root.clone(),
        };
    }
}

impl<T> Default for TreeList<T> {
    fn default() -> Self {
        return Self::new();
    }
}

impl<T: fmt::Debug> fmt::Debug for TreeList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.debug_list().entries(self.iter()).finish();
    }
}

impl<T: PartialEq> PartialEq for TreeList<T> {
    fn eq(&self, other: &Self) -> bool {
        return self.ptr_eq(other) || (self.len() == other.len() && self.iter().eq(other.iter()));
    }
}

impl<T: Eq> Eq for TreeList<T> {}

impl<T> Index<usize> for TreeList<T> {
    type Output = T;

    /// Panics when `index` is out of range, like slice indexing.
    fn index(&self, index: usize) -> &T {
        let len = self.len();
        return match self.get(index) {
            Some(item) => item,
            None => panic!("index {} out of range for TreeList of length {}", index, len),
        };
    }
}

impl<T> FromIterator<T> for TreeList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        return TreeList::from_vec(iter.into_iter().collect());
    }
}

impl<'a, T> IntoIterator for &'a TreeList<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        return self.iter();
    }
}

impl<T> PersistentSeq for TreeList<T>
where
    T: Clone + Send + Sync,
{
    type Item = T;

    type Iter<'a>
        = Iter<'a, T>
    where
        Self: 'a;

    fn len(&self) -> usize {
        return TreeList::len(self);
    }

    fn get(&self, index: usize) -> Option<&T> {
        return TreeList::get(self, index);
    }

    fn iter(&self) -> Self::Iter<'_> {
        return TreeList::iter(self);
    }

    fn chunk(&self, index: usize) -> &[T] {
        return match self.leaf_at(index) {
            Some((items, offset)) => &items[offset..],
            None => &[],
        };
    }

    fn chunk_before(&self, end: usize) -> &[T] {
        let Some(last) = end.checked_sub(1) else {
            return &[];
        };
        return match self.leaf_at(last) {
            Some((items, offset)) => &items[..=offset],
            None => &[],
        };
    }

    fn from_vec(values: Vec<T>) -> Self {
        return TreeList::from_vec(values);
    }

    fn insert_at(&self, index: usize, value: T) -> Result<Self> {
        return self.insert(index, value);
    }

    fn remove_at(&self, index: usize) -> Result<(Self, T)> {
        return self.remove(index);
    }

    fn set_at(&self, index: usize, value: T) -> Result<Self> {
        return self.set(index, value);
    }

    fn push(&self, value: T) -> Self {
        return TreeList::push(self, value);
    }
}

/// Iterator over TreeList items, in order.
pub struct Iter<'a, T> {
    /// Branches on the path to the current leaf, each with the slot of the
    /// next child to visit.
    stack: SmallVec<[(&'a Branch<T>, usize); 8]>,
    /// Remaining items of the current leaf.
    leaf: std::slice::Iter<'a, T>,
    remaining: usize,
}

impl<'a, T> Iter<'a, T> {
    /// Walk down the leftmost edge of `node`, pushing branches as we go.
    fn descend(&mut self, mut node: &'a Node<T>) {
        loop {
            match node {
                Node::Leaf(items) => {
                    self.leaf = items.iter();
                    return;
                }
                Node::Branch(branch) => {
                    self.stack.push((branch, 1));
                    node = &*branch.children[0];
                }
            }
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.leaf.next() {
                self.remaining -= 1;
                return Some(item);
            }
            let (branch, slot) = self.stack.last_mut()?;
            let parent: &'a Branch<T> = *branch;
            let index = *slot;
            if index == parent.children.len() {
                self.stack.pop();
                continue;
            }
            *slot += 1;
            self.descend(&*parent.children[index]);
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        return (self.remaining, Some(self.remaining));
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> std::iter::FusedIterator for Iter<'_, T> {}

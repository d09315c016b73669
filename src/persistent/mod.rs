//! Immutable ordered sequences.
//!
//! A [`PersistentSeq`] never changes once built. Every update hands back a new
//! value and leaves the receiver untouched, so any number of threads can keep
//! reading an old value while a writer derives the next one. Two backings
//! ship with the crate:
//!
//! - [`TreeList`]: an `Arc`-linked B+tree. Updates copy one root-to-leaf path
//!   and share everything else, so they cost O(log n).
//! - `Arc<[T]>`: a flat slice that is copied on every update. O(n), but
//!   simple and compact for small lists.

mod flat;
pub mod tree_list;

pub use tree_list::TreeList;

use crate::error::Result;

/// An immutable sequence supporting value-returning updates.
///
/// Implementations must never mutate `self`. Index-addressed updates fail with
/// [`Error::IndexOutOfRange`](crate::Error::IndexOutOfRange) and leave the
/// receiver as it was.
pub trait PersistentSeq: Clone + Default + Send + Sync + Sized {
    type Item;

    type Iter<'a>: Iterator<Item = &'a Self::Item>
    where
        Self: 'a;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        return self.len() == 0;
    }

    fn get(&self, index: usize) -> Option<&Self::Item>;

    fn iter(&self) -> Self::Iter<'_>;

    /// The contiguous run of elements that starts at `index`. Never empty
    /// while `index < len`; empty otherwise.
    fn chunk(&self, index: usize) -> &[Self::Item] {
        return self.get(index).map(std::slice::from_ref).unwrap_or(&[]);
    }

    /// The contiguous run of elements that ends just before `end`. Never
    /// empty while `0 < end <= len`; empty otherwise.
    fn chunk_before(&self, end: usize) -> &[Self::Item] {
        return end
            .checked_sub(1)
            .and_then(|last| self.get(last))
            .map(std::slice::from_ref)
            .unwrap_or(&[]);
    }

    /// Build a sequence holding `values` in order.
    fn from_vec(values: Vec<Self::Item>) -> Self;

    /// Insert `value` so that it ends up at `index`. `index == len` appends.
    fn insert_at(&self, index: usize, value: Self::Item) -> Result<Self>;

    /// Remove the element at `index`, returning the new sequence and the
    /// removed element.
    fn remove_at(&self, index: usize) -> Result<(Self, Self::Item)>;

    /// Replace the element at `index`. Every other position is unchanged.
    fn set_at(&self, index: usize, value: Self::Item) -> Result<Self>;

    fn push(&self, value: Self::Item) -> Self;

    fn clear(&self) -> Self {
        return Self::default();
    }

    fn index_of(&self, value: &Self::Item) -> Option<usize>
    where
        Self::Item: PartialEq,
    {
        return self.iter().position(|item| item == value);
    }

    fn contains(&self, value: &Self::Item) -> bool
    where
        Self::Item: PartialEq,
    {
        return self.index_of(value).is_some();
    }

    /// Remove the first element equal to `value`. Returns `None` when there
    /// is no such element.
    fn remove_value(&self, value: &Self::Item) -> Option<Self>
    where
        Self::Item: PartialEq,
    {
        let index = self.index_of(value)?;
        return self.remove_at(index).ok().map(|(next, _)| next);
    }
}

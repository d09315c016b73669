//! `Arc<[T]>` as a copy-on-write sequence.

use std::sync::Arc;

use super::PersistentSeq;
use crate::error::Error;
use crate::error::Result;

impl<T> PersistentSeq for Arc<[T]>
where
    T: Clone + Send + Sync,
{
    type Item = T;

    type Iter<'a>
        = std::slice::Iter<'a, T>
    where
        Self: 'a;

    fn len(&self) -> usize {
        return <[T]>::len(self);
    }

    fn get(&self, index: usize) -> Option<&T> {
        return <[T]>::get(self, index);
    }

    fn iter(&self) -> Self::Iter<'_> {
        return <[T]>::iter(self);
    }

    fn chunk(&self, index: usize) -> &[T] {
        return <[T]>::get(self, index..).unwrap_or(&[]);
    }

    fn chunk_before(&self, end: usize) -> &[T] {
        return <[T]>::get(self, ..end).unwrap_or(&[]);
    }

    fn from_vec(values: Vec<T>) -> Self {
        return Arc::from(values);
    }

    fn insert_at(&self, index: usize, value: T) -> Result<Self> {
        let len = <[T]>::len(self);
        if index > len {
            return Err(Error::out_of_range(index, len));
        }
        let mut values = Vec::with_capacity(len + 1);
        values.extend_from_slice(&self[..index]);
        values.push(value);
        values.extend_from_slice(&self[index..]);
        return Ok(Arc::from(values));
    }

    fn remove_at(&self, index: usize) -> Result<(Self, T)> {
        let len = <[T]>::len(self);
        if index >= len {
            return Err(Error::out_of_range(index, len));
        }
        let mut values = self.to_vec();
        let removed = values.remove(index);
        return Ok((Arc::from(values), removed));
    }

    fn set_at(&self, index: usize, value: T) -> Result<Self> {
        let len = <[T]>::len(self);
        if index >= len {
            return Err(Error::out_of_range(index, len));
        }
        let mut values = self.to_vec();
        values[index] = value;
        return Ok(Arc::from(values));
    }

    fn push(&self, value: T) -> Self {
        let mut values = Vec::with_capacity(<[T]>::len(self) + 1);
        values.extend_from_slice(self);
        values.push(value);
        return Arc::from(values);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(values: &[i32]) -> Arc<[i32]> {
        return Arc::from(values.to_vec());
    }

    #[test]
    fn updates_leave_receiver_alone() {
        let original = flat(&[1, 2, 3]);

        let inserted = original.insert_at(1, 9).unwrap();
        let (removed, value) = original.remove_at(0).unwrap();
        let set = original.set_at(2, 7).unwrap();
        let pushed = PersistentSeq::push(&original, 4);

        assert_eq!(&*original, &[1, 2, 3]);
        assert_eq!(&*inserted, &[1, 9, 2, 3]);
        assert_eq!((&*removed, value), (&[2, 3][..], 1));
        assert_eq!(&*set, &[1, 2, 7]);
        assert_eq!(&*pushed, &[1, 2, 3, 4]);
    }

    #[test]
    fn insert_at_end_is_allowed() {
        let original = flat(&[1]);
        assert_eq!(&*original.insert_at(1, 2).unwrap(), &[1, 2]);
        assert!(original.insert_at(2, 2).unwrap_err().is_index_out_of_range());
    }

    #[test]
    fn index_errors() {
        let empty = flat(&[]);
        assert_eq!(
            empty.remove_at(0).unwrap_err(),
            Error::IndexOutOfRange { index: 0, len: 0 }
        );
        assert!(empty.set_at(0, 1).is_err());
        assert_eq!(PersistentSeq::get(&empty, 0), None);
    }

    #[test]
    fn chunks_cover_the_whole_slice() {
        let values = flat(&[1, 2, 3]);
        assert_eq!(values.chunk(1), &[2, 3]);
        assert_eq!(values.chunk_before(2), &[1, 2]);
        assert!(values.chunk(3).is_empty());
        assert!(values.chunk_before(4).is_empty());
    }

    #[test]
    fn remove_value_takes_first_match() {
        let original = flat(&[5, 8, 6, 8]);
        let next = original.remove_value(&8).unwrap();
        assert_eq!(&*next, &[5, 6, 8]);
        assert!(original.remove_value(&42).is_none());
    }
}

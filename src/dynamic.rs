//! Loosely-typed access to a list.
//!
//! Callers that only know they hold "some list" (plugin hosts, scripting
//! bridges, heterogeneous registries) can go through [`DynList`], which
//! accepts and returns `dyn Any` values. Every value is checked against the
//! list's element type before the write lock is taken; a mismatch is reported
//! as [`Error::InvalidCast`] and nothing is published.
//!
//! Indices are signed here so that callers holding a negative index get an
//! `IndexOutOfRange` error rather than a conversion problem of their own, and
//! `index_of_dyn` reports a missing element as `-1`.

use std::any::Any;

use crate::error::Error;
use crate::error::Result;
use crate::list::SnapList;
use crate::persistent::PersistentSeq;

/// Object-safe view of a [`SnapList`] over `dyn Any` values.
pub trait DynList: Send + Sync {
    /// Name of the element type the list stores.
    fn element_type(&self) -> &'static str;

    fn len_dyn(&self) -> usize;

    /// Return a boxed clone of the element at `index`.
    fn get_dyn(&self, index: isize) -> Result<Box<dyn Any + Send>>;

    fn set_dyn(&self, index: isize, value: Box<dyn Any>) -> Result<()>;

    fn insert_dyn(&self, index: isize, value: Box<dyn Any>) -> Result<()>;

    /// Append `value`, returning the index it was stored at.
    fn push_dyn(&self, value: Box<dyn Any>) -> Result<usize>;

    fn remove_at_dyn(&self, index: isize) -> Result<()>;

    /// Remove the first element equal to `value`. A value of the wrong type
    /// is an error, not a miss.
    fn remove_dyn(&self, value: &dyn Any) -> Result<bool>;

    /// False for values of the wrong type.
    fn contains_dyn(&self, value: &dyn Any) -> bool;

    /// Position of the first element equal to `value`, or -1.
    fn index_of_dyn(&self, value: &dyn Any) -> isize;

    fn clear_dyn(&self) -> Result<()>;

    /// Iterate over boxed clones of the contents as of this call. Writes made
    /// while the iterator is alive are not observed.
    fn iter_dyn(&self) -> Box<dyn Iterator<Item = Box<dyn Any + Send>> + Send + '_>;

    fn to_vec_dyn(&self) -> Vec<Box<dyn Any + Send>> {
        return self.iter_dyn().collect();
    }

    /// Copy the contents into `dest`, which must be a `Vec` of the element
    /// type, starting at `offset`. Existing slots are overwritten; the vector
    /// never grows. Returns the number of elements copied.
    fn copy_to_dyn(&self, dest: &mut dyn Any, offset: isize) -> Result<usize>;

    fn is_read_only(&self) -> bool {
        return false;
    }

    fn is_fixed_size(&self) -> bool {
        return false;
    }
}

fn downcast<T: Any>(value: Box<dyn Any>) -> Result<T> {
    return value
        .downcast::<T>()
        .map(|boxed| *boxed)
        .map_err(|_| Error::invalid_cast::<T>());
}

/// Convert a signed index, rejecting negatives against the current length.
fn unsigned<T, S>(list: &SnapList<T, S>, index: isize) -> Result<usize>
where
    S: PersistentSeq<Item = T>,
{
    return usize::try_from(index).map_err(|_| Error::IndexOutOfRange {
        index,
        len: list.len(),
    });
}

impl<T, S> DynList for SnapList<T, S>
where
    T: Any + Clone + PartialEq + Send + Sync,
    S: PersistentSeq<Item = T>,
{
    fn element_type(&self) -> &'static str {
        return std::any::type_name::<T>();
    }

    fn len_dyn(&self) -> usize {
        return self.len();
    }

    fn get_dyn(&self, index: isize) -> Result<Box<dyn Any + Send>> {
        let value = self.get(unsigned(self, index)?)?;
        return Ok(Box::new(value));
    }

    fn set_dyn(&self, index: isize, value: Box<dyn Any>) -> Result<()> {
        let value = downcast::<T>(value)?;
        return self.set(unsigned(self, index)?, value);
    }

    fn insert_dyn(&self, index: isize, value: Box<dyn Any>) -> Result<()> {
        let value = downcast::<T>(value)?;
        return self.insert(unsigned(self, index)?, value);
    }

    fn push_dyn(&self, value: Box<dyn Any>) -> Result<usize> {
        return self.push(downcast::<T>(value)?);
    }

    fn remove_at_dyn(&self, index: isize) -> Result<()> {
        self.remove_at(unsigned(self, index)?)?;
        return Ok(());
    }

    fn remove_dyn(&self, value: &dyn Any) -> Result<bool> {
        let value = value.downcast_ref::<T>().ok_or_else(Error::invalid_cast::<T>)?;
        return self.remove(value);
    }

    fn contains_dyn(&self, value: &dyn Any) -> bool {
        return value
            .downcast_ref::<T>()
            .is_some_and(|value| self.contains(value));
    }

    fn index_of_dyn(&self, value: &dyn Any) -> isize {
        return value
            .downcast_ref::<T>()
            .and_then(|value| self.index_of(value))
            .and_then(|index| isize::try_from(index).ok())
            .unwrap_or(-1);
    }

    fn clear_dyn(&self) -> Result<()> {
        return self.clear();
    }

    fn iter_dyn(&self) -> Box<dyn Iterator<Item = Box<dyn Any + Send>> + Send + '_> {
        return Box::new(self.iter().map(|value| Box::new(value) as Box<dyn Any + Send>));
    }

    fn copy_to_dyn(&self, dest: &mut dyn Any, offset: isize) -> Result<usize> {
        let dest = dest
            .downcast_mut::<Vec<T>>()
            .ok_or_else(Error::invalid_cast::<Vec<T>>)?;
        let offset = usize::try_from(offset).map_err(|_| Error::IndexOutOfRange {
            index: offset,
            len: dest.len(),
        })?;
        return self.copy_to(dest, offset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_of(values: &[u32]) -> SnapList<u32> {
        return values.iter().copied().collect();
    }

    #[test]
    fn wrong_type_is_invalid_cast() {
        let list = list_of(&[1, 2]);
        let before = list.snapshot();

        let err = list.push_dyn(Box::new("three")).unwrap_err();
        assert_eq!(err, Error::InvalidCast { expected: "u32" });
        assert!(list.set_dyn(0, Box::new(1u64)).unwrap_err().is_invalid_cast());
        assert!(list.insert_dyn(0, Box::new(1i32)).unwrap_err().is_invalid_cast());
        assert!(list.remove_dyn(&1u8).unwrap_err().is_invalid_cast());

        assert!(before.ptr_eq(&list.snapshot()));
    }

    #[test]
    fn type_checked_queries_never_fail() {
        let list = list_of(&[7, 8]);
        assert!(list.contains_dyn(&8u32));
        assert!(!list.contains_dyn(&8u64));
        assert_eq!(list.index_of_dyn(&8u32), 1);
        assert_eq!(list.index_of_dyn(&9u32), -1);
        assert_eq!(list.index_of_dyn(&"8"), -1);
    }

    #[test]
    fn negative_indices_are_out_of_range() {
        let list = list_of(&[1]);
        assert_eq!(
            list.get_dyn(-1).unwrap_err(),
            Error::IndexOutOfRange { index: -1, len: 1 }
        );
        assert!(list.remove_at_dyn(-3).unwrap_err().is_index_out_of_range());
    }

    #[test]
    fn iter_dyn_yields_boxed_clones() {
        let list = list_of(&[3, 4]);
        let values: Vec<u32> = list
            .iter_dyn()
            .filter_map(|value| value.downcast_ref::<u32>().copied())
            .collect();
        assert_eq!(values, vec![3, 4]);
        assert_eq!(list.to_vec_dyn().len(), 2);
    }

    #[test]
    fn copy_to_dyn_checks_destination() {
        let list = list_of(&[1, 2]);
        let mut dest = vec![0u32; 3];
        assert_eq!(list.copy_to_dyn(&mut dest, 1), Ok(2));
        assert_eq!(dest, vec![0, 1, 2]);

        let mut wrong = vec![0u64; 3];
        assert_eq!(
            list.copy_to_dyn(&mut wrong, 0).unwrap_err(),
            Error::InvalidCast { expected: "alloc::vec::Vec<u32>" }
        );
        assert_eq!(
            list.copy_to_dyn(&mut dest, -1).unwrap_err(),
            Error::IndexOutOfRange { index: -1, len: 3 }
        );
        assert_eq!(
            list.copy_to_dyn(&mut dest, 2).unwrap_err(),
            Error::DestinationTooSmall { needed: 2, available: 1 }
        );
    }

    #[test]
    fn legacy_flags() {
        let list = list_of(&[]);
        let list: &dyn DynList = &list;
        assert!(!list.is_read_only());
        assert!(!list.is_fixed_size());
        assert_eq!(list.element_type(), "u32");
    }
}

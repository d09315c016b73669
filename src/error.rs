//! Error type shared by the list, its persistent backing sequences, and the
//! object-typed adapter.

use std::time::Duration;

use thiserror::Error;

/// Everything that can go wrong when touching a list.
///
/// Errors are only ever returned to the thread that made the failing call,
/// and a failed mutation never publishes a new snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// An index fell outside the snapshot observed at call entry.
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange {
        /// The offending index.
        index: isize,
        /// Length of the snapshot the index was checked against.
        len: usize,
    },

    /// A loosely-typed value did not have the list's element type.
    #[error("invalid cast: expected a value of type {expected}")]
    InvalidCast {
        /// Name of the element type the list stores.
        expected: &'static str,
    },

    /// The write lock could not be taken within the configured timeout.
    #[error("write lock not acquired within {0:?}")]
    LockTimeout(Duration),

    /// `copy_to` was handed a slice too short for the snapshot.
    #[error("destination too small: need {needed} slots, have {available}")]
    DestinationTooSmall {
        /// Elements in the snapshot being copied.
        needed: usize,
        /// Slots left in the destination after the offset.
        available: usize,
    },
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build an `IndexOutOfRange` from an unsigned index.
    pub fn out_of_range(index: usize, len: usize) -> Error {
        return Error::IndexOutOfRange {
            index: isize::try_from(index).unwrap_or(isize::MAX),
            len,
        };
    }

    /// Build an `InvalidCast` naming `T` as the expected type.
    pub fn invalid_cast<T: ?Sized>() -> Error {
        return Error::InvalidCast {
            expected: std::any::type_name::<T>(),
        };
    }

    pub fn is_index_out_of_range(&self) -> bool {
        return matches!(self, Error::IndexOutOfRange { .. });
    }

    pub fn is_invalid_cast(&self) -> bool {
        return matches!(self, Error::InvalidCast { .. });
    }

    pub fn is_lock_timeout(&self) -> bool {
        return matches!(self, Error::LockTimeout(_));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_saturates_huge_indices() {
        let err = Error::out_of_range(usize::MAX, 3);
        assert_eq!(err, Error::IndexOutOfRange { index: isize::MAX, len: 3 });
        assert!(err.is_index_out_of_range());
    }

    #[test]
    fn display_messages() {
        assert_eq!(
            Error::out_of_range(4, 2).to_string(),
            "index 4 out of range for length 2"
        );
        assert_eq!(
            Error::invalid_cast::<u32>().to_string(),
            "invalid cast: expected a value of type u32"
        );
        assert_eq!(
            Error::DestinationTooSmall { needed: 3, available: 1 }.to_string(),
            "destination too small: need 3 slots, have 1"
        );
    }

    #[test]
    fn predicates() {
        assert!(Error::invalid_cast::<String>().is_invalid_cast());
        assert!(Error::LockTimeout(Duration::from_millis(5)).is_lock_timeout());
        assert!(!Error::LockTimeout(Duration::ZERO).is_index_out_of_range());
    }
}

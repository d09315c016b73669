//! Snaplist - a thread-safe list with lock-free snapshot reads.
//!
//! Every read works against an immutable snapshot loaded with one atomic
//! pointer read. Writers are serialized by a single lock, derive the next
//! snapshot from the current one, and publish it atomically, so readers never
//! block and never see a half-applied change.
//!
//! # Quick Start
//!
//! ```
//! use snaplist::SnapList;
//!
//! let list: SnapList<&str> = SnapList::new();
//! list.push("a").unwrap();
//! list.push("c").unwrap();
//! list.insert(1, "b").unwrap();
//!
//! // Iterators keep the snapshot they started from.
//! let before = list.iter();
//! list.clear().unwrap();
//!
//! assert_eq!(before.collect::<Vec<_>>(), vec!["a", "b", "c"]);
//! assert!(list.is_empty());
//! ```

pub mod config;
pub mod dynamic;
pub mod error;
pub mod list;
pub mod persistent;

pub use config::Config;
pub use dynamic::DynList;
pub use error::Error;
pub use error::Result;
pub use list::Iter;
pub use list::SnapList;
pub use list::Snapshot;
pub use persistent::PersistentSeq;
pub use persistent::TreeList;

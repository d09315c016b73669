//! The shared list.
//!
//! A [`SnapList`] holds one pointer to an immutable sequence and one write
//! lock. Reads load the pointer once and work against that snapshot without
//! ever touching the lock. Writes take the lock, derive a new sequence from
//! the current one, publish it, and release the lock.
//!
//! # Invariants
//!
//! - The published pointer always refers to a complete sequence. A reader sees
//!   either the value before a write or the value after it, never a mix.
//! - Writers are totally ordered. No two writes derive their result from the
//!   same current value.
//! - A failed write publishes nothing.
//! - An iterator owns the snapshot it was created from and is unaffected by
//!   later writes.

use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use parking_lot::MutexGuard;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::config::Config;
use crate::error::Error;
use crate::error::Result;
use crate::persistent::PersistentSeq;
use crate::persistent::TreeList;

/// A list that can be read from many threads without locking while writes
/// are serialized.
///
/// `S` is the persistent sequence the list publishes. The default,
/// [`TreeList`], makes every write O(log n); `Arc<[T]>` copies the whole list
/// on each write but is compact.
///
/// The write lock is not reentrant: a closure handed to [`SnapList::update`]
/// must not call mutating methods of the same list.
pub struct SnapList<T, S = TreeList<T>> {
    current: ArcSwap<S>,
    write_lock: Mutex<()>,
    config: Config,
    _marker: PhantomData<fn() -> T>,
}

/// An immutable view of a list's contents at one point in time.
///
/// Snapshots are cheap to clone and stay valid, and unchanged, no matter what
/// happens to the list afterwards.
pub struct Snapshot<T, S = TreeList<T>> {
    seq: Arc<S>,
    _marker: PhantomData<fn() -> T>,
}

impl<T, S> SnapList<T, S>
where
    S: PersistentSeq<Item = T>,
{
    pub fn new() -> Self {
        return Self::with_config(Config::default());
    }

    pub fn with_config(config: Config) -> Self {
        return Self::from_seq(S::default(), config);
    }

    /// Create a list whose first snapshot is `seq`.
    pub fn from_seq(seq: S, config: Config) -> Self {
        return Self::from_arc(Arc::new(seq), config);
    }

    fn from_arc(seq: Arc<S>, config: Config) -> Self {
        return SnapList {
            current: ArcSwap::new(seq),
            write_lock: Mutex::new(()),
            config,
            _marker: PhantomData,
        };
    }

    pub fn config(&self) -> &Config {
        return &self.config;
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Capture the current contents.
    pub fn snapshot(&self) -> Snapshot<T, S> {
        return Snapshot::new(self.current.load_full());
    }

    pub fn len(&self) -> usize {
        return self.current.load().len();
    }

    pub fn is_empty(&self) -> bool {
        return self.current.load().is_empty();
    }

    /// Return a clone of the element at `index`.
    pub fn get(&self, index: usize) -> Result<T>
    where
        T: Clone,
    {
        let current = self.current.load();
        return current
            .get(index)
            .cloned()
            .ok_or_else(|| Error::out_of_range(index, current.len()));
    }

    pub fn contains(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        return self.current.load().contains(value);
    }

    pub fn index_of(&self, value: &T) -> Option<usize>
    where
        T: PartialEq,
    {
        return self.current.load().index_of(value);
    }

    /// Iterate over the contents as of this call. Writes made while the
    /// iterator is alive are not observed. A full pass is O(n).
    pub fn iter(&self) -> Iter<T, S>
    where
        T: Clone,
    {
        return self.snapshot().into_iter();
    }

    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        return self.snapshot().to_vec();
    }

    /// Copy the current contents into `dest` starting at `offset`. Returns the
    /// number of elements copied.
    pub fn copy_to(&self, dest: &mut [T], offset: usize) -> Result<usize>
    where
        T: Clone,
    {
        let snapshot = self.snapshot();
        if offset > dest.len() {
            return Err(Error::out_of_range(offset, dest.len()));
        }
        let available = dest.len() - offset;
        if snapshot.len() > available {
            return Err(Error::DestinationTooSmall {
                needed: snapshot.len(),
                available,
            });
        }
        for (slot, item) in dest[offset..].iter_mut().zip(snapshot.iter()) {
            *slot = item.clone();
        }
        return Ok(snapshot.len());
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Replace the element at `index`, leaving every other position alone.
    pub fn set(&self, index: usize, value: T) -> Result<()> {
        return self.write("set", |seq| Ok((Some(seq.set_at(index, value)?), ())));
    }

    /// Insert `value` at `index`, shifting later elements back. `index` may
    /// equal the length.
    pub fn insert(&self, index: usize, value: T) -> Result<()> {
        return self.write("insert", |seq| Ok((Some(seq.insert_at(index, value)?), ())));
    }

    /// Remove and return the element at `index`.
    pub fn remove_at(&self, index: usize) -> Result<T> {
        return self.write("remove_at", |seq| {
            let (next, removed) = seq.remove_at(index)?;
            Ok((Some(next), removed))
        });
    }

    /// Append `value`, returning the index it was stored at.
    ///
    /// Only fails when a lock timeout is configured and expires.
    pub fn push(&self, value: T) -> Result<usize> {
        return self.write("push", |seq| Ok((Some(seq.push(value)), seq.len())));
    }

    /// Remove the first element equal to `value`. Returns whether one was
    /// found; nothing is published when it was not.
    pub fn remove(&self, value: &T) -> Result<bool>
    where
        T: PartialEq,
    {
        return self.write("remove", |seq| {
            let next = seq.remove_value(value);
            let found = next.is_some();
            Ok((next, found))
        });
    }

    /// Publish the empty sequence.
    pub fn clear(&self) -> Result<()> {
        return self.write("clear", |seq| Ok((Some(seq.clear()), ())));
    }

    /// Append every value from `values` as a single write. The iterator is
    /// drained before the lock is taken.
    pub fn extend<I>(&self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
    {
        let values: Vec<T> = values.into_iter().collect();
        if values.is_empty() {
            return Ok(());
        }
        return self.write("extend", |seq| {
            let next = values.into_iter().fold(None::<S>, |acc, value| {
                Some(acc.as_ref().unwrap_or(seq).push(value))
            });
            Ok((next, ()))
        });
    }

    /// Atomically derive a new sequence from the current one.
    ///
    /// `f` runs with the write lock held, so no other write can slip in
    /// between reading and publishing. If it returns an error nothing is
    /// published and the error is passed through.
    pub fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&S) -> Result<S>,
    {
        return self.write("update", |seq| Ok((Some(f(seq)?), ())));
    }

    /// Publish `seq` wholesale and return the snapshot it replaced.
    pub fn replace(&self, seq: S) -> Result<Snapshot<T, S>> {
        let _guard = self.lock_writer("replace")?;
        let len = seq.len();
        let previous = self.current.swap(Arc::new(seq));
        trace!(list = self.config.label, op = "replace", len, "published snapshot");
        return Ok(Snapshot::new(previous));
    }

    /// Run one serialized read-modify-write.
    ///
    /// `f` sees the current sequence and returns the sequence to publish
    /// (`None` to leave it as is) plus the caller's result.
    fn write<R, F>(&self, op: &'static str, f: F) -> Result<R>
    where
        F: FnOnce(&S) -> Result<(Option<S>, R)>,
    {
        let _guard = self.lock_writer(op)?;
        let current = self.current.load();

        match f(&**current) {
            Ok((Some(next), out)) => {
                let len = next.len();
                self.current.store(Arc::new(next));
                trace!(list = self.config.label, op, len, "published snapshot");
                return Ok(out);
            }
            Ok((None, out)) => {
                trace!(list = self.config.label, op, "nothing to publish");
                return Ok(out);
            }
            Err(err) => {
                debug!(list = self.config.label, op, error = %err, "write rejected");
                return Err(err);
            }
        }
    }

    fn lock_writer(&self, op: &'static str) -> Result<MutexGuard<'_, ()>> {
        let Some(timeout) = self.config.lock_timeout else {
            return Ok(self.write_lock.lock());
        };
        return match self.write_lock.try_lock_for(timeout) {
            Some(guard) => Ok(guard),
            None => {
                warn!(list = self.config.label, op, ?timeout, "write lock timed out");
                Err(Error::LockTimeout(timeout))
            }
        };
    }
}

impl<T, S> Default for SnapList<T, S>
where
    S: PersistentSeq<Item = T>,
{
    fn default() -> Self {
        return Self::new();
    }
}

/// Cloning produces an independent list that starts from the same snapshot
/// and has its own lock.
impl<T, S> Clone for SnapList<T, S>
where
    S: PersistentSeq<Item = T>,
{
    fn clone(&self) -> Self {
        return Self::from_arc(self.current.load_full(), self.config);
    }
}

impl<T, S> fmt::Debug for SnapList<T, S>
where
    S: PersistentSeq<Item = T> + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f
            .debug_struct("SnapList")
            .field("label", &self.config.label)
            .field("items", &*self.current.load_full())
            .finish();
    }
}

impl<T, S> FromIterator<T> for SnapList<T, S>
where
    S: PersistentSeq<Item = T>,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        return Self::from_seq(S::from_vec(iter.into_iter().collect()), Config::default());
    }
}

impl<T, S> IntoIterator for &SnapList<T, S>
where
    T: Clone,
    S: PersistentSeq<Item = T>,
{
    type Item = T;
    type IntoIter = Iter<T, S>;

    fn into_iter(self) -> Self::IntoIter {
        return self.iter();
    }
}

// =============================================================================
// Snapshot
// =============================================================================

impl<T, S> Snapshot<T, S>
where
    S: PersistentSeq<Item = T>,
{
    fn new(seq: Arc<S>) -> Self {
        return Snapshot {
            seq,
            _marker: PhantomData,
        };
    }

    pub fn len(&self) -> usize {
        return self.seq.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.seq.is_empty();
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        return self.seq.get(index);
    }

    pub fn iter(&self) -> S::Iter<'_> {
        return self.seq.iter();
    }

    pub fn contains(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        return self.seq.contains(value);
    }

    pub fn index_of(&self, value: &T) -> Option<usize>
    where
        T: PartialEq,
    {
        return self.seq.index_of(value);
    }

    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        return self.seq.iter().cloned().collect();
    }

    /// True when both snapshots are the very same published value.
    pub fn ptr_eq(&self, other: &Snapshot<T, S>) -> bool {
        return Arc::ptr_eq(&self.seq, &other.seq);
    }
}

impl<T, S> Deref for Snapshot<T, S> {
    type Target = S;

    fn deref(&self) -> &S {
        return &self.seq;
    }
}

impl<T, S> Clone for Snapshot<T, S> {
    fn clone(&self) -> Self {
        return Snapshot {
            seq: Arc::clone(&self.seq),
            _marker: PhantomData,
        };
    }
}

impl<T, S: fmt::Debug> fmt::Debug for Snapshot<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return fmt::Debug::fmt(&*self.seq, f);
    }
}

impl<T, S> IntoIterator for Snapshot<T, S>
where
    T: Clone,
    S: PersistentSeq<Item = T>,
{
    type Item = T;
    type IntoIter = Iter<T, S>;

    fn into_iter(self) -> Self::IntoIter {
        let back = self.len();
        return Iter {
            snapshot: self,
            front: 0,
            back,
            front_run: Vec::new().into_iter(),
            back_run: Vec::new().into_iter(),
        };
    }
}

// =============================================================================
// Iter
// =============================================================================

/// Owning iterator over one snapshot. Yields clones of the elements.
///
/// Elements are cloned one contiguous run at a time (a whole leaf for
/// [`TreeList`]), so a full pass costs O(n) rather than one lookup per item.
pub struct Iter<T, S = TreeList<T>> {
    snapshot: Snapshot<T, S>,
    /// Positions in `front..back` have not been cloned out yet.
    front: usize,
    back: usize,
    front_run: std::vec::IntoIter<T>,
    back_run: std::vec::IntoIter<T>,
}

impl<T, S> Iter<T, S> {
    /// The snapshot this iterator walks.
    pub fn snapshot(&self) -> &Snapshot<T, S> {
        return &self.snapshot;
    }
}

impl<T, S> Iterator for Iter<T, S>
where
    T: Clone,
    S: PersistentSeq<Item = T>,
{
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if let Some(item) = self.front_run.next() {
            return Some(item);
        }
        if self.front < self.back {
            let run = self.snapshot.seq.chunk(self.front);
            let take = run.len().min(self.back - self.front);
            if take > 0 {
                self.front_run = run[..take].to_vec().into_iter();
                self.front += take;
                return self.front_run.next();
            }
        }
        return self.back_run.next();
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.front_run.len() + (self.back - self.front) + self.back_run.len();
        return (remaining, Some(remaining));
    }
}

impl<T, S> DoubleEndedIterator for Iter<T, S>
where
    T: Clone,
    S: PersistentSeq<Item = T>,
{
    fn next_back(&mut self) -> Option<T> {
        if let Some(item) = self.back_run.next_back() {
            return Some(item);
        }
        if self.front < self.back {
            let run = self.snapshot.seq.chunk_before(self.back);
            let take = run.len().min(self.back - self.front);
            if take > 0 {
                self.back_run = run[run.len() - take..].to_vec().into_iter();
                self.back -= take;
                return self.back_run.next_back();
            }
        }
        return self.front_run.next_back();
    }
}

impl<T, S> ExactSizeIterator for Iter<T, S>
where
    T: Clone,
    S: PersistentSeq<Item = T>,
{
}

impl<T, S> std::iter::FusedIterator for Iter<T, S>
where
    T: Clone,
    S: PersistentSeq<Item = T>,
{
}

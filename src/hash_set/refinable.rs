use core::hash::{BuildHasher, Hash};
use core::mem;
use core::sync::atomic::{AtomicUsize, Ordering};
use std::collections::hash_map::RandomState;

use crossbeam_epoch::{pin, Atomic, Guard, Owned};
use crossbeam_utils::Backoff;
use log::{debug, trace};

use super::{bucket_index, hash_of, overloaded, redistribute, IntoIter, DEFAULT_CAPACITY};
use crate::adt::ConcurrentSet;
use crate::error::{check_capacity, CapacityError};
use crate::lock::{lock_all, Lock, RawLock, SpinLock};

/// Capacity multiplier applied by a resize.
const GROWTH: usize = 4;

/// One generation of the table: every bucket carries its own lock.
///
/// Once published, a snapshot is never replaced in place, only unlinked. Its buckets are drained
/// by the resize that unlinks it, which holds all of its locks while doing so; any thread that
/// takes one of those locks afterwards sees the snapshot is stale before looking at the bucket.
struct Snapshot<T, L: RawLock> {
    buckets: Box<[Lock<L, Vec<T>>]>,
}

impl<T, L: RawLock> Snapshot<T, L> {
    fn new(buckets: Vec<Vec<T>>) -> Self {
        Self {
            buckets: buckets.into_iter().map(Lock::new).collect(),
        }
    }

    fn capacity(&self) -> usize {
        self.buckets.len()
    }
}

/// Concurrent hash set whose lock array grows with its table.
///
/// The buckets and their locks form an immutable snapshot reached through an atomic pointer.
/// Operations lock one bucket of the snapshot they loaded, then check that the snapshot is still
/// the current one; if a resize swapped it in the meantime they release the lock and retry. The
/// retry loop has no bound and no fairness guarantee: it ends once the operation wins a window
/// without a concurrent resize.
///
/// Resizes are cooperative: a thread that finds another resize in flight skips its own.
/// Retired snapshots are reclaimed through `crossbeam_epoch` once no pinned thread can still be
/// looking at them.
#[derive(Debug)]
pub struct RefinableHashSet<T, L: RawLock = SpinLock, S = RandomState> {
    snapshot: Atomic<Snapshot<T, L>>,
    resize_lock: Lock<SpinLock, ()>,
    len: AtomicUsize,
    hash_builder: S,
}

impl<T> RefinableHashSet<T> {
    /// Creates an empty set with `initial_capacity` buckets.
    ///
    /// # Panics
    ///
    /// Panics if `initial_capacity` is zero.
    pub fn with_capacity(initial_capacity: usize) -> Self {
        Self::with_capacity_and_hasher(initial_capacity, RandomState::new())
    }

    /// Creates an empty set with `initial_capacity` buckets, or fails if it is zero.
    pub fn try_with_capacity(initial_capacity: usize) -> Result<Self, CapacityError> {
        Self::try_with_capacity_and_hasher(initial_capacity, RandomState::new())
    }
}

impl<T, L: RawLock, S> RefinableHashSet<T, L, S> {
    /// Creates an empty set with `initial_capacity` buckets hashing with `hash_builder`.
    ///
    /// # Panics
    ///
    /// Panics if `initial_capacity` is zero.
    pub fn with_capacity_and_hasher(initial_capacity: usize, hash_builder: S) -> Self {
        match Self::try_with_capacity_and_hasher(initial_capacity, hash_builder) {
            Ok(set) => set,
            Err(e) => panic!("{e}"),
        }
    }

    /// Fallible version of [`RefinableHashSet::with_capacity_and_hasher`].
    pub fn try_with_capacity_and_hasher(
        initial_capacity: usize,
        hash_builder: S,
    ) -> Result<Self, CapacityError> {
        let capacity = check_capacity(initial_capacity)?;
        let buckets = (0..capacity).map(|_| Vec::new()).collect();
        Ok(Self {
            snapshot: Atomic::new(Snapshot::new(buckets)),
            resize_lock: Lock::default(),
            len: AtomicUsize::new(0),
            hash_builder,
        })
    }

    /// Returns the number of buckets of the current snapshot.
    pub fn capacity(&self) -> usize {
        let guard = pin();
        self.current(&guard).capacity()
    }

    fn current<'g>(&self, guard: &'g Guard) -> &'g Snapshot<T, L> {
        let snapshot = self.snapshot.load(Ordering::Acquire, guard);
        // SAFETY: the pointer is non-null from construction until `drop`/`into_iter`, which take
        // `self` exclusively. A snapshot unlinked by a resize is only destroyed after every thread
        // pinned before the unlink, including us, is unpinned.
        unsafe { snapshot.deref() }
    }
}

impl<T: Hash, L: RawLock, S: BuildHasher> RefinableHashSet<T, L, S> {
    /// Runs `f` on the bucket of the element hashed to `hash`, holding its lock in a snapshot
    /// that is still current. `f` also gets the capacity of that snapshot.
    fn with_bucket<R>(&self, hash: u64, f: impl FnOnce(&mut Vec<T>, usize) -> R) -> R {
        let guard = pin();
        let backoff = Backoff::new();

        loop {
            let shared = self.snapshot.load(Ordering::Acquire, &guard);
            // SAFETY: see `current`.
            let snapshot = unsafe { shared.deref() };
            let capacity = snapshot.capacity();
            let mut bucket = snapshot.buckets[bucket_index(hash, capacity)].lock();

            // A resize publishes the new snapshot before releasing the old locks, so if the
            // pointer is unchanged now, no resize can drain this bucket while we hold its lock.
            if self.snapshot.load(Ordering::Acquire, &guard) != shared {
                drop(bucket);
                backoff.snooze();
                continue;
            }

            return f(&mut *bucket, capacity);
        }
    }

    /// Quadruples the table, unless another thread is already resizing or already did.
    ///
    /// Must not be called while holding a bucket lock.
    fn resize(&self) {
        let Ok(_resizing) = self.resize_lock.try_lock() else {
            trace!("refinable: resize already in progress, skipping");
            return;
        };

        let guard = pin();
        let shared = self.snapshot.load(Ordering::Acquire, &guard);
        // SAFETY: see `current`.
        let snapshot = unsafe { shared.deref() };
        let old_capacity = snapshot.capacity();
        if !overloaded(self.len.load(Ordering::Relaxed), old_capacity) {
            trace!("refinable: table already resized, skipping");
            return;
        }

        let mut buckets = lock_all(snapshot.buckets.iter());
        let new_capacity = old_capacity * GROWTH;
        let elements = buckets.iter_mut().flat_map(|bucket| bucket.drain(..));
        let next = Snapshot::new(redistribute(&self.hash_builder, new_capacity, elements));

        // Only the holder of `resize_lock` swaps the pointer, so the unlinked one is `shared`.
        let old = self.snapshot.swap(Owned::new(next), Ordering::AcqRel, &guard);
        debug_assert_eq!(old, shared);
        drop(buckets);

        // SAFETY: `old` is unlinked, so threads pinning from now on can't reach it. Threads that
        // loaded it earlier are still pinned, which defers the destruction until they are done.
        unsafe { guard.defer_destroy(old) };

        debug!(
            "refinable: resized {} -> {} buckets ({} elements)",
            old_capacity,
            new_capacity,
            self.len.load(Ordering::Relaxed)
        );
    }
}

impl<T: Hash + Eq, L: RawLock, S: BuildHasher> ConcurrentSet<T> for RefinableHashSet<T, L, S> {
    fn contains(&self, value: &T) -> bool {
        let hash = hash_of(&self.hash_builder, value);
        self.with_bucket(hash, |bucket, _| bucket.contains(value))
    }

    fn insert(&self, value: T) -> bool {
        let hash = hash_of(&self.hash_builder, &value);
        let grow = self.with_bucket(hash, |bucket, capacity| {
            if bucket.contains(&value) {
                return None;
            }
            bucket.push(value);
            let len = self.len.fetch_add(1, Ordering::Relaxed) + 1;
            Some(overloaded(len, capacity))
        });

        let Some(grow) = grow else {
            return false;
        };
        if grow {
            self.resize();
        }
        true
    }

    fn remove(&self, value: &T) -> bool {
        let hash = hash_of(&self.hash_builder, value);
        self.with_bucket(hash, |bucket, _| {
            let Some(position) = bucket.iter().position(|v| v == value) else {
                return false;
            };
            let _ = bucket.swap_remove(position);
            let _ = self.len.fetch_sub(1, Ordering::Relaxed);
            true
        })
    }

    fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }
}

impl<T, L: RawLock, S: Default> Default for RefinableHashSet<T, L, S> {
    fn default() -> Self {
        Self::with_capacity_and_hasher(DEFAULT_CAPACITY, S::default())
    }
}

impl<T, L: RawLock, S> RefinableHashSet<T, L, S> {
    /// Unlinks the current snapshot and takes ownership of it.
    fn take_snapshot(&mut self) -> Option<Box<Snapshot<T, L>>> {
        let snapshot = mem::take(&mut self.snapshot);
        // SAFETY: we have `&mut self`, so no other thread is pinned on this set's snapshot, and
        // retired snapshots were handed to the collector already.
        unsafe { snapshot.try_into_owned() }.map(Owned::into_box)
    }
}

impl<T, L: RawLock, S> IntoIterator for RefinableHashSet<T, L, S> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(mut self) -> IntoIter<T> {
        let buckets = self
            .take_snapshot()
            .map(|snapshot| {
                snapshot
                    .buckets
                    .into_vec()
                    .into_iter()
                    .map(Lock::into_inner)
                    .collect()
            })
            .unwrap_or_default();
        IntoIter::new(buckets)
    }
}

impl<T, L: RawLock, S> Drop for RefinableHashSet<T, L, S> {
    fn drop(&mut self) {
        drop(self.take_snapshot());
    }
}

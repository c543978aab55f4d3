use core::cell::UnsafeCell;
use core::hash::{BuildHasher, Hash};
use core::sync::atomic::{AtomicUsize, Ordering};
use std::collections::hash_map::RandomState;

use crossbeam_utils::CachePadded;
use log::{debug, trace};

use super::{bucket_index, hash_of, overloaded, redistribute, IntoIter, DEFAULT_CAPACITY};
use crate::adt::ConcurrentSet;
use crate::error::{check_capacity, CapacityError};
use crate::lock::{lock_all, Lock, RawLock, SpinLock};

type Table<T> = Box<[UnsafeCell<Vec<T>>]>;

/// Concurrent hash set with lock striping.
///
/// The set owns a fixed array of stripes (locks), one per initial bucket. The table doubles as it
/// fills, but the stripes never change: an element with hash `h` is always guarded by stripe
/// `h % lock_count` and lives in bucket `h % capacity`. Since the capacity is always
/// `lock_count * 2^k`, every bucket is governed by exactly one stripe at any capacity, and holding
/// that stripe makes it safe to read the capacity and touch the bucket.
///
/// A resize takes a dedicated resize lock and then every stripe in ascending order.
#[derive(Debug)]
pub struct StripedHashSet<T, L: RawLock = SpinLock, S = RandomState> {
    stripes: Box<[CachePadded<Lock<L, ()>>]>,
    resize_lock: Lock<L, ()>,
    /// Buckets. The bucket at index `i` is accessed only while holding stripe `i % lock_count`;
    /// the table itself is replaced only while holding every stripe.
    table: UnsafeCell<Table<T>>,
    /// Mirror of `table.len()` readable without any stripe, for load factor checks.
    capacity: AtomicUsize,
    len: AtomicUsize,
    hash_builder: S,
}

// SAFETY: elements are only touched while holding the governing stripe, which gives the holder
// exclusive access, so sharing the set only requires elements to be sendable between threads. The
// hasher is used concurrently through `&S`.
unsafe impl<T: Send, L: RawLock, S: Sync> Sync for StripedHashSet<T, L, S> {}

impl<T> StripedHashSet<T> {
    /// Creates an empty set with `initial_capacity` buckets and as many stripes.
    ///
    /// # Panics
    ///
    /// Panics if `initial_capacity` is zero.
    pub fn with_capacity(initial_capacity: usize) -> Self {
        Self::with_capacity_and_hasher(initial_capacity, RandomState::new())
    }

    /// Creates an empty set with `initial_capacity` buckets and as many stripes, or fails if it is
    /// zero.
    pub fn try_with_capacity(initial_capacity: usize) -> Result<Self, CapacityError> {
        Self::try_with_capacity_and_hasher(initial_capacity, RandomState::new())
    }
}

impl<T, L: RawLock, S> StripedHashSet<T, L, S> {
    /// Creates an empty set with `initial_capacity` buckets and as many stripes, hashing with
    /// `hash_builder`.
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

    /// Fallible version of [`StripedHashSet::with_capacity_and_hasher`].
    pub fn try_with_capacity_and_hasher(
        initial_capacity: usize,
        hash_builder: S,
    ) -> Result<Self, CapacityError> {
        let capacity = check_capacity(initial_capacity)?;
        Ok(Self {
            stripes: (0..capacity)
                .map(|_| CachePadded::new(Lock::default()))
                .collect(),
            resize_lock: Lock::default(),
            table: UnsafeCell::new((0..capacity).map(|_| UnsafeCell::default()).collect()),
            capacity: AtomicUsize::new(capacity),
            len: AtomicUsize::new(0),
            hash_builder,
        })
    }

    /// Returns the current number of buckets.
    pub fn capacity(&self) -> usize {
        self.capacity.load(Ordering::Acquire)
    }

    /// Returns the number of stripes, fixed at construction.
    pub fn lock_count(&self) -> usize {
        self.stripes.len()
    }

    /// Returns the average number of elements per bucket.
    pub fn load_factor(&self) -> f64 {
        self.len.load(Ordering::Relaxed) as f64 / self.capacity() as f64
    }

    fn overloaded(&self) -> bool {
        overloaded(self.len.load(Ordering::Relaxed), self.capacity())
    }
}

impl<T: Hash, L: RawLock, S: BuildHasher> StripedHashSet<T, L, S> {
    /// Runs `f` on the bucket of the element hashed to `hash`, holding its stripe.
    fn with_bucket<R>(&self, hash: u64, f: impl FnOnce(&mut Vec<T>) -> R) -> R {
        let stripe = bucket_index(hash, self.stripes.len());
        let _guard = self.stripes[stripe].lock();

        // SAFETY: we hold stripe `hash % lock_count`, so no resize is replacing the table, and
        // since the capacity is a multiple of the lock count, the bucket below is governed by the
        // same stripe. No other thread can reference it.
        let bucket = unsafe {
            let table = &*self.table.get();
            &mut *table[bucket_index(hash, table.len())].get()
        };
        f(bucket)
    }

    /// Doubles the table unless another thread already brought the load factor back down.
    ///
    /// Must not be called while holding a stripe.
    fn resize(&self) {
        let _resizing = self.resize_lock.lock();
        let _stripes = lock_all(self.stripes.iter().map(|stripe| &**stripe));

        if !self.overloaded() {
            trace!("striped: table already resized, skipping");
            return;
        }

        // SAFETY: we hold every stripe, so no other thread holds a reference into the table.
        let table = unsafe { &mut *self.table.get() };
        let old_capacity = table.len();
        let new_capacity = old_capacity * 2;
        let elements = table
            .iter_mut()
            .flat_map(|bucket| bucket.get_mut().drain(..));
        let buckets = redistribute(&self.hash_builder, new_capacity, elements);
        *table = buckets.into_iter().map(UnsafeCell::new).collect();
        self.capacity.store(new_capacity, Ordering::Release);

        debug!(
            "striped: resized {} -> {} buckets ({} elements, {} stripes)",
            old_capacity,
            new_capacity,
            self.len.load(Ordering::Relaxed),
            self.stripes.len()
        );
    }
}

impl<T: Hash + Eq, L: RawLock, S: BuildHasher> ConcurrentSet<T> for StripedHashSet<T, L, S> {
    fn contains(&self, value: &T) -> bool {
        let hash = hash_of(&self.hash_builder, value);
        self.with_bucket(hash, |bucket| bucket.contains(value))
    }

    fn insert(&self, value: T) -> bool {
        let hash = hash_of(&self.hash_builder, &value);
        let inserted = self.with_bucket(hash, |bucket| {
            if bucket.contains(&value) {
                return false;
            }
            bucket.push(value);
            let _ = self.len.fetch_add(1, Ordering::Relaxed);
            true
        });

        // Other threads may touch any bucket between the stripe release above and the resize
        // below; `resize` re-checks the load factor under all stripes.
        if inserted && self.overloaded() {
            self.resize();
        }
        inserted
    }

    fn remove(&self, value: &T) -> bool {
        let hash = hash_of(&self.hash_builder, value);
        self.with_bucket(hash, |bucket| {
            let Some(position) = bucket.iter().position(|v| v == value) else {
                return false;
            };
            let _ = bucket.swap_remove(position);
            let _ = self.len.fetch_sub(1, Ordering::Relaxed);
            true
        })
    }

    fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }
}

impl<T, L: RawLock, S: Default> Default for StripedHashSet<T, L, S> {
    fn default() -> Self {
        Self::with_capacity_and_hasher(DEFAULT_CAPACITY, S::default())
    }
}

impl<T, L: RawLock, S> IntoIterator for StripedHashSet<T, L, S> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> IntoIter<T> {
        let buckets = self
            .table
            .into_inner()
            .into_vec()
            .into_iter()
            .map(UnsafeCell::into_inner)
            .collect();
        IntoIter::new(buckets)
    }
}

use core::hash::{BuildHasher, Hash};
use std::collections::hash_map::RandomState;

use super::{bucket_index, hash_of, overloaded, redistribute, IntoIter, DEFAULT_CAPACITY};
use crate::adt::SequentialSet;
use crate::error::{check_capacity, CapacityError};

/// Single-threaded chained hash set.
///
/// Serves as the reference behaviour for the concurrent sets. Wrap it in a
/// [`Lock`](crate::lock::Lock) to get a coarse-grained [`ConcurrentSet`](crate::ConcurrentSet).
#[derive(Debug, Clone)]
pub struct SequentialHashSet<T, S = RandomState> {
    table: Vec<Vec<T>>,
    len: usize,
    hash_builder: S,
}

impl<T> SequentialHashSet<T> {
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

impl<T, S> SequentialHashSet<T, S> {
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

    /// Creates an empty set with `initial_capacity` buckets hashing with `hash_builder`, or fails
    /// if `initial_capacity` is zero.
    pub fn try_with_capacity_and_hasher(
        initial_capacity: usize,
        hash_builder: S,
    ) -> Result<Self, CapacityError> {
        let capacity = check_capacity(initial_capacity)?;
        Ok(Self {
            table: (0..capacity).map(|_| Vec::new()).collect(),
            len: 0,
            hash_builder,
        })
    }

    /// Returns the number of buckets.
    pub fn capacity(&self) -> usize {
        self.table.len()
    }

    /// An iterator visiting all elements in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.table.iter().flatten()
    }
}

impl<T: Hash, S: BuildHasher> SequentialHashSet<T, S> {
    fn bucket_of(&self, value: &T) -> usize {
        bucket_index(hash_of(&self.hash_builder, value), self.table.len())
    }

    /// Doubles the table, moving every element to its new bucket.
    fn resize(&mut self) {
        let new_capacity = self.table.len() * 2;
        let old = std::mem::take(&mut self.table);
        self.table = redistribute(&self.hash_builder, new_capacity, old.into_iter().flatten());
    }
}

impl<T: Hash + Eq, S: BuildHasher> SequentialSet<T> for SequentialHashSet<T, S> {
    fn contains(&self, value: &T) -> bool {
        self.table[self.bucket_of(value)].contains(value)
    }

    fn insert(&mut self, value: T) -> bool {
        let index = self.bucket_of(&value);
        let bucket = &mut self.table[index];
        if bucket.contains(&value) {
            return false;
        }

        bucket.push(value);
        self.len += 1;

        if overloaded(self.len, self.table.len()) {
            self.resize();
        }
        true
    }

    fn remove(&mut self, value: &T) -> bool {
        let index = self.bucket_of(value);
        let bucket = &mut self.table[index];
        let Some(position) = bucket.iter().position(|v| v == value) else {
            return false;
        };

        let _ = bucket.swap_remove(position);
        self.len -= 1;
        true
    }

    fn len(&self) -> usize {
        self.len
    }
}

impl<T, S: Default> Default for SequentialHashSet<T, S> {
    fn default() -> Self {
        Self::with_capacity_and_hasher(DEFAULT_CAPACITY, S::default())
    }
}

impl<T, S> IntoIterator for SequentialHashSet<T, S> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> IntoIter<T> {
        IntoIter::new(self.table)
    }
}

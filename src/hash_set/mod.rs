//! Chained hash sets: a sequential reference set and two concurrent variants.
//!
//! All three share the same bucket layout: a table of `Vec<T>` chains, an element landing in
//! bucket `hash % capacity`, and growth once the set holds more than [`LOAD_FACTOR`] elements per
//! bucket on average. They differ in how the table is protected:
//!
//! - [`SequentialHashSet`] is not protected at all and doubles its table.
//! - [`StripedHashSet`] guards a growing table with a fixed array of stripes and doubles.
//! - [`RefinableHashSet`] swaps a whole `{buckets, locks}` snapshot and quadruples.

use core::hash::{BuildHasher, Hash};
use core::iter::FusedIterator;
use std::vec;

mod refinable;
mod sequential;
mod striped;

pub use refinable::RefinableHashSet;
pub use sequential::SequentialHashSet;
pub use striped::StripedHashSet;

/// Average number of elements per bucket above which a set grows its table.
pub const LOAD_FACTOR: usize = 4;

/// Initial capacity used by the `Default` impls.
pub const DEFAULT_CAPACITY: usize = 16;

/// Hashes `value` once; every index of the value is derived from this.
#[inline]
fn hash_of<T: Hash + ?Sized, S: BuildHasher>(hash_builder: &S, value: &T) -> u64 {
    hash_builder.hash_one(value)
}

#[inline]
fn bucket_index(hash: u64, capacity: usize) -> usize {
    (hash % capacity as u64) as usize
}

/// Whether `len` elements over `capacity` buckets exceed the load factor.
#[inline]
fn overloaded(len: usize, capacity: usize) -> bool {
    len > LOAD_FACTOR.saturating_mul(capacity)
}

/// Partitions `elements` into `capacity` fresh buckets by `hash % capacity`.
///
/// Elements are moved, never cloned, so a resize can't duplicate or drop anything.
fn redistribute<T, S, I>(hash_builder: &S, capacity: usize, elements: I) -> Vec<Vec<T>>
where
    T: Hash,
    S: BuildHasher,
    I: IntoIterator<Item = T>,
{
    let mut buckets = (0..capacity).map(|_| Vec::new()).collect::<Vec<_>>();
    for value in elements {
        let index = bucket_index(hash_of(hash_builder, &value), capacity);
        buckets[index].push(value);
    }
    buckets
}

/// An owning iterator over the elements of a set, in unspecified order.
#[derive(Debug)]
pub struct IntoIter<T> {
    buckets: vec::IntoIter<Vec<T>>,
    current: vec::IntoIter<T>,
}

impl<T> IntoIter<T> {
    fn new(buckets: Vec<Vec<T>>) -> Self {
        Self {
            buckets: buckets.into_iter(),
            current: Vec::new().into_iter(),
        }
    }
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        loop {
            if let Some(value) = self.current.next() {
                return Some(value);
            }
            self.current = self.buckets.next()?.into_iter();
        }
    }
}

impl<T> FusedIterator for IntoIter<T> {}

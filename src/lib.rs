//! Concurrent hash sets with lock striping and refinable locking.
//!
//! Three chained hash sets share one contract ([`SequentialSet`] / [`ConcurrentSet`]):
//!
//! - [`SequentialHashSet`]: single-threaded, the reference behaviour.
//! - [`StripedHashSet`]: a fixed array of stripes governs a table that keeps doubling.
//! - [`RefinableHashSet`]: the table and one lock per bucket are swapped together, so lock
//!   granularity follows the table as it grows.
//!
//! The concurrent sets are generic over their bucket lock ([`lock::RawLock`]) and hasher.

#![warn(missing_docs, missing_debug_implementations)]
#![allow(clippy::result_unit_err)]
#![deny(unsafe_op_in_unsafe_fn)]

mod adt;
mod error;
pub mod hash_set;
pub mod lock;
pub mod test;

pub use adt::{ConcurrentSet, SequentialSet};
pub use error::CapacityError;
pub use hash_set::{
    RefinableHashSet, SequentialHashSet, StripedHashSet, DEFAULT_CAPACITY, LOAD_FACTOR,
};

//! Utilities for testing set implementations.
//!
//! Compiled into the library so integration tests (and downstream crates checking their own
//! `ConcurrentSet` impls) can share them.
#![doc(hidden)]

pub mod adt;

pub use self::rand::RandGen;

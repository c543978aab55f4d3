//! Locks guarding the buckets of the concurrent sets.
//!
//! Every set is generic over its bucket lock `L: RawLock`. [`SpinLock`] is the default.
//! [`TicketLock`] hands the lock out in FIFO order. Both also implement [`RawTryLock`].

mod api;
mod spinlock;
mod ticketlock;

pub use api::{lock_all, Lock, LockGuard, RawLock, RawTryLock};
pub use spinlock::SpinLock;
pub use ticketlock::TicketLock;

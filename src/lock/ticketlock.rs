use core::sync::atomic::AtomicUsize;
use core::sync::atomic::Ordering::*;

use crossbeam_utils::Backoff;

use crate::lock::*;

/// A ticket lock.
///
/// Waiters are served in arrival order, so a resize waiting for a busy stripe can't be overtaken
/// indefinitely by single-bucket operations.
#[derive(Debug)]
pub struct TicketLock {
    serving: AtomicUsize,
    next_ticket: AtomicUsize,
}

impl Default for TicketLock {
    fn default() -> Self {
        Self {
            serving: AtomicUsize::new(0),
            next_ticket: AtomicUsize::new(0),
        }
    }
}

unsafe impl RawLock for TicketLock {
    type Token = usize;

    fn lock(&self) -> usize {
        let ticket = self.next_ticket.fetch_add(1, Relaxed);
        let backoff = Backoff::new();

        while self.serving.load(Acquire) != ticket {
            backoff.snooze();
        }

        ticket
    }

    unsafe fn unlock(&self, ticket: usize) {
        self.serving.store(ticket.wrapping_add(1), Release);
    }
}

unsafe impl RawTryLock for TicketLock {
    /// Takes a ticket only if it would be served immediately.
    fn try_lock(&self) -> Result<usize, ()> {
        let ticket = self.serving.load(Acquire);
        self.next_ticket
            .compare_exchange(ticket, ticket.wrapping_add(1), Relaxed, Relaxed)
            .map(|_| ticket)
            .map_err(|_| ())
    }
}

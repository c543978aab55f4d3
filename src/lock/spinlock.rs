use core::sync::atomic::AtomicBool;
use core::sync::atomic::Ordering::*;

use crossbeam_utils::Backoff;

use crate::lock::*;

/// A test-and-test-and-set spin lock.
///
/// Waiters back off exponentially and eventually yield their time slice, so a stripe held across a
/// whole resize doesn't burn a core per waiter.
#[derive(Debug)]
pub struct SpinLock {
    locked: AtomicBool,
}

impl Default for SpinLock {
    fn default() -> Self {
        Self {
            locked: AtomicBool::new(false),
        }
    }
}

impl SpinLock {
    fn try_acquire(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Acquire, Relaxed)
            .is_ok()
    }
}

unsafe impl RawLock for SpinLock {
    type Token = ();

    fn lock(&self) {
        let backoff = Backoff::new();

        while !self.try_acquire() {
            // Wait on a plain load so contended waiters don't bounce the cache line.
            while self.locked.load(Relaxed) {
                backoff.snooze();
            }
        }
    }

    unsafe fn unlock(&self, _token: ()) {
        self.locked.store(false, Release);
    }
}

unsafe impl RawTryLock for SpinLock {
    fn try_lock(&self) -> Result<(), ()> {
        if self.try_acquire() {
            Ok(())
        } else {
            Err(())
        }
    }
}

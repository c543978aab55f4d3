use core::cell::UnsafeCell;
use core::mem::ManuallyDrop;
use core::ops::{Deref, DerefMut};

/// Raw lock interface.
///
/// # Safety
///
/// Implementations of this trait must ensure that the lock is actually exclusive: a lock can't be
/// acquired while the lock is already locked. Releasing a lock must happen-before the next
/// acquisition of the same lock, so that bucket contents written under the lock are visible to
/// the next holder.
pub unsafe trait RawLock: Default + Send + Sync {
    /// Raw lock's token type.
    ///
    /// Send/Sync are not enforced here, they are restricted at the Send/Sync impl for
    /// [`LockGuard`].
    type Token;

    /// Acquires the raw lock.
    fn lock(&self) -> Self::Token;

    /// Releases the raw lock.
    ///
    /// # Safety
    ///
    /// - `self` must be an acquired lock.
    /// - `token` must be from a [`RawLock::lock`] or [`RawTryLock::try_lock`] call to `self`.
    unsafe fn unlock(&self, token: Self::Token);
}

/// Raw lock interface for the non-blocking `try_lock` API.
///
/// # Safety
///
/// See [`RawLock`] for safety requirements.
///
/// Also, [`RawTryLock::try_lock`] should return a token that can be used for [`RawLock::unlock`].
pub unsafe trait RawTryLock: RawLock {
    /// Tries to acquire the raw lock without waiting.
    fn try_lock(&self) -> Result<Self::Token, ()>;
}

/// A type-safe lock protecting a value of type `T`.
///
/// `T` may be `()` when the lock guards data stored elsewhere, as the stripes of
/// [`StripedHashSet`](crate::StripedHashSet) do.
#[derive(Debug, Default)]
pub struct Lock<L: RawLock, T> {
    inner: L,
    data: UnsafeCell<T>,
}

// Send is automatically implemented for Lock.

// SAFETY: threads can only access `&mut T` via the lock, and `L` is `Sync`.
unsafe impl<L: RawLock, T: Send> Sync for Lock<L, T> {}

impl<L: RawLock, T> Lock<L, T> {
    /// Creates a new, unlocked lock.
    pub fn new(data: T) -> Self {
        Self {
            inner: L::default(),
            data: UnsafeCell::new(data),
        }
    }

    /// Destroys the lock and retrieves the lock-protected value.
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }

    /// Returns a mutable reference to the protected value.
    ///
    /// No locking happens: the exclusive borrow statically guarantees that no guard exists.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    /// Acquires the lock and dereferences the inner value.
    pub fn lock(&self) -> LockGuard<'_, L, T> {
        let token = self.inner.lock();
        LockGuard {
            lock: self,
            token: ManuallyDrop::new(token),
        }
    }
}

impl<L: RawTryLock, T> Lock<L, T> {
    /// Tries to acquire the lock and dereferences the inner value.
    pub fn try_lock(&self) -> Result<LockGuard<'_, L, T>, ()> {
        self.inner.try_lock().map(|token| LockGuard {
            lock: self,
            token: ManuallyDrop::new(token),
        })
    }
}

/// Acquires every lock yielded by `locks`, in iteration order.
///
/// Callers pass the locks in ascending index order. This is the only place in the crate where a
/// thread holds more than one lock at a time, and every such thread takes them in the same order,
/// so two callers can't deadlock against each other or against single-lock operations.
///
/// The locks are released when the returned guards are dropped.
pub fn lock_all<'s, L, T, I>(locks: I) -> Vec<LockGuard<'s, L, T>>
where
    L: RawLock + 's,
    T: 's,
    I: IntoIterator<Item = &'s Lock<L, T>>,
{
    locks.into_iter().map(Lock::lock).collect()
}

/// A guard that holds the lock and dereferences the inner value.
#[derive(Debug)]
pub struct LockGuard<'s, L: RawLock, T> {
    lock: &'s Lock<L, T>,
    token: ManuallyDrop<L::Token>,
}

// Not auto derived as the auto-derived impls are incorrect: the guard hands out `&mut T` through
// unsafe code.

// SAFETY: Ownership of `LockGuard` implies ownership of `L::Token` and `T`. Thus, they must both be
// `Send`.
unsafe impl<L: RawLock, T: Send> Send for LockGuard<'_, L, T> where L::Token: Send {}

// SAFETY: Reference to `LockGuard` implies reference to `T`. Thus, `T` must be `Sync`.
unsafe impl<L: RawLock, T: Sync> Sync for LockGuard<'_, L, T> {}

impl<L: RawLock, T> Drop for LockGuard<'_, L, T> {
    fn drop(&mut self) {
        // SAFETY: `self.token` is not used anymore in this function, and as we are `drop`ing
        // `self`, it is not used anymore.
        let token = unsafe { ManuallyDrop::take(&mut self.token) };

        // SAFETY: since `self` was created with `lock` and its `token`, the `token` given to
        // `unlock()` is correct.
        unsafe { self.lock.inner.unlock(token) };
    }
}

impl<L: RawLock, T> Deref for LockGuard<'_, L, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        // SAFETY: Having a `LockGuard` means the underlying lock is acquired, so the underlying
        // data is valid. Hence we can create a shared reference to it.
        unsafe { &*self.lock.data.get() }
    }
}

impl<L: RawLock, T> DerefMut for LockGuard<'_, L, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: Having a `LockGuard` means the underlying lock is acquired, and having a mutable
        // reference to the guard means we are the only one with access to the data.
        unsafe { &mut *self.lock.data.get() }
    }
}

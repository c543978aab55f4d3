use crate::lock::{Lock, RawLock};

/// Trait for a single-threaded set.
pub trait SequentialSet<T> {
    /// Returns `true` iff the set contains the value.
    fn contains(&self, value: &T) -> bool;

    /// Adds the value to the set. Returns whether the value was newly inserted.
    fn insert(&mut self, value: T) -> bool;

    /// Removes the value from the set. Returns whether the value was present in the set.
    fn remove(&mut self, value: &T) -> bool;

    /// Returns the number of elements in the set.
    fn len(&self) -> usize;

    /// Returns `true` iff the set holds no element.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Trait for a concurrent set.
///
/// `len` is not linearized with the mutators: while other threads are inserting or removing, it
/// may lag behind operations that already returned. Once every thread is done it is exact.
pub trait ConcurrentSet<T> {
    /// Returns `true` iff the set contains the value.
    fn contains(&self, value: &T) -> bool;

    /// Adds the value to the set. Returns whether the value was newly inserted.
    fn insert(&self, value: T) -> bool;

    /// Removes the value from the set. Returns whether the value was present in the set.
    fn remove(&self, value: &T) -> bool;

    /// Returns the number of elements in the set.
    fn len(&self) -> usize;

    /// Returns `true` iff the set holds no element.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A sequential set behind one global lock is a (coarse-grained) concurrent set.
impl<T, L: RawLock, M> ConcurrentSet<T> for Lock<L, M>
where
    M: SequentialSet<T>,
{
    fn contains(&self, value: &T) -> bool {
        self.lock().contains(value)
    }

    fn insert(&self, value: T) -> bool {
        self.lock().insert(value)
    }

    fn remove(&self, value: &T) -> bool {
        self.lock().remove(value)
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}

//! Construction errors.

use thiserror::Error;

/// Rejected set construction parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CapacityError {
    /// The initial capacity was zero. Every variant needs at least one bucket (and, for the
    /// striped set, at least one stripe).
    #[error("initial capacity must be positive")]
    Zero,
}

/// Checks a requested initial capacity.
pub(crate) fn check_capacity(initial_capacity: usize) -> Result<usize, CapacityError> {
    if initial_capacity == 0 {
        return Err(CapacityError::Zero);
    }
    Ok(initial_capacity)
}

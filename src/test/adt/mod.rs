//! Randomized harnesses per abstract data type.

pub mod set;

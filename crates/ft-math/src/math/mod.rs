//! Math primitives.

pub mod relative;

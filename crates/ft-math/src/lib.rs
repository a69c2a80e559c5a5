//! Flow analyzer math utilities.

pub mod math;

pub use math::relative::*;

//! Flow file ingestion and reconciliation.

pub mod loader;
pub mod reconcile;

pub use loader::{load_flows, parse_flows, Column, LoadError};
pub use reconcile::{reconcile, ReconcileError, ReconcileStats, Timeouts};

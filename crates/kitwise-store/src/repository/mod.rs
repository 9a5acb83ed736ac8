//! # Repository Implementations
//!
//! SQL-backed stores over the shared pool.
//!
//! - [`snapshot`] - Unified catalog snapshots

pub mod snapshot;

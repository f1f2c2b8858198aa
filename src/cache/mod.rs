//! Time-boxed caching of the collated appointment list.
//!
//! - `traits`: the transient key-value contract (get/set with TTL/delete)
//! - `storage`: its SQLite implementation
//! - `controller`: the appointment slot, its invalidation and the debounced
//!   background refresh

mod controller;
mod storage;
mod traits;

pub use controller::{AppointmentCache, CacheOptions};
pub use storage::SqliteStorage;

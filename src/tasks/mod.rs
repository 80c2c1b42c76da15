//! Background Tasks Module
//!
//! Contains background tasks that run for the lifetime of a cache.
//!
//! # Tasks
//! - Expiry sweep: removes expired entries until the cache is closed

mod sweep;

pub(crate) use sweep::spawn_sweep_task;

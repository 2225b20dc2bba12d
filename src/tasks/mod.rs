//! Background Tasks Module
//!
//! Contains the tasks a store runs off the caller's path.
//!
//! # Tasks
//! - Snapshot flush: debounced write of the cache state to storage

mod flush;

pub use flush::{FlushHandle, FlushScheduler, FlushTarget};

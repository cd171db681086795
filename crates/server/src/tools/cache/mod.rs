//! Cache inspection tools.
//!
//! This module provides tools for reading and trimming the worker's cache stores.

pub mod get;
pub mod purge;

pub use get::{CacheGetParams, get_impl};
pub use purge::{CachePurgeParams, purge_impl};

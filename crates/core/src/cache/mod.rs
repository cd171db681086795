//! SQLite-backed named cache storage.
//!
//! This module provides a persistent request/response cache using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Multiple named stores, deleted as a whole on version change
//! - Overwrite-by-key entries keyed on method and URL
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Trimming a single store to its newest entries

pub mod connection;
pub mod hash;
pub mod migrations;
pub mod storage;

pub use crate::Error;

pub use connection::CacheDb;
pub use storage::CacheEntry;

//! Core types and shared functionality for the harbor offline worker.
//!
//! This crate provides:
//! - Named cache storage with a SQLite backend
//! - The response model stored in and served from the cache
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod response;

pub use cache::{CacheDb, CacheEntry};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use response::Response;

//! Client code for the harbor offline worker.
//!
//! This crate provides the network seam, the strategy classifier and cache
//! executor, and the worker lifecycle that a host dispatches events to.

pub mod fetch;
pub mod strategy;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use fetch::{FetchConfig, HttpNetwork, Network, Request, RequestMode};
pub use strategy::{CacheExecutor, Strategy, StrategyRules};
pub use worker::{
    ClickOutcome, FetchOutcome, Notification, NotificationAction, OfflineWorker, PassReason, PushPayload, WorkerConfig,
    WorkerEvents, WorkerState,
};

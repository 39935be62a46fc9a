//! Workload driver: drives correctness workloads against worker
//! processes exercising a distributed key-value store.
//!
//! A [`manager::TaskManager`] admits [`config::TestCaseDescriptor`]s and
//! spawns one [`task::Task`] per test case. Each task pairs a
//! stateful [`generators::Generator`] with a bidirectional `Execute`
//! stream to a worker, classifying every response against the
//! operation's own oracle.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod action_mix;
pub mod config;
pub mod error;
pub mod generators;
pub mod manager;
pub mod metrics;
pub mod mirror;
pub mod operation;
pub mod provider_pool;
pub mod rate_limiter;
pub mod retry;
pub mod service;
pub mod task;

pub use config::{DriverConfig, TestCaseDescriptor, TestCaseKind};
pub use error::{DriverError, DriverResult};
pub use manager::TaskManager;

/// Installs an `EnvFilter`-driven `tracing` subscriber. Only the
/// (out of scope) binary entry point should call this — the library
/// itself only emits events, never installs a global subscriber.
#[cfg(feature = "otel")]
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

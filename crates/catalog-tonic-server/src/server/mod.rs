//! Server-side components of the product catalog.
//!
//! ## Submodules
//!
//! - [`config`] - CLI/environment configuration.
//! - [`seed`] - Sample data loaded into an empty store.
//! - [`service`] - gRPC service implementation.
//! - [`store`] - Storage adapter traits and the in-memory store.
//! - [`telemetry`] - Logging, tracing and metrics setup.
//!
//! These components are wired together in the server's `main.rs`.

pub mod config;
pub mod seed;
pub mod service;
pub mod store;
pub mod telemetry;

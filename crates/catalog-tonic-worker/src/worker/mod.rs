//! Worker components.
//!
//! ## Submodules
//!
//! - [`config`] - CLI/environment configuration.
//! - [`error`] - Failures that end the worker loop.
//! - [`factory`] - Synthetic product generation.
//! - [`runner`] - The tick loop.
//! - [`telemetry`] - Console logging setup.

pub mod config;
pub mod error;
pub mod factory;
pub mod runner;
pub mod telemetry;

pub use error::WorkerError;
pub use runner::run_worker;

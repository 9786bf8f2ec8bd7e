//! Core library for Pontoon.
//!
//! Pontoon replicates the full contents of a source database to a
//! destination database through an intermediate object-storage bridge,
//! with no direct connection between the two sides. This crate carries
//! the pieces every other crate leans on: the error taxonomy, the
//! configuration file model and loader, cron schedule parsing, and the
//! retry machinery used for per-chunk bridge operations.

pub mod config;
pub mod error;
pub mod retry;
pub mod schedule;
pub mod types;

pub use error::{Error, Result};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

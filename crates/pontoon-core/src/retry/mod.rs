//! Retry support for transient bridge I/O
//!
//! Single chunk operations against the bridge are retried a bounded
//! number of times with backoff before the whole run is failed. Fatal
//! errors (configuration, auth, integrity, cancellation) short-circuit
//! immediately via [`Error::is_transient`].
//!
//! [`Error::is_transient`]: crate::error::Error::is_transient

mod executor;
mod strategies;

pub use executor::retry_with_policy;
pub use strategies::calculate_delay;

//! Launchpad Testing Utilities
//!
//! Test doubles for the delivery side of Launchpad.
//!
//! # Features
//!
//! - **Scripted transport**: per-recipient provider responses, every call recorded
//!   with its `tokio::time::Instant` so throttle and backoff delays can be asserted
//!   under `#[tokio::test(start_paused = true)]`
//! - **Fixtures**: recipient lists, a ready-made message template and template engine
//!
//! # Example
//!
//! ```rust,ignore
//! use launchpad_testing::prelude::*;
//!
//! #[tokio::test(start_paused = true)]
//! async fn retries_rate_limits() {
//!     let transport = ScriptedTransport::new()
//!         .script("a@example.com", [Reply::Fail(errors::rate_limited()), Reply::Accept]);
//!     // dispatch through `transport`...
//!     assert_eq!(transport.calls_for("a@example.com").len(), 2);
//! }
//! ```

pub mod fixtures;
mod transport;

pub use transport::{RecordedCall, Reply, ScriptedTransport, errors};

/// Prelude for common imports
pub mod prelude {
    pub use crate::fixtures;
    pub use crate::transport::{RecordedCall, Reply, ScriptedTransport, errors};
}

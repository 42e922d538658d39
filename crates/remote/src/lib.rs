//! Remote call plumbing for repolens.
//!
//! - [`RemoteClient`] wraps `reqwest` with retry/backoff and status classification.
//! - [`with_retry`] is the generic retry loop used by the client.
//! - [`RemoteError`] is the error taxonomy shared by every HTTP-facing crate.
//! - [`with_timeout`] races a future against a deadline.

mod client;
mod error;
mod retry;
mod timeout;

pub use client::{RemoteClient, USER_AGENT};
pub use error::{is_client_error_message, RemoteError};
pub use retry::{with_retry, OnRetry, RetryNotice, RetryPolicy, RetryableError};
pub use timeout::with_timeout;

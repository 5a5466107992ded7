//! Shared helpers used by the session core.

pub mod retry;

pub use retry::{with_retry, RetryPolicy};

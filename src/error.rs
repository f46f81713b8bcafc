//! Shared error classification.
//!
//! DESIGN
//! ======
//! Each module owns its own `thiserror` enum. This trait gives them a common,
//! grepable shape for logs and for the text surfaced to the user, without
//! collapsing them into one crate-wide error type.

/// Grepable error code and retryable flag for structured error reporting.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

//! Message-based classification for use inside callables.
//!
//! A callable wrapping a client library often only has an error string to go
//! on. Matching known transient phrases is acceptable there, where the failure
//! is understood. The submission boundary never does this.

use lorchestra_core::{BoxError, LorchestraError};

const TRANSIENT_PHRASES: [&str; 12] = [
    "rate limit",
    "ratelimit",
    "too many requests",
    "timed out",
    "timeout",
    "deadline exceeded",
    "temporarily unavailable",
    "service unavailable",
    "connection reset",
    "connection refused",
    "broken pipe",
    "try again",
];

/// HTTP statuses that signal a retryable condition. Matched only as whole
/// numeric tokens, so `row 14290` does not count.
const TRANSIENT_STATUS_CODES: [&str; 2] = ["429", "503"];

/// Whether `message` mentions a known transient condition.
pub fn is_transient_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    TRANSIENT_PHRASES
        .iter()
        .any(|phrase| lower.contains(phrase))
        || lower
            .split(|c: char| !c.is_ascii_alphanumeric())
            .any(|token| TRANSIENT_STATUS_CODES.contains(&token))
}

/// Classify a failure message: transient on a known phrase, permanent otherwise.
pub fn classify_message(message: impl Into<String>) -> LorchestraError {
    let message = message.into();
    if is_transient_message(&message) {
        LorchestraError::transient(message)
    } else {
        LorchestraError::permanent(message)
    }
}

/// Classify an arbitrary error raised inside a callable by its rendered chain.
pub fn classify_source(source: impl Into<BoxError>) -> LorchestraError {
    let source = source.into();
    let mut message = source.to_string();
    let mut current = source.source();
    while let Some(cause) = current {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        current = cause.source();
    }
    classify_message(message)
}

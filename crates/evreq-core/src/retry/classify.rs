//! Classify failures for retry eligibility.
//!
//! The default policy retries every runtime failure identically (bad status,
//! transport fault, decode failure after a 200); `RetryOn::Transient`
//! narrows eligibility to failures that plausibly resolve on their own.

use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorKind};

/// High-level classification of a failure for retry purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// May resolve on its own: transport faults, throttling, 5xx.
    Transient,
    /// Deterministic for identical input: 4xx, decode failures, file errors.
    Permanent,
}

/// Which failure classes the retry counters apply to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryOn {
    /// Retry any runtime failure (the historical behavior).
    #[default]
    AllFailures,
    /// Retry only failures classified [`ErrorClass::Transient`].
    Transient,
}

impl RetryOn {
    pub fn allows(&self, error: &Error) -> bool {
        match self {
            RetryOn::AllFailures => true,
            RetryOn::Transient => classify(error) == ErrorClass::Transient,
        }
    }
}

/// Classify an HTTP status code. Timeout/throttle statuses and 5xx are
/// transient; everything else is permanent.
pub fn classify_status(status: u32) -> ErrorClass {
    match status {
        408 | 429 => ErrorClass::Transient,
        500..=599 => ErrorClass::Transient,
        _ => ErrorClass::Permanent,
    }
}

/// Classify a pipeline error.
pub fn classify(error: &Error) -> ErrorClass {
    match &error.kind {
        ErrorKind::Transport(_) => ErrorClass::Transient,
        ErrorKind::BadStatus(status) => classify_status(*status),
        ErrorKind::MissingValue(_) => ErrorClass::Transient,
        _ => ErrorClass::Permanent,
    }
}

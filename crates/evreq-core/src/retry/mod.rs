//! Retry scheduling: bounded attempt counting with linear backoff.
//!
//! Each logical call owns one [`RetryPolicy`], which in turn owns one
//! [`AfterWorker`]; the worker guarantees at most one pending delayed
//! re-invocation per call, so retries for a single session can never
//! overlap. Error classification lives here too so the policy knob that
//! decides which failures are eligible stays next to the counters.

mod classify;
mod policy;
mod worker;

pub use classify::{classify, classify_status, ErrorClass, RetryOn};
pub use policy::RetryPolicy;
pub use worker::AfterWorker;

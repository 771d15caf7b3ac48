//! Bounded-attempt retry policy with linear backoff.

use std::time::Duration;

use super::worker::AfterWorker;

/// Delay step between consecutive retries: the n-th retry fires after
/// `n * 250ms`. Linear on purpose; with the small attempt ceilings this
/// policy is used with, exponential growth buys nothing.
const BACKOFF_STEP: Duration = Duration::from_millis(250);

/// Counts retry attempts for one session and schedules the delayed
/// re-invocations through its own [`AfterWorker`].
///
/// `needs_retry` is the caller's pre-check: it holds while fewer than
/// `max_count` retries have been scheduled. An `attempt` admitted by that
/// pre-check always fires; calling `attempt` without the pre-check once the
/// budget is spent drops the action silently. `max_count` of zero therefore
/// means the action of the very first `attempt` never runs.
#[derive(Debug)]
pub struct RetryPolicy {
    max_count: u32,
    retry_count: u32,
    worker: AfterWorker,
}

impl RetryPolicy {
    pub fn new(max_count: u32) -> Self {
        Self {
            max_count,
            retry_count: 0,
            worker: AfterWorker::new(),
        }
    }

    /// True while another retry may be scheduled.
    pub fn needs_retry(&self) -> bool {
        self.retry_count < self.max_count
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn max_count(&self) -> u32 {
        self.max_count
    }

    /// Delay before the n-th retry (1-based) fires.
    fn backoff(retry: u32) -> Duration {
        BACKOFF_STEP.saturating_mul(retry)
    }

    /// Consume one retry: bump the counter and, if the budget still covers
    /// it, schedule `action` after the linear backoff delay. Out-of-budget
    /// attempts drop the action without error.
    pub fn attempt<F>(&mut self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.retry_count += 1;
        if self.retry_count > self.max_count {
            return;
        }
        self.worker.schedule(Self::backoff(self.retry_count), action);
    }

    /// Discard a pending scheduled retry, if any.
    pub fn cancel(&mut self) {
        self.worker.cancel();
    }
}

//! A bounded polling wait.
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Default time budget of a wait.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Default pause between two unsuccessful attempts.
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_millis(100);

/// How a wait ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaitOutcome {
    /// Whether the condition became true before the deadline.
    pub satisfied: bool,
    /// Time spent waiting.
    pub elapsed: Duration,
    /// The time budget that was used.
    pub timeout: Duration,
}

/// Repeatedly evaluates a condition until it holds or a deadline passes.
///
/// The condition is always evaluated at least once. After every unsuccessful attempt the
/// calling thread sleeps for the polling interval; there is no other bound on the number of
/// attempts than the deadline.
#[derive(Clone, Copy, Debug)]
pub struct Wait {
    timeout: Duration,
    polling_interval: Duration,
}

impl Default for Wait {
    fn default() -> Self {
        Wait::new(DEFAULT_TIMEOUT, DEFAULT_POLLING_INTERVAL)
    }
}

impl Wait {
    /// A wait with the given time budget and polling interval.
    pub fn new(timeout: Duration, polling_interval: Duration) -> Self {
        Self {
            timeout,
            polling_interval,
        }
    }

    /// Change the time budget.
    pub fn at_most(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Change the polling interval.
    pub fn every(mut self, interval: Duration) -> Self {
        self.polling_interval = interval;
        self
    }

    /// The time budget of this wait.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Evaluate `condition` until it returns `Ok(true)` or the deadline passes.
    ///
    /// An `Err` from the condition aborts the wait and is returned as is.
    pub fn until<F, E>(&self, mut condition: F) -> Result<WaitOutcome, E>
    where
        F: FnMut() -> Result<bool, E>,
    {
        let start = Instant::now();
        // None when the budget is too large to ever run out
        let deadline = start.checked_add(self.timeout);
        let mut attempts = 0usize;

        let satisfied = loop {
            attempts += 1;
            let satisfied = condition()?;
            trace!(attempts, satisfied, "polled wait condition");

            if !satisfied {
                std::thread::sleep(self.polling_interval);
            }

            if satisfied || deadline.map_or(false, |deadline| Instant::now() >= deadline) {
                break satisfied;
            }
        };

        let elapsed = start.elapsed();
        debug!(attempts, satisfied, ?elapsed, timeout = ?self.timeout, "wait finished");
        Ok(WaitOutcome {
            satisfied,
            elapsed,
            timeout: self.timeout,
        })
    }
}

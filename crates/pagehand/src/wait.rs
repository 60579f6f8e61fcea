//! Wait Mechanisms
//!
//! Bounded, blocking polling on top of the dispatch proxy.
//!
//! A wait target is either an operation name (invoke it and wait until the
//! result [`is_ready`](crate::Value::is_ready)) or a locator (retry the
//! lookup until it finds an element). Targets are awaited one after another,
//! each with its own deadline.

use crate::proxy::DispatchProxy;
use crate::result::{HarnessError, HarnessResult};
use crate::value::{By, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for each awaited target (10 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 10_000;

/// Default polling interval (200ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 200;

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitOptions {
    /// Timeout per target in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// =============================================================================
// WAIT TARGETS
// =============================================================================

/// Something to wait for
#[derive(Debug, Clone, PartialEq)]
pub enum WaitTarget {
    /// Invoke the operation until its result is ready
    Operation(String),
    /// Retry the lookup until it finds an element
    Locator {
        /// Identifier kind
        by: By,
        /// Identifier value
        value: String,
    },
    /// A value that is neither form; rejected before any polling
    Unsupported(Value),
}

impl WaitTarget {
    /// Visibility-style operation target
    #[must_use]
    pub fn operation(name: impl Into<String>) -> Self {
        Self::Operation(name.into())
    }

    /// Locator target by unique id
    #[must_use]
    pub fn locator(value: impl Into<String>) -> Self {
        Self::locator_by(By::Id, value)
    }

    /// Locator target by any identifier kind
    #[must_use]
    pub fn locator_by(by: By, value: impl Into<String>) -> Self {
        Self::Locator {
            by,
            value: value.into(),
        }
    }
}

impl fmt::Display for WaitTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Operation(name) => write!(f, "operation `{name}`"),
            Self::Locator { by, value } => write!(f, "element {by} `{value}`"),
            Self::Unsupported(value) => write!(f, "{} value {value:?}", value.kind()),
        }
    }
}

/// Text converts to an id locator; every other value is unsupported.
impl From<Value> for WaitTarget {
    fn from(value: Value) -> Self {
        match value {
            Value::Text(id) => Self::locator(id),
            other => Self::Unsupported(other),
        }
    }
}

// =============================================================================
// WAIT RESULT
// =============================================================================

/// Result of a successful wait
#[derive(Debug, Clone)]
pub struct WaitResult {
    /// Time spent waiting
    pub elapsed: Duration,
    /// Number of times the condition was checked
    pub attempts: u32,
    /// Description of what was waited for
    pub waited_for: String,
}

// =============================================================================
// WAITER IMPLEMENTATION
// =============================================================================

/// Poll loop over a dispatch proxy
#[derive(Debug, Clone, Default)]
pub struct Waiter {
    options: WaitOptions,
}

impl Waiter {
    /// Create a new waiter with default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom options
    #[must_use]
    pub const fn with_options(options: WaitOptions) -> Self {
        Self { options }
    }

    /// Options in use
    #[must_use]
    pub const fn options(&self) -> &WaitOptions {
        &self.options
    }

    /// Await every target in order.
    ///
    /// All targets are validated first: an unsupported one fails with
    /// `UnsupportedWaitTarget` before anything is polled.
    pub fn await_all<I>(
        &self,
        proxy: &mut DispatchProxy,
        targets: I,
    ) -> HarnessResult<Vec<WaitResult>>
    where
        I: IntoIterator,
        I::Item: Into<WaitTarget>,
    {
        let targets: Vec<WaitTarget> = targets.into_iter().map(Into::into).collect();
        if let Some(bad) = targets
            .iter()
            .find(|t| matches!(t, WaitTarget::Unsupported(_)))
        {
            return Err(HarnessError::UnsupportedWaitTarget {
                target: bad.to_string(),
            });
        }

        targets
            .iter()
            .map(|target| self.await_target(proxy, target))
            .collect()
    }

    /// Await a single target
    pub fn await_target(
        &self,
        proxy: &mut DispatchProxy,
        target: &WaitTarget,
    ) -> HarnessResult<WaitResult> {
        let description = target.to_string();
        match target {
            WaitTarget::Operation(name) => self.poll(&description, || {
                proxy.invoke(name, &[]).map(|value| value.is_ready())
            }),
            WaitTarget::Locator { by, value } => {
                self.poll(&description, || proxy.seek_by(*by, value).map(|_| true))
            }
            WaitTarget::Unsupported(_) => Err(HarnessError::UnsupportedWaitTarget {
                target: description,
            }),
        }
    }

    /// Poll `check` until it reports ready or the timeout elapses.
    ///
    /// Retryable errors count as "not ready"; any other error ends the wait.
    /// The condition is always checked at least once, and the final sleep
    /// is clipped to the deadline. A timeout carries the error from the last
    /// attempt when that attempt failed.
    pub fn poll<F>(&self, description: &str, mut check: F) -> HarnessResult<WaitResult>
    where
        F: FnMut() -> HarnessResult<bool>,
    {
        let start = Instant::now();
        let deadline = start + self.options.timeout();
        let mut attempts = 0u32;
        let mut last_error: Option<HarnessError> = None;

        loop {
            attempts += 1;
            match check() {
                Ok(true) => {
                    debug!(target = description, attempts, "wait satisfied");
                    return Ok(WaitResult {
                        elapsed: start.elapsed(),
                        attempts,
                        waited_for: description.to_string(),
                    });
                }
                Ok(false) => {
                    trace!(target = description, attempts, "not ready");
                    last_error = None;
                }
                Err(err) if err.is_retryable() => {
                    trace!(target = description, attempts, error = %err, "retrying");
                    last_error = Some(err);
                }
                Err(err) => return Err(err),
            }

            let now = Instant::now();
            if now >= deadline {
                let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                let last_error = last_error.map(|err| err.to_string());
                warn!(
                    target = description,
                    elapsed_ms,
                    attempts,
                    last_error = last_error.as_deref().unwrap_or("none"),
                    "wait timed out"
                );
                return Err(HarnessError::WaitTimeout {
                    target: description.to_string(),
                    elapsed_ms,
                    last_error,
                });
            }
            std::thread::sleep(self.options.poll_interval().min(deadline - now));
        }
    }
}

// =============================================================================
// CONVENIENCE FUNCTIONS
// =============================================================================

/// Wait for a predicate with the given timeout and default poll interval
pub fn wait_until<F>(predicate: F, timeout_ms: u64) -> HarnessResult<()>
where
    F: Fn() -> bool,
{
    let waiter = Waiter::with_options(WaitOptions::new().with_timeout(timeout_ms));
    waiter.poll("custom predicate", || Ok(predicate()))?;
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

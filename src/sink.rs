//! Summarization sinks.
//!
//! A [`SummarySink`] turns a finished [`VideoReport`] into prose. It is the
//! only place a run touches the network, and it is called once, after the
//! report is complete, so it can be retried without redoing any frame work.
//! From the pipeline's point of view it is a plain synchronous call.
//!
//! Sink failures never end a run: [`summarize_or_placeholder`] turns them
//! into a textual notice so the computed scene analysis is kept.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use vidsum::{RetryPolicy, RetryingSink, VideoReport, VidsumError, build_report};
//! use vidsum::sink::summarize_or_placeholder;
//!
//! let flaky = |_: &VideoReport| -> Result<String, VidsumError> {
//!     Err(VidsumError::SinkFailure("service unavailable".to_string()))
//! };
//! let sink = RetryingSink::new(flaky, RetryPolicy::new(2, Duration::ZERO));
//!
//! let report = build_report("empty.mp4", Vec::new(), Vec::new());
//! let text = summarize_or_placeholder(&sink, &report);
//! assert_eq!(text, "Summary generation failed: service unavailable");
//! ```

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread;
use std::time::Duration;

use crate::{error::VidsumError, report::VideoReport};

/// Turns a report into a human-readable summary.
pub trait SummarySink {
    /// Produce the summary text.
    ///
    /// Must accept a report with no scenes.
    fn summarize(&self, report: &VideoReport) -> Result<String, VidsumError>;
}

impl<F> SummarySink for F
where
    F: Fn(&VideoReport) -> Result<String, VidsumError>,
{
    fn summarize(&self, report: &VideoReport) -> Result<String, VidsumError> {
        self(report)
    }
}

/// Call `sink`, converting any failure into a placeholder summary.
///
/// The placeholder reads `Summary generation failed: <reason>`. Panics in
/// the sink are caught and reported the same way.
pub fn summarize_or_placeholder<S>(sink: &S, report: &VideoReport) -> String
where
    S: SummarySink + ?Sized,
{
    let outcome = catch_unwind(AssertUnwindSafe(|| sink.summarize(report)));
    match outcome {
        Ok(Ok(summary)) => summary,
        Ok(Err(error)) => {
            log::warn!("Summarization failed for {}: {error}", report.filename);
            match error {
                VidsumError::SinkFailure(_) | VidsumError::SinkRejected(_) => error.to_string(),
                other => VidsumError::SinkFailure(other.to_string()).to_string(),
            }
        }
        Err(_) => {
            log::warn!("Summarization sink panicked for {}", report.filename);
            VidsumError::SinkFailure("sink panicked".to_string()).to_string()
        }
    }
}

/// Exponential backoff schedule for [`RetryingSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. At least 1.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_backoff: Duration,
    /// Factor applied to the delay after each failed retry.
    pub multiplier: f64,
    /// Upper bound for any single delay.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            multiplier: 2.0,
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// `max_attempts` tries, starting with `initial_backoff` and doubling.
    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
            ..Self::default()
        }
    }

    /// A policy that tries once.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(30) as i32;
        let factor = self.multiplier.max(1.0).powi(exponent);
        self.initial_backoff.mul_f64(factor).min(self.max_backoff)
    }
}

/// Retries a sink according to a [`RetryPolicy`].
///
/// Errors for which [`VidsumError::is_retryable`] is false are returned
/// immediately.
#[derive(Debug, Clone)]
pub struct RetryingSink<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: SummarySink> RetryingSink<S> {
    /// Wrap `inner`.
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// The wrapped sink.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: SummarySink> SummarySink for RetryingSink<S> {
    fn summarize(&self, report: &VideoReport) -> Result<String, VidsumError> {
        let attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.inner.summarize(report) {
                Ok(summary) => return Ok(summary),
                Err(error) if attempt < attempts && error.is_retryable() => {
                    let delay = self.policy.backoff_for(attempt);
                    log::warn!(
                        "Summarization attempt {attempt}/{attempts} failed: {error}; retrying in {delay:?}"
                    );
                    if !delay.is_zero() {
                        thread::sleep(delay);
                    }
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

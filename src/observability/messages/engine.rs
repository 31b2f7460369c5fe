// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for workflow run lifecycle and step dispatch.
//!
//! This module contains message types for logging events related to:
//! * Run start, completion, failure and cancellation
//! * Dispatch of events to steps
//! * Stop buffering while siblings are still in flight
//! * Runs that go idle without a result

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// A run was started.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use caseflow::observability::messages::engine::RunStarted;
///
/// let msg = RunStarted {
///     workflow: "case_summary",
///     run_id: "0b5e",
///     step_count: 6,
///     max_concurrency: 4,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct RunStarted<'a> {
    pub workflow: &'a str,
    pub run_id: &'a str,
    pub step_count: usize,
    pub max_concurrency: usize,
}

impl Display for RunStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting run {} of workflow '{}': {} steps, max_concurrency={}",
            self.run_id, self.workflow, self.step_count, self.max_concurrency
        )
    }
}

impl StructuredLog for RunStarted<'_> {
    fn log(&self) {
        tracing::info!(
            workflow = self.workflow,
            run_id = self.run_id,
            step_count = self.step_count,
            max_concurrency = self.max_concurrency,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "run",
            span_name = name,
            workflow = self.workflow,
            run_id = self.run_id,
        )
    }
}

/// A run produced its result.
///
/// # Log Level
/// `info!` - Important operational event
pub struct RunCompleted<'a> {
    pub run_id: &'a str,
    pub dispatched: usize,
    pub duration: Duration,
}

impl Display for RunCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Run {} completed: {} steps dispatched in {:?}",
            self.run_id, self.dispatched, self.duration
        )
    }
}

impl StructuredLog for RunCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            run_id = self.run_id,
            dispatched = self.dispatched,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("run_completed", span_name = name, run_id = self.run_id)
    }
}

/// A run failed because a step returned an error.
///
/// # Log Level
/// `error!` - Run aborted
pub struct RunFailed<'a> {
    pub run_id: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for RunFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Run {} failed: {}", self.run_id, self.error)
    }
}

impl StructuredLog for RunFailed<'_> {
    fn log(&self) {
        tracing::error!(run_id = self.run_id, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("run_failed", span_name = name, run_id = self.run_id)
    }
}

/// A run was cancelled by its caller or by the run timeout.
///
/// # Log Level
/// `warn!` - Run ended without a result
pub struct RunCancelled<'a> {
    pub run_id: &'a str,
    pub timed_out: bool,
}

impl Display for RunCancelled<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        if self.timed_out {
            write!(f, "Run {} cancelled after reaching its timeout", self.run_id)
        } else {
            write!(f, "Run {} cancelled", self.run_id)
        }
    }
}

/// An event was handed to its step.
///
/// # Log Level
/// `debug!` - Per-dispatch detail
pub struct StepDispatched<'a> {
    pub step: &'a str,
    pub event: &'a str,
    pub in_flight: usize,
}

impl Display for StepDispatched<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Dispatching {} to step '{}' ({} in flight)",
            self.event, self.step, self.in_flight
        )
    }
}

/// A step returned an error.
///
/// # Log Level
/// `error!` - Triggers run abort
pub struct StepFailed<'a> {
    pub step: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for StepFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Step '{}' failed: {}", self.step, self.error)
    }
}

/// `Stop` arrived while other work was still in flight.
///
/// # Log Level
/// `debug!` - Scheduler detail
pub struct StopBuffered {
    pub in_flight: usize,
}

impl Display for StopBuffered {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Stop received with {} events still in flight; completing once they settle",
            self.in_flight
        )
    }
}

/// A second `Stop` arrived after the first was recorded.
///
/// # Log Level
/// `warn!` - Ignored
pub struct ExtraStopIgnored<'a> {
    pub run_id: &'a str,
}

impl Display for ExtraStopIgnored<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Run {} emitted more than one Stop; keeping the first", self.run_id)
    }
}

/// Every task settled and nothing produced `Stop`.
///
/// # Log Level
/// `warn!` - The run fails as stalled
pub struct RunStalled<'a> {
    pub run_id: &'a str,
    pub pending: &'a [String],
}

impl Display for RunStalled<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        if self.pending.is_empty() {
            write!(f, "Run {} went idle without a result", self.run_id)
        } else {
            write!(
                f,
                "Run {} went idle without a result; waiting on {}",
                self.run_id,
                self.pending.join(", ")
            )
        }
    }
}

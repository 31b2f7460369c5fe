// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The error surfaced by a workflow run.
//!
//! Every failure inside a step ends up here, and any one of them aborts the
//! whole run: sibling steps are cancelled and no partial result is returned.

use crate::errors::{BarrierError, CacheError, CapabilityError, RecordError};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkflowError {
    /// A generator produced output that does not deserialize into the
    /// requested schema.
    #[error("Output for schema '{schema}' failed validation: {reason}")]
    Validation { schema: String, reason: String },

    #[error("Capability call failed: {0}")]
    Capability(#[from] CapabilityError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("Barrier inconsistency: {0}")]
    Barrier(#[from] BarrierError),

    #[error(transparent)]
    Record(#[from] RecordError),

    /// `get` on a key nobody has set during this run.
    #[error("Context key '{0}' has not been set")]
    MissingContextKey(&'static str),

    /// Use of a key the workflow definition never declared.
    #[error("Context key '{0}' is not declared by this workflow")]
    UndeclaredContextKey(&'static str),

    #[error("Context key '{key}' holds a value that is not {expected}")]
    ContextTypeMismatch {
        key: &'static str,
        expected: &'static str,
    },

    /// A step received an event shape it does not handle.
    #[error("Step '{step}' cannot handle event '{event}'")]
    UnexpectedEvent { step: &'static str, event: String },

    /// Every task finished and the queue drained without a `Stop` event.
    #[error("Run went idle without producing a result (pending barrier groups: {})", .pending.join(", "))]
    Stalled { pending: Vec<String> },

    #[error("Run was cancelled")]
    Cancelled,

    #[error("Run timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Internal scheduler error: {0}")]
    Internal(String),
}

impl WorkflowError {
    /// True for the outcomes produced by the cancellation path rather than by
    /// a failing step.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, WorkflowError::Cancelled | WorkflowError::TimedOut(_))
    }
}

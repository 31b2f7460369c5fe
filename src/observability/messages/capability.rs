// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for generation and retrieval capabilities.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// A retryable capability failure will be attempted again.
///
/// # Log Level
/// `warn!` - Degraded but recovering
pub struct RetryScheduled<'a> {
    pub capability: &'a str,
    pub attempt: u32,
    pub max_attempts: u32,
    pub backoff: Duration,
    pub error: &'a dyn std::error::Error,
}

impl Display for RetryScheduled<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} attempt {}/{} failed ({}); retrying in {:?}",
            self.capability, self.attempt, self.max_attempts, self.error, self.backoff
        )
    }
}

impl StructuredLog for RetryScheduled<'_> {
    fn log(&self) {
        tracing::warn!(
            capability = self.capability,
            attempt = self.attempt,
            max_attempts = self.max_attempts,
            backoff_ms = self.backoff.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("retry", span_name = name, capability = self.capability)
    }
}

/// A structured generation request is about to be sent.
///
/// # Log Level
/// `debug!` - Per-call detail
pub struct GenerationRequested<'a> {
    pub generator: &'a str,
    pub schema: &'a str,
}

impl Display for GenerationRequested<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Requesting '{}' from generator '{}'", self.schema, self.generator)
    }
}

/// Retrieval finished for one query.
///
/// # Log Level
/// `debug!` - Per-call detail
pub struct DocumentsRetrieved<'a> {
    pub retriever: &'a str,
    pub query: &'a str,
    pub count: usize,
}

impl Display for DocumentsRetrieved<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Retriever '{}' returned {} documents for query '{}'",
            self.retriever, self.count, self.query
        )
    }
}

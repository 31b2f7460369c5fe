// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::errors::CapabilityError;
use crate::observability::messages::capability::RetryScheduled;
use crate::observability::messages::StructuredLog;
use crate::traits::{PredictRequest, StructuredGenerator};

/// Retries retryable generator failures with linear backoff.
///
/// Each attempt is one complete request, and only errors that report
/// themselves as retryable (transport, 429, 5xx) are tried again. Validation
/// of the answer happens above this layer and is never retried.
pub struct RetryingGenerator<G> {
    inner: G,
    retries: u32,
    backoff: Duration,
}

impl<G: StructuredGenerator> RetryingGenerator<G> {
    pub fn new(inner: G, retries: u32, backoff: Duration) -> Self {
        Self {
            inner,
            retries,
            backoff,
        }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }
}

#[async_trait]
impl<G: StructuredGenerator> StructuredGenerator for RetryingGenerator<G> {
    async fn predict(&self, request: &PredictRequest) -> Result<Value, CapabilityError> {
        let max_attempts = self.retries.saturating_add(1);
        let mut attempt = 1;
        loop {
            match self.inner.predict(request).await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_retryable() && attempt < max_attempts => {
                    let backoff = self.backoff.saturating_mul(attempt);
                    RetryScheduled {
                        capability: self.inner.name(),
                        attempt,
                        max_attempts,
                        backoff,
                        error: &error,
                    }
                    .log();
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

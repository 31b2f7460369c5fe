// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::future::Future;
use std::marker::PhantomData;

use crate::engine::{Event, Payload, StepContext};
use crate::errors::WorkflowError;

/// A unit of work bound to one event kind.
///
/// `run` receives the event it was bound to and returns the events to emit
/// once it finishes. Events that must start before the step returns (fan-out
/// children, progress logs) are emitted eagerly through the context instead.
#[async_trait]
pub trait Step<P: Payload>: Send + Sync {
    async fn run(&self, ctx: StepContext<P>, event: Event<P>) -> Result<Vec<Event<P>>, WorkflowError>;

    fn name(&self) -> &'static str;
}

/// Adapter that turns an async closure into a [`Step`].
pub struct FnStep<P, F> {
    name: &'static str,
    handler: F,
    _payload: PhantomData<fn() -> P>,
}

impl<P, F> FnStep<P, F> {
    pub fn new(name: &'static str, handler: F) -> Self {
        Self {
            name,
            handler,
            _payload: PhantomData,
        }
    }
}

#[async_trait]
impl<P, F, Fut> Step<P> for FnStep<P, F>
where
    P: Payload,
    F: Fn(StepContext<P>, Event<P>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<Event<P>>, WorkflowError>> + Send + 'static,
{
    async fn run(&self, ctx: StepContext<P>, event: Event<P>) -> Result<Vec<Event<P>>, WorkflowError> {
        (self.handler)(ctx, event).await
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

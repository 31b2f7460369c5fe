// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;
use std::time::Duration;

use crate::config::consts::{DEFAULT_MAX_CONCURRENCY, DEFAULT_STREAM_CAPACITY};
use crate::engine::context::ContextSchema;
use crate::engine::event::Payload;
use crate::engine::handle::RunHandle;
use crate::engine::registry::StepRegistry;
use crate::engine::scheduler;

/// Run-time knobs shared by every run of a workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowOptions {
    /// Whole-run deadline. Expiry takes the cancellation path.
    pub timeout: Option<Duration>,
    /// Bound of the observer channel; `Log` producers wait when it is full.
    pub stream_capacity: usize,
    /// Maximum number of steps executing at once.
    pub max_concurrency: usize,
    /// Steps stream extra detail (JSON dumps, queries) when set.
    pub verbose: bool,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        let max_concurrency = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(DEFAULT_MAX_CONCURRENCY);
        Self {
            timeout: None,
            stream_capacity: DEFAULT_STREAM_CAPACITY,
            max_concurrency,
            verbose: false,
        }
    }
}

/// A validated workflow definition. Cheap to clone; each `run` is isolated.
pub struct Workflow<P: Payload> {
    name: Arc<str>,
    registry: Arc<StepRegistry<P>>,
    schema: Arc<ContextSchema>,
    options: WorkflowOptions,
}

impl<P: Payload> Clone for Workflow<P> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            registry: Arc::clone(&self.registry),
            schema: Arc::clone(&self.schema),
            options: self.options.clone(),
        }
    }
}

impl<P: Payload> Workflow<P> {
    pub(crate) fn new(
        name: String,
        registry: StepRegistry<P>,
        schema: ContextSchema,
        options: WorkflowOptions,
    ) -> Self {
        Self {
            name: name.into(),
            registry: Arc::new(registry),
            schema: Arc::new(schema),
            options,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &WorkflowOptions {
        &self.options
    }

    pub fn registry(&self) -> &StepRegistry<P> {
        &self.registry
    }

    pub(crate) fn schema(&self) -> Arc<ContextSchema> {
        Arc::clone(&self.schema)
    }

    pub(crate) fn registry_handle(&self) -> Arc<StepRegistry<P>> {
        Arc::clone(&self.registry)
    }

    /// Start a run and return its handle immediately.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn run(&self, input: P::Input) -> RunHandle<P> {
        scheduler::start(self, input)
    }
}

impl<P: Payload> std::fmt::Debug for Workflow<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("name", &self.name)
            .field("registry", &self.registry)
            .field("options", &self.options)
            .finish()
    }
}

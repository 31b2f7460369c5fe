// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Step registration and routing.
//!
//! [`WorkflowBuilder`] collects `(route, step)` bindings and context-key
//! declarations, then validates them all at once in `build()`:
//!
//! 1. The `Start` route has exactly one step.
//! 2. Every kind listed by [`Payload::kinds`] has exactly one step.
//! 3. No step is bound to a kind outside that list.
//! 4. No context key is declared with two different types.
//!
//! Every problem found is reported, not just the first one. A workflow that
//! builds can route every event it can ever see.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::engine::context::{ContextKey, ContextSchema};
use crate::engine::event::{Payload, Route};
use crate::engine::workflow::{Workflow, WorkflowOptions};
use crate::errors::RegistrationError;
use crate::traits::Step;

/// Validated routing table: each dispatchable route maps to one step.
pub struct StepRegistry<P: Payload> {
    steps: HashMap<Route<P::Kind>, Arc<dyn Step<P>>>,
}

impl<P: Payload> StepRegistry<P> {
    pub fn resolve(&self, route: &Route<P::Kind>) -> Option<&Arc<dyn Step<P>>> {
        self.steps.get(route)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// `(route, step name)` pairs, sorted by route name.
    pub fn bindings(&self) -> Vec<(String, &'static str)> {
        let mut bindings: Vec<(String, &'static str)> = self
            .steps
            .iter()
            .map(|(route, step)| (route.to_string(), step.name()))
            .collect();
        bindings.sort();
        bindings
    }
}

impl<P: Payload> std::fmt::Debug for StepRegistry<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepRegistry")
            .field("bindings", &self.bindings())
            .finish()
    }
}

pub struct WorkflowBuilder<P: Payload> {
    name: String,
    bindings: Vec<(Route<P::Kind>, Arc<dyn Step<P>>)>,
    schema: ContextSchema,
    schema_errors: Vec<RegistrationError>,
    options: WorkflowOptions,
}

impl<P: Payload> WorkflowBuilder<P> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bindings: Vec::new(),
            schema: ContextSchema::default(),
            schema_errors: Vec::new(),
            options: WorkflowOptions::default(),
        }
    }

    /// Bind the step that consumes the initial `Start` event.
    pub fn on_start(self, step: impl Step<P> + 'static) -> Self {
        self.register(Route::Start, Arc::new(step))
    }

    /// Bind the step that consumes events of `kind`.
    pub fn on(self, kind: P::Kind, step: impl Step<P> + 'static) -> Self {
        self.register(Route::Step(kind), Arc::new(step))
    }

    pub fn register(mut self, route: Route<P::Kind>, step: Arc<dyn Step<P>>) -> Self {
        self.bindings.push((route, step));
        self
    }

    pub fn context_key<T: Send + Sync + 'static>(mut self, key: &ContextKey<T>) -> Self {
        if let Err(e) = self.schema.declare(key) {
            self.schema_errors.push(e);
        }
        self
    }

    pub fn options(mut self, options: WorkflowOptions) -> Self {
        self.options = options;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    pub fn stream_capacity(mut self, capacity: usize) -> Self {
        self.options.stream_capacity = capacity.max(1);
        self
    }

    pub fn max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.options.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.options.verbose = verbose;
        self
    }

    pub fn build(self) -> Result<Workflow<P>, RegistrationError> {
        let mut errors = self.schema_errors;
        let mut steps: HashMap<Route<P::Kind>, Arc<dyn Step<P>>> = HashMap::new();
        let known = P::kinds();

        for (route, step) in self.bindings {
            if let Route::Step(kind) = route {
                if !known.contains(&kind) {
                    errors.push(RegistrationError::UnknownEvent {
                        kind: route.to_string(),
                        step: step.name().to_string(),
                    });
                    continue;
                }
            }
            if let Some(existing) = steps.get(&route) {
                errors.push(RegistrationError::DuplicateStep {
                    kind: route.to_string(),
                    first: existing.name().to_string(),
                    second: step.name().to_string(),
                });
                continue;
            }
            steps.insert(route, step);
        }

        if !steps.contains_key(&Route::Start) {
            errors.push(RegistrationError::MissingStartStep {
                workflow: self.name.clone(),
            });
        }
        for kind in known {
            let route = Route::Step(*kind);
            if !steps.contains_key(&route) {
                errors.push(RegistrationError::MissingStep {
                    workflow: self.name.clone(),
                    kind: route.to_string(),
                });
            }
        }

        match errors.len() {
            0 => Ok(Workflow::new(
                self.name,
                StepRegistry { steps },
                self.schema,
                self.options,
            )),
            1 => Err(errors.remove(0)),
            _ => Err(RegistrationError::Multiple(errors)),
        }
    }
}

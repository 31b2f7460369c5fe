// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors detected while a workflow definition is being built.
//!
//! These never occur mid-run: `WorkflowBuilder::build` validates the whole
//! registration table and context-key declarations up front.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistrationError {
    /// Nothing consumes the initial `Start` event.
    #[error("Workflow '{workflow}' has no step registered for the start event")]
    MissingStartStep { workflow: String },

    /// A routable event kind has no consuming step.
    #[error("Workflow '{workflow}' has no step registered for event '{kind}'")]
    MissingStep { workflow: String, kind: String },

    /// Two steps were bound to the same event kind.
    #[error("Event '{kind}' is consumed by both '{first}' and '{second}'")]
    DuplicateStep {
        kind: String,
        first: String,
        second: String,
    },

    /// A step was bound to a kind the event type does not list.
    #[error("Step '{step}' is bound to '{kind}', which is not part of the workflow's event set")]
    UnknownEvent { kind: String, step: String },

    /// The same context key name was declared with two different value types.
    #[error("Context key '{key}' declared as both {first} and {second}")]
    ConflictingContextKey {
        key: &'static str,
        first: &'static str,
        second: &'static str,
    },

    /// More than one of the above.
    #[error("{}", join_errors(.0))]
    Multiple(Vec<RegistrationError>),
}

fn join_errors(errors: &[RegistrationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

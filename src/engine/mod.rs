// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod barrier;
pub mod cache;
pub mod context;
pub mod event;
pub mod handle;
pub mod registry;
pub mod scheduler;
pub mod workflow;

pub use barrier::{BarrierGroup, Barriers};
pub use cache::StageCache;
pub use context::{Context, ContextKey, ContextSchema};
pub use event::{Event, LogEvent, Payload, Route, StreamEvent};
pub use handle::{EventStream, RunHandle, RunState};
pub use registry::{StepRegistry, WorkflowBuilder};
pub use scheduler::StepContext;
pub use workflow::{Workflow, WorkflowOptions};

// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::engine::event::{Payload, StreamEvent};
use crate::errors::WorkflowError;

/// Lifecycle of one run. A handle exists only once the run has started, so
/// it reports `Running` from the moment `Workflow::run` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed | RunState::Cancelled)
    }
}

/// Consumer end of a run's progress events.
///
/// Yields `Log` events in emission order, then one terminal event, then
/// `None`. Once the run's cancellation token fires, queued `Log` events are
/// discarded and only the terminal event is delivered. Dropping the stream
/// does not affect the run.
pub struct EventStream {
    receiver: mpsc::Receiver<StreamEvent>,
    cancel: CancellationToken,
    finished: bool,
}

impl EventStream {
    pub async fn next(&mut self) -> Option<StreamEvent> {
        if self.finished {
            return None;
        }
        loop {
            let event = self.receiver.recv().await?;
            if event.is_terminal() {
                self.finished = true;
                return Some(event);
            }
            if !self.cancel.is_cancelled() {
                return Some(event);
            }
        }
    }

    /// Drain the stream to its terminal event.
    pub async fn collect(mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next().await {
            events.push(event);
        }
        events
    }
}

/// Caller-side handle of one in-flight run.
pub struct RunHandle<P: Payload> {
    run_id: Uuid,
    events: Option<EventStream>,
    cancel: CancellationToken,
    state: watch::Receiver<RunState>,
    outcome: oneshot::Receiver<Result<P::Output, WorkflowError>>,
}

impl<P: Payload> RunHandle<P> {
    pub(crate) fn new(
        run_id: Uuid,
        receiver: mpsc::Receiver<StreamEvent>,
        cancel: CancellationToken,
        state: watch::Receiver<RunState>,
        outcome: oneshot::Receiver<Result<P::Output, WorkflowError>>,
    ) -> Self {
        Self {
            run_id,
            events: Some(EventStream {
                receiver,
                cancel: cancel.clone(),
                finished: false,
            }),
            cancel,
            state,
            outcome,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Take the progress stream. Returns `None` if it was already taken.
    pub fn stream_events(&mut self) -> Option<EventStream> {
        self.events.take()
    }

    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    /// Request cancellation. The run ends as `WorkflowError::Cancelled`
    /// unless it already finished.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the run's final result.
    ///
    /// An untaken event stream is dropped first so that steps never block on
    /// an observer nobody is reading.
    pub async fn wait(mut self) -> Result<P::Output, WorkflowError> {
        self.events.take();
        self.outcome
            .await
            .map_err(|_| WorkflowError::Internal("run driver exited without an outcome".to_string()))?
    }
}

impl<P: Payload> std::fmt::Debug for RunHandle<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunHandle")
            .field("run_id", &self.run_id)
            .field("state", &self.state())
            .finish()
    }
}

// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The run scheduler: concurrent dispatch of events to steps.
//!
//! # Architecture Overview
//!
//! Each run owns one driver task and a set of step tasks:
//!
//! ```text
//!            ┌──────────── work queue (unbounded) ◄──────────┐
//!            ▼                                               │
//!   driver: dequeue ─► resolve step ─► spawn step task ─► send_event
//!            │                                               │
//!            └─ Stop: remember result                        └─► Log ─► event stream (bounded)
//! ```
//!
//! A shared in-flight counter covers both queued events and running step
//! tasks. It is incremented before an event is queued and decremented when
//! the driver consumes a `Stop` or reaps a finished task, so it reaches zero
//! only when nothing is left that could still emit. The run completes when
//! the counter is zero and a `Stop` has been seen; a `Stop` that arrives
//! while siblings are still running is held until they settle.
//!
//! # Failure and cancellation
//!
//! * A step error aborts the run: the abort token is cancelled, every sibling
//!   is dropped at its next suspension point, and the error is the run's
//!   only outcome.
//! * `RunHandle::cancel` and the run timeout cancel the run token. The abort
//!   token is its child, so steps stop the same way, and the event stream
//!   stops delivering `Log` events.
//! * A run that drains to zero without a `Stop` fails as `Stalled` instead of
//!   hanging.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch, Semaphore};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::engine::barrier::Barriers;
use crate::engine::context::{Context, ContextKey};
use crate::engine::event::{Event, LogEvent, Payload, StreamEvent};
use crate::engine::handle::{RunHandle, RunState};
use crate::engine::registry::StepRegistry;
use crate::engine::workflow::{Workflow, WorkflowOptions};
use crate::errors::WorkflowError;
use crate::observability::messages::barrier::{GroupOpened, GroupReleased};
use crate::observability::messages::engine::{
    ExtraStopIgnored, RunCancelled, RunCompleted, RunFailed, RunStalled, RunStarted,
    StepDispatched, StepFailed, StopBuffered,
};
use crate::observability::messages::StructuredLog;
use crate::traits::Step;

struct RunShared<P: Payload> {
    run_id: Uuid,
    queue: mpsc::UnboundedSender<Event<P>>,
    stream: mpsc::Sender<StreamEvent>,
    in_flight: AtomicUsize,
    context: Context,
    barriers: Barriers,
    abort: CancellationToken,
    verbose: bool,
}

/// What a step sees of its run.
pub struct StepContext<P: Payload> {
    shared: Arc<RunShared<P>>,
}

impl<P: Payload> Clone for StepContext<P> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<P: Payload> StepContext<P> {
    pub fn run_id(&self) -> Uuid {
        self.shared.run_id
    }

    pub fn context(&self) -> &Context {
        &self.shared.context
    }

    pub fn get<T: Send + Sync + 'static>(&self, key: &ContextKey<T>) -> Result<Arc<T>, WorkflowError> {
        self.shared.context.get(key)
    }

    pub fn set<T: Send + Sync + 'static>(&self, key: &ContextKey<T>, value: T) -> Result<(), WorkflowError> {
        self.shared.context.set(key, value)
    }

    pub fn is_verbose(&self) -> bool {
        self.shared.verbose
    }

    /// True once the run is being torn down, by failure, cancel or timeout.
    pub fn is_cancelled(&self) -> bool {
        self.shared.abort.is_cancelled()
    }

    /// Checkpoint for long steps between external calls.
    pub fn ensure_active(&self) -> Result<(), WorkflowError> {
        if self.is_cancelled() {
            Err(WorkflowError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.shared.abort.clone()
    }

    /// Declare how many results barrier group `id` waits for.
    ///
    /// Returns the collection when this call completes the group, which is
    /// always the case for `expected == 0`.
    pub fn open_group<R: Send + 'static>(
        &self,
        id: &str,
        expected: usize,
    ) -> Result<Option<Vec<R>>, WorkflowError> {
        tracing::debug!("{}", GroupOpened { group: id, expected });
        let released = self.shared.barriers.open_group(id, expected)?;
        if let Some(results) = &released {
            GroupReleased { group: id, count: results.len() }.log();
        }
        Ok(released)
    }

    /// Submit one result to barrier group `id`.
    pub fn submit<R: Send + 'static>(&self, id: &str, result: R) -> Result<Option<Vec<R>>, WorkflowError> {
        let released = self.shared.barriers.submit(id, result)?;
        if let Some(results) = &released {
            GroupReleased { group: id, count: results.len() }.log();
        }
        Ok(released)
    }

    /// Emit an event now, without waiting for the step to return.
    ///
    /// `Log` events go to the observer stream; everything else is queued for
    /// dispatch and may start running before the caller continues.
    pub async fn send_event(&self, event: Event<P>) -> Result<(), WorkflowError> {
        match event {
            Event::Log(log) => self.write_event_to_stream(log).await,
            event => {
                self.ensure_active()?;
                self.enqueue(event)
            }
        }
    }

    /// Push a progress event to the observer, waiting while the stream is full.
    ///
    /// A dropped observer is not an error; the run carries on.
    pub async fn write_event_to_stream(&self, log: LogEvent) -> Result<(), WorkflowError> {
        self.ensure_active()?;
        tokio::select! {
            biased;
            _ = self.shared.abort.cancelled() => Err(WorkflowError::Cancelled),
            sent = self.shared.stream.send(StreamEvent::Log(log)) => {
                if sent.is_err() {
                    tracing::trace!(run_id = %self.shared.run_id, "observer dropped; discarding log event");
                }
                Ok(())
            }
        }
    }

    pub async fn log(&self, message: impl Into<String>) -> Result<(), WorkflowError> {
        self.write_event_to_stream(LogEvent::line(message)).await
    }

    fn enqueue(&self, event: Event<P>) -> Result<(), WorkflowError> {
        self.shared.in_flight.fetch_add(1, Ordering::SeqCst);
        if self.shared.queue.send(event).is_err() {
            self.shared.in_flight.fetch_sub(1, Ordering::SeqCst);
            return Err(WorkflowError::Cancelled);
        }
        Ok(())
    }
}

pub(crate) fn start<P: Payload>(workflow: &Workflow<P>, input: P::Input) -> RunHandle<P> {
    let options = workflow.options().clone();
    let run_id = Uuid::new_v4();
    let (queue_tx, queue_rx) = mpsc::unbounded_channel();
    let (stream_tx, stream_rx) = mpsc::channel(options.stream_capacity.max(1));
    let (state_tx, state_rx) = watch::channel(RunState::Running);
    let (outcome_tx, outcome_rx) = oneshot::channel();
    let cancel = CancellationToken::new();

    let shared = Arc::new(RunShared {
        run_id,
        queue: queue_tx,
        stream: stream_tx,
        in_flight: AtomicUsize::new(0),
        context: Context::new(workflow.schema()),
        barriers: Barriers::new(),
        abort: cancel.child_token(),
        verbose: options.verbose,
    });

    let driver = Driver {
        workflow: workflow.name().to_string(),
        registry: workflow.registry_handle(),
        permits: Arc::new(Semaphore::new(options.max_concurrency.max(1))),
        options,
        shared,
        queue: queue_rx,
        tasks: JoinSet::new(),
        cancel: cancel.clone(),
        dispatched: 0,
    };
    tokio::spawn(driver.run(input, state_tx, outcome_tx));

    RunHandle::new(run_id, stream_rx, cancel, state_rx, outcome_rx)
}

type StepOutcome = (&'static str, Result<(), WorkflowError>);

struct Driver<P: Payload> {
    workflow: String,
    registry: Arc<StepRegistry<P>>,
    permits: Arc<Semaphore>,
    options: WorkflowOptions,
    shared: Arc<RunShared<P>>,
    queue: mpsc::UnboundedReceiver<Event<P>>,
    tasks: JoinSet<StepOutcome>,
    cancel: CancellationToken,
    dispatched: usize,
}

impl<P: Payload> Driver<P> {
    async fn run(
        mut self,
        input: P::Input,
        state: watch::Sender<RunState>,
        outcome: oneshot::Sender<Result<P::Output, WorkflowError>>,
    ) {
        let started = Instant::now();
        let run_id = self.shared.run_id.to_string();

        let start_msg = RunStarted {
            workflow: &self.workflow,
            run_id: &run_id,
            step_count: self.registry.len(),
            max_concurrency: self.options.max_concurrency,
        };
        start_msg.log();

        let ctx = StepContext {
            shared: Arc::clone(&self.shared),
        };
        let result = match ctx.enqueue(Event::Start(input)) {
            Ok(()) => self.event_loop(&ctx).await,
            Err(e) => Err(e),
        };
        drop(ctx);

        // Stop whatever is still running and wait for it to unwind.
        self.shared.abort.cancel();
        while self.tasks.join_next().await.is_some() {}

        let (final_state, terminal) = match &result {
            Ok(_) => {
                RunCompleted {
                    run_id: &run_id,
                    dispatched: self.dispatched,
                    duration: started.elapsed(),
                }
                .log();
                (RunState::Completed, StreamEvent::Completed)
            }
            Err(e) if e.is_cancellation() => {
                let timed_out = matches!(e, WorkflowError::TimedOut(_));
                tracing::warn!("{}", RunCancelled { run_id: &run_id, timed_out });
                (RunState::Cancelled, StreamEvent::Cancelled { timed_out })
            }
            Err(e) => {
                RunFailed { run_id: &run_id, error: e }.log();
                (
                    RunState::Failed,
                    StreamEvent::Failed {
                        error: e.to_string(),
                    },
                )
            }
        };

        let _ = state.send(final_state);
        let _ = outcome.send(result);
        let _ = self.shared.stream.send(terminal).await;
    }

    async fn event_loop(&mut self, ctx: &StepContext<P>) -> Result<P::Output, WorkflowError> {
        let mut stop: Option<P::Output> = None;
        let timeout = self.options.timeout;
        let deadline = async move {
            match timeout {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(deadline);

        loop {
            if self.shared.in_flight.load(Ordering::SeqCst) == 0 {
                return match stop.take() {
                    Some(output) => Ok(output),
                    None => {
                        let pending = self.shared.barriers.pending();
                        let run_id = self.shared.run_id.to_string();
                        tracing::warn!("{}", RunStalled { run_id: &run_id, pending: &pending });
                        Err(WorkflowError::Stalled { pending })
                    }
                };
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(WorkflowError::Cancelled),
                _ = &mut deadline => {
                    self.cancel.cancel();
                    return Err(WorkflowError::TimedOut(timeout.unwrap_or_default()));
                }
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    self.shared.in_flight.fetch_sub(1, Ordering::SeqCst);
                    match joined {
                        Ok((_, Ok(()))) => {}
                        Ok((step, Err(error))) => {
                            tracing::error!("{}", StepFailed { step, error: &error });
                            return Err(error);
                        }
                        Err(join_error) => {
                            return Err(WorkflowError::Internal(format!(
                                "step task did not complete: {}",
                                join_error
                            )));
                        }
                    }
                }
                Some(event) = self.queue.recv() => {
                    match event {
                        Event::Stop(output) => {
                            let remaining = self.shared.in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
                            if stop.is_some() {
                                let run_id = self.shared.run_id.to_string();
                                tracing::warn!("{}", ExtraStopIgnored { run_id: &run_id });
                            } else {
                                if remaining > 0 {
                                    tracing::debug!("{}", StopBuffered { in_flight: remaining });
                                }
                                stop = Some(output);
                            }
                        }
                        // Logs never enter the work queue.
                        Event::Log(_) => {
                            self.shared.in_flight.fetch_sub(1, Ordering::SeqCst);
                        }
                        event => self.dispatch(event, ctx)?,
                    }
                }
            }
        }
    }

    fn dispatch(&mut self, event: Event<P>, ctx: &StepContext<P>) -> Result<(), WorkflowError> {
        if self.cancel.is_cancelled() {
            return Err(WorkflowError::Cancelled);
        }
        let route = event
            .route()
            .ok_or_else(|| WorkflowError::Internal(format!("{} is not dispatchable", event.describe())))?;
        let step = self
            .registry
            .resolve(&route)
            .cloned()
            .ok_or_else(|| WorkflowError::Internal(format!("no step bound to {}", route)))?;

        self.dispatched += 1;
        tracing::debug!(
            "{}",
            StepDispatched {
                step: step.name(),
                event: &route.to_string(),
                in_flight: self.shared.in_flight.load(Ordering::SeqCst),
            }
        );

        let ctx = ctx.clone();
        let permits = Arc::clone(&self.permits);
        let abort = self.shared.abort.clone();
        self.tasks.spawn(async move {
            let name = step.name();
            let result = tokio::select! {
                biased;
                _ = abort.cancelled() => Err(WorkflowError::Cancelled),
                result = execute_step(step, ctx, event, permits) => result,
            };
            (name, result)
        });
        Ok(())
    }
}

async fn execute_step<P: Payload>(
    step: Arc<dyn Step<P>>,
    ctx: StepContext<P>,
    event: Event<P>,
    permits: Arc<Semaphore>,
) -> Result<(), WorkflowError> {
    let _permit = permits
        .acquire_owned()
        .await
        .map_err(|_| WorkflowError::Cancelled)?;
    let emitted = step.run(ctx.clone(), event).await?;
    for event in emitted {
        ctx.send_event(event).await?;
    }
    Ok(())
}

// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Events routed between workflow steps.
//!
//! A workflow's event set is closed: the engine owns the four structural
//! variants (`Start`, `Stop`, `Log` and the step-to-step carrier `Step`) and
//! the workflow supplies its intermediate events as a [`Payload`] enum. Each
//! payload variant maps to a [`Payload::Kind`], and the registry binds every
//! kind to exactly one consuming step when the workflow is built.

use std::fmt;
use std::hash::Hash;

/// The intermediate events of one workflow.
///
/// `kinds()` must list every value `kind()` can return; the workflow builder
/// uses it to prove every kind has a consumer before a run can start.
pub trait Payload: Send + 'static {
    /// Value carried by `Start`.
    type Input: Send + 'static;
    /// Value carried by `Stop`, returned from `RunHandle::wait`.
    type Output: Send + 'static;
    /// Fieldless discriminant used as the routing key.
    type Kind: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static;

    fn kind(&self) -> Self::Kind;

    fn kinds() -> &'static [Self::Kind];
}

/// Routing key of a dispatchable event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route<K> {
    Start,
    Step(K),
}

impl<K: fmt::Debug> fmt::Display for Route<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Start => write!(f, "Start"),
            Route::Step(kind) => write!(f, "{:?}", kind),
        }
    }
}

/// Progress message for the external observer. Never dispatched to a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub message: String,
    /// Incremental fragment of a longer message rather than a full line.
    pub delta: bool,
}

impl LogEvent {
    pub fn line(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            delta: false,
        }
    }

    pub fn delta(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            delta: true,
        }
    }
}

pub enum Event<P: Payload> {
    Start(P::Input),
    Step(P),
    Stop(P::Output),
    Log(LogEvent),
}

impl<P: Payload> Event<P> {
    pub fn log(message: impl Into<String>) -> Self {
        Event::Log(LogEvent::line(message))
    }

    /// The step route for dispatchable events; `None` for `Stop` and `Log`.
    pub fn route(&self) -> Option<Route<P::Kind>> {
        match self {
            Event::Start(_) => Some(Route::Start),
            Event::Step(payload) => Some(Route::Step(payload.kind())),
            Event::Stop(_) | Event::Log(_) => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Event::Start(_) => "Start".to_string(),
            Event::Step(payload) => format!("{:?}", payload.kind()),
            Event::Stop(_) => "Stop".to_string(),
            Event::Log(_) => "Log".to_string(),
        }
    }
}

impl<P: Payload> fmt::Debug for Event<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Log(log) => f.debug_tuple("Log").field(log).finish(),
            other => write!(f, "Event::{}", other.describe()),
        }
    }
}

/// What an observer receives from a run: its `Log` events in emission order,
/// then exactly one terminal notification.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Log(LogEvent),
    Completed,
    Failed { error: String },
    Cancelled { timed_out: bool },
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamEvent::Log(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    enum Probe {
        Ping,
        Pong,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum ProbeKind {
        Ping,
        Pong,
    }

    impl Payload for Probe {
        type Input = ();
        type Output = ();
        type Kind = ProbeKind;

        fn kind(&self) -> ProbeKind {
            match self {
                Probe::Ping => ProbeKind::Ping,
                Probe::Pong => ProbeKind::Pong,
            }
        }

        fn kinds() -> &'static [ProbeKind] {
            &[ProbeKind::Ping, ProbeKind::Pong]
        }
    }

    #[test]
    fn test_routes_only_dispatchable_events() {
        assert_eq!(Event::<Probe>::Start(()).route(), Some(Route::Start));
        assert_eq!(
            Event::Step(Probe::Pong).route(),
            Some(Route::Step(ProbeKind::Pong))
        );
        assert_eq!(Event::<Probe>::Stop(()).route(), None);
        assert_eq!(Event::<Probe>::log("hello").route(), None);
        assert_eq!(Event::Step(Probe::Ping).describe(), "Ping");
    }

    #[test]
    fn test_only_log_stream_events_are_non_terminal() {
        assert!(!StreamEvent::Log(LogEvent::delta("..")).is_terminal());
        assert!(StreamEvent::Completed.is_terminal());
        assert!(StreamEvent::Cancelled { timed_out: true }.is_terminal());
    }
}

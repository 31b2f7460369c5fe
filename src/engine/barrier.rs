// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Fan-in synchronization: wait for N results, release them exactly once.
//!
//! # Architecture Overview
//!
//! A fan-out step calls `open_group(id, n)` and emits N child events. Each
//! child's result is `submit`ted to the same group id. The two calls may
//! arrive in any order: results submitted before the group is opened are
//! buffered, and the group releases as soon as it knows its expected count
//! and holds that many results.
//!
//! Whichever call completes the group returns `Some(results)`; every other
//! call returns `None`. That caller alone emits the gathered event. Release is
//! guarded by a compare-and-set on an atomic flag, so two racing submitters
//! can never both observe the release.
//!
//! ```text
//!  open_group("g", 3)      submit r1     submit r2     submit r3
//!        │                     │             │             │
//!        ▼                     ▼             ▼             ▼
//!      None                  None          None     Some([r1, r2, r3])
//! ```
//!
//! A group opened with zero expected results releases immediately with an
//! empty collection. Submitting past the expected count, opening twice, or
//! submitting after release are reported as [`BarrierError`]s.
//!
//! # Example
//! ```
//! use caseflow::engine::BarrierGroup;
//!
//! let group = BarrierGroup::new("g1");
//! assert_eq!(group.submit("r1").unwrap(), None);
//! assert_eq!(group.submit("r2").unwrap(), None);
//! assert_eq!(group.open(2).unwrap(), Some(vec!["r1", "r2"]));
//! ```

use crate::errors::BarrierError;
use dashmap::DashMap;
use std::any::{type_name, Any};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

struct GroupState<R> {
    expected: Option<usize>,
    results: Vec<R>,
}

/// One fan-in group.
pub struct BarrierGroup<R> {
    id: String,
    state: Mutex<GroupState<R>>,
    received: AtomicUsize,
    released: AtomicBool,
}

impl<R> BarrierGroup<R> {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: Mutex::new(GroupState {
                expected: None,
                results: Vec::new(),
            }),
            received: AtomicUsize::new(0),
            released: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Set the expected count. Releases when enough results are already buffered.
    pub fn open(&self, expected: usize) -> Result<Option<Vec<R>>, BarrierError> {
        let mut state = self.lock();
        if let Some(first) = state.expected {
            return Err(BarrierError::AlreadyOpened {
                group: self.id.clone(),
                first,
                second: expected,
            });
        }
        state.expected = Some(expected);

        let received = self.received.load(Ordering::Acquire);
        if received > expected {
            return Err(BarrierError::Overflow {
                group: self.id.clone(),
                expected,
                received,
            });
        }
        Ok(self.try_release(&mut state, received, expected))
    }

    /// Add one result. Returns the full collection to the caller that completes the group.
    pub fn submit(&self, result: R) -> Result<Option<Vec<R>>, BarrierError> {
        let mut state = self.lock();
        if self.released.load(Ordering::Acquire) {
            return Err(BarrierError::SubmitAfterRelease {
                group: self.id.clone(),
            });
        }

        let received = self.received.fetch_add(1, Ordering::AcqRel) + 1;
        match state.expected {
            Some(expected) if received > expected => Err(BarrierError::Overflow {
                group: self.id.clone(),
                expected,
                received,
            }),
            Some(expected) => {
                state.results.push(result);
                Ok(self.try_release(&mut state, received, expected))
            }
            None => {
                state.results.push(result);
                Ok(None)
            }
        }
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    pub fn received(&self) -> usize {
        self.received.load(Ordering::Acquire)
    }

    pub fn expected(&self) -> Option<usize> {
        self.lock().expected
    }

    fn try_release(
        &self,
        state: &mut GroupState<R>,
        received: usize,
        expected: usize,
    ) -> Option<Vec<R>> {
        if received != expected {
            return None;
        }
        self.released
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| std::mem::take(&mut state.results))
    }

    fn lock(&self) -> MutexGuard<'_, GroupState<R>> {
        // A panic while holding the lock cannot leave the state half-written.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Type-erased view used to report groups still waiting when a run stalls.
trait PendingGroup: Send + Sync {
    fn describe_pending(&self) -> Option<String>;
    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<R: Send + 'static> PendingGroup for BarrierGroup<R> {
    fn describe_pending(&self) -> Option<String> {
        if self.is_released() {
            return None;
        }
        let expected = self
            .expected()
            .map(|n| n.to_string())
            .unwrap_or_else(|| "?".to_string());
        Some(format!("{} ({}/{})", self.id, self.received(), expected))
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// All barrier groups of one run, keyed by group id.
#[derive(Clone, Default)]
pub struct Barriers {
    groups: Arc<DashMap<String, Arc<dyn PendingGroup>>>,
}

impl Barriers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_group<R: Send + 'static>(
        &self,
        id: &str,
        expected: usize,
    ) -> Result<Option<Vec<R>>, BarrierError> {
        self.group::<R>(id)?.open(expected)
    }

    pub fn submit<R: Send + 'static>(
        &self,
        id: &str,
        result: R,
    ) -> Result<Option<Vec<R>>, BarrierError> {
        self.group::<R>(id)?.submit(result)
    }

    /// Groups that have not released yet, as `id (received/expected)`.
    pub fn pending(&self) -> Vec<String> {
        let mut pending: Vec<String> = self
            .groups
            .iter()
            .filter_map(|entry| entry.value().describe_pending())
            .collect();
        pending.sort();
        pending
    }

    fn group<R: Send + 'static>(&self, id: &str) -> Result<Arc<BarrierGroup<R>>, BarrierError> {
        let erased = self
            .groups
            .entry(id.to_string())
            .or_insert_with(|| -> Arc<dyn PendingGroup> { Arc::new(BarrierGroup::<R>::new(id)) })
            .value()
            .clone();
        erased
            .as_any()
            .downcast::<BarrierGroup<R>>()
            .map_err(|_| BarrierError::TypeMismatch {
                group: id.to_string(),
                expected: type_name::<R>(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every permutation of `items`.
    fn permutations(items: &[usize]) -> Vec<Vec<usize>> {
        if items.len() <= 1 {
            return vec![items.to_vec()];
        }
        let mut all = Vec::new();
        for i in 0..items.len() {
            let mut rest = items.to_vec();
            let head = rest.remove(i);
            for mut tail in permutations(&rest) {
                tail.insert(0, head);
                all.push(tail);
            }
        }
        all
    }

    #[test]
    fn test_releases_once_for_every_arrival_order() {
        // Position `n` in the order stands for the open_group call.
        for n in 0..=4usize {
            let calls: Vec<usize> = (0..=n).collect();
            for order in permutations(&calls) {
                let group = BarrierGroup::new("g");
                let mut releases = Vec::new();
                for call in order {
                    let released = if call == n {
                        group.open(n).unwrap()
                    } else {
                        group.submit(call).unwrap()
                    };
                    if let Some(results) = released {
                        releases.push(results);
                    }
                }
                assert_eq!(releases.len(), 1, "n={}", n);
                let mut results = releases.remove(0);
                results.sort();
                assert_eq!(results, (0..n).collect::<Vec<_>>());
            }
        }
    }

    #[test]
    fn test_open_after_buffered_submits_releases() {
        let group = BarrierGroup::new("g1");
        assert_eq!(group.submit("r1").unwrap(), None);
        assert_eq!(group.submit("r2").unwrap(), None);
        assert!(!group.is_released());
        assert_eq!(group.open(2).unwrap(), Some(vec!["r1", "r2"]));
        assert!(group.is_released());
    }

    #[test]
    fn test_zero_size_group_releases_empty() {
        let group: BarrierGroup<String> = BarrierGroup::new("empty");
        assert_eq!(group.open(0).unwrap(), Some(vec![]));
    }

    #[test]
    fn test_over_submission_is_an_error() {
        let group = BarrierGroup::new("g");
        group.submit(1).unwrap();
        group.submit(2).unwrap();
        match group.open(1) {
            Err(BarrierError::Overflow {
                expected: 1,
                received: 2,
                ..
            }) => {}
            other => panic!("Expected Overflow, got {:?}", other),
        }
    }

    #[test]
    fn test_submit_after_release_is_an_error() {
        let group = BarrierGroup::new("g");
        group.open(1).unwrap();
        assert_eq!(group.submit(1).unwrap(), Some(vec![1]));
        match group.submit(2) {
            Err(BarrierError::SubmitAfterRelease { group }) => assert_eq!(group, "g"),
            other => panic!("Expected SubmitAfterRelease, got {:?}", other),
        }
    }

    #[test]
    fn test_double_open_is_an_error() {
        let group: BarrierGroup<u8> = BarrierGroup::new("g");
        group.open(2).unwrap();
        assert!(matches!(
            group.open(3),
            Err(BarrierError::AlreadyOpened {
                first: 2,
                second: 3,
                ..
            })
        ));
    }

    #[test]
    fn test_registry_rejects_mismatched_result_type() {
        let barriers = Barriers::new();
        barriers.open_group::<u32>("g", 2).unwrap();
        assert!(matches!(
            barriers.submit::<&str>("g", "oops"),
            Err(BarrierError::TypeMismatch { .. })
        ));
        assert_eq!(barriers.pending(), vec!["g (0/2)".to_string()]);
    }

    #[test]
    fn test_concurrent_submits_release_exactly_once() {
        let barriers = Barriers::new();
        barriers.open_group::<usize>("g", 64).unwrap();

        let handles: Vec<_> = (0..64)
            .map(|i| {
                let barriers = barriers.clone();
                std::thread::spawn(move || barriers.submit::<usize>("g", i).unwrap())
            })
            .collect();

        let releases: Vec<Vec<usize>> = handles
            .into_iter()
            .filter_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].len(), 64);
        assert!(barriers.pending().is_empty());
    }
}

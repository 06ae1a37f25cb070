//! Priority schedule of pending internal events.
//!
//! A [`Scheduler`] holds at most one [`EventRecord`] per identifier and
//! answers two questions: "what is the next event time" and "which
//! identifiers are due at that time". The latter, the *imminent set*, is
//! extracted in bulk: all records sharing the minimal time are removed at
//! once, using exact equality on [`Time`] since models sharing a date are
//! simultaneous in DEVS semantics.
//!
//! The scheduler is generic over the identifier type so that the same
//! structure drives the [`Coordinator`](crate::coordinator::Coordinator)
//! (model identifiers), [`MultiComponent`](crate::multi_component::MultiComponent)
//! (component identifiers) and timed observation views.
//!
//! Imminent sets are returned as ordered sets so that callers iterate over
//! simultaneous identifiers in ascending order, never in a hash-dependent
//! order.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};
use std::fmt;

use thiserror::Error;

use crate::time::Time;

/// An immutable `(time, identifier)` association.
///
/// Records are ordered so that a [`BinaryHeap`] of records behaves as a
/// min-heap on time, ties being broken by ascending identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EventRecord<I> {
    /// Date of the event.
    pub time: Time,
    /// Owner of the event.
    pub id: I,
}

impl<I> EventRecord<I> {
    /// Creates a record.
    pub fn new(time: Time, id: I) -> Self {
        Self { time, id }
    }
}

impl<I: Ord> Ord for EventRecord<I> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so that the heap top is the earliest record.
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl<I: Ord> PartialOrd for EventRecord<I> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Error returned when an event cannot be scheduled.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SchedulingError<I: fmt::Debug> {
    /// The requested date precedes the date of the last extracted imminent
    /// set.
    #[error("event for {id:?} scheduled at t={time}, before the current time t={current}")]
    Past {
        /// Offending identifier.
        id: I,
        /// Requested date.
        time: Time,
        /// Current scheduler horizon.
        current: Time,
    },
    /// The requested date is `NaN`.
    #[error("event for {id:?} scheduled at an undefined (NaN) time")]
    NotANumber {
        /// Offending identifier.
        id: I,
    },
    /// The identifier already has a pending event.
    #[error("{id:?} already has a pending event at t={pending}")]
    Duplicate {
        /// Offending identifier.
        id: I,
        /// Date of the pending event.
        pending: Time,
    },
}

/// A schedule of internal events with bulk extraction of imminent sets.
#[derive(Clone)]
pub struct Scheduler<I> {
    heap: BinaryHeap<EventRecord<I>>,
    pending: BTreeMap<I, Time>,
    horizon: Time,
}

impl<I: Ord + Copy + fmt::Debug> Scheduler<I> {
    /// Creates an empty scheduler whose horizon is [`Time::ZERO`].
    pub fn new() -> Self {
        Self::starting_at(Time::ZERO)
    }

    /// Creates an empty scheduler that rejects events before `time`.
    pub fn starting_at(time: Time) -> Self {
        Self {
            heap: BinaryHeap::new(),
            pending: BTreeMap::new(),
            horizon: time,
        }
    }

    /// Adds an event for `id` at `time`.
    ///
    /// Scheduling at [`Time::INFINITY`] is a no-op: it means the identifier
    /// is passive.
    pub fn insert(&mut self, time: Time, id: I) -> Result<(), SchedulingError<I>> {
        if time.is_nan() {
            return Err(SchedulingError::NotANumber { id });
        }
        if time < self.horizon {
            return Err(SchedulingError::Past {
                id,
                time,
                current: self.horizon,
            });
        }
        if let Some(&pending) = self.pending.get(&id) {
            return Err(SchedulingError::Duplicate { id, pending });
        }
        if time.is_infinite() {
            return Ok(());
        }

        self.pending.insert(id, time);
        self.heap.push(EventRecord::new(time, id));

        Ok(())
    }

    /// Returns the earliest pending date, or [`Time::INFINITY`] if the
    /// schedule is empty.
    pub fn peek_next_time(&self) -> Time {
        self.heap.peek().map_or(Time::INFINITY, |r| r.time)
    }

    /// Returns, without removing them, all identifiers due at the earliest
    /// pending date.
    pub fn peek_imminent_set(&self) -> BTreeSet<I> {
        let next = self.peek_next_time();
        if next.is_infinite() {
            return BTreeSet::new();
        }

        self.heap
            .iter()
            .filter(|r| r.time == next)
            .map(|r| r.id)
            .collect()
    }

    /// Removes and returns all identifiers due at the earliest pending
    /// date.
    ///
    /// The scheduler horizon advances to that date.
    pub fn extract_imminent_set(&mut self) -> BTreeSet<I> {
        let mut imminent = BTreeSet::new();
        let Some(next) = self.heap.peek().map(|r| r.time) else {
            return imminent;
        };

        while let Some(record) = self.heap.peek() {
            if record.time != next {
                break;
            }
            let id = record.id;
            self.heap.pop();
            self.pending.remove(&id);
            imminent.insert(id);
        }
        self.horizon = next;

        imminent
    }

    /// Removes the pending event of `id`, if any.
    ///
    /// Returns the date of the removed event.
    pub fn remove(&mut self, id: I) -> Option<Time> {
        let time = self.pending.remove(&id)?;
        self.heap.retain(|r| r.id != id);

        Some(time)
    }

    /// Removes the pending events of all given identifiers.
    ///
    /// The heap is rebuilt once, in linear time.
    pub fn remove_all_for<'a, T>(&mut self, ids: T)
    where
        T: IntoIterator<Item = &'a I>,
        I: 'a,
    {
        let mut removed = BTreeSet::new();
        for id in ids {
            if self.pending.remove(id).is_some() {
                removed.insert(*id);
            }
        }
        if !removed.is_empty() {
            self.heap.retain(|r| !removed.contains(&r.id));
        }
    }

    /// Returns `true` if `id` has a pending event.
    pub fn contains(&self, id: I) -> bool {
        self.pending.contains_key(&id)
    }

    /// Returns the pending date of `id`.
    pub fn pending_time(&self, id: I) -> Option<Time> {
        self.pending.get(&id).copied()
    }

    /// Returns `true` if no event is pending.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Date of the last extracted imminent set, or the start date.
    pub fn horizon(&self) -> Time {
        self.horizon
    }

    /// Moves the horizon forward to `time`.
    ///
    /// Used when time advances for a reason unrelated to this schedule, for
    /// instance an external event. The horizon never moves backward.
    pub fn advance_to(&mut self, time: Time) {
        if time > self.horizon {
            self.horizon = time;
        }
    }

    /// Removes all pending events and resets the horizon.
    pub fn clear(&mut self, horizon: Time) {
        self.heap.clear();
        self.pending.clear();
        self.horizon = horizon;
    }
}

impl<I: Ord + Copy + fmt::Debug> Default for Scheduler<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Ord + Copy + fmt::Debug> fmt::Debug for Scheduler<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("next", &self.peek_next_time())
            .field("len", &self.len())
            .field("horizon", &self.horizon)
            .finish_non_exhaustive()
    }
}

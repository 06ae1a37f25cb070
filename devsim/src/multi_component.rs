//! Nested scheduling of homogeneous components.
//!
//! A [`MultiComponent`] is an atomic model which runs, inside its own
//! transitions, the same algorithm as the
//! [`Coordinator`](crate::coordinator::Coordinator) over a collection of
//! lightweight components described by a [`ModelList`]. Components share
//! one [`Scheduler`] and interact through *changes* rather than through a
//! connection graph:
//!
//! * the transitions of a component return a list of
//!   `(destination, change)` pairs,
//! * all changes addressed to the same destination during one transition of
//!   the `MultiComponent` are batched and applied with a single
//!   [`ModelList::react`] call,
//! * a component which reacted to changes has its pending event dropped and
//!   its time advance queried again, as if it had transitioned.
//!
//! Events received by the `MultiComponent` itself are dispatched to the
//! components returned by [`ModelList::influenced`]. Events emitted by
//! imminent components in [`ModelList::output`] become the output of the
//! `MultiComponent`.
//!
//! A `MultiComponent` resolves confluence component by component, so its
//! confluent policy is [`ConfluentPolicy::Custom`]: a component that is both
//! imminent and influenced receives a single
//! [`ModelList::confluent_transitions`] call with the events addressed to
//! it.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use thiserror::Error;
use tracing::trace;

use crate::event::{ExternalEvent, ExternalEventList, ObservationEvent};
use crate::model::{ConfluentPolicy, Context, Dynamics, DynamicsResult};
use crate::routing::model_external_event_list;
use crate::scheduler::{Scheduler, SchedulingError};
use crate::time::Time;
use crate::value::Value;

/// Index of a component within a [`ModelList`].
pub type ComponentId = u32;

/// Changes produced by a component transition, as `(destination, change)`
/// pairs.
pub type Changes<C> = Vec<(ComponentId, C)>;

/// Error raised by a [`MultiComponent`] on behalf of one of its components.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ComponentError {
    /// A component returned a negative or `NaN` time advance.
    #[error("component {component} returned an invalid time advance {duration} at t={time}")]
    InvalidTimeAdvance {
        /// Offending component.
        component: ComponentId,
        /// Simulation time.
        time: Time,
        /// Returned duration.
        duration: Time,
    },
    /// A change or an event was addressed to a component that does not
    /// exist.
    #[error("component {0} does not exist")]
    UnknownComponent(ComponentId),
    /// The component schedule is inconsistent.
    #[error(transparent)]
    Scheduling(#[from] SchedulingError<ComponentId>),
}

/// A collection of components managed by a [`MultiComponent`].
///
/// Components are identified by their index in `0..len()`.
pub trait ModelList: Send + 'static {
    /// Change exchanged between components.
    type Change: Send + 'static;

    /// Number of components.
    fn len(&self) -> usize;

    /// Returns `true` if the list has no component.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Initializes a component and returns the duration of its initial
    /// state.
    fn init(&mut self, id: ComponentId, time: Time, cx: &mut Context<'_>)
        -> DynamicsResult<Time>;

    /// Appends the events emitted by an imminent component.
    fn output(
        &self,
        id: ComponentId,
        time: Time,
        output: &mut ExternalEventList,
    ) -> DynamicsResult<()> {
        let _ = (id, time, output);
        Ok(())
    }

    /// Returns the duration of the current state of a component.
    fn time_advance(&self, id: ComponentId) -> Time;

    /// Applies the internal transition of a component.
    fn internal_transition(
        &mut self,
        id: ComponentId,
        time: Time,
        cx: &mut Context<'_>,
    ) -> DynamicsResult<Changes<Self::Change>>;

    /// Applies the events addressed to a component.
    fn external_transition(
        &mut self,
        id: ComponentId,
        events: &[ExternalEvent],
        time: Time,
        cx: &mut Context<'_>,
    ) -> DynamicsResult<Changes<Self::Change>>;

    /// Applies the internal transition and the events of a component which
    /// is both imminent and influenced.
    fn confluent_transitions(
        &mut self,
        id: ComponentId,
        time: Time,
        events: &[ExternalEvent],
        cx: &mut Context<'_>,
    ) -> DynamicsResult<Changes<Self::Change>>;

    /// Applies all changes addressed to a component during one step, as
    /// `(source, change)` pairs.
    fn react(
        &mut self,
        id: ComponentId,
        changes: &[(ComponentId, Self::Change)],
        cx: &mut Context<'_>,
    ) -> DynamicsResult<()>;

    /// Returns the components influenced by an event received by the
    /// `MultiComponent`.
    fn influenced(&self, event: &ExternalEvent) -> Vec<ComponentId>;

    /// Returns the observable value of a port.
    fn observation(&self, event: &ObservationEvent) -> Option<Value> {
        let _ = event;
        None
    }

    /// Releases the resources of a component.
    fn finish(&mut self, id: ComponentId) {
        let _ = id;
    }
}

/// An atomic model scheduling a [`ModelList`] internally.
pub struct MultiComponent<L: ModelList> {
    components: L,
    scheduler: Scheduler<ComponentId>,
    current: Time,
}

impl<L: ModelList> MultiComponent<L> {
    /// Wraps a list of components.
    pub fn new(components: L) -> Self {
        Self {
            components,
            scheduler: Scheduler::new(),
            current: Time::ZERO,
        }
    }

    /// The wrapped components.
    pub fn components(&self) -> &L {
        &self.components
    }

    /// Date of the next event of each scheduled component.
    pub fn pending(&self, id: ComponentId) -> Option<Time> {
        self.scheduler.pending_time(id)
    }

    fn count(&self) -> DynamicsResult<ComponentId> {
        ComponentId::try_from(self.components.len())
            .map_err(|_| anyhow::anyhow!("too many components"))
    }

    fn check(&self, id: ComponentId) -> Result<(), ComponentError> {
        if (id as usize) < self.components.len() {
            Ok(())
        } else {
            Err(ComponentError::UnknownComponent(id))
        }
    }

    /// Extracts the components due at the earliest pending date.
    ///
    /// The enclosing scheduler recomputes that date from the relative time
    /// advance, so `time` may differ from it by a rounding error; the
    /// imminent set is therefore taken without comparing dates.
    fn extract_imminent(&mut self, time: Time) -> BTreeSet<ComponentId> {
        let imminent = self.scheduler.extract_imminent_set();
        let local = if imminent.is_empty() {
            time
        } else {
            self.scheduler.horizon()
        };
        self.synchronize(local);

        imminent
    }

    /// Moves the local clock forward to `time`.
    ///
    /// The local clock never goes backward and never passes the date of a
    /// pending component event.
    fn synchronize(&mut self, time: Time) {
        let local = time.min(self.scheduler.peek_next_time());
        if local > self.current {
            self.current = local;
        }
        self.scheduler.advance_to(self.current);
    }

    /// Groups incoming events per influenced component and drops the
    /// pending events of these components.
    fn dispatch(
        &mut self,
        events: &[ExternalEvent],
    ) -> Result<BTreeMap<ComponentId, ExternalEventList>, ComponentError> {
        let components = &self.components;
        let map = model_external_event_list(events, |e| components.influenced(e));
        for &id in map.keys() {
            self.check(id)?;
        }
        self.scheduler.remove_all_for(map.keys());

        Ok(map)
    }

    /// Applies batched changes, one `react` call per destination.
    fn process_changes(
        &mut self,
        changes: BTreeMap<ComponentId, Vec<(ComponentId, L::Change)>>,
        touched: &mut BTreeSet<ComponentId>,
        cx: &mut Context<'_>,
    ) -> DynamicsResult<()> {
        for (id, batch) in changes {
            self.check(id)?;
            trace!(component = id, changes = batch.len(), "react");
            self.components.react(id, &batch, cx)?;
            self.scheduler.remove(id);
            touched.insert(id);
        }

        Ok(())
    }

    /// Schedules the next event of every component that transitioned or
    /// reacted.
    fn reschedule(&mut self, touched: BTreeSet<ComponentId>) -> DynamicsResult<()> {
        for id in touched {
            let duration = self.components.time_advance(id);
            self.schedule(id, duration)?;
        }

        Ok(())
    }

    fn schedule(&mut self, id: ComponentId, duration: Time) -> Result<(), ComponentError> {
        if !duration.is_valid_duration() {
            return Err(ComponentError::InvalidTimeAdvance {
                component: id,
                time: self.current,
                duration,
            });
        }
        self.scheduler.insert(self.current + duration, id)?;

        Ok(())
    }
}

fn push_changes<C>(
    changes: &mut BTreeMap<ComponentId, Vec<(ComponentId, C)>>,
    from: ComponentId,
    produced: Changes<C>,
) {
    for (to, change) in produced {
        changes.entry(to).or_default().push((from, change));
    }
}

impl<L: ModelList> Dynamics for MultiComponent<L> {
    fn init(&mut self, time: Time, cx: &mut Context<'_>) -> DynamicsResult<Time> {
        self.current = time;
        self.scheduler = Scheduler::starting_at(time);
        for id in 0..self.count()? {
            let duration = self.components.init(id, time, cx)?;
            self.schedule(id, duration)?;
        }

        Ok(self.scheduler.peek_next_time().duration_since(time))
    }

    fn output(&self, _: Time, output: &mut ExternalEventList) -> DynamicsResult<()> {
        let time = self.scheduler.peek_next_time();
        for id in self.scheduler.peek_imminent_set() {
            self.components.output(id, time, output)?;
        }

        Ok(())
    }

    fn time_advance(&self) -> Time {
        self.scheduler.peek_next_time().duration_since(self.current)
    }

    fn internal_transition(&mut self, time: Time, cx: &mut Context<'_>) -> DynamicsResult<()> {
        let imminent = self.extract_imminent(time);
        let time = self.current;

        let mut changes = BTreeMap::new();
        for &id in &imminent {
            let produced = self.components.internal_transition(id, time, cx)?;
            push_changes(&mut changes, id, produced);
        }

        let mut touched = imminent;
        self.process_changes(changes, &mut touched, cx)?;
        self.reschedule(touched)
    }

    fn external_transition(
        &mut self,
        events: &[ExternalEvent],
        time: Time,
        cx: &mut Context<'_>,
    ) -> DynamicsResult<()> {
        self.synchronize(time);
        let time = self.current;
        let map = self.dispatch(events)?;

        let mut changes = BTreeMap::new();
        let mut touched = BTreeSet::new();
        for (id, events) in map {
            let produced = self.components.external_transition(id, &events, time, cx)?;
            push_changes(&mut changes, id, produced);
            touched.insert(id);
        }

        self.process_changes(changes, &mut touched, cx)?;
        self.reschedule(touched)
    }

    fn confluent_policy(&self) -> ConfluentPolicy {
        ConfluentPolicy::Custom
    }

    fn confluent_transitions(
        &mut self,
        time: Time,
        events: &[ExternalEvent],
        cx: &mut Context<'_>,
    ) -> DynamicsResult<()> {
        let imminent = self.extract_imminent(time);
        let time = self.current;
        let mut map = self.dispatch(events)?;

        let mut changes = BTreeMap::new();
        for &id in &imminent {
            let produced = match map.remove(&id) {
                Some(own) => self.components.confluent_transitions(id, time, &own, cx)?,
                None => self.components.internal_transition(id, time, cx)?,
            };
            push_changes(&mut changes, id, produced);
        }

        let mut touched = imminent;
        for (id, events) in map {
            let produced = self.components.external_transition(id, &events, time, cx)?;
            push_changes(&mut changes, id, produced);
            touched.insert(id);
        }

        self.process_changes(changes, &mut touched, cx)?;
        self.reschedule(touched)
    }

    fn observation(&self, event: &ObservationEvent) -> Option<Value> {
        self.components.observation(event)
    }

    fn finish(&mut self) {
        for id in 0..self.components.len() {
            if let Ok(id) = ComponentId::try_from(id) {
                self.components.finish(id);
            }
        }
    }
}

impl<L: ModelList> fmt::Debug for MultiComponent<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiComponent")
            .field("components", &self.components.len())
            .field("scheduler", &self.scheduler)
            .field("current", &self.current)
            .finish()
    }
}

//! Atomic model behaviour.
//!
//! # The `Dynamics` trait
//!
//! An atomic model is defined by an implementation of the [`Dynamics`]
//! trait, which exposes the DEVS primitives:
//!
//! * [`init`](Dynamics::init): called once, returns the duration of the
//!   initial state,
//! * [`output`](Dynamics::output): called when the model is imminent, just
//!   before its internal or confluent transition; it must not mutate the
//!   model (hence the `&self` receiver),
//! * [`time_advance`](Dynamics::time_advance): duration of the current
//!   state, queried after every transition,
//! * [`internal_transition`](Dynamics::internal_transition),
//!   [`external_transition`](Dynamics::external_transition) and
//!   [`confluent_transitions`](Dynamics::confluent_transitions): state
//!   changes triggered respectively by the model's own schedule, by incoming
//!   events, or by both at the same date,
//! * [`observation`](Dynamics::observation): a pure query of the observable
//!   value of a port,
//! * [`finish`](Dynamics::finish): end-of-simulation clean-up.
//!
//! Every method has a default implementation describing a passive model,
//! except for the confluent policy which each model must state explicitly
//! through [`Dynamics::confluent_policy`]. A model that keeps the
//! [`ConfluentPolicy::Unspecified`] default is rejected when attached.
//!
//! ```
//! use devsim::event::{ExternalEvent, ExternalEventList};
//! use devsim::model::{ConfluentPolicy, Context, Dynamics, DynamicsResult};
//! use devsim::time::Time;
//!
//! /// Emits an event on port `out` every `period`.
//! struct Beacon {
//!     period: f64,
//! }
//!
//! impl Dynamics for Beacon {
//!     fn init(&mut self, _time: Time, _cx: &mut Context<'_>) -> DynamicsResult<Time> {
//!         Ok(Time::new(self.period))
//!     }
//!     fn output(&self, _time: Time, output: &mut ExternalEventList) -> DynamicsResult<()> {
//!         output.push(ExternalEvent::new("out"));
//!         Ok(())
//!     }
//!     fn time_advance(&self) -> Time {
//!         Time::new(self.period)
//!     }
//!     fn confluent_policy(&self) -> ConfluentPolicy {
//!         ConfluentPolicy::InternalFirst
//!     }
//! }
//! ```
//!
//! # Context
//!
//! Mutating methods receive a [`Context`] giving access to the current
//! time, the identity of the model, the random number generator of the run
//! and, for executive models only, the [`StructureChanges`] used to alter
//! the model graph.

use std::collections::BTreeMap;
use std::fmt;

use anyhow::anyhow;
use rand_chacha::ChaCha8Rng;

use crate::event::{ExternalEvent, ExternalEventList, ObservationEvent};
use crate::executive::StructureChanges;
use crate::time::Time;
use crate::value::Value;

/// Result type returned by model code.
///
/// Any error type can be propagated with `?`; the kernel attaches the model
/// identity and the simulation time before surfacing it.
pub type DynamicsResult<T> = anyhow::Result<T>;

/// Random number generator lent to models, seeded once per simulation run.
pub type SimRng = ChaCha8Rng;

/// Unique identifier of an atomic model within one coordinator.
///
/// Identifiers are allocated from a monotonic counter and are never reused
/// within a coordinator, even after the model is detached.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModelId(u64);

impl ModelId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw index.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a model resolves an internal event and external events occurring
/// at the same date.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConfluentPolicy {
    /// No policy was stated; the model cannot be attached.
    #[default]
    Unspecified,
    /// Internal transition, then external transition.
    InternalFirst,
    /// External transition, then internal transition.
    ExternalFirst,
    /// The model overrides [`Dynamics::confluent_transitions`].
    Custom,
}

/// The behaviour of an atomic model.
pub trait Dynamics: Send + 'static {
    /// Initializes the model and returns the duration of its initial state.
    fn init(&mut self, time: Time, cx: &mut Context<'_>) -> DynamicsResult<Time> {
        let _ = (time, cx);
        Ok(Time::INFINITY)
    }

    /// Appends the events emitted by the model at `time`.
    fn output(&self, time: Time, output: &mut ExternalEventList) -> DynamicsResult<()> {
        let _ = (time, output);
        Ok(())
    }

    /// Returns the duration of the current state.
    fn time_advance(&self) -> Time {
        Time::INFINITY
    }

    /// Applies the state change scheduled at `time`.
    fn internal_transition(&mut self, time: Time, cx: &mut Context<'_>) -> DynamicsResult<()> {
        let _ = (time, cx);
        Ok(())
    }

    /// Applies the events received at `time`.
    fn external_transition(
        &mut self,
        events: &[ExternalEvent],
        time: Time,
        cx: &mut Context<'_>,
    ) -> DynamicsResult<()> {
        let _ = (events, time, cx);
        Ok(())
    }

    /// States how [`Dynamics::confluent_transitions`] orders the internal and
    /// external transitions.
    fn confluent_policy(&self) -> ConfluentPolicy {
        ConfluentPolicy::Unspecified
    }

    /// Applies a scheduled state change and received events occurring at
    /// the same `time`.
    ///
    /// The default implementation sequences the internal and external
    /// transitions according to [`Dynamics::confluent_policy`].
    fn confluent_transitions(
        &mut self,
        time: Time,
        events: &[ExternalEvent],
        cx: &mut Context<'_>,
    ) -> DynamicsResult<()> {
        match self.confluent_policy() {
            ConfluentPolicy::InternalFirst => {
                self.internal_transition(time, cx)?;
                self.external_transition(events, time, cx)
            }
            ConfluentPolicy::ExternalFirst => {
                self.external_transition(events, time, cx)?;
                self.internal_transition(time, cx)
            }
            ConfluentPolicy::Custom => Err(anyhow!(
                "custom confluent policy declared without a confluent_transitions implementation"
            )),
            ConfluentPolicy::Unspecified => Err(anyhow!("no confluent policy specified")),
        }
    }

    /// Returns the observable value of a port, if any.
    fn observation(&self, event: &ObservationEvent) -> Option<Value> {
        let _ = event;
        None
    }

    /// Releases resources at the end of the simulation.
    fn finish(&mut self) {}
}

/// Per-call environment handed to mutating [`Dynamics`] methods.
pub struct Context<'a> {
    time: Time,
    model: ModelId,
    name: &'a str,
    rng: &'a mut SimRng,
    structure: Option<&'a mut StructureChanges>,
}

impl<'a> Context<'a> {
    /// Creates a context for a non-executive model.
    ///
    /// This is mostly useful to unit-test a [`Dynamics`] implementation
    /// outside of a coordinator.
    pub fn new(time: Time, model: ModelId, name: &'a str, rng: &'a mut SimRng) -> Self {
        Self {
            time,
            model,
            name,
            rng,
            structure: None,
        }
    }

    pub(crate) fn with_structure(mut self, structure: Option<&'a mut StructureChanges>) -> Self {
        self.structure = structure;
        self
    }

    /// Current simulation time.
    pub fn time(&self) -> Time {
        self.time
    }

    /// Identifier of the model being called.
    pub fn model(&self) -> ModelId {
        self.model
    }

    /// Name of the model being called.
    pub fn name(&self) -> &str {
        self.name
    }

    /// Random number generator of the simulation run.
    pub fn rng(&mut self) -> &mut SimRng {
        self.rng
    }

    /// Returns `true` if the model was attached as an executive.
    pub fn is_executive(&self) -> bool {
        self.structure.is_some()
    }

    /// Structural changes available to executive models.
    ///
    /// Returns `None` for regular models.
    pub fn executive(&mut self) -> Option<&mut StructureChanges> {
        self.structure.as_deref_mut()
    }
}

impl fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("time", &self.time)
            .field("model", &self.model)
            .field("name", &self.name)
            .field("executive", &self.structure.is_some())
            .finish_non_exhaustive()
    }
}

/// The configuration handed to a [`DynamicsFactory`] for one atomic model.
#[derive(Clone, Copy, Debug)]
pub struct DynamicsInit<'a> {
    /// Name of the atomic model.
    pub model: &'a str,
    /// Name of the dynamics to instantiate.
    pub dynamics: &'a str,
    /// Names of the initial conditions of the model.
    pub conditions: &'a [String],
    /// Values of the initial conditions, merged in the order of
    /// `conditions`.
    pub parameters: &'a BTreeMap<String, Value>,
    /// Name of the observable set of the model, if any.
    pub observable: Option<&'a str>,
}

impl DynamicsInit<'_> {
    /// Looks up an initial condition value.
    pub fn parameter(&self, key: &str) -> Option<&Value> {
        self.parameters.get(key)
    }

    /// Looks up a numeric initial condition value.
    pub fn parameter_f64(&self, key: &str) -> DynamicsResult<f64> {
        self.parameter(key)
            .and_then(Value::as_double)
            .ok_or_else(|| anyhow!("model '{}': missing numeric parameter '{}'", self.model, key))
    }
}

/// Builds the [`Dynamics`] of atomic models.
pub trait DynamicsFactory {
    /// Instantiates the dynamics described by `init`.
    fn build(&self, init: &DynamicsInit<'_>) -> DynamicsResult<Box<dyn Dynamics>>;
}

impl<F> DynamicsFactory for F
where
    F: Fn(&DynamicsInit<'_>) -> DynamicsResult<Box<dyn Dynamics>>,
{
    fn build(&self, init: &DynamicsInit<'_>) -> DynamicsResult<Box<dyn Dynamics>> {
        self(init)
    }
}

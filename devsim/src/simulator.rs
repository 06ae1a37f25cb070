//! Atomic model simulators.
//!
//! A [`Simulator`] wraps the [`Dynamics`] of one atomic model. It forwards
//! the DEVS primitives to the model, validates the durations returned by
//! the model, attaches the model identity to any error and tracks the
//! lifecycle of the model:
//!
//! ```text
//! Created ─init─► Idle ─output─► Imminent ─internal/confluent─► Idle
//!                  │                                           ▲
//!                  └──────────────external─────────────────────┘
//!
//! any phase except Finished ─finish─► Finished
//! ```
//!
//! Calling an operation in the wrong phase is reported as a
//! [`ConsistencyError`]: it can only result from a kernel bug.

use std::fmt;

use tracing::{debug_span, trace};

use crate::error::{ConsistencyError, ModelingError, SimulationError};
use crate::event::{ExternalEvent, ExternalEventList, ObservationEvent};
use crate::executive::StructureChanges;
use crate::model::{ConfluentPolicy, Context, Dynamics, ModelId, SimRng};
use crate::time::Time;
use crate::value::Value;

/// Lifecycle phase of a simulator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Attached but not yet initialized.
    Created,
    /// Waiting for its next event.
    Idle,
    /// Its output was computed and an internal or confluent transition is
    /// expected.
    Imminent,
    /// A transition is in progress.
    Transitioning,
    /// Terminated; no operation is valid anymore.
    Finished,
}

impl Phase {
    fn as_str(self) -> &'static str {
        match self {
            Phase::Created => "created",
            Phase::Idle => "idle",
            Phase::Imminent => "imminent",
            Phase::Transitioning => "transitioning",
            Phase::Finished => "finished",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The simulator of one atomic model.
pub struct Simulator {
    id: ModelId,
    name: String,
    dynamics: Box<dyn Dynamics>,
    executive: bool,
    phase: Phase,
    last_time: Time,
}

impl Simulator {
    pub(crate) fn new(
        id: ModelId,
        name: String,
        dynamics: Box<dyn Dynamics>,
        executive: bool,
    ) -> Self {
        Self {
            id,
            name,
            dynamics,
            executive,
            phase: Phase::Created,
            last_time: Time::ZERO,
        }
    }

    /// Identifier of the model.
    pub fn id(&self) -> ModelId {
        self.id
    }

    /// Name of the model.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` if the model was attached as an executive.
    pub fn is_executive(&self) -> bool {
        self.executive
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Date of the last initialization or transition.
    pub fn last_time(&self) -> Time {
        self.last_time
    }

    /// Confluent policy declared by the model.
    pub fn confluent_policy(&self) -> ConfluentPolicy {
        self.dynamics.confluent_policy()
    }

    /// Initializes the model and returns the duration of its initial state.
    pub(crate) fn init(
        &mut self,
        time: Time,
        rng: &mut SimRng,
        structure: Option<&mut StructureChanges>,
    ) -> Result<Time, SimulationError> {
        self.expect_phase("init", &[Phase::Created])?;
        let _span = debug_span!("dynamics", model = %self.id, name = %self.name, %time, op = "init")
            .entered();

        let mut cx = Context::new(time, self.id, &self.name, rng).with_structure(structure);
        let duration = self
            .dynamics
            .init(time, &mut cx)
            .map_err(|e| self.transition_error(time, "init", e))?;

        let duration = self.validate(time, duration)?;
        self.last_time = time;
        self.phase = Phase::Idle;

        Ok(duration)
    }

    /// Appends the output events of the imminent model.
    pub(crate) fn output(
        &mut self,
        time: Time,
        output: &mut ExternalEventList,
    ) -> Result<(), SimulationError> {
        self.expect_phase("output", &[Phase::Idle])?;
        let _span =
            debug_span!("dynamics", model = %self.id, name = %self.name, %time, op = "output")
                .entered();

        self.dynamics
            .output(time, output)
            .map_err(|e| self.transition_error(time, "output", e))?;
        self.phase = Phase::Imminent;

        Ok(())
    }

    /// Returns the validated duration of the current state.
    pub(crate) fn time_advance(&self, time: Time) -> Result<Time, SimulationError> {
        self.expect_phase("time_advance", &[Phase::Idle])?;

        self.validate(time, self.dynamics.time_advance())
    }

    /// Applies the internal transition of an imminent model.
    pub(crate) fn internal_transition(
        &mut self,
        time: Time,
        rng: &mut SimRng,
        structure: Option<&mut StructureChanges>,
    ) -> Result<(), SimulationError> {
        self.expect_phase("internal_transition", &[Phase::Imminent])?;
        let _span = debug_span!("dynamics", model = %self.id, name = %self.name, %time, op = "internal")
            .entered();
        trace!("internal transition");

        self.phase = Phase::Transitioning;
        let mut cx = Context::new(time, self.id, &self.name, rng).with_structure(structure);
        let result = self.dynamics.internal_transition(time, &mut cx);
        self.complete(time, "internal_transition", result)
    }

    /// Applies the external transition of a non-imminent model.
    pub(crate) fn external_transition(
        &mut self,
        events: &[ExternalEvent],
        time: Time,
        rng: &mut SimRng,
        structure: Option<&mut StructureChanges>,
    ) -> Result<(), SimulationError> {
        self.expect_phase("external_transition", &[Phase::Idle])?;
        let _span = debug_span!("dynamics", model = %self.id, name = %self.name, %time, op = "external")
            .entered();
        trace!(events = events.len(), "external transition");

        self.phase = Phase::Transitioning;
        let mut cx = Context::new(time, self.id, &self.name, rng).with_structure(structure);
        let result = self.dynamics.external_transition(events, time, &mut cx);
        self.complete(time, "external_transition", result)
    }

    /// Applies the confluent transitions of an imminent model that also
    /// received events.
    pub(crate) fn confluent_transitions(
        &mut self,
        time: Time,
        events: &[ExternalEvent],
        rng: &mut SimRng,
        structure: Option<&mut StructureChanges>,
    ) -> Result<(), SimulationError> {
        self.expect_phase("confluent_transitions", &[Phase::Imminent])?;
        let _span = debug_span!("dynamics", model = %self.id, name = %self.name, %time, op = "confluent")
            .entered();
        trace!(events = events.len(), "confluent transitions");

        self.phase = Phase::Transitioning;
        let mut cx = Context::new(time, self.id, &self.name, rng).with_structure(structure);
        let result = self.dynamics.confluent_transitions(time, events, &mut cx);
        self.complete(time, "confluent_transitions", result)
    }

    /// Queries the observable value of a port.
    pub(crate) fn observation(
        &self,
        event: &ObservationEvent,
    ) -> Result<Option<Value>, SimulationError> {
        self.expect_phase(
            "observation",
            &[Phase::Created, Phase::Idle, Phase::Imminent],
        )?;

        Ok(self.dynamics.observation(event))
    }

    /// Terminates the model.
    pub(crate) fn finish(&mut self) -> Result<(), SimulationError> {
        self.expect_phase(
            "finish",
            &[Phase::Created, Phase::Idle, Phase::Imminent],
        )?;
        let _span = debug_span!("dynamics", model = %self.id, name = %self.name, op = "finish")
            .entered();

        self.dynamics.finish();
        self.phase = Phase::Finished;

        Ok(())
    }

    fn complete(
        &mut self,
        time: Time,
        operation: &'static str,
        result: anyhow::Result<()>,
    ) -> Result<(), SimulationError> {
        result.map_err(|e| self.transition_error(time, operation, e))?;
        self.last_time = time;
        self.phase = Phase::Idle;

        Ok(())
    }

    fn validate(&self, time: Time, duration: Time) -> Result<Time, SimulationError> {
        if duration.is_valid_duration() {
            Ok(duration)
        } else {
            Err(ModelingError::InvalidTimeAdvance {
                model: self.id,
                name: self.name.clone(),
                time,
                duration,
            }
            .into())
        }
    }

    fn expect_phase(&self, operation: &'static str, allowed: &[Phase]) -> Result<(), SimulationError> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(ConsistencyError::InvalidPhase {
                model: self.id,
                operation,
                phase: self.phase.as_str(),
            }
            .into())
        }
    }

    fn transition_error(
        &self,
        time: Time,
        operation: &'static str,
        source: anyhow::Error,
    ) -> SimulationError {
        SimulationError::Transition {
            model: self.id,
            name: self.name.clone(),
            time,
            operation,
            source: source.into(),
        }
    }
}

impl fmt::Debug for Simulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulator")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("executive", &self.executive)
            .field("phase", &self.phase)
            .field("last_time", &self.last_time)
            .finish_non_exhaustive()
    }
}

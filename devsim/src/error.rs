//! Simulation errors.
//!
//! [`SimulationError`] is the only error type surfaced by the
//! [`Coordinator`](crate::coordinator::Coordinator) and by
//! [`SimInit`](crate::simulation::SimInit). Its variants distinguish
//! mistakes in model code ([`ModelingError`], [`SimulationError::Transition`]),
//! broken kernel invariants ([`ConsistencyError`]) and bench assembly
//! problems ([`ConfigurationError`]).

use std::error::Error;

use thiserror::Error;

use crate::model::ModelId;
use crate::time::Time;

/// A model produced a semantically invalid result.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ModelingError {
    /// `init` or `time_advance` returned a negative or `NaN` duration.
    #[error("model '{name}' ({model}) returned an invalid time advance {duration} at t={time}")]
    InvalidTimeAdvance {
        /// Offending model.
        model: ModelId,
        /// Name of the offending model.
        name: String,
        /// Simulation time.
        time: Time,
        /// Returned duration.
        duration: Time,
    },
    /// A structural change referenced a model name that does not exist.
    #[error("model '{name}' ({model}) referenced unknown model '{target}' at t={time}")]
    UnknownTarget {
        /// Offending model.
        model: ModelId,
        /// Name of the offending model.
        name: String,
        /// Simulation time.
        time: Time,
        /// Unknown name.
        target: String,
    },
    /// A structural change tried to create a model under a name in use.
    #[error("model '{name}' ({model}) tried to create duplicate model '{target}' at t={time}")]
    DuplicateName {
        /// Offending model.
        model: ModelId,
        /// Name of the offending model.
        name: String,
        /// Simulation time.
        time: Time,
        /// Name already in use.
        target: String,
    },
}

/// A kernel invariant was violated.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConsistencyError {
    /// A model was scheduled twice.
    #[error("model {model} already has a pending event at t={pending}")]
    DuplicateEntry {
        /// Model identifier.
        model: ModelId,
        /// Date of the pending entry.
        pending: Time,
    },
    /// A model is both imminent and pending.
    #[error("imminent model {model} still has a pending event at t={pending}")]
    ImminentOverlap {
        /// Model identifier.
        model: ModelId,
        /// Date of the leftover entry.
        pending: Time,
    },
    /// A simulator operation was called in the wrong phase.
    #[error("cannot call '{operation}' on model {model} in phase {phase}")]
    InvalidPhase {
        /// Model identifier.
        model: ModelId,
        /// Requested operation.
        operation: &'static str,
        /// Current phase.
        phase: &'static str,
    },
}

/// The bench could not be assembled.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConfigurationError {
    /// Two models share the same name.
    #[error("duplicate model name '{0}'")]
    DuplicateModel(String),
    /// No model is registered under this name.
    #[error("unknown model '{0}'")]
    UnknownModel(String),
    /// No model has this identifier.
    #[error("unknown model identifier {0}")]
    UnknownModelId(ModelId),
    /// No view is registered under this name.
    #[error("unknown view '{0}'")]
    UnknownView(String),
    /// Two views share the same name.
    #[error("duplicate view name '{0}'")]
    DuplicateView(String),
    /// No dynamics is registered under this name.
    #[error("unknown dynamics '{0}'")]
    UnknownDynamics(String),
    /// Two dynamics constructors share the same name.
    #[error("duplicate dynamics name '{0}'")]
    DuplicateDynamics(String),
    /// The dynamics factory failed to build a model.
    #[error("could not build dynamics '{dynamics}' for model '{model}': {message}")]
    Factory {
        /// Name of the model.
        model: String,
        /// Name of the dynamics.
        dynamics: String,
        /// Error message of the factory.
        message: String,
    },
    /// The model does not state a confluent policy.
    #[error("model '{0}' does not specify a confluent policy")]
    UnspecifiedConfluentPolicy(String),
    /// The period of a timed view is not a positive finite duration.
    #[error("view '{view}' has an invalid time step {step}")]
    InvalidTimeStep {
        /// Name of the view.
        view: String,
        /// Requested step.
        step: Time,
    },
    /// A model refers to a condition set which is not defined.
    #[error("unknown condition '{0}'")]
    UnknownCondition(String),
    /// A view of the configuration has no sink.
    #[error("no observation sink provided for view '{0}'")]
    MissingSink(String),
    /// The requested date is not valid.
    #[error("invalid simulation time {0}")]
    InvalidTime(Time),
}

/// An error returned by the simulation kernel.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// A model produced an invalid result.
    #[error(transparent)]
    Modeling(#[from] ModelingError),
    /// A kernel invariant was violated.
    #[error(transparent)]
    Consistency(#[from] ConsistencyError),
    /// The bench could not be assembled.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    /// A method of a model's dynamics returned an error.
    #[error("model '{name}' ({model}) failed in '{operation}' at t={time}")]
    Transition {
        /// Offending model.
        model: ModelId,
        /// Name of the offending model.
        name: String,
        /// Simulation time.
        time: Time,
        /// Name of the failed operation.
        operation: &'static str,
        /// Error returned by the model.
        #[source]
        source: Box<dyn Error + Send + Sync + 'static>,
    },
    /// The coordinator was stepped before being initialized.
    #[error("the simulation has not been initialized")]
    NotInitialized,
    /// The coordinator was initialized twice.
    #[error("the simulation is already initialized")]
    AlreadyInitialized,
    /// The coordinator was used after `finish`.
    #[error("the simulation has already finished")]
    Finished,
    /// A previous step failed and the run can no longer proceed.
    #[error("the simulation was aborted by a previous error")]
    Aborted,
    /// The simulation was stopped by a [`HaltHandle`](crate::coordinator::HaltHandle).
    #[error("the simulation was halted")]
    Halted,
}

impl SimulationError {
    /// Returns the model the error originates from, if any.
    pub fn model(&self) -> Option<ModelId> {
        match self {
            Self::Modeling(ModelingError::InvalidTimeAdvance { model, .. })
            | Self::Modeling(ModelingError::UnknownTarget { model, .. })
            | Self::Modeling(ModelingError::DuplicateName { model, .. })
            | Self::Consistency(ConsistencyError::DuplicateEntry { model, .. })
            | Self::Consistency(ConsistencyError::ImminentOverlap { model, .. })
            | Self::Consistency(ConsistencyError::InvalidPhase { model, .. })
            | Self::Transition { model, .. } => Some(*model),
            _ => None,
        }
    }
}

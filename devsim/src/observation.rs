//! Observation of model state.
//!
//! Model state is observed through *views*. A view has a name, a
//! [`ViewKind`] deciding when it observes, a set of observed
//! `(model, port)` pairs and an [`ObservationSink`] receiving the resulting
//! [`Observation`] records:
//!
//! * a [`ViewKind::Timed`] view observes all its ports at the start of the
//!   simulation and then periodically; an observation due at a date where
//!   models still have events is deferred until all these events have been
//!   processed,
//! * a [`ViewKind::Event`] view observes a model right after its
//!   initialization and after each of its transitions,
//! * a [`ViewKind::Finish`] view observes all its ports once, when the
//!   simulation finishes.
//!
//! Delivery to sinks is best-effort: a [`SinkError`] is logged and never
//! interrupts the simulation.
//!
//! Two sinks are provided:
//!
//! * [`ObservationBuffer`], a shared in-memory buffer which can be read while
//!   or after the simulation runs,
//! * [`ObservationQueue`], a blocking queue whose reader is meant to be
//!   consumed from another thread.

mod buffer;
mod queue;
pub(crate) mod view;

use thiserror::Error;

use crate::model::ModelId;
use crate::time::Time;
use crate::value::Value;

pub use buffer::ObservationBuffer;
pub use queue::{ObservationQueue, ObservationQueueReader, ObservationQueueWriter};

/// When a view observes its ports.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ViewKind {
    /// Periodically, every `step`.
    Timed {
        /// Observation period; must be positive and finite.
        step: Time,
    },
    /// After the initialization and after each transition of a model.
    Event,
    /// Once, when the simulation finishes.
    Finish,
}

/// The value of a model port seen by a view at a given date.
#[derive(Clone, Debug, PartialEq)]
pub struct Observation {
    /// Name of the view.
    pub view: String,
    /// Observed model.
    pub model: ModelId,
    /// Name of the observed model.
    pub model_name: String,
    /// Observed port.
    pub port: String,
    /// Date of the observation.
    pub time: Time,
    /// Observed value, or `None` if the model does not expose this port.
    pub value: Option<Value>,
}

/// An error reported by an [`ObservationSink`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("observation sink failure: {0}")]
pub struct SinkError(pub String);

impl SinkError {
    /// Creates a sink error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A receiver of observations.
pub trait ObservationSink: Send + 'static {
    /// Receives one observation.
    fn push(&mut self, observation: &Observation) -> Result<(), SinkError>;

    /// Called once when the simulation finishes.
    fn close(&mut self) {}
}

impl<S: ObservationSink + ?Sized> ObservationSink for Box<S> {
    fn push(&mut self, observation: &Observation) -> Result<(), SinkError> {
        (**self).push(observation)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

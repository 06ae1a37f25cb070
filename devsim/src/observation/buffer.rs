use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{Observation, ObservationSink, SinkError};

/// A shared in-memory buffer of observations.
///
/// Clones share the same storage: one clone is handed to the simulation as
/// a sink while another is kept to read the observations.
#[derive(Clone, Default)]
pub struct ObservationBuffer {
    inner: Arc<Mutex<VecDeque<Observation>>>,
}

impl ObservationBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns the oldest observation.
    pub fn pop(&self) -> Option<Observation> {
        self.lock().pop_front()
    }

    /// Removes and returns all buffered observations.
    pub fn take(&self) -> Vec<Observation> {
        self.lock().drain(..).collect()
    }

    /// Number of buffered observations.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if no observation is buffered.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Observation>> {
        // The queue cannot be left in an inconsistent state by a panic.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ObservationSink for ObservationBuffer {
    fn push(&mut self, observation: &Observation) -> Result<(), SinkError> {
        self.lock().push_back(observation.clone());

        Ok(())
    }
}

impl fmt::Debug for ObservationBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObservationBuffer ({} observations)", self.len())
    }
}

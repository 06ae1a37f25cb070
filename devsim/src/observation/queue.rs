use std::fmt;
use std::iter::FusedIterator;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;

use super::{Observation, ObservationSink, SinkError};

/// A blocking queue of observations with an unbounded size.
///
/// The producer side, obtained with [`ObservationQueue::writer`], is an
/// [`ObservationSink`]. The consumer side, obtained with
/// [`ObservationQueue::reader`], is a blocking iterator which ends once the
/// simulation has finished and every observation has been read.
pub struct ObservationQueue {
    is_open: Arc<AtomicBool>,
    sender: Sender<Observation>,
    receiver: Receiver<Observation>,
}

impl ObservationQueue {
    /// Creates an open queue.
    pub fn new() -> Self {
        let (sender, receiver) = channel();
        Self {
            is_open: Arc::new(AtomicBool::new(true)),
            sender,
            receiver,
        }
    }

    /// Returns a producer handle.
    pub fn writer(&self) -> ObservationQueueWriter {
        ObservationQueueWriter {
            is_open: self.is_open.clone(),
            sender: Some(self.sender.clone()),
        }
    }

    /// Returns the consumer handle.
    ///
    /// Writers must be created beforehand.
    pub fn reader(self) -> ObservationQueueReader {
        ObservationQueueReader {
            is_open: self.is_open,
            receiver: self.receiver,
        }
    }
}

impl Default for ObservationQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ObservationQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservationQueue").finish_non_exhaustive()
    }
}

/// A consumer handle of an [`ObservationQueue`].
///
/// Calls to `next` block until an observation is available. `None` is
/// returned once all writers are closed or dropped.
pub struct ObservationQueueReader {
    is_open: Arc<AtomicBool>,
    receiver: Receiver<Observation>,
}

impl ObservationQueueReader {
    /// Resumes the delivery of observations.
    pub fn open(&mut self) {
        self.is_open.store(true, Ordering::Relaxed);
    }

    /// Suspends the delivery of observations; observations pushed in the
    /// meantime are discarded.
    pub fn close(&mut self) {
        self.is_open.store(false, Ordering::Relaxed);
    }

    /// Returns an observation if one is immediately available.
    pub fn try_next(&mut self) -> Option<Observation> {
        self.receiver.try_recv().ok()
    }
}

impl Iterator for ObservationQueueReader {
    type Item = Observation;

    fn next(&mut self) -> Option<Self::Item> {
        self.receiver.recv().ok()
    }
}

impl FusedIterator for ObservationQueueReader {}

impl fmt::Debug for ObservationQueueReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservationQueueReader")
            .finish_non_exhaustive()
    }
}

/// A producer handle of an [`ObservationQueue`].
pub struct ObservationQueueWriter {
    is_open: Arc<AtomicBool>,
    sender: Option<Sender<Observation>>,
}

impl ObservationSink for ObservationQueueWriter {
    fn push(&mut self, observation: &Observation) -> Result<(), SinkError> {
        if !self.is_open.load(Ordering::Relaxed) {
            return Ok(());
        }
        let Some(sender) = &self.sender else {
            return Err(SinkError::new("observation queue writer is closed"));
        };

        sender
            .send(observation.clone())
            .map_err(|_| SinkError::new("observation queue reader was dropped"))
    }

    fn close(&mut self) {
        self.sender = None;
    }
}

impl fmt::Debug for ObservationQueueWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservationQueueWriter")
            .finish_non_exhaustive()
    }
}

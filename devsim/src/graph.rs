//! Connection graph.
//!
//! The kernel only needs to know, for a given model and output port, which
//! `(model, input port)` pairs are connected. This is captured by the
//! [`ConnectionGraph`] trait; [`Couplings`] is the default implementation
//! used by [`SimInit`](crate::simulation::SimInit).

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::model::ModelId;

/// An oracle answering "who is connected to this output port".
///
/// The graph is only mutated between steps, by bench assembly or by the
/// application of executive structure changes.
pub trait ConnectionGraph: Send + 'static {
    /// Returns the `(model, input port)` pairs connected to the output port
    /// `port` of `model`, in a deterministic order.
    fn targets(&self, model: ModelId, port: &str) -> Vec<(ModelId, String)>;

    /// Adds a connection. Returns `false` if it already existed.
    fn connect(&mut self, source: ModelId, output: &str, destination: ModelId, input: &str)
        -> bool;

    /// Removes a connection. Returns `false` if it did not exist.
    fn disconnect(
        &mut self,
        source: ModelId,
        output: &str,
        destination: ModelId,
        input: &str,
    ) -> bool;

    /// Removes every connection from or to `model`.
    fn remove_model(&mut self, model: ModelId);
}

/// Port-to-port couplings between atomic models.
#[derive(Clone, Default)]
pub struct Couplings {
    edges: BTreeMap<(ModelId, String), BTreeSet<(ModelId, String)>>,
}

impl Couplings {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of connections.
    pub fn len(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }

    /// Returns `true` if there is no connection.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

impl ConnectionGraph for Couplings {
    fn targets(&self, model: ModelId, port: &str) -> Vec<(ModelId, String)> {
        self.edges
            .get(&(model, port.to_owned()))
            .map(|targets| targets.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn connect(
        &mut self,
        source: ModelId,
        output: &str,
        destination: ModelId,
        input: &str,
    ) -> bool {
        self.edges
            .entry((source, output.to_owned()))
            .or_default()
            .insert((destination, input.to_owned()))
    }

    fn disconnect(
        &mut self,
        source: ModelId,
        output: &str,
        destination: ModelId,
        input: &str,
    ) -> bool {
        let key = (source, output.to_owned());
        let Some(targets) = self.edges.get_mut(&key) else {
            return false;
        };
        let removed = targets.remove(&(destination, input.to_owned()));
        if targets.is_empty() {
            self.edges.remove(&key);
        }

        removed
    }

    fn remove_model(&mut self, model: ModelId) {
        self.edges.retain(|(source, _), targets| {
            if *source == model {
                return false;
            }
            targets.retain(|(destination, _)| *destination != model);

            !targets.is_empty()
        });
    }
}

impl fmt::Debug for Couplings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Couplings ({} connections)", self.len())
    }
}

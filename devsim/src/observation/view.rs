use std::collections::BTreeSet;
use std::fmt;

use tracing::warn;

use super::{Observation, ObservationSink, ViewKind};
use crate::event::ObservationEvent;
use crate::model::ModelId;
use crate::simulator::Simulator;
use crate::time::Time;

/// A view registered in a coordinator.
pub(crate) struct View {
    name: String,
    kind: ViewKind,
    sink: Box<dyn ObservationSink>,
    observables: BTreeSet<(ModelId, String)>,
}

impl View {
    pub(crate) fn new(name: String, kind: ViewKind, sink: Box<dyn ObservationSink>) -> Self {
        Self {
            name,
            kind,
            sink,
            observables: BTreeSet::new(),
        }
    }

    pub(crate) fn kind(&self) -> ViewKind {
        self.kind
    }

    /// Period of a timed view.
    pub(crate) fn step(&self) -> Option<Time> {
        match self.kind {
            ViewKind::Timed { step } => Some(step),
            _ => None,
        }
    }

    pub(crate) fn add_observable(&mut self, model: ModelId, port: String) -> bool {
        self.observables.insert((model, port))
    }

    pub(crate) fn remove_model(&mut self, model: ModelId) {
        self.observables.retain(|(id, _)| *id != model);
    }

    /// Observes every port of `simulator` watched by this view.
    pub(crate) fn observe_model(&mut self, simulator: &Simulator, time: Time) {
        let id = simulator.id();
        let ports: Vec<String> = self
            .observables
            .range((id, String::new())..)
            .take_while(|(model, _)| *model == id)
            .map(|(_, port)| port.clone())
            .collect();
        for port in ports {
            self.observe(simulator, &port, time);
        }
    }

    /// Observes every watched port, looking simulators up with `lookup`.
    pub(crate) fn observe_all<'a, F>(&mut self, time: Time, lookup: F)
    where
        F: Fn(ModelId) -> Option<&'a Simulator>,
    {
        let observables: Vec<(ModelId, String)> = self.observables.iter().cloned().collect();
        for (model, port) in observables {
            if let Some(simulator) = lookup(model) {
                self.observe(simulator, &port, time);
            }
        }
    }

    pub(crate) fn close(&mut self) {
        self.sink.close();
    }

    fn observe(&mut self, simulator: &Simulator, port: &str, time: Time) {
        let event = ObservationEvent::new(time, self.name.as_str(), port);
        let value = match simulator.observation(&event) {
            Ok(value) => value,
            Err(e) => {
                warn!(view = %self.name, model = %simulator.id(), error = %e, "observation skipped");
                return;
            }
        };
        let observation = Observation {
            view: self.name.clone(),
            model: simulator.id(),
            model_name: simulator.name().to_owned(),
            port: port.to_owned(),
            time,
            value,
        };
        if let Err(e) = self.sink.push(&observation) {
            warn!(view = %self.name, model = %simulator.id(), port, error = %e, "observation sink failed");
        }
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("observables", &self.observables)
            .finish_non_exhaustive()
    }
}

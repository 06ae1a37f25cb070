//! Bench assembly.
//!
//! [`SimInit`] collects models, connections and views, then builds and
//! initializes a [`Coordinator`]. Models are referred to by name; name
//! resolution errors are reported when the bench is built, before any model
//! is initialized.
//!
//! ```
//! use devsim::event::{ExternalEvent, ExternalEventList};
//! use devsim::model::{ConfluentPolicy, Context, Dynamics, DynamicsResult};
//! use devsim::observation::{ObservationBuffer, ViewKind};
//! use devsim::simulation::SimInit;
//! use devsim::time::Time;
//! use devsim::value::Value;
//!
//! /// Emits an event every time unit.
//! struct Clock;
//! impl Dynamics for Clock {
//!     fn init(&mut self, _: Time, _: &mut Context<'_>) -> DynamicsResult<Time> {
//!         Ok(Time::new(1.0))
//!     }
//!     fn output(&self, _: Time, output: &mut ExternalEventList) -> DynamicsResult<()> {
//!         output.push(ExternalEvent::new("tick"));
//!         Ok(())
//!     }
//!     fn time_advance(&self) -> Time {
//!         Time::new(1.0)
//!     }
//!     fn confluent_policy(&self) -> ConfluentPolicy {
//!         ConfluentPolicy::InternalFirst
//!     }
//! }
//!
//! /// Counts received events.
//! #[derive(Default)]
//! struct Tally(i64);
//! impl Dynamics for Tally {
//!     fn external_transition(
//!         &mut self,
//!         events: &[ExternalEvent],
//!         _: Time,
//!         _: &mut Context<'_>,
//!     ) -> DynamicsResult<()> {
//!         self.0 += events.len() as i64;
//!         Ok(())
//!     }
//!     fn confluent_policy(&self) -> ConfluentPolicy {
//!         ConfluentPolicy::ExternalFirst
//!     }
//!     fn observation(&self, _: &devsim::event::ObservationEvent) -> Option<Value> {
//!         Some(Value::Integer(self.0))
//!     }
//! }
//!
//! let buffer = ObservationBuffer::new();
//! let mut simu = SimInit::new()
//!     .add_model("clock", Clock)
//!     .add_model("tally", Tally::default())
//!     .connect("clock", "tick", "tally", "in")
//!     .add_view("end", ViewKind::Finish, buffer.clone())
//!     .add_observable("end", "tally", "count")
//!     .init(Time::ZERO)?;
//!
//! simu.run_until(Time::new(3.0))?;
//! simu.finish()?;
//!
//! let observations = buffer.take();
//! assert_eq!(observations[0].value, Some(Value::Integer(3)));
//! # Ok::<(), devsim::error::SimulationError>(())
//! ```

use std::collections::BTreeMap;
use std::fmt;

use tracing::info;

use crate::config::{ConnectionConfig, ExperimentConfig};
use crate::coordinator::Coordinator;
use crate::error::{ConfigurationError, SimulationError};
use crate::model::{Dynamics, DynamicsFactory, DynamicsInit};
use crate::observation::{ObservationSink, ViewKind};
use crate::time::Time;
use crate::value::Value;

/// Builder for a simulation bench.
pub struct SimInit {
    seed: u64,
    end: Time,
    models: Vec<(String, Box<dyn Dynamics>, bool)>,
    connections: Vec<ConnectionConfig>,
    views: Vec<(String, ViewKind, Box<dyn ObservationSink>)>,
    observables: Vec<(String, String, String)>,
}

impl SimInit {
    /// Creates an empty bench with seed 0 and no end time.
    pub fn new() -> Self {
        Self {
            seed: 0,
            end: Time::INFINITY,
            models: Vec::new(),
            connections: Vec::new(),
            views: Vec::new(),
            observables: Vec::new(),
        }
    }

    /// Creates a bench from an experiment configuration.
    ///
    /// Each model is built by `factory`, with the merged values of its
    /// condition sets. `sinks` provides one sink per configured view.
    pub fn from_config<F, I>(
        config: &ExperimentConfig,
        factory: &F,
        sinks: I,
    ) -> Result<Self, SimulationError>
    where
        F: DynamicsFactory + ?Sized,
        I: IntoIterator<Item = (String, Box<dyn ObservationSink>)>,
    {
        let conditions: BTreeMap<&str, &BTreeMap<String, Value>> = config
            .conditions
            .iter()
            .map(|c| (c.name.as_str(), &c.values))
            .collect();

        let mut bench = Self::new()
            .set_seed(config.seed)
            .set_end_time(config.end());

        for model in &config.models {
            let mut parameters = BTreeMap::new();
            for name in &model.conditions {
                let values = conditions
                    .get(name.as_str())
                    .ok_or_else(|| ConfigurationError::UnknownCondition(name.clone()))?;
                parameters.extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            let init = DynamicsInit {
                model: &model.name,
                dynamics: &model.dynamics,
                conditions: &model.conditions,
                parameters: &parameters,
                observable: model.observable.as_deref(),
            };
            let dynamics = factory
                .build(&init)
                .map_err(|e| ConfigurationError::Factory {
                    model: model.name.clone(),
                    dynamics: model.dynamics.clone(),
                    message: format!("{e:#}"),
                })?;
            bench
                .models
                .push((model.name.clone(), dynamics, model.executive));
        }

        bench.connections.extend(config.connections.iter().cloned());

        let mut sinks: BTreeMap<String, Box<dyn ObservationSink>> = sinks.into_iter().collect();
        for view in &config.views {
            let sink = sinks
                .remove(&view.name)
                .ok_or_else(|| ConfigurationError::MissingSink(view.name.clone()))?;
            bench.views.push((view.name.clone(), view.kind, sink));
            for observable in &view.observables {
                bench.observables.push((
                    view.name.clone(),
                    observable.model.clone(),
                    observable.port.clone(),
                ));
            }
        }
        if let Some(name) = sinks.into_keys().next() {
            return Err(ConfigurationError::UnknownView(name).into());
        }

        Ok(bench)
    }

    /// Sets the seed of the random number generator lent to models.
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the date at which [`Coordinator::run`] stops.
    pub fn set_end_time(mut self, end: Time) -> Self {
        self.end = end;
        self
    }

    /// Adds a regular model.
    pub fn add_model(mut self, name: impl Into<String>, dynamics: impl Dynamics) -> Self {
        self.models.push((name.into(), Box::new(dynamics), false));
        self
    }

    /// Adds an executive model.
    pub fn add_executive(mut self, name: impl Into<String>, dynamics: impl Dynamics) -> Self {
        self.models.push((name.into(), Box::new(dynamics), true));
        self
    }

    /// Connects an output port to an input port.
    pub fn connect(
        mut self,
        source: impl Into<String>,
        output: impl Into<String>,
        destination: impl Into<String>,
        input: impl Into<String>,
    ) -> Self {
        self.connections
            .push(ConnectionConfig::new(source, output, destination, input));
        self
    }

    /// Adds an observation view.
    pub fn add_view(
        mut self,
        name: impl Into<String>,
        kind: ViewKind,
        sink: impl ObservationSink,
    ) -> Self {
        self.views.push((name.into(), kind, Box::new(sink)));
        self
    }

    /// Adds a model port to the observables of a view.
    pub fn add_observable(
        mut self,
        view: impl Into<String>,
        model: impl Into<String>,
        port: impl Into<String>,
    ) -> Self {
        self.observables
            .push((view.into(), model.into(), port.into()));
        self
    }

    /// Builds the coordinator without initializing it.
    pub fn build(self) -> Result<Coordinator, SimulationError> {
        let mut coordinator = Coordinator::new(self.seed);
        coordinator.set_end_time(self.end);

        for (name, dynamics, executive) in self.models {
            coordinator.attach_boxed(name, dynamics, executive)?;
        }

        let resolve = |coordinator: &Coordinator, name: &str| {
            coordinator
                .model_id(name)
                .ok_or_else(|| ConfigurationError::UnknownModel(name.to_owned()))
        };
        for connection in &self.connections {
            let source = resolve(&coordinator, &connection.source)?;
            let destination = resolve(&coordinator, &connection.destination)?;
            coordinator.connect(source, &connection.output, destination, &connection.input)?;
        }
        for (name, kind, sink) in self.views {
            coordinator.add_view(name, kind, sink)?;
        }
        for (view, model, port) in self.observables {
            let model = resolve(&coordinator, &model)?;
            coordinator.add_observable(&view, model, port)?;
        }
        info!(models = coordinator.len(), "simulation bench assembled");

        Ok(coordinator)
    }

    /// Builds the coordinator and initializes it at `start`.
    pub fn init(self, start: Time) -> Result<Coordinator, SimulationError> {
        let mut coordinator = self.build()?;
        coordinator.init(start)?;

        Ok(coordinator)
    }
}

impl Default for SimInit {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SimInit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimInit")
            .field("seed", &self.seed)
            .field("end", &self.end)
            .field("models", &self.models.len())
            .field("connections", &self.connections.len())
            .field("views", &self.views.len())
            .finish_non_exhaustive()
    }
}

//! Experiment configuration.
//!
//! An [`ExperimentConfig`] holds the minimal data a project file must
//! supply to run a simulation: the atomic models and the name of their
//! dynamics, their initial conditions, the connections between their ports
//! and the observation views. It is turned into a ready-to-run bench by
//! [`SimInit::from_config`](crate::simulation::SimInit::from_config).
//!
//! With the `serde` feature, all configuration types can be serialized and
//! deserialized. Omitted fields take their default value.

use std::collections::BTreeMap;

use crate::observation::ViewKind;
use crate::time::Time;
use crate::value::Value;

/// A complete simulation experiment.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ExperimentConfig {
    /// Name of the experiment.
    pub name: String,
    /// Start date.
    pub begin: Time,
    /// Simulated duration.
    pub duration: Time,
    /// Seed of the random number generator lent to models.
    pub seed: u64,
    /// Named sets of initial condition values.
    pub conditions: Vec<ConditionConfig>,
    /// Atomic models.
    pub models: Vec<ModelConfig>,
    /// Port connections.
    pub connections: Vec<ConnectionConfig>,
    /// Observation views.
    pub views: Vec<ViewConfig>,
}

impl ExperimentConfig {
    /// Creates an empty experiment starting at zero with an unbounded
    /// duration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// End date of the experiment.
    pub fn end(&self) -> Time {
        self.begin + self.duration
    }

    /// Sets the start date and duration.
    pub fn with_period(mut self, begin: Time, duration: Time) -> Self {
        self.begin = begin;
        self.duration = duration;
        self
    }

    /// Sets the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Adds a condition set.
    pub fn with_condition(mut self, condition: ConditionConfig) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Adds an atomic model.
    pub fn with_model(mut self, model: ModelConfig) -> Self {
        self.models.push(model);
        self
    }

    /// Adds a connection.
    pub fn with_connection(mut self, connection: ConnectionConfig) -> Self {
        self.connections.push(connection);
        self
    }

    /// Adds a view.
    pub fn with_view(mut self, view: ViewConfig) -> Self {
        self.views.push(view);
        self
    }
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            begin: Time::ZERO,
            duration: Time::INFINITY,
            seed: 0,
            conditions: Vec::new(),
            models: Vec::new(),
            connections: Vec::new(),
            views: Vec::new(),
        }
    }
}

/// A named set of initial condition values.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ConditionConfig {
    /// Name of the condition set.
    pub name: String,
    /// Values of the conditions.
    pub values: BTreeMap<String, Value>,
}

impl ConditionConfig {
    /// Creates an empty condition set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: BTreeMap::new(),
        }
    }

    /// Adds a value.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

/// An atomic model.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ModelConfig {
    /// Unique name of the model.
    pub name: String,
    /// Name of the dynamics resolved by the dynamics factory.
    pub dynamics: String,
    /// Names of the condition sets of the model.
    pub conditions: Vec<String>,
    /// Name of the observable set of the model.
    pub observable: Option<String>,
    /// Whether the model is an executive.
    pub executive: bool,
}

impl ModelConfig {
    /// Creates a regular model.
    pub fn new(name: impl Into<String>, dynamics: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dynamics: dynamics.into(),
            ..Self::default()
        }
    }

    /// Adds a condition set.
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.conditions.push(condition.into());
        self
    }

    /// Sets the observable set.
    pub fn with_observable(mut self, observable: impl Into<String>) -> Self {
        self.observable = Some(observable.into());
        self
    }

    /// Marks the model as an executive.
    pub fn executive(mut self) -> Self {
        self.executive = true;
        self
    }
}

/// A connection from an output port to an input port.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConnectionConfig {
    /// Name of the emitting model.
    pub source: String,
    /// Output port.
    pub output: String,
    /// Name of the receiving model.
    pub destination: String,
    /// Input port.
    pub input: String,
}

impl ConnectionConfig {
    /// Creates a connection.
    pub fn new(
        source: impl Into<String>,
        output: impl Into<String>,
        destination: impl Into<String>,
        input: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            output: output.into(),
            destination: destination.into(),
            input: input.into(),
        }
    }
}

/// An observation view.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ViewConfig {
    /// Unique name of the view.
    pub name: String,
    /// When the view observes.
    pub kind: ViewKind,
    /// Observed ports.
    #[cfg_attr(feature = "serde", serde(default))]
    pub observables: Vec<ObservableConfig>,
}

impl ViewConfig {
    /// Creates a view without observables.
    pub fn new(name: impl Into<String>, kind: ViewKind) -> Self {
        Self {
            name: name.into(),
            kind,
            observables: Vec::new(),
        }
    }

    /// Adds an observed port.
    pub fn with_observable(mut self, model: impl Into<String>, port: impl Into<String>) -> Self {
        self.observables.push(ObservableConfig {
            model: model.into(),
            port: port.into(),
        });
        self
    }
}

/// An observed model port.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObservableConfig {
    /// Name of the model.
    pub model: String,
    /// Name of the port.
    pub port: String,
}

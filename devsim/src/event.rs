//! Events exchanged between models and observation requests.

use crate::time::Time;
use crate::value::Value;

/// An event emitted on an output port or received on an input port.
///
/// When produced by a model's output function, `port` names the output
/// port of the emitter. Once routed through the connection graph, the
/// kernel delivers a copy whose `port` names the input port of the
/// receiver.
#[derive(Clone, Debug, PartialEq)]
pub struct ExternalEvent {
    port: String,
    attributes: Value,
}

impl ExternalEvent {
    /// Creates an event without attributes.
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            attributes: Value::Null,
        }
    }

    /// Creates an event carrying the given attributes.
    pub fn with_value(port: impl Into<String>, attributes: impl Into<Value>) -> Self {
        Self {
            port: port.into(),
            attributes: attributes.into(),
        }
    }

    /// Adds a named attribute, turning the payload into a map if needed.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key, value);
        self
    }

    /// Name of the port.
    pub fn port(&self) -> &str {
        &self.port
    }

    /// Returns `true` if the event is on port `name`.
    pub fn on_port(&self, name: &str) -> bool {
        self.port == name
    }

    /// Payload of the event.
    pub fn attributes(&self) -> &Value {
        &self.attributes
    }

    /// Looks up a named attribute.
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Returns a copy of this event addressed to `port`.
    pub(crate) fn retarget(&self, port: &str) -> Self {
        Self {
            port: port.to_owned(),
            attributes: self.attributes.clone(),
        }
    }
}

/// The bag of events produced by one output call or delivered to one
/// transition.
pub type ExternalEventList = Vec<ExternalEvent>;

/// A request for the observable value of a model port.
#[derive(Clone, Debug, PartialEq)]
pub struct ObservationEvent {
    time: Time,
    view: String,
    port: String,
}

impl ObservationEvent {
    /// Creates an observation request.
    pub fn new(time: Time, view: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            time,
            view: view.into(),
            port: port.into(),
        }
    }

    /// Date of the observation.
    pub fn time(&self) -> Time {
        self.time
    }

    /// Name of the view requesting the observation.
    pub fn view(&self) -> &str {
        &self.view
    }

    /// Name of the observed port.
    pub fn port(&self) -> &str {
        &self.port
    }

    /// Returns `true` if the observed port is `name`.
    pub fn on_port(&self, name: &str) -> bool {
        self.port == name
    }
}

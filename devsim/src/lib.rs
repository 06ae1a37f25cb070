//! A discrete-event simulation kernel implementing the DEVS formalism.
//!
//! DEVSim executes populations of atomic models which communicate through
//! events exchanged between named ports. Each model is a timed state
//! machine: it stays in a state for a duration of its own choosing, emits
//! output events when that duration elapses, and changes state either on its
//! own schedule or when it receives events. A single-threaded coordinator
//! advances simulation time from one event date to the next and guarantees
//! that all models sharing an event date see a consistent view of the
//! outputs produced at that date.
//!
//! Beyond the classic DEVS semantics, the kernel supports:
//!
//! * *executive* models which add, remove and reconnect models while the
//!   simulation runs,
//! * *multi-component* models which run a whole population of lightweight
//!   components inside a single atomic model,
//! * *views* which observe model ports periodically, on every transition or
//!   at the end of the simulation,
//! * assembly of simulation benches from a declarative
//!   [`ExperimentConfig`](config::ExperimentConfig).
//!
//! # A practical overview
//!
//! Simulating a system typically involves three distinct activities:
//!
//! 1. the design of atomic models,
//! 2. the assembly of a simulation bench from a set of models, performed by
//!    connecting output ports to input ports,
//! 3. the execution of the simulation and the collection of observations.
//!
//! ## Authoring models
//!
//! Models implement the [`Dynamics`](model::Dynamics) trait. All methods
//! have a default implementation describing a passive model, except
//! [`Dynamics::confluent_policy`](model::Dynamics::confluent_policy) which
//! states what happens when the model receives events at the very date of
//! its own internal event.
//!
//! Model code returns a [`DynamicsResult`](model::DynamicsResult), so any
//! error can be propagated with `?`. The kernel attaches the model identity,
//! the simulation time and the failed operation before reporting it as a
//! [`SimulationError`](error::SimulationError).
//!
//! ### A simple model
//!
//! Let us consider for illustration a model that delays the values it
//! receives on its `in` port by one time unit before sending them back on
//! its `out` port:
//!
//! ```
//! use std::collections::VecDeque;
//!
//! use devsim::event::{ExternalEvent, ExternalEventList};
//! use devsim::model::{ConfluentPolicy, Context, Dynamics, DynamicsResult};
//! use devsim::time::Time;
//!
//! #[derive(Default)]
//! pub struct Delay {
//!     queue: VecDeque<(Time, f64)>,
//!     now: Time,
//! }
//!
//! impl Dynamics for Delay {
//!     fn output(&self, _: Time, output: &mut ExternalEventList) -> DynamicsResult<()> {
//!         if let Some(&(_, value)) = self.queue.front() {
//!             output.push(ExternalEvent::new("out").with("value", value));
//!         }
//!         Ok(())
//!     }
//!     fn time_advance(&self) -> Time {
//!         match self.queue.front() {
//!             Some(&(due, _)) => due.duration_since(self.now),
//!             None => Time::INFINITY,
//!         }
//!     }
//!     fn internal_transition(&mut self, time: Time, _: &mut Context<'_>) -> DynamicsResult<()> {
//!         self.now = time;
//!         self.queue.pop_front();
//!         Ok(())
//!     }
//!     fn external_transition(
//!         &mut self,
//!         events: &[ExternalEvent],
//!         time: Time,
//!         _: &mut Context<'_>,
//!     ) -> DynamicsResult<()> {
//!         self.now = time;
//!         for event in events.iter().filter(|e| e.on_port("in")) {
//!             let value = event.attribute("value").and_then(|v| v.as_double());
//!             self.queue.push_back((time + 1.0, value.unwrap_or_default()));
//!         }
//!         Ok(())
//!     }
//!     fn confluent_policy(&self) -> ConfluentPolicy {
//!         ConfluentPolicy::InternalFirst
//!     }
//! }
//! ```
//!
//! ## Assembling simulation benches
//!
//! Benches are assembled with a [`SimInit`](simulation::SimInit) builder,
//! or with a [`Coordinator`](coordinator::Coordinator) directly when model
//! identifiers are needed. Models are given unique names; connections and
//! observables refer to models by name:
//!
//! ```text
//!                 ┌────────┐      ┌────────┐
//!     inject ●───►│ delay1 ├─────►│ delay2 ├───► ◉ view
//!                 └────────┘      └────────┘
//! ```
//!
//! ## Running simulations
//!
//! The simulation is advanced with
//! [`Coordinator::step`](coordinator::Coordinator::step), which processes
//! all events at the next event date, or with
//! [`Coordinator::run_until`](coordinator::Coordinator::run_until) and
//! [`Coordinator::run`](coordinator::Coordinator::run). Events can be
//! injected from outside with
//! [`Coordinator::inject`](coordinator::Coordinator::inject); they are
//! delivered at the current time by the next step.
//!
//! ```
//! # use std::collections::VecDeque;
//! # use devsim::event::{ExternalEvent, ExternalEventList};
//! # use devsim::model::{ConfluentPolicy, Context, Dynamics, DynamicsResult};
//! # use devsim::time::Time;
//! # #[derive(Default)]
//! # pub struct Delay {
//! #     queue: VecDeque<(Time, f64)>,
//! #     now: Time,
//! # }
//! # impl Dynamics for Delay {
//! #     fn output(&self, _: Time, output: &mut ExternalEventList) -> DynamicsResult<()> {
//! #         if let Some(&(_, value)) = self.queue.front() {
//! #             output.push(ExternalEvent::new("out").with("value", value));
//! #         }
//! #         Ok(())
//! #     }
//! #     fn time_advance(&self) -> Time {
//! #         match self.queue.front() {
//! #             Some(&(due, _)) => due.duration_since(self.now),
//! #             None => Time::INFINITY,
//! #         }
//! #     }
//! #     fn internal_transition(&mut self, time: Time, _: &mut Context<'_>) -> DynamicsResult<()> {
//! #         self.now = time;
//! #         self.queue.pop_front();
//! #         Ok(())
//! #     }
//! #     fn external_transition(
//! #         &mut self,
//! #         events: &[ExternalEvent],
//! #         time: Time,
//! #         _: &mut Context<'_>,
//! #     ) -> DynamicsResult<()> {
//! #         self.now = time;
//! #         for event in events.iter().filter(|e| e.on_port("in")) {
//! #             let value = event.attribute("value").and_then(|v| v.as_double());
//! #             self.queue.push_back((time + 1.0, value.unwrap_or_default()));
//! #         }
//! #         Ok(())
//! #     }
//! #     fn confluent_policy(&self) -> ConfluentPolicy {
//! #         ConfluentPolicy::InternalFirst
//! #     }
//! # }
//! use devsim::coordinator::Coordinator;
//! use devsim::observation::{ObservationBuffer, ViewKind};
//!
//! let mut simu = Coordinator::new(0);
//! let delay1 = simu.attach("delay1", Delay::default())?;
//! let delay2 = simu.attach("delay2", Delay::default())?;
//! simu.connect(delay1, "out", delay2, "in")?;
//!
//! let buffer = ObservationBuffer::new();
//! simu.add_view("trace", ViewKind::Event, buffer.clone())?;
//! simu.add_observable("trace", delay2, "queue")?;
//!
//! simu.init(Time::ZERO)?;
//! simu.inject(delay1, ExternalEvent::new("in").with("value", 3.5))?;
//!
//! // The injected event is delivered at t=0 and reaches `delay2` at t=1.
//! assert_eq!(simu.step()?, 0.0);
//! assert_eq!(simu.step()?, 1.0);
//! assert_eq!(simu.pending_time(delay2), Some(Time::new(2.0)));
//!
//! simu.run_until(Time::new(10.0))?;
//! assert_eq!(simu.current_time(), 2.0);
//! simu.finish()?;
//!
//! // One observation at initialization, one per transition.
//! assert_eq!(buffer.len(), 3);
//! # Ok::<(), devsim::error::SimulationError>(())
//! ```
//!
//! # Event ordering guarantees
//!
//! All events occurring at the same date are processed in a single step, in
//! two phases. The output function of every imminent model is called first;
//! only then do models transition, so the events a model receives never
//! depend on the transitions of other models at the same date.
//!
//! Within a step, each model receives exactly one transition. Regular models
//! transition in ascending identifier order, then executive models in
//! ascending identifier order. The events received by a model are grouped
//! by emitter in ascending identifier order, preserving the emission order
//! of each emitter, followed by injected events in injection order.
//!
//! Equal event dates are compared exactly: two dates that differ by a
//! rounding error are distinct dates.
//!
//! # Cargo feature flags
//!
//! ## Serde
//!
//! The `serde` feature flag derives `Serialize` and `Deserialize` for
//! [`Time`](time::Time), [`Value`](value::Value) and the configuration types
//! of the [`config`] module, so experiments can be loaded from any format
//! supported by `serde`:
//!
//! ```toml
//! [dependencies]
//! devsim = { version = "0.1.0", features = ["serde"] }
//! ```
//!
//! # Other resources
//!
//! ## Other examples
//!
//! Several examples are available in the `examples/` directories of the
//! `devsim` and `devsim-util` crates.
//!
//! ## Modules documentation
//!
//! * the [`model`] module describes the [`Dynamics`](model::Dynamics) trait
//!   in depth,
//! * the [`coordinator`] module details the simulation loop,
//! * the [`executive`] module explains how executive models change the bench
//!   while it runs,
//! * the [`multi_component`] module describes multi-component models,
//! * the [`observation`] module documents views and observation sinks,
//! * the [`error`] module classifies simulation errors.
#![warn(missing_docs, missing_debug_implementations, unreachable_pub)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod config;
pub mod coordinator;
pub mod error;
pub mod event;
pub mod executive;
pub mod graph;
pub mod model;
pub mod multi_component;
pub mod observation;
pub mod registry;
pub(crate) mod routing;
pub mod scheduler;
pub mod simulation;
pub mod simulator;
pub mod time;
pub mod value;

//! Example: a simulation that runs infinitely, receiving data from
//! outside. This setup is typical for hardware-in-the-loop use case.
//!
//! This example demonstrates in particular:
//!
//! * infinite simulation,
//! * simulation halting,
//! * processing of external data through a polling model,
//! * zero time advance,
//! * blocking observation queue.
//!
//! ```text
//!                              ┏━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━┓
//!                              ┃ Simulation                               ┃
//!┌╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌┐           ┃   ┌──────────┐         ┌──────────┐ last ┃
//!┆                 ┆  message  ┃   │          │ message │          ├──────╂─►
//!┆ External thread ├╌╌╌╌╌╌╌╌╌╌╌╂╌╌►│ Listener ├────────►│  Logger  │      ┃
//!┆                 ┆ [channel] ┃   │          │         │          │      ┃
//!└╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌┘           ┃   └──────────┘         └──────────┘      ┃
//!                              ┗━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━┛
//! ```

use std::collections::VecDeque;
use std::sync::mpsc::{channel, Receiver};
use std::thread::{self, sleep};
use std::time::Duration;

use devsim::error::SimulationError;
use devsim::event::{ExternalEvent, ExternalEventList, ObservationEvent};
use devsim::model::{ConfluentPolicy, Context, Dynamics, DynamicsResult};
use devsim::observation::{ObservationQueue, ViewKind};
use devsim::simulation::SimInit;
use devsim::time::Time;
use devsim::value::Value;

const PERIOD: f64 = 0.02;
const N: usize = 10;

/// The `Listener` model.
///
/// Polls a channel every `PERIOD` and forwards the received messages on its
/// `message` port, one message per transition. Polls are paced against the
/// wall clock, one simulated time unit lasting one second.
pub struct Listener {
    /// Source of external messages.
    external: Receiver<String>,

    /// Messages not forwarded yet.
    pending: VecDeque<String>,
}

impl Listener {
    /// Creates new `Listener` model.
    fn new(external: Receiver<String>) -> Self {
        Self {
            external,
            pending: VecDeque::new(),
        }
    }
}

impl Dynamics for Listener {
    fn init(&mut self, _: Time, _: &mut Context<'_>) -> DynamicsResult<Time> {
        Ok(Time::new(PERIOD))
    }

    fn output(&self, _: Time, output: &mut ExternalEventList) -> DynamicsResult<()> {
        if let Some(message) = self.pending.front() {
            output.push(ExternalEvent::new("message").with("text", message.as_str()));
        }
        Ok(())
    }

    fn time_advance(&self) -> Time {
        // Pending messages are sent without waiting for the next poll.
        if self.pending.is_empty() {
            Time::new(PERIOD)
        } else {
            Time::ZERO
        }
    }

    fn internal_transition(&mut self, _: Time, _: &mut Context<'_>) -> DynamicsResult<()> {
        // A poll ends a `PERIOD` wait, which lasts as long in wall-clock
        // seconds.
        if self.pending.pop_front().is_none() {
            sleep(Duration::from_secs_f64(PERIOD));
        }
        if self.pending.is_empty() {
            self.pending.extend(self.external.try_iter());
        }
        Ok(())
    }

    fn confluent_policy(&self) -> ConfluentPolicy {
        ConfluentPolicy::InternalFirst
    }
}

/// The `Logger` model.
///
/// Keeps the last received message, observable on the `last` port.
#[derive(Default)]
pub struct Logger {
    last: Option<String>,
}

impl Dynamics for Logger {
    fn external_transition(
        &mut self,
        events: &[ExternalEvent],
        _: Time,
        _: &mut Context<'_>,
    ) -> DynamicsResult<()> {
        for event in events {
            self.last = event.attribute("text").and_then(Value::as_str).map(str::to_owned);
        }
        Ok(())
    }

    fn confluent_policy(&self) -> ConfluentPolicy {
        ConfluentPolicy::ExternalFirst
    }

    fn observation(&self, event: &ObservationEvent) -> Option<Value> {
        if event.on_port("last") {
            self.last.clone().map(Value::String)
        } else {
            None
        }
    }
}

fn main() -> Result<(), SimulationError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // ---------------
    // Bench assembly.
    // ---------------

    // Channel for communication with simulation from outside.
    let (tx, rx) = channel();

    // Observation of the logger.
    let queue = ObservationQueue::new();
    let writer = queue.writer();
    let messages = queue.reader();

    // Assembly and initialization.
    let mut simu = SimInit::new()
        .add_model("listener", Listener::new(rx))
        .add_model("logger", Logger::default())
        .connect("listener", "message", "logger", "in")
        .add_view("log", ViewKind::Event, writer)
        .add_observable("log", "logger", "last")
        .init(Time::ZERO)?;
    let halt = simu.halt_handle();

    // Simulation thread.
    let simulation_handle = thread::spawn(move || {
        // ----------
        // Simulation.
        // ----------
        simu.run()
    });

    // Send data to simulation from outside.
    for i in 0..N {
        tx.send(i.to_string()).unwrap();
        if i % 3 == 0 {
            sleep(Duration::from_millis(20 * i as u64))
        }
    }

    // Check collected external messages. The logger is observed once at
    // initialization, before any message is received.
    let received: Vec<String> = messages
        .filter_map(|o| o.value.and_then(|v| v.as_str().map(str::to_owned)))
        .take(N)
        .collect();
    let expected: Vec<String> = (0..N).map(|i| i.to_string()).collect();
    assert_eq!(received, expected);

    // Stop the simulation.
    halt.halt();
    match simulation_handle.join().unwrap() {
        Err(SimulationError::Halted) => Ok(()),
        Err(e) => Err(e),
        Ok(_) => Ok(()),
    }
}

//! Example: a simulation that runs infinitely until stopped. The test
//! scenario is driven by simulation events.
//!
//! This example demonstrates in particular:
//!
//! * infinite simulation,
//! * blocking observation queue,
//! * simulation halting,
//! * periodic and random event sources,
//! * observable state.
//!
//! ```text
//! ┏━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━┓
//! ┃ Simulation                              ┃
//! ┃   ┌──────────┐        ┌──────────┐      ┃
//! ┃   │          │ pulses │          │count ┃ ObservationQueue
//! ┃   │ Detector ├───────►│ Counter  ├──────╂───────────────────►
//! ┃   │          │        │          │      ┃
//! ┃   └──────────┘        └──────────┘      ┃
//! ┃   ┌──────────┐                          ┃
//! ┃   │  Ticker  │                          ┃
//! ┃   └──────────┘                          ┃
//! ┗━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━┛
//! ```

use std::thread;

use devsim::error::SimulationError;
use devsim::observation::{ObservationQueue, ViewKind};
use devsim::simulation::SimInit;
use devsim::time::Time;
use devsim::value::Value;
use devsim_util::helper_models::{Counter, PoissonSource, Ticker};

const MEAN_PULSE_PERIOD: f64 = 0.05;
const TICK: f64 = 0.1;
const N: i64 = 10;

fn main() -> Result<(), SimulationError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // ---------------
    // Bench assembly.
    // ---------------

    // Observation of the counter.
    let observer = ObservationQueue::new();
    let writer = observer.writer();
    let observer = observer.reader();

    // Assembly and initialization.
    let mut simu = SimInit::new()
        .set_seed(42)
        // The detector model that produces pulses.
        .add_model("detector", PoissonSource::new(MEAN_PULSE_PERIOD))
        // The counter model.
        .add_model("counter", Counter::new())
        // The ticker model that keeps simulation alive.
        .add_model("ticker", Ticker::new(Time::new(TICK)))
        .connect("detector", "out", "counter", "pulse")
        .add_view("counter", ViewKind::Event, writer)
        .add_observable("counter", "counter", "count")
        .init(Time::ZERO)?;
    let halt = simu.halt_handle();

    // Simulation thread.
    let simulation_handle = thread::spawn(move || {
        // ---------- Simulation.  ----------
        // Infinitely kept alive by the ticker model until halted.
        simu.run()
    });

    // Wait until `N` detections.
    for observation in observer {
        if let Some(Value::Integer(c)) = observation.value {
            if c >= N {
                break;
            }
        }
    }

    // Stop the simulation.
    halt.halt();
    match simulation_handle.join().unwrap() {
        Err(SimulationError::Halted) => Ok(()),
        Err(e) => Err(e),
        _ => Ok(()),
    }
}

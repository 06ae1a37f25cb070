//! Observation views and sinks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use devsim::coordinator::Coordinator;
use devsim::error::{ConfigurationError, SimulationError};
use devsim::observation::{
    Observation, ObservationBuffer, ObservationQueue, ObservationSink, SinkError, ViewKind,
};
use devsim::time::Time;
use devsim::value::Value;

use crate::test_models::{Call, CallLog, Probe};

fn timed(step: f64) -> ViewKind {
    ViewKind::Timed {
        step: Time::new(step),
    }
}

fn samples(buffer: &ObservationBuffer) -> Vec<(f64, Option<Value>)> {
    buffer
        .take()
        .into_iter()
        .map(|o| (o.time.as_f64(), o.value))
        .collect()
}

#[test]
fn timed_view_waits_for_all_events_at_its_date() {
    let log = CallLog::new();
    let buffer = ObservationBuffer::new();
    let mut simu = Coordinator::new(0);
    let probe = simu
        .attach("probe", Probe::new("probe", &log, &[2.0, 0.0, 1.0]))
        .unwrap();
    simu.add_view("sampler", timed(2.0), buffer.clone()).unwrap();
    simu.add_observable("sampler", probe, "next").unwrap();

    assert_eq!(simu.init(Time::ZERO).unwrap(), 0.0);
    assert_eq!(simu.step().unwrap(), 0.0);
    assert_eq!(simu.step().unwrap(), 2.0);
    // A second event is pending at t=2: the observation is deferred.
    assert_eq!(buffer.len(), 1);
    assert_eq!(simu.step().unwrap(), 2.0);
    simu.run_until(Time::new(4.0)).unwrap();

    assert_eq!(
        samples(&buffer),
        vec![
            (0.0, Some(Value::Double(2.0))),
            (2.0, Some(Value::Double(3.0))),
            (4.0, Some(Value::Double(f64::INFINITY))),
        ]
    );
    assert_eq!(simu.current_time(), 4.0);
}

#[test]
fn event_view_follows_transitions() {
    let log = CallLog::new();
    let buffer = ObservationBuffer::new();
    let mut simu = Coordinator::new(0);
    let source = simu
        .attach("source", Probe::new("source", &log, &[1.0, 1.0]).emitting("out"))
        .unwrap();
    let sink = simu.attach("sink", Probe::new("sink", &log, &[])).unwrap();
    simu.connect(source, "out", sink, "in").unwrap();
    simu.add_view("events", ViewKind::Event, buffer.clone()).unwrap();
    simu.add_observable("events", sink, "received").unwrap();
    simu.add_observable("events", sink, "unknown").unwrap();

    simu.init(Time::ZERO).unwrap();
    simu.run().unwrap();

    let observations = buffer.take();
    let received: Vec<_> = observations
        .iter()
        .filter(|o| o.port == "received")
        .map(|o| (o.time.as_f64(), o.value.clone()))
        .collect();
    assert_eq!(
        received,
        vec![
            (0.0, Some(Value::Integer(0))),
            (1.0, Some(Value::Integer(1))),
            (2.0, Some(Value::Integer(2))),
        ]
    );
    // Ports the model does not expose are reported without a value.
    assert!(observations
        .iter()
        .filter(|o| o.port == "unknown")
        .all(|o| o.value.is_none() && o.view == "events" && o.model_name == "sink"));
}

#[test]
fn finish_view_observes_before_models_finish() {
    let log = CallLog::new();
    let buffer = ObservationBuffer::new();
    let mut simu = Coordinator::new(0);
    let probe = simu
        .attach("probe", Probe::new("probe", &log, &[1.5, 1.5]))
        .unwrap();
    simu.add_view("end", ViewKind::Finish, buffer.clone()).unwrap();
    simu.add_observable("end", probe, "next").unwrap();

    simu.init(Time::ZERO).unwrap();
    simu.run_until(Time::new(2.0)).unwrap();
    assert!(buffer.is_empty());

    simu.finish().unwrap();
    assert_eq!(samples(&buffer), vec![(1.5, Some(Value::Double(3.0)))]);
    assert_eq!(log.calls("probe").last(), Some(&Call::Finish));
}

/// A sink rejecting every observation.
struct Rejecting {
    closed: Arc<AtomicBool>,
}

impl ObservationSink for Rejecting {
    fn push(&mut self, _: &Observation) -> Result<(), SinkError> {
        Err(SinkError::new("disk full"))
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::Relaxed);
    }
}

#[test]
fn sink_errors_do_not_abort_the_simulation() {
    let log = CallLog::new();
    let closed = Arc::new(AtomicBool::new(false));
    let mut simu = Coordinator::new(0);
    let probe = simu
        .attach("probe", Probe::new("probe", &log, &[1.0, 1.0]))
        .unwrap();
    simu.add_view(
        "broken",
        ViewKind::Event,
        Rejecting {
            closed: closed.clone(),
        },
    )
    .unwrap();
    simu.add_observable("broken", probe, "next").unwrap();

    simu.init(Time::ZERO).unwrap();
    assert_eq!(simu.run().unwrap(), 2.0);
    simu.finish().unwrap();

    assert!(closed.load(Ordering::Relaxed));
}

#[test]
fn timed_view_added_while_running() {
    let log = CallLog::new();
    let buffer = ObservationBuffer::new();
    let mut simu = Coordinator::new(0);
    let probe = simu
        .attach("probe", Probe::new("probe", &log, &[1.0, 1.0, 1.0, 1.0]))
        .unwrap();

    simu.init(Time::ZERO).unwrap();
    simu.step().unwrap();
    simu.add_view("late", timed(1.5), buffer.clone()).unwrap();
    simu.add_observable("late", probe, "next").unwrap();
    simu.run_until(Time::new(4.0)).unwrap();

    assert_eq!(
        samples(&buffer),
        vec![
            (1.0, Some(Value::Double(2.0))),
            (2.5, Some(Value::Double(3.0))),
            (4.0, Some(Value::Double(f64::INFINITY))),
        ]
    );
}

#[test]
fn view_configuration_errors() {
    let mut simu = Coordinator::new(0);

    assert!(matches!(
        simu.add_view("zero", timed(0.0), ObservationBuffer::new()),
        Err(SimulationError::Configuration(ConfigurationError::InvalidTimeStep { .. }))
    ));
    assert!(matches!(
        simu.add_view("forever", timed(f64::INFINITY), ObservationBuffer::new()),
        Err(SimulationError::Configuration(ConfigurationError::InvalidTimeStep { .. }))
    ));

    simu.add_view("v", ViewKind::Finish, ObservationBuffer::new())
        .unwrap();
    assert!(matches!(
        simu.add_view("v", ViewKind::Event, ObservationBuffer::new()),
        Err(SimulationError::Configuration(ConfigurationError::DuplicateView(name))) if name == "v"
    ));

    let log = CallLog::new();
    let probe = simu.attach("probe", Probe::new("probe", &log, &[])).unwrap();
    assert!(matches!(
        simu.add_observable("w", probe, "next"),
        Err(SimulationError::Configuration(ConfigurationError::UnknownView(name))) if name == "w"
    ));
}

#[test]
fn observation_queue_is_closed_on_finish() {
    let log = CallLog::new();
    let queue = ObservationQueue::new();
    let mut simu = Coordinator::new(0);
    let probe = simu
        .attach("probe", Probe::new("probe", &log, &[1.0; 3]))
        .unwrap();
    simu.add_view("events", ViewKind::Event, queue.writer()).unwrap();
    simu.add_observable("events", probe, "next").unwrap();
    let reader = queue.reader();

    let simulation = thread::spawn(move || -> Result<Time, SimulationError> {
        simu.init(Time::ZERO)?;
        let end = simu.run()?;
        simu.finish()?;
        Ok(end)
    });

    let times: Vec<f64> = reader.map(|o| o.time.as_f64()).collect();
    assert_eq!(simulation.join().unwrap().unwrap(), 3.0);
    assert_eq!(times, vec![0.0, 1.0, 2.0, 3.0]);
}

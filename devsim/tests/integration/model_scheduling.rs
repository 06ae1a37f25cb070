//! Scheduling of atomic models by the coordinator.

use anyhow::bail;

use devsim::coordinator::{Coordinator, Status};
use devsim::error::{ConfigurationError, ModelingError, SimulationError};
use devsim::event::ExternalEvent;
use devsim::model::{ConfluentPolicy, Context, Dynamics, DynamicsResult};
use devsim::time::Time;
use devsim::value::Value;

use crate::test_models::{init_tracing, Call, CallLog, FixedInit, Probe};

#[test]
fn simultaneous_imminent_models() {
    init_tracing();

    let log = CallLog::new();
    let mut simu = Coordinator::new(0);
    let a = simu.attach("a", Probe::new("a", &log, &[1.0, 1.0, 1.0])).unwrap();
    let b = simu.attach("b", Probe::new("b", &log, &[2.0, 2.0])).unwrap();

    assert_eq!(simu.init(Time::ZERO).unwrap(), 1.0);

    assert_eq!(simu.step().unwrap(), 1.0);
    assert_eq!(
        log.transitions(),
        vec![("a".to_owned(), Call::Internal(1.0))]
    );
    assert_eq!(simu.pending_time(a), Some(Time::new(2.0)));
    assert_eq!(simu.pending_time(b), Some(Time::new(2.0)));

    assert_eq!(simu.step().unwrap(), 2.0);
    assert_eq!(
        log.transitions()[1..],
        [
            ("a".to_owned(), Call::Internal(2.0)),
            ("b".to_owned(), Call::Internal(2.0)),
        ]
    );
    assert_eq!(simu.current_time(), 2.0);
}

#[test]
fn routed_output_triggers_external_transition() {
    let log = CallLog::new();
    let mut simu = Coordinator::new(0);
    let a = simu
        .attach("a", Probe::new("a", &log, &[5.0]).emitting("out"))
        .unwrap();
    let b = simu.attach("b", Probe::new("b", &log, &[])).unwrap();
    simu.connect(a, "out", b, "in").unwrap();

    simu.init(Time::ZERO).unwrap();
    assert_eq!(simu.step().unwrap(), 5.0);

    assert_eq!(
        log.calls("a"),
        vec![Call::Init(0.0), Call::Output(5.0), Call::Internal(5.0)]
    );
    assert_eq!(
        log.calls("b"),
        vec![Call::Init(0.0), Call::External(5.0, vec!["a".to_owned()])]
    );
    assert_eq!(simu.observe(b, "received").unwrap(), Some(Value::Integer(1)));
}

#[test]
fn imminent_receiver_gets_single_confluent_transition() {
    let log = CallLog::new();
    let mut simu = Coordinator::new(0);
    let a = simu
        .attach("a", Probe::new("a", &log, &[5.0]).emitting("out"))
        .unwrap();
    let b = simu.attach("b", Probe::new("b", &log, &[5.0, 3.0])).unwrap();
    simu.connect(a, "out", b, "in").unwrap();

    simu.init(Time::ZERO).unwrap();
    simu.step().unwrap();

    assert_eq!(
        log.calls("b"),
        vec![
            Call::Init(0.0),
            Call::Output(5.0),
            Call::Confluent(5.0, vec!["a".to_owned()]),
        ]
    );
    assert_eq!(simu.pending_time(b), Some(Time::new(8.0)));
}

#[test]
fn init_failure_discards_the_run() {
    let log = CallLog::new();
    let mut simu = Coordinator::new(0);
    let a = simu.attach("a", Probe::new("a", &log, &[1.0])).unwrap();
    let bad = simu.attach("bad", FixedInit(-1.0)).unwrap();

    match simu.init(Time::ZERO) {
        Err(SimulationError::Modeling(ModelingError::InvalidTimeAdvance {
            model,
            name,
            duration,
            ..
        })) => {
            assert_eq!(model, bad);
            assert_eq!(name, "bad");
            assert_eq!(duration, -1.0);
        }
        other => panic!("unexpected result: {other:?}"),
    }

    assert_eq!(simu.status(), Status::Aborted);
    assert_eq!(simu.pending_time(a), None);
    assert!(simu.next_time().is_infinite());
    assert!(matches!(simu.step(), Err(SimulationError::Aborted)));
}

#[test]
fn failed_attach_while_running_aborts_the_run() {
    let log = CallLog::new();
    let mut simu = Coordinator::new(0);
    let a = simu.attach("a", Probe::new("a", &log, &[1.0])).unwrap();
    simu.init(Time::ZERO).unwrap();

    assert!(matches!(
        simu.attach("bad", FixedInit(-1.0)),
        Err(SimulationError::Modeling(ModelingError::InvalidTimeAdvance { duration, .. }))
            if duration == -1.0
    ));

    assert_eq!(simu.model_id("bad"), None);
    assert_eq!(simu.models().collect::<Vec<_>>(), vec![a]);
    assert_eq!(simu.status(), Status::Aborted);
    assert!(matches!(simu.step(), Err(SimulationError::Aborted)));
    assert_eq!(log.transitions(), Vec::new());
}

#[test]
fn negative_time_advance_aborts_the_step() {
    let log = CallLog::new();
    let mut simu = Coordinator::new(0);
    let a = simu.attach("a", Probe::new("a", &log, &[1.0, -3.0])).unwrap();

    simu.init(Time::ZERO).unwrap();
    let err = simu.step().unwrap_err();

    assert_eq!(err.model(), Some(a));
    assert!(matches!(
        err,
        SimulationError::Modeling(ModelingError::InvalidTimeAdvance { duration, .. })
            if duration == -3.0
    ));
    assert_eq!(simu.status(), Status::Aborted);
    assert!(matches!(simu.step(), Err(SimulationError::Aborted)));
}

/// Final observable state of each model after running a fan-in bench
/// attached in the given order.
fn fan_in_states(order: &[&str]) -> Vec<(String, Option<Value>, Option<Value>)> {
    let log = CallLog::new();
    let mut simu = Coordinator::new(0);
    for &name in order {
        let probe = match name {
            "sink" => Probe::new(name, &log, &[1.0]),
            _ => Probe::new(name, &log, &[1.0, 2.0]).emitting("out"),
        };
        simu.attach(name, probe).unwrap();
    }
    let sink = simu.model_id("sink").unwrap();
    for source in ["left", "right"] {
        let source = simu.model_id(source).unwrap();
        simu.connect(source, "out", sink, "in").unwrap();
    }

    simu.init(Time::ZERO).unwrap();
    simu.run_until(Time::new(10.0)).unwrap();

    let mut states: Vec<_> = simu
        .models()
        .map(|id| {
            (
                simu.model_name(id).unwrap().to_owned(),
                simu.observe(id, "received").unwrap(),
                simu.observe(id, "next").unwrap(),
            )
        })
        .collect();
    states.sort_by(|x, y| x.0.cmp(&y.0));

    states
}

#[test]
fn final_state_does_not_depend_on_attachment_order() {
    let forward = fan_in_states(&["left", "right", "sink"]);
    let backward = fan_in_states(&["sink", "right", "left"]);

    assert_eq!(forward, backward);
    assert_eq!(forward[2].0, "sink");
    assert_eq!(forward[2].1, Some(Value::Integer(4)));
}

#[test]
fn quiescent_step_leaves_time_unchanged() {
    let log = CallLog::new();
    let mut simu = Coordinator::new(0);
    simu.attach("idle", Probe::new("idle", &log, &[])).unwrap();

    assert!(simu.init(Time::new(3.0)).unwrap().is_infinite());
    assert!(simu.step().unwrap().is_infinite());
    assert_eq!(simu.current_time(), 3.0);
    assert_eq!(simu.run().unwrap(), 3.0);
}

#[test]
fn injected_events() {
    let log = CallLog::new();
    let mut simu = Coordinator::new(0);
    let idle = simu.attach("idle", Probe::new("idle", &log, &[])).unwrap();
    let busy = simu.attach("busy", Probe::new("busy", &log, &[0.0, 1.0])).unwrap();

    simu.init(Time::ZERO).unwrap();
    simu.inject(idle, ExternalEvent::new("first")).unwrap();
    simu.inject(idle, ExternalEvent::new("second")).unwrap();
    simu.inject(busy, ExternalEvent::new("kick")).unwrap();
    assert_eq!(simu.next_time(), 0.0);

    assert_eq!(simu.step().unwrap(), 0.0);
    assert_eq!(
        log.transitions(),
        vec![
            (
                "idle".to_owned(),
                Call::External(0.0, vec!["first".to_owned(), "second".to_owned()])
            ),
            ("busy".to_owned(), Call::Confluent(0.0, vec!["kick".to_owned()])),
        ]
    );

    // Injection between steps is delivered at the current time.
    simu.step().unwrap();
    simu.inject(idle, ExternalEvent::new("late")).unwrap();
    assert_eq!(simu.step().unwrap(), 1.0);
    assert_eq!(
        log.calls("idle").last(),
        Some(&Call::External(1.0, vec!["late".to_owned()]))
    );
}

struct Broken;

impl Dynamics for Broken {
    fn init(&mut self, _: Time, _: &mut Context<'_>) -> DynamicsResult<Time> {
        Ok(Time::new(2.0))
    }

    fn internal_transition(&mut self, _: Time, _: &mut Context<'_>) -> DynamicsResult<()> {
        bail!("valve stuck")
    }

    fn confluent_policy(&self) -> ConfluentPolicy {
        ConfluentPolicy::ExternalFirst
    }
}

#[test]
fn transition_error_reports_the_model() {
    let mut simu = Coordinator::new(0);
    let broken = simu.attach("valve", Broken).unwrap();
    simu.init(Time::ZERO).unwrap();

    match simu.step() {
        Err(SimulationError::Transition {
            model,
            name,
            time,
            operation,
            source,
        }) => {
            assert_eq!(model, broken);
            assert_eq!(name, "valve");
            assert_eq!(time, 2.0);
            assert_eq!(operation, "internal_transition");
            assert_eq!(source.to_string(), "valve stuck");
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(simu.status(), Status::Aborted);
}

struct Undecided;

impl Dynamics for Undecided {}

#[test]
fn models_must_state_a_confluent_policy() {
    let mut simu = Coordinator::new(0);

    assert!(matches!(
        simu.attach("undecided", Undecided),
        Err(SimulationError::Configuration(
            ConfigurationError::UnspecifiedConfluentPolicy(name)
        )) if name == "undecided"
    ));
    assert!(simu.is_empty());
}

#[test]
fn lifecycle_errors() {
    let log = CallLog::new();
    let mut simu = Coordinator::new(0);
    simu.attach("a", Probe::new("a", &log, &[1.0])).unwrap();

    assert!(matches!(simu.step(), Err(SimulationError::NotInitialized)));
    assert!(matches!(
        simu.attach("a", Probe::new("a", &log, &[])),
        Err(SimulationError::Configuration(ConfigurationError::DuplicateModel(_)))
    ));

    simu.init(Time::ZERO).unwrap();
    assert!(matches!(
        simu.init(Time::ZERO),
        Err(SimulationError::AlreadyInitialized)
    ));

    simu.finish().unwrap();
    assert_eq!(log.calls("a").last(), Some(&Call::Finish));
    assert!(matches!(simu.step(), Err(SimulationError::Finished)));
    assert!(matches!(simu.finish(), Err(SimulationError::Finished)));
}

#[test]
fn halt_is_honored_between_steps() {
    let log = CallLog::new();
    let mut simu = Coordinator::new(0);
    simu.attach("a", Probe::new("a", &log, &[1.0; 8])).unwrap();
    simu.init(Time::ZERO).unwrap();

    let halt = simu.halt_handle();
    simu.step().unwrap();
    halt.halt();

    assert!(matches!(simu.run(), Err(SimulationError::Halted)));
    assert_eq!(simu.current_time(), 1.0);
    assert_eq!(simu.status(), Status::Running);

    // The request is consumed: the simulation can resume.
    assert_eq!(simu.step().unwrap(), 2.0);
}

#[test]
fn reschedule_after_external_change() {
    let log = CallLog::new();
    let mut simu = Coordinator::new(0);
    let a = simu.attach("a", Probe::new("a", &log, &[5.0])).unwrap();
    simu.init(Time::new(1.0)).unwrap();

    assert_eq!(simu.reschedule_after_external_change(a).unwrap(), 6.0);
    assert_eq!(simu.pending_time(a), Some(Time::new(6.0)));

    simu.detach(a).unwrap();
    assert!(matches!(
        simu.reschedule_after_external_change(a),
        Err(SimulationError::Configuration(ConfigurationError::UnknownModelId(id))) if id == a
    ));
}

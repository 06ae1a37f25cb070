//! Structure changes requested by executive models.

use std::sync::{Arc, Mutex};

use devsim::coordinator::{Coordinator, Status};
use devsim::error::{ModelingError, SimulationError};
use devsim::executive::StructureChanges;
use devsim::model::{ConfluentPolicy, Context, Dynamics, DynamicsResult, ModelId};
use devsim::observation::{ObservationBuffer, ViewKind};
use devsim::time::Time;
use devsim::value::Value;

use crate::test_models::{Call, CallLog, Probe};

type Script = Box<dyn FnMut(&mut StructureChanges) + Send>;

/// An executive running a script once, at a fixed date.
struct Scripted {
    name: &'static str,
    log: CallLog,
    at: Time,
    script: Option<Script>,
}

impl Scripted {
    fn new(
        name: &'static str,
        log: &CallLog,
        at: f64,
        script: impl FnMut(&mut StructureChanges) + Send + 'static,
    ) -> Self {
        Self {
            name,
            log: log.clone(),
            at: Time::new(at),
            script: Some(Box::new(script)),
        }
    }
}

impl Dynamics for Scripted {
    fn init(&mut self, time: Time, _: &mut Context<'_>) -> DynamicsResult<Time> {
        Ok(self.at.duration_since(time))
    }

    fn time_advance(&self) -> Time {
        Time::INFINITY
    }

    fn internal_transition(&mut self, time: Time, cx: &mut Context<'_>) -> DynamicsResult<()> {
        self.log.push(self.name, Call::Internal(time.as_f64()));
        let changes = cx
            .executive()
            .ok_or_else(|| anyhow::anyhow!("not an executive"))?;
        if let Some(mut script) = self.script.take() {
            script(changes);
        }
        Ok(())
    }

    fn confluent_policy(&self) -> ConfluentPolicy {
        ConfluentPolicy::InternalFirst
    }
}

#[test]
fn deleted_model_is_never_transitioned() {
    let log = CallLog::new();
    let mut simu = Coordinator::new(0);
    let y = simu
        .attach("y", Probe::new("y", &log, &[10.0]).emitting("out"))
        .unwrap();
    let x = simu.attach("x", Probe::new("x", &log, &[10.0])).unwrap();
    simu.connect(y, "out", x, "in").unwrap();
    simu.attach_executive(
        "exec",
        Scripted::new("exec", &log, 5.0, |changes| changes.delete_model("x")),
    )
    .unwrap();

    simu.init(Time::ZERO).unwrap();
    assert_eq!(simu.pending_time(x), Some(Time::new(10.0)));

    simu.run_until(Time::new(20.0)).unwrap();

    assert_eq!(log.calls("x"), vec![Call::Init(0.0), Call::Finish]);
    assert_eq!(
        log.calls("y"),
        vec![Call::Init(0.0), Call::Output(10.0), Call::Internal(10.0)]
    );
    assert_eq!(simu.model_id("x"), None);
    assert!(simu.simulator(x).is_none());
    assert_eq!(simu.current_time(), 10.0);
    assert_eq!(simu.len(), 2);
}

#[test]
fn detach_between_steps_drops_routed_events() {
    let log = CallLog::new();
    let mut simu = Coordinator::new(0);
    let y = simu
        .attach("y", Probe::new("y", &log, &[10.0]).emitting("out"))
        .unwrap();
    let x = simu.attach("x", Probe::new("x", &log, &[10.0])).unwrap();
    simu.connect(y, "out", x, "in").unwrap();

    simu.init(Time::ZERO).unwrap();
    simu.detach(x).unwrap();
    assert!(simu.detach(x).is_err());

    assert_eq!(simu.step().unwrap(), 10.0);
    assert_eq!(log.calls("x"), vec![Call::Init(0.0), Call::Finish]);
    assert!(simu.next_time().is_infinite());

    // Identifiers are not reused.
    let z = simu.attach("x", Probe::new("z", &log, &[])).unwrap();
    assert_ne!(z, x);
    assert_eq!(log.calls("z"), vec![Call::Init(10.0)]);
}

#[test]
fn created_model_is_initialized_and_connected() {
    let log = CallLog::new();
    let created = Arc::new(Mutex::new(None::<ModelId>));
    let buffer = ObservationBuffer::new();

    let mut simu = Coordinator::new(0);
    simu.add_view("trace", ViewKind::Event, buffer.clone()).unwrap();
    let sink = simu.attach("sink", Probe::new("sink", &log, &[])).unwrap();
    let script_log = log.clone();
    let slot = created.clone();
    simu.attach_executive(
        "exec",
        Scripted::new("exec", &log, 1.0, move |changes| {
            let probe = Probe::new("probe", &script_log, &[1.0]).emitting("out");
            *slot.lock().unwrap() = Some(changes.create_model("probe", probe));
            changes.connect("probe", "out", "sink", "in");
            changes.add_observable("trace", "probe", "received");
        }),
    )
    .unwrap();

    simu.init(Time::ZERO).unwrap();
    simu.run_until(Time::new(5.0)).unwrap();

    let probe = (*created.lock().unwrap()).unwrap();
    assert_eq!(simu.model_id("probe"), Some(probe));
    assert_eq!(probe.as_u64(), 2);
    assert_eq!(
        log.calls("probe"),
        vec![Call::Init(1.0), Call::Output(2.0), Call::Internal(2.0)]
    );
    assert_eq!(
        log.calls("sink").last(),
        Some(&Call::External(2.0, vec!["probe".to_owned()]))
    );
    assert_eq!(simu.observe(sink, "received").unwrap(), Some(Value::Integer(1)));

    let observations = buffer.take();
    assert_eq!(observations.len(), 1);
    assert_eq!(observations[0].model, probe);
    assert_eq!(observations[0].time, 2.0);
    assert_eq!(observations[0].value, Some(Value::Integer(0)));
}

#[test]
fn executives_transition_after_regular_models() {
    let log = CallLog::new();
    let mut simu = Coordinator::new(0);
    simu.attach_executive("exec", Scripted::new("exec", &log, 1.0, |_| {}))
        .unwrap();
    simu.attach("probe", Probe::new("probe", &log, &[1.0])).unwrap();

    simu.init(Time::ZERO).unwrap();
    simu.step().unwrap();

    assert_eq!(
        log.transitions(),
        vec![
            ("probe".to_owned(), Call::Internal(1.0)),
            ("exec".to_owned(), Call::Internal(1.0)),
        ]
    );
}

#[test]
fn unknown_target_aborts_the_step() {
    let log = CallLog::new();
    let mut simu = Coordinator::new(0);
    let exec = simu
        .attach_executive(
            "exec",
            Scripted::new("exec", &log, 1.0, |changes| {
                changes.connect("exec", "out", "ghost", "in")
            }),
        )
        .unwrap();

    simu.init(Time::ZERO).unwrap();
    match simu.step() {
        Err(SimulationError::Modeling(ModelingError::UnknownTarget {
            model,
            time,
            target,
            ..
        })) => {
            assert_eq!(model, exec);
            assert_eq!(time, 1.0);
            assert_eq!(target, "ghost");
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(simu.status(), Status::Aborted);
}

#[test]
fn duplicate_created_name_aborts_the_step() {
    let log = CallLog::new();
    let mut simu = Coordinator::new(0);
    simu.attach("taken", Probe::new("taken", &log, &[])).unwrap();
    let script_log = log.clone();
    simu.attach_executive(
        "exec",
        Scripted::new("exec", &log, 1.0, move |changes| {
            changes.create_model("taken", Probe::new("other", &script_log, &[]));
        }),
    )
    .unwrap();

    simu.init(Time::ZERO).unwrap();
    assert!(matches!(
        simu.step(),
        Err(SimulationError::Modeling(ModelingError::DuplicateName { target, .. }))
            if target == "taken"
    ));
    assert!(log.calls("other").is_empty());
}

#[test]
fn regular_models_cannot_change_the_structure() {
    let log = CallLog::new();
    let mut simu = Coordinator::new(0);
    let impostor = simu
        .attach("impostor", Scripted::new("impostor", &log, 1.0, |_| {}))
        .unwrap();

    simu.init(Time::ZERO).unwrap();
    let err = simu.step().unwrap_err();

    assert!(matches!(
        err,
        SimulationError::Transition { operation: "internal_transition", .. }
    ));
    assert_eq!(err.model(), Some(impostor));
}

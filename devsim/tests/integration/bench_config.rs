//! Bench assembly from an experiment configuration.

use devsim::config::{
    ConditionConfig, ConnectionConfig, ExperimentConfig, ModelConfig, ViewConfig,
};
use devsim::error::{ConfigurationError, SimulationError};
use devsim::observation::{ObservationBuffer, ObservationSink, ViewKind};
use devsim::registry::DynamicsRegistry;
use devsim::simulation::SimInit;
use devsim::time::Time;
use devsim::value::Value;

use crate::test_models::{Call, CallLog, Probe};

fn registry(log: &CallLog) -> DynamicsRegistry {
    let mut registry = DynamicsRegistry::new();

    let pulse_log = log.clone();
    registry
        .add("pulse", move |init| {
            let period = init.parameter_f64("period")?;
            Ok(Probe::new(init.model, &pulse_log, &[period; 3]).emitting("out"))
        })
        .unwrap();
    let probe_log = log.clone();
    registry
        .add("probe", move |init| Ok(Probe::new(init.model, &probe_log, &[])))
        .unwrap();

    registry
}

fn experiment() -> ExperimentConfig {
    ExperimentConfig::new("pulses")
        .with_period(Time::new(1.0), Time::new(9.0))
        .with_seed(5)
        .with_condition(
            ConditionConfig::new("base")
                .with("period", 2.0)
                .with("gain", 3),
        )
        .with_condition(ConditionConfig::new("fast").with("period", 1.0))
        .with_model(
            ModelConfig::new("src", "pulse")
                .with_condition("base")
                .with_condition("fast"),
        )
        .with_model(ModelConfig::new("dst", "probe"))
        .with_connection(ConnectionConfig::new("src", "out", "dst", "in"))
        .with_view(ViewConfig::new("end", ViewKind::Finish).with_observable("dst", "received"))
}

fn sinks(buffer: &ObservationBuffer) -> Vec<(String, Box<dyn ObservationSink>)> {
    let sink: Box<dyn ObservationSink> = Box::new(buffer.clone());

    vec![("end".to_owned(), sink)]
}

fn configuration_error(result: Result<SimInit, SimulationError>) -> ConfigurationError {
    match result {
        Err(SimulationError::Configuration(e)) => e,
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn bench_from_config() {
    let log = CallLog::new();
    let buffer = ObservationBuffer::new();
    let config = experiment();

    let mut simu = SimInit::from_config(&config, &registry(&log), sinks(&buffer))
        .unwrap()
        .init(config.begin)
        .unwrap();
    assert_eq!(simu.end_time(), 10.0);

    // Later condition sets override earlier ones: the period is 1.
    assert_eq!(simu.run().unwrap(), 4.0);
    simu.finish().unwrap();

    assert_eq!(
        log.calls("dst")[..2],
        [Call::Init(1.0), Call::External(2.0, vec!["src".to_owned()])]
    );
    let observations = buffer.take();
    assert_eq!(observations.len(), 1);
    assert_eq!(observations[0].model_name, "dst");
    assert_eq!(observations[0].value, Some(Value::Integer(3)));
}

#[test]
fn unknown_condition() {
    let log = CallLog::new();
    let buffer = ObservationBuffer::new();
    let config = experiment().with_model(ModelConfig::new("other", "probe").with_condition("slow"));

    assert_eq!(
        configuration_error(SimInit::from_config(&config, &registry(&log), sinks(&buffer))),
        ConfigurationError::UnknownCondition("slow".to_owned())
    );
}

#[test]
fn factory_failures() {
    let log = CallLog::new();
    let buffer = ObservationBuffer::new();

    let config = experiment().with_model(ModelConfig::new("other", "nope"));
    match configuration_error(SimInit::from_config(&config, &registry(&log), sinks(&buffer))) {
        ConfigurationError::Factory {
            model,
            dynamics,
            message,
        } => {
            assert_eq!(model, "other");
            assert_eq!(dynamics, "nope");
            assert!(message.contains("unknown dynamics"));
        }
        e => panic!("unexpected error: {e}"),
    }

    let config = experiment().with_model(ModelConfig::new("other", "pulse"));
    match configuration_error(SimInit::from_config(&config, &registry(&log), sinks(&buffer))) {
        ConfigurationError::Factory { model, message, .. } => {
            assert_eq!(model, "other");
            assert!(message.contains("period"));
        }
        e => panic!("unexpected error: {e}"),
    }
}

#[test]
fn sinks_must_match_views() {
    let log = CallLog::new();
    let buffer = ObservationBuffer::new();
    let config = experiment();

    assert_eq!(
        configuration_error(SimInit::from_config(&config, &registry(&log), Vec::new())),
        ConfigurationError::MissingSink("end".to_owned())
    );

    let mut extra = sinks(&buffer);
    extra.push(("other".to_owned(), Box::new(ObservationBuffer::new())));
    assert_eq!(
        configuration_error(SimInit::from_config(&config, &registry(&log), extra)),
        ConfigurationError::UnknownView("other".to_owned())
    );
}

#[test]
fn names_are_resolved_before_initialization() {
    let log = CallLog::new();
    let buffer = ObservationBuffer::new();
    let config =
        experiment().with_connection(ConnectionConfig::new("src", "out", "ghost", "in"));

    let bench = SimInit::from_config(&config, &registry(&log), sinks(&buffer)).unwrap();
    match bench.init(config.begin) {
        Err(SimulationError::Configuration(ConfigurationError::UnknownModel(name))) => {
            assert_eq!(name, "ghost")
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(log.calls("src").is_empty());
}

#[test]
fn duplicate_dynamics_name() {
    let log = CallLog::new();
    let mut registry = registry(&log);

    assert_eq!(
        registry.add("probe", |_| Ok(spare_probe())),
        Err(ConfigurationError::DuplicateDynamics("probe".to_owned()))
    );
    assert_eq!(registry.len(), 2);
    assert!(registry.contains("pulse"));
}

fn spare_probe() -> Probe {
    Probe::new("unused", &CallLog::new(), &[])
}

#[cfg(feature = "serde")]
#[test]
fn bench_from_json() {
    let json = r#"{
        "name": "pulses",
        "duration": 3.5,
        "conditions": [{ "name": "c", "values": { "period": { "Double": 1.0 } } }],
        "models": [
            { "name": "src", "dynamics": "pulse", "conditions": ["c"] },
            { "name": "dst", "dynamics": "probe" }
        ],
        "connections": [{ "source": "src", "output": "out", "destination": "dst", "input": "in" }],
        "views": [{ "name": "end", "kind": "finish", "observables": [{ "model": "dst", "port": "received" }] }]
    }"#;
    let config: ExperimentConfig = serde_json::from_str(json).unwrap();

    let log = CallLog::new();
    let buffer = ObservationBuffer::new();
    let mut simu = SimInit::from_config(&config, &registry(&log), sinks(&buffer))
        .unwrap()
        .init(config.begin)
        .unwrap();
    simu.run().unwrap();
    simu.finish().unwrap();

    assert_eq!(buffer.take()[0].value, Some(Value::Integer(3)));
}

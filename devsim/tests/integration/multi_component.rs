//! Multi-component models scheduled by a coordinator.

use devsim::coordinator::Coordinator;
use devsim::event::{ExternalEvent, ExternalEventList, ObservationEvent};
use devsim::model::{Context, DynamicsResult};
use devsim::multi_component::{Changes, ComponentId, ModelList, MultiComponent};
use devsim::time::Time;
use devsim::value::Value;

use crate::test_models::{Call, CallLog, Probe};

/// Components firing once, at a fixed date.
struct OneShots {
    dates: Vec<f64>,
    fired: Vec<Option<Time>>,
}

impl OneShots {
    fn new(dates: &[f64]) -> Self {
        Self {
            dates: dates.to_vec(),
            fired: vec![None; dates.len()],
        }
    }
}

impl ModelList for OneShots {
    type Change = ();

    fn len(&self) -> usize {
        self.dates.len()
    }

    fn init(&mut self, id: ComponentId, _: Time, _: &mut Context<'_>) -> DynamicsResult<Time> {
        Ok(Time::new(self.dates[id as usize]))
    }

    fn output(
        &self,
        id: ComponentId,
        _: Time,
        output: &mut ExternalEventList,
    ) -> DynamicsResult<()> {
        output.push(ExternalEvent::new("fired").with("from", format!("c{id}")));
        Ok(())
    }

    fn time_advance(&self, id: ComponentId) -> Time {
        match self.fired[id as usize] {
            Some(_) => Time::INFINITY,
            None => Time::new(self.dates[id as usize]),
        }
    }

    fn internal_transition(
        &mut self,
        id: ComponentId,
        time: Time,
        _: &mut Context<'_>,
    ) -> DynamicsResult<Changes<()>> {
        self.fired[id as usize] = Some(time);
        Ok(Vec::new())
    }

    fn external_transition(
        &mut self,
        _: ComponentId,
        _: &[ExternalEvent],
        _: Time,
        _: &mut Context<'_>,
    ) -> DynamicsResult<Changes<()>> {
        Ok(Vec::new())
    }

    fn confluent_transitions(
        &mut self,
        id: ComponentId,
        time: Time,
        _: &[ExternalEvent],
        cx: &mut Context<'_>,
    ) -> DynamicsResult<Changes<()>> {
        self.internal_transition(id, time, cx)
    }

    fn react(
        &mut self,
        _: ComponentId,
        _: &[(ComponentId, ())],
        _: &mut Context<'_>,
    ) -> DynamicsResult<()> {
        Ok(())
    }

    fn influenced(&self, _: &ExternalEvent) -> Vec<ComponentId> {
        Vec::new()
    }

    fn observation(&self, event: &ObservationEvent) -> Option<Value> {
        let port = event.port().strip_prefix('c')?;
        let id: usize = port.parse().ok()?;
        let time = (*self.fired.get(id)?)?;
        Some(Value::Double(time.as_f64()))
    }
}

#[test]
fn components_fire_when_dates_do_not_round_trip() {
    // 0.3 + (0.9 - 0.3) rounds up and 0.2 + (0.9 - 0.2) rounds down.
    for dates in [[0.3, 0.9], [0.2, 0.9]] {
        let log = CallLog::new();
        let mut simu = Coordinator::new(0);
        let multi = simu
            .attach("multi", MultiComponent::new(OneShots::new(&dates)))
            .unwrap();
        let sink = simu.attach("sink", Probe::new("sink", &log, &[])).unwrap();
        simu.connect(multi, "fired", sink, "in").unwrap();

        assert_eq!(simu.init(Time::ZERO).unwrap(), dates[0]);
        assert_eq!(simu.step().unwrap(), dates[0]);
        let second = simu.step().unwrap();
        assert!((second.as_f64() - dates[1]).abs() < 1e-12);
        assert!(simu.step().unwrap().is_infinite());

        // Components see their own dates, not the rounded ones.
        assert_eq!(
            simu.observe(multi, "c0").unwrap(),
            Some(Value::Double(dates[0]))
        );
        assert_eq!(
            simu.observe(multi, "c1").unwrap(),
            Some(Value::Double(dates[1]))
        );

        let senders: Vec<Vec<String>> = log
            .transitions()
            .into_iter()
            .map(|(_, call)| match call {
                Call::External(_, from) => from,
                other => panic!("unexpected transition: {other:?}"),
            })
            .collect();
        assert_eq!(senders, vec![vec!["c0".to_owned()], vec!["c1".to_owned()]]);
    }
}

//! Helper models.
//!
//! This module contains helper models useful for simulation bench assembly.
//!

use std::collections::VecDeque;

use rand::Rng;
use tracing::trace;

use devsim::event::{ExternalEvent, ExternalEventList, ObservationEvent};
use devsim::model::{ConfluentPolicy, Context, Dynamics, DynamicsResult};
use devsim::time::Time;
use devsim::value::Value;

/// A ticker model.
///
/// This model emits an event on its `tick` port at the specified period,
/// which can be used to keep the simulation alive or to drive periodic
/// models. Each event carries the tick number in its `count` attribute.
#[derive(Debug)]
pub struct Ticker {
    /// Tick period.
    period: Time,
    /// Number of ticks emitted so far.
    count: i64,
}

impl Ticker {
    /// Creates a new `Ticker` with the specified period.
    ///
    /// # Panics
    ///
    /// Panics if the period is not a positive, finite duration.
    pub fn new(period: Time) -> Self {
        assert!(
            period.is_finite() && period > Time::ZERO,
            "the ticker period must be positive and finite"
        );

        Self { period, count: 0 }
    }
}

impl Dynamics for Ticker {
    fn init(&mut self, _: Time, _: &mut Context<'_>) -> DynamicsResult<Time> {
        self.count = 0;
        Ok(self.period)
    }

    fn output(&self, _: Time, output: &mut ExternalEventList) -> DynamicsResult<()> {
        output.push(ExternalEvent::new("tick").with("count", self.count + 1));
        Ok(())
    }

    fn time_advance(&self) -> Time {
        self.period
    }

    fn internal_transition(&mut self, _: Time, _: &mut Context<'_>) -> DynamicsResult<()> {
        self.count += 1;
        Ok(())
    }

    fn confluent_policy(&self) -> ConfluentPolicy {
        ConfluentPolicy::InternalFirst
    }

    fn observation(&self, event: &ObservationEvent) -> Option<Value> {
        event.on_port("count").then_some(Value::Integer(self.count))
    }
}

/// A passive model counting the events it receives.
///
/// The number of events received on all ports is observable on the `count`
/// port.
#[derive(Debug, Default)]
pub struct Counter {
    count: i64,
}

impl Counter {
    /// Creates a new `Counter`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events received so far.
    pub fn count(&self) -> i64 {
        self.count
    }
}

impl Dynamics for Counter {
    fn init(&mut self, _: Time, _: &mut Context<'_>) -> DynamicsResult<Time> {
        self.count = 0;
        Ok(Time::INFINITY)
    }

    fn external_transition(
        &mut self,
        events: &[ExternalEvent],
        time: Time,
        cx: &mut Context<'_>,
    ) -> DynamicsResult<()> {
        self.count += i64::try_from(events.len())?;
        trace!(model = cx.name(), %time, count = self.count, "events counted");
        Ok(())
    }

    fn confluent_policy(&self) -> ConfluentPolicy {
        ConfluentPolicy::ExternalFirst
    }

    fn observation(&self, event: &ObservationEvent) -> Option<Value> {
        event.on_port("count").then_some(Value::Integer(self.count))
    }
}

/// A model forwarding the events it receives after a fixed delay.
///
/// Events received on any port are sent on the `out` port `delay` time units
/// later, with their attributes unchanged. Events in flight are observable
/// on the `pending` port.
#[derive(Debug)]
pub struct Relay {
    /// Forwarding delay.
    delay: Time,
    /// Events in flight with their due date, in arrival order.
    queue: VecDeque<(Time, Value)>,
    /// Date of the last transition.
    now: Time,
}

impl Relay {
    /// Creates a new `Relay` with the specified delay.
    ///
    /// # Panics
    ///
    /// Panics if the delay is not a non-negative, finite duration.
    pub fn new(delay: Time) -> Self {
        assert!(
            delay.is_finite() && delay >= Time::ZERO,
            "the relay delay must be non-negative and finite"
        );

        Self {
            delay,
            queue: VecDeque::new(),
            now: Time::ZERO,
        }
    }
}

impl Dynamics for Relay {
    fn init(&mut self, time: Time, _: &mut Context<'_>) -> DynamicsResult<Time> {
        self.now = time;
        self.queue.clear();
        Ok(Time::INFINITY)
    }

    fn output(&self, _: Time, output: &mut ExternalEventList) -> DynamicsResult<()> {
        if let Some((_, attributes)) = self.queue.front() {
            output.push(ExternalEvent::with_value("out", attributes.clone()));
        }
        Ok(())
    }

    fn time_advance(&self) -> Time {
        match self.queue.front() {
            Some(&(due, _)) => due.duration_since(self.now),
            None => Time::INFINITY,
        }
    }

    fn internal_transition(&mut self, time: Time, _: &mut Context<'_>) -> DynamicsResult<()> {
        self.now = time;
        self.queue.pop_front();
        Ok(())
    }

    fn external_transition(
        &mut self,
        events: &[ExternalEvent],
        time: Time,
        _: &mut Context<'_>,
    ) -> DynamicsResult<()> {
        self.now = time;
        let due = time + self.delay;
        self.queue
            .extend(events.iter().map(|e| (due, e.attributes().clone())));
        Ok(())
    }

    fn confluent_policy(&self) -> ConfluentPolicy {
        ConfluentPolicy::InternalFirst
    }

    fn observation(&self, event: &ObservationEvent) -> Option<Value> {
        let pending = i64::try_from(self.queue.len()).ok()?;
        event.on_port("pending").then_some(Value::Integer(pending))
    }
}

/// A source emitting events at exponentially distributed intervals.
///
/// Intervals are drawn from the random number generator of the simulation,
/// so runs with the same seed produce the same event dates. Each event is
/// emitted on the `out` port and carries its sequence number in its `index`
/// attribute.
#[derive(Debug)]
pub struct PoissonSource {
    /// Mean interval between events.
    mean: f64,
    /// Duration until the next event.
    sigma: Time,
    /// Number of events emitted so far.
    emitted: i64,
}

impl PoissonSource {
    /// Creates a new `PoissonSource` with the specified mean interval.
    ///
    /// # Panics
    ///
    /// Panics if the mean is not a positive, finite number.
    pub fn new(mean: f64) -> Self {
        assert!(
            mean.is_finite() && mean > 0.0,
            "the mean interval must be positive and finite"
        );

        Self {
            mean,
            sigma: Time::INFINITY,
            emitted: 0,
        }
    }

    fn draw(&self, cx: &mut Context<'_>) -> Time {
        let u: f64 = cx.rng().gen();
        Time::new(-self.mean * (1.0 - u).ln())
    }
}

impl Dynamics for PoissonSource {
    fn init(&mut self, _: Time, cx: &mut Context<'_>) -> DynamicsResult<Time> {
        self.emitted = 0;
        self.sigma = self.draw(cx);
        Ok(self.sigma)
    }

    fn output(&self, _: Time, output: &mut ExternalEventList) -> DynamicsResult<()> {
        output.push(ExternalEvent::new("out").with("index", self.emitted));
        Ok(())
    }

    fn time_advance(&self) -> Time {
        self.sigma
    }

    fn internal_transition(&mut self, _: Time, cx: &mut Context<'_>) -> DynamicsResult<()> {
        self.emitted += 1;
        self.sigma = self.draw(cx);
        Ok(())
    }

    fn confluent_policy(&self) -> ConfluentPolicy {
        ConfluentPolicy::InternalFirst
    }

    fn observation(&self, event: &ObservationEvent) -> Option<Value> {
        event
            .on_port("emitted")
            .then_some(Value::Integer(self.emitted))
    }
}

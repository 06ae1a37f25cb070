//! Top-level simulation loop.
//!
//! The [`Coordinator`] owns the simulators of all atomic models, the
//! schedule of their internal events, the connection graph and the
//! observation views. Each call to [`Coordinator::step`] advances the
//! simulation to the next event date and processes all events occurring at
//! that date:
//!
//! 1. the imminent set is extracted from the schedule,
//! 2. the output function of every imminent model is called,
//! 3. output events are routed through the connection graph and merged
//!    with the events injected from outside since the last step,
//! 4. every imminent or perturbed model receives exactly one transition:
//!    internal if it is only imminent, external if it only received events,
//!    confluent if both,
//! 5. the time advance of every transitioned model is queried and its next
//!    event is scheduled,
//! 6. event views observe the transitioned models,
//! 7. structural changes requested by executive models are applied,
//! 8. timed views due at that date observe their ports, unless models still
//!    have events at the same date.
//!
//! Within one step, regular models transition in ascending identifier
//! order, followed by executive models in ascending identifier order. All
//! routing decisions are computed from the outputs gathered before the
//! first transition.
//!
//! Any error aborts the step and poisons the coordinator: subsequent steps
//! return [`SimulationError::Aborted`].
//!
//! A step is never interrupted. A [`HaltHandle`] lets another thread request
//! a stop, which is honored at the beginning of the next step.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::map::Entry;
use indexmap::IndexMap;
use rand::SeedableRng;
use tracing::{debug, error, info, warn};

use crate::error::{ConfigurationError, ConsistencyError, ModelingError, SimulationError};
use crate::event::{ExternalEvent, ExternalEventList, ObservationEvent};
use crate::executive::{StructuralChange, StructureChanges};
use crate::graph::{ConnectionGraph, Couplings};
use crate::model::{ConfluentPolicy, Dynamics, ModelId, SimRng};
use crate::observation::view::View;
use crate::observation::{ObservationSink, ViewKind};
use crate::routing::{dispatch_external_events, PendingExternalEvents};
use crate::scheduler::{Scheduler, SchedulingError};
use crate::simulator::{Phase, Simulator};
use crate::time::Time;
use crate::value::Value;

/// A structural change together with the executive that requested it.
type PendingChange = (ModelId, StructuralChange);

/// Lifecycle of a [`Coordinator`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    /// Models can be attached; the simulation has not started.
    Created,
    /// The simulation is initialized and can be stepped.
    Running,
    /// The simulation has finished.
    Finished,
    /// A step failed; the simulation cannot proceed.
    Aborted,
}

/// A handle requesting a [`Coordinator`] to stop.
///
/// The request is honored at the beginning of the next step, which then
/// returns [`SimulationError::Halted`]. Handles can be cloned and sent to
/// other threads.
#[derive(Clone)]
pub struct HaltHandle(Arc<AtomicBool>);

impl HaltHandle {
    /// Requests the simulation to stop.
    pub fn halt(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

impl fmt::Debug for HaltHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HaltHandle").finish_non_exhaustive()
    }
}

/// The coordinator of a population of atomic models.
pub struct Coordinator {
    simulators: BTreeMap<ModelId, Simulator>,
    names: BTreeMap<String, ModelId>,
    scheduler: Scheduler<ModelId>,
    graph: Box<dyn ConnectionGraph>,
    views: IndexMap<String, View>,
    view_scheduler: Scheduler<usize>,
    injected: PendingExternalEvents,
    rng: SimRng,
    current: Time,
    end: Time,
    next_id: u64,
    status: Status,
    halted: Arc<AtomicBool>,
}

impl Coordinator {
    /// Creates an empty coordinator using [`Couplings`] as connection graph
    /// and `seed` to seed the random number generator lent to models.
    pub fn new(seed: u64) -> Self {
        Self::with_graph(Couplings::new(), seed)
    }

    /// Creates an empty coordinator with a custom connection graph.
    pub fn with_graph(graph: impl ConnectionGraph, seed: u64) -> Self {
        Self {
            simulators: BTreeMap::new(),
            names: BTreeMap::new(),
            scheduler: Scheduler::new(),
            graph: Box::new(graph),
            views: IndexMap::new(),
            view_scheduler: Scheduler::new(),
            injected: PendingExternalEvents::new(),
            rng: SimRng::seed_from_u64(seed),
            current: Time::ZERO,
            end: Time::INFINITY,
            next_id: 0,
            status: Status::Created,
            halted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Current lifecycle status.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Current simulation time.
    pub fn current_time(&self) -> Time {
        self.current
    }

    /// Date at which [`Coordinator::run`] stops.
    pub fn end_time(&self) -> Time {
        self.end
    }

    /// Sets the date at which [`Coordinator::run`] stops.
    pub fn set_end_time(&mut self, end: Time) {
        self.end = end;
    }

    /// Returns a handle that can stop the simulation from another thread.
    pub fn halt_handle(&self) -> HaltHandle {
        HaltHandle(self.halted.clone())
    }

    /// Number of attached models.
    pub fn len(&self) -> usize {
        self.simulators.len()
    }

    /// Returns `true` if no model is attached.
    pub fn is_empty(&self) -> bool {
        self.simulators.is_empty()
    }

    /// Identifier of the model named `name`.
    pub fn model_id(&self, name: &str) -> Option<ModelId> {
        self.names.get(name).copied()
    }

    /// Name of the model with identifier `id`.
    pub fn model_name(&self, id: ModelId) -> Option<&str> {
        self.simulators.get(&id).map(Simulator::name)
    }

    /// Simulator of the model with identifier `id`.
    pub fn simulator(&self, id: ModelId) -> Option<&Simulator> {
        self.simulators.get(&id)
    }

    /// Identifiers of the attached models, in ascending order.
    pub fn models(&self) -> impl Iterator<Item = ModelId> + '_ {
        self.simulators.keys().copied()
    }

    /// Date of the pending internal event of a model, if any.
    pub fn pending_time(&self, id: ModelId) -> Option<Time> {
        self.scheduler.pending_time(id)
    }

    /// Date of the next step, or [`Time::INFINITY`] if nothing is scheduled
    /// or the simulation is not running.
    pub fn next_time(&self) -> Time {
        if self.status != Status::Running {
            return Time::INFINITY;
        }
        let models = if self.injected.is_empty() {
            self.scheduler.peek_next_time()
        } else {
            self.current
        };

        models.min(self.view_scheduler.peek_next_time())
    }

    /// Attaches a regular model.
    ///
    /// If the simulation is running, the model is initialized at the
    /// current time and its first event is scheduled before this method
    /// returns. A model failing its initialization is not attached and the
    /// simulation is aborted.
    pub fn attach(
        &mut self,
        name: impl Into<String>,
        dynamics: impl Dynamics,
    ) -> Result<ModelId, SimulationError> {
        self.attach_boxed(name.into(), Box::new(dynamics), false)
    }

    /// Attaches an executive model, which may request structural changes
    /// during its transitions.
    pub fn attach_executive(
        &mut self,
        name: impl Into<String>,
        dynamics: impl Dynamics,
    ) -> Result<ModelId, SimulationError> {
        self.attach_boxed(name.into(), Box::new(dynamics), true)
    }

    pub(crate) fn attach_boxed(
        &mut self,
        name: String,
        dynamics: Box<dyn Dynamics>,
        executive: bool,
    ) -> Result<ModelId, SimulationError> {
        self.check_modifiable()?;
        let id = ModelId::new(self.next_id);
        self.register(id, name, dynamics, executive)?;
        self.next_id += 1;

        if self.status == Status::Running {
            let time = self.current;
            let changes = match self.init_model(id, time) {
                Ok(changes) => changes,
                Err(e) => {
                    self.scheduler.remove(id);
                    if let Some(simulator) = self.simulators.remove(&id) {
                        self.names.remove(simulator.name());
                    }
                    return Err(self.abort(e));
                }
            };
            self.apply_changes(changes, time)
                .map_err(|e| self.abort(e))?;
        }

        Ok(id)
    }

    /// Detaches a model.
    ///
    /// Its pending event, connections, queued events and observables are
    /// dropped, then the model is finished. Events later routed to it are
    /// silently discarded.
    pub fn detach(&mut self, id: ModelId) -> Result<(), SimulationError> {
        self.check_modifiable()?;
        let mut simulator = self
            .simulators
            .remove(&id)
            .ok_or(ConfigurationError::UnknownModelId(id))?;

        self.scheduler.remove(id);
        self.graph.remove_model(id);
        self.injected.remove(&id);
        self.names.remove(simulator.name());
        for view in self.views.values_mut() {
            view.remove_model(id);
        }
        if matches!(simulator.phase(), Phase::Created | Phase::Idle) {
            simulator.finish()?;
        }
        info!(model = %id, name = simulator.name(), "model detached");

        Ok(())
    }

    /// Reschedules a model whose state was changed outside of its
    /// transitions.
    ///
    /// The pending event of the model is dropped and its time advance is
    /// queried again from the current time. Returns the date of its next
    /// event.
    pub fn reschedule_after_external_change(
        &mut self,
        id: ModelId,
    ) -> Result<Time, SimulationError> {
        self.check_running()?;
        let time = self.current;
        let simulator = self
            .simulators
            .get(&id)
            .ok_or(ConfigurationError::UnknownModelId(id))?;

        self.scheduler.remove(id);
        let duration = simulator.time_advance(time)?;
        schedule(&mut self.scheduler, simulator, time, duration)?;

        Ok(time + duration)
    }

    /// Connects an output port to an input port.
    ///
    /// Returns `false` if the connection already existed.
    pub fn connect(
        &mut self,
        source: ModelId,
        output: &str,
        destination: ModelId,
        input: &str,
    ) -> Result<bool, SimulationError> {
        self.check_modifiable()?;
        self.check_model(source)?;
        self.check_model(destination)?;

        Ok(self.graph.connect(source, output, destination, input))
    }

    /// Removes a connection.
    ///
    /// Returns `false` if the connection did not exist.
    pub fn disconnect(
        &mut self,
        source: ModelId,
        output: &str,
        destination: ModelId,
        input: &str,
    ) -> Result<bool, SimulationError> {
        self.check_modifiable()?;

        Ok(self.graph.disconnect(source, output, destination, input))
    }

    /// Adds an observation view.
    ///
    /// A timed view added while the simulation runs first observes at the
    /// current time.
    pub fn add_view(
        &mut self,
        name: impl Into<String>,
        kind: ViewKind,
        sink: impl ObservationSink,
    ) -> Result<(), SimulationError> {
        self.check_modifiable()?;
        let name = name.into();
        if let ViewKind::Timed { step } = kind {
            if !step.is_finite() || step <= Time::ZERO {
                return Err(ConfigurationError::InvalidTimeStep { view: name, step }.into());
            }
        }

        match self.views.entry(name) {
            Entry::Vacant(entry) => {
                let index = entry.index();
                let name = entry.key().clone();
                entry.insert(View::new(name, kind, Box::new(sink)));
                if self.status == Status::Running && matches!(kind, ViewKind::Timed { .. }) {
                    schedule_view(&mut self.view_scheduler, index, self.current)?;
                }

                Ok(())
            }
            Entry::Occupied(entry) => {
                Err(ConfigurationError::DuplicateView(entry.key().clone()).into())
            }
        }
    }

    /// Adds a model port to the observables of a view.
    pub fn add_observable(
        &mut self,
        view: &str,
        model: ModelId,
        port: impl Into<String>,
    ) -> Result<(), SimulationError> {
        self.check_modifiable()?;
        self.check_model(model)?;
        let view = self
            .views
            .get_mut(view)
            .ok_or_else(|| ConfigurationError::UnknownView(view.to_owned()))?;
        view.add_observable(model, port.into());

        Ok(())
    }

    /// Queues an external event for a model.
    ///
    /// The event is delivered at the current time by the next step, in the
    /// same bag as the events emitted by the models imminent at that time.
    pub fn inject(&mut self, model: ModelId, event: ExternalEvent) -> Result<(), SimulationError> {
        self.check_modifiable()?;
        self.check_model(model)?;
        self.injected.entry(model).or_default().push(event);

        Ok(())
    }

    /// Queries the observable value of a model port.
    pub fn observe(&self, model: ModelId, port: &str) -> Result<Option<Value>, SimulationError> {
        let simulator = self
            .simulators
            .get(&model)
            .ok_or(ConfigurationError::UnknownModelId(model))?;

        simulator.observation(&ObservationEvent::new(self.current, "", port))
    }

    /// Initializes all models at `start` and returns the date of the first
    /// step.
    ///
    /// On failure, the schedule is discarded and the coordinator is
    /// aborted.
    pub fn init(&mut self, start: Time) -> Result<Time, SimulationError> {
        match self.status {
            Status::Created => {}
            Status::Running => return Err(SimulationError::AlreadyInitialized),
            Status::Finished => return Err(SimulationError::Finished),
            Status::Aborted => return Err(SimulationError::Aborted),
        }
        if !start.is_finite() {
            return Err(ConfigurationError::InvalidTime(start).into());
        }

        self.current = start;
        self.scheduler = Scheduler::starting_at(start);
        self.view_scheduler = Scheduler::starting_at(start);
        self.status = Status::Running;

        match self.init_all(start) {
            Ok(()) => {
                info!(time = %start, models = self.simulators.len(), "simulation initialized");

                Ok(self.next_time())
            }
            Err(e) => {
                error!(time = %start, error = %e, "simulation initialization failed");
                self.scheduler.clear(start);
                self.view_scheduler.clear(start);
                self.injected.clear();
                self.status = Status::Aborted;

                Err(e)
            }
        }
    }

    /// Processes all events at the next event date and returns that date.
    ///
    /// Returns [`Time::INFINITY`], leaving the current time unchanged, if
    /// nothing is scheduled.
    pub fn step(&mut self) -> Result<Time, SimulationError> {
        self.check_running()?;
        if self.halted.swap(false, Ordering::Relaxed) {
            info!(time = %self.current, "simulation halted");
            return Err(SimulationError::Halted);
        }

        self.step_inner().map_err(|e| self.abort(e))
    }

    /// Steps until the next event date exceeds `end` or nothing is
    /// scheduled, and returns the current time.
    pub fn run_until(&mut self, end: Time) -> Result<Time, SimulationError> {
        self.check_running()?;
        loop {
            let next = self.next_time();
            if next.is_infinite() || next > end {
                return Ok(self.current);
            }
            self.step()?;
        }
    }

    /// Steps until the end time set with [`Coordinator::set_end_time`], or
    /// until nothing is scheduled.
    pub fn run(&mut self) -> Result<Time, SimulationError> {
        self.run_until(self.end)
    }

    /// Terminates the simulation.
    ///
    /// Finish views observe their ports, then every model is finished and
    /// every sink is closed.
    pub fn finish(&mut self) -> Result<(), SimulationError> {
        if self.status == Status::Finished {
            return Err(SimulationError::Finished);
        }

        let time = self.current;
        let simulators = &self.simulators;
        for view in self.views.values_mut() {
            if view.kind() == ViewKind::Finish {
                view.observe_all(time, |id| simulators.get(&id));
            }
        }
        for simulator in self.simulators.values_mut() {
            if let Err(e) = simulator.finish() {
                warn!(model = %simulator.id(), error = %e, "model not finished");
            }
        }
        for view in self.views.values_mut() {
            view.close();
        }
        self.status = Status::Finished;
        info!(time = %time, "simulation finished");

        Ok(())
    }

    fn step_inner(&mut self) -> Result<Time, SimulationError> {
        let models = if self.injected.is_empty() {
            self.scheduler.peek_next_time()
        } else {
            self.current
        };
        let next = models.min(self.view_scheduler.peek_next_time());
        if next.is_infinite() {
            debug!(time = %self.current, "simulation is quiescent");
            return Ok(Time::INFINITY);
        }

        self.current = next;
        if models == next {
            self.process_bag(next)?;
        }
        let models_done = self.injected.is_empty() && self.scheduler.peek_next_time() != next;
        if models_done && self.view_scheduler.peek_next_time() == next {
            self.observe_timed_views(next)?;
        }

        Ok(next)
    }

    fn process_bag(&mut self, time: Time) -> Result<(), SimulationError> {
        let imminent = if self.scheduler.peek_next_time() == time {
            self.scheduler.extract_imminent_set()
        } else {
            self.scheduler.advance_to(time);
            BTreeSet::new()
        };

        let mut outputs = Vec::with_capacity(imminent.len());
        for &id in &imminent {
            let simulator = self
                .simulators
                .get_mut(&id)
                .ok_or(ConfigurationError::UnknownModelId(id))?;
            let mut output = ExternalEventList::new();
            simulator.output(time, &mut output)?;
            outputs.push((id, output));
        }

        let mut bag = PendingExternalEvents::new();
        let simulators = &self.simulators;
        for (id, output) in &outputs {
            dispatch_external_events(
                &*self.graph,
                *id,
                output,
                |target| simulators.contains_key(&target),
                &mut bag,
            );
        }
        for (id, events) in mem::take(&mut self.injected) {
            if simulators.contains_key(&id) {
                bag.entry(id).or_default().extend(events);
            } else {
                debug!(target = %id, "dropping injected events addressed to a detached model");
            }
        }
        debug!(%time, imminent = imminent.len(), perturbed = bag.len(), "step");

        let order = self.transition_order(imminent.iter().chain(bag.keys()).copied());
        let mut changes = Vec::new();
        for id in order {
            let events = bag.remove(&id);
            let is_imminent = imminent.contains(&id);
            let Some(simulator) = self.simulators.get_mut(&id) else {
                continue;
            };
            let mut structure = simulator
                .is_executive()
                .then(|| StructureChanges::new(self.next_id));

            match (is_imminent, events) {
                (true, None) => {
                    simulator.internal_transition(time, &mut self.rng, structure.as_mut())?
                }
                (false, Some(events)) => {
                    self.scheduler.remove(id);
                    simulator.external_transition(&events, time, &mut self.rng, structure.as_mut())?
                }
                (true, Some(events)) => simulator.confluent_transitions(
                    time,
                    &events,
                    &mut self.rng,
                    structure.as_mut(),
                )?,
                (false, None) => continue,
            }

            if let Some(pending) = self.scheduler.pending_time(id) {
                return Err(ConsistencyError::ImminentOverlap { model: id, pending }.into());
            }
            let duration = simulator.time_advance(time)?;
            schedule(&mut self.scheduler, simulator, time, duration)?;

            for view in self.views.values_mut() {
                if view.kind() == ViewKind::Event {
                    view.observe_model(simulator, time);
                }
            }
            if let Some(structure) = structure {
                let (next_id, requested) = structure.into_parts();
                self.next_id = next_id;
                changes.extend(requested.into_iter().map(|change| (id, change)));
            }
        }

        self.apply_changes(changes, time)
    }

    /// Initializes every model: regular models first, executives last.
    fn init_all(&mut self, start: Time) -> Result<(), SimulationError> {
        let mut changes = Vec::new();
        for id in self.transition_order(self.simulators.keys().copied()) {
            changes.extend(self.init_model(id, start)?);
        }
        self.apply_changes(changes, start)?;

        for (index, view) in self.views.values().enumerate() {
            if matches!(view.kind(), ViewKind::Timed { .. }) {
                schedule_view(&mut self.view_scheduler, index, start)?;
            }
        }

        Ok(())
    }

    /// Initializes one model and schedules its first event.
    fn init_model(&mut self, id: ModelId, time: Time) -> Result<Vec<PendingChange>, SimulationError> {
        let simulator = self
            .simulators
            .get_mut(&id)
            .ok_or(ConfigurationError::UnknownModelId(id))?;
        let mut structure = simulator
            .is_executive()
            .then(|| StructureChanges::new(self.next_id));

        let duration = simulator.init(time, &mut self.rng, structure.as_mut())?;
        schedule(&mut self.scheduler, simulator, time, duration)?;
        for view in self.views.values_mut() {
            if view.kind() == ViewKind::Event {
                view.observe_model(simulator, time);
            }
        }

        Ok(match structure {
            Some(structure) => {
                let (next_id, requested) = structure.into_parts();
                self.next_id = next_id;
                requested.into_iter().map(|change| (id, change)).collect()
            }
            None => Vec::new(),
        })
    }

    /// Applies structural changes in request order.
    ///
    /// Models created by a change are initialized at `time` and scheduled
    /// before the next change is applied.
    fn apply_changes(
        &mut self,
        changes: Vec<PendingChange>,
        time: Time,
    ) -> Result<(), SimulationError> {
        let mut queue = VecDeque::from(changes);
        while let Some((executive, change)) = queue.pop_front() {
            debug!(%executive, ?change, "structure change");
            match change {
                StructuralChange::Create {
                    id,
                    name,
                    dynamics,
                    executive: is_executive,
                } => {
                    if self.names.contains_key(&name) {
                        return Err(ModelingError::DuplicateName {
                            model: executive,
                            name: self.executive_name(executive),
                            time,
                            target: name,
                        }
                        .into());
                    }
                    self.register(id, name, dynamics, is_executive)?;
                    queue.extend(self.init_model(id, time)?);
                }
                StructuralChange::Delete { name } => {
                    let id = self.resolve(executive, &name, time)?;
                    self.detach(id)?;
                }
                StructuralChange::Connect {
                    source,
                    output,
                    destination,
                    input,
                } => {
                    let source = self.resolve(executive, &source, time)?;
                    let destination = self.resolve(executive, &destination, time)?;
                    self.graph.connect(source, &output, destination, &input);
                }
                StructuralChange::Disconnect {
                    source,
                    output,
                    destination,
                    input,
                } => {
                    let source = self.resolve(executive, &source, time)?;
                    let destination = self.resolve(executive, &destination, time)?;
                    self.graph.disconnect(source, &output, destination, &input);
                }
                StructuralChange::AddObservable { view, model, port } => {
                    let model = self.resolve(executive, &model, time)?;
                    self.add_observable(&view, model, port)?;
                }
            }
        }

        Ok(())
    }

    /// Observes the ports of the timed views due at `time` and schedules
    /// their next observation.
    fn observe_timed_views(&mut self, time: Time) -> Result<(), SimulationError> {
        let simulators = &self.simulators;
        for index in self.view_scheduler.extract_imminent_set() {
            let Some((_, view)) = self.views.get_index_mut(index) else {
                continue;
            };
            view.observe_all(time, |id| simulators.get(&id));
            if let Some(step) = view.step() {
                schedule_view(&mut self.view_scheduler, index, time + step)?;
            }
        }

        Ok(())
    }

    fn register(
        &mut self,
        id: ModelId,
        name: String,
        dynamics: Box<dyn Dynamics>,
        executive: bool,
    ) -> Result<(), ConfigurationError> {
        if self.names.contains_key(&name) {
            return Err(ConfigurationError::DuplicateModel(name));
        }
        if dynamics.confluent_policy() == ConfluentPolicy::Unspecified {
            return Err(ConfigurationError::UnspecifiedConfluentPolicy(name));
        }

        info!(model = %id, name = %name, executive, "model attached");
        self.names.insert(name.clone(), id);
        self.simulators
            .insert(id, Simulator::new(id, name, dynamics, executive));

        Ok(())
    }

    /// Orders models for transition: regular models first, then executives.
    fn transition_order(&self, ids: impl Iterator<Item = ModelId>) -> Vec<ModelId> {
        let ids: BTreeSet<ModelId> = ids.collect();
        let (mut order, executives): (Vec<ModelId>, Vec<ModelId>) =
            ids.into_iter().partition(|id| {
                self.simulators
                    .get(id)
                    .is_some_and(|simulator| !simulator.is_executive())
            });
        order.extend(executives);

        order
    }

    fn resolve(&self, executive: ModelId, name: &str, time: Time) -> Result<ModelId, ModelingError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| ModelingError::UnknownTarget {
                model: executive,
                name: self.executive_name(executive),
                time,
                target: name.to_owned(),
            })
    }

    fn executive_name(&self, executive: ModelId) -> String {
        self.model_name(executive).unwrap_or_default().to_owned()
    }

    fn check_model(&self, id: ModelId) -> Result<(), ConfigurationError> {
        if self.simulators.contains_key(&id) {
            Ok(())
        } else {
            Err(ConfigurationError::UnknownModelId(id))
        }
    }

    /// Poisons the coordinator after a failed step or a failed
    /// initialization of a model attached while running.
    fn abort(&mut self, e: SimulationError) -> SimulationError {
        error!(time = %self.current, error = %e, "simulation aborted");
        self.status = Status::Aborted;
        e
    }

    fn check_running(&self) -> Result<(), SimulationError> {
        match self.status {
            Status::Running => Ok(()),
            Status::Created => Err(SimulationError::NotInitialized),
            Status::Finished => Err(SimulationError::Finished),
            Status::Aborted => Err(SimulationError::Aborted),
        }
    }

    fn check_modifiable(&self) -> Result<(), SimulationError> {
        match self.status {
            Status::Created | Status::Running => Ok(()),
            Status::Finished => Err(SimulationError::Finished),
            Status::Aborted => Err(SimulationError::Aborted),
        }
    }
}

impl fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("status", &self.status)
            .field("current", &self.current)
            .field("models", &self.simulators.len())
            .field("scheduler", &self.scheduler)
            .field("views", &self.views.len())
            .finish_non_exhaustive()
    }
}

/// Schedules the next internal event of a model `duration` after `time`.
fn schedule(
    scheduler: &mut Scheduler<ModelId>,
    simulator: &Simulator,
    time: Time,
    duration: Time,
) -> Result<(), SimulationError> {
    scheduler
        .insert(time + duration, simulator.id())
        .map_err(|e| match e {
            SchedulingError::Duplicate { id, pending } => {
                SimulationError::from(ConsistencyError::DuplicateEntry { model: id, pending })
            }
            SchedulingError::Past { .. } | SchedulingError::NotANumber { .. } => {
                SimulationError::from(ModelingError::InvalidTimeAdvance {
                    model: simulator.id(),
                    name: simulator.name().to_owned(),
                    time,
                    duration,
                })
            }
        })
}

fn schedule_view(
    scheduler: &mut Scheduler<usize>,
    index: usize,
    time: Time,
) -> Result<(), ConfigurationError> {
    scheduler
        .insert(time, index)
        .map_err(|_| ConfigurationError::InvalidTime(time))
}

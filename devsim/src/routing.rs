//! Event routing.
//!
//! Output events are produced as a flat list per emitting model. Before
//! transitions are applied they are regrouped per destination so that each
//! destination receives its whole bag of events in a single external or
//! confluent transition.
//!
//! Destinations are kept in ordered maps: iterating over a bag visits the
//! destinations in ascending identifier order.

use std::collections::BTreeMap;

use tracing::debug;

use crate::event::{ExternalEvent, ExternalEventList};
use crate::graph::ConnectionGraph;
use crate::model::ModelId;

/// Events awaiting delivery in the current step, per destination model.
pub(crate) type PendingExternalEvents = BTreeMap<ModelId, ExternalEventList>;

/// Routes the output events of `source` through the connection graph.
///
/// Each event is copied to every connected `(model, input port)` pair, with
/// its port renamed to the input port. Targets for which `is_live` returns
/// `false` are skipped: a model deleted earlier may still appear in a stale
/// graph and its events are silently dropped.
///
/// Returns the number of delivered copies.
pub(crate) fn dispatch_external_events<G, F>(
    graph: &G,
    source: ModelId,
    events: &[ExternalEvent],
    is_live: F,
    pending: &mut PendingExternalEvents,
) -> usize
where
    G: ConnectionGraph + ?Sized,
    F: Fn(ModelId) -> bool,
{
    let mut delivered = 0;
    for event in events {
        for (target, input) in graph.targets(source, event.port()) {
            if !is_live(target) {
                debug!(
                    %source,
                    port = event.port(),
                    %target,
                    "dropping event addressed to a detached model"
                );
                continue;
            }
            pending
                .entry(target)
                .or_default()
                .push(event.retarget(&input));
            delivered += 1;
        }
    }

    delivered
}

/// Groups events per influenced destination.
///
/// `influenced` returns the destinations of one event; an event influencing
/// several destinations is copied to each of them, and a destination listed
/// twice for the same event receives it only once.
pub(crate) fn model_external_event_list<I, F>(
    events: &[ExternalEvent],
    influenced: F,
) -> BTreeMap<I, ExternalEventList>
where
    I: Ord + Copy,
    F: Fn(&ExternalEvent) -> Vec<I>,
{
    let mut map: BTreeMap<I, ExternalEventList> = BTreeMap::new();
    for event in events {
        let mut destinations = influenced(event);
        destinations.sort_unstable();
        destinations.dedup();
        for id in destinations {
            map.entry(id).or_default().push(event.clone());
        }
    }

    map
}

//! Shared accumulation state of one analysis run.
//!
//! A context is allocated per run, threaded mutably through the traversal,
//! and never shared between runs. Everything in it is additive, so the
//! traversal order can only affect internal storage order, never the
//! reported facts.

use std::collections::{BTreeMap, BTreeSet};

use crate::events::INIT_EVENT;
use crate::machine::{Machine, NodeId};

use super::items::ItemMap;

/// Accumulators for one analysis run.
#[derive(Debug, Default)]
pub(crate) struct AnalysisContext {
    /// Action name to causing events.
    pub(crate) actions: ItemMap,
    /// Guard name to causing events.
    pub(crate) guards: ItemMap,
    /// Actor source name to causing events.
    pub(crate) services: ItemMap,
    /// Delay name to causing events.
    pub(crate) delays: ItemMap,
    /// Node to the events whose processing can enter it.
    pub(crate) source_events: BTreeMap<NodeId, BTreeSet<String>>,
    /// Actor source name to every invocation id using it.
    pub(crate) service_src_to_ids: BTreeMap<String, BTreeSet<String>>,
}

impl AnalysisContext {
    /// A fresh context with the root already marked as entered by the
    /// initialization event. Everything active from the start inherits its
    /// attribution from this seed.
    pub(crate) fn new(machine: &Machine) -> Self {
        let mut context = AnalysisContext::default();
        context.enter_state(machine.root(), INIT_EVENT);
        context
    }

    /// Record that processing `event` can enter `node`.
    pub(crate) fn enter_state(&mut self, node: NodeId, event: &str) {
        self.source_events
            .entry(node)
            .or_default()
            .insert(event.to_owned());
    }

    /// Record that processing any of `events` can enter `node`.
    pub(crate) fn enter_state_all(&mut self, node: NodeId, events: &BTreeSet<String>) {
        self.source_events
            .entry(node)
            .or_default()
            .extend(events.iter().cloned());
    }

    /// Events recorded as entering `node`, if any.
    pub(crate) fn source_events(&self, node: NodeId) -> Option<&BTreeSet<String>> {
        self.source_events.get(&node)
    }

    /// Record an invocation: its source becomes a known actor even before
    /// any causing event is found, and the source-to-ids index gains the
    /// invocation id.
    pub(crate) fn record_invocation(&mut self, src: &str, id: &str) {
        self.services.add_item(src);
        self.service_src_to_ids
            .entry(src.to_owned())
            .or_default()
            .insert(id.to_owned());
    }
}

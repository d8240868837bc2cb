//! Turns a finished analysis context into the report.
//!
//! The accumulators are insertion-ordered and node-indexed; everything
//! here is about materializing them into the sorted, name-indexed shape
//! consumers read. Runtime-owned names are dropped, required flags are
//! recomputed over what remains, and the synthetic events the machine can
//! raise are gathered into one list.

use std::collections::{BTreeMap, BTreeSet};

use crate::analysis::context::AnalysisContext;
use crate::analysis::{ItemMap, ItemReport};
use crate::events;
use crate::machine::{Machine, NodeId, StateKind};

use super::data::{MissingImplementations, StateSchema, StateSources, TypegenData};

/// Assemble the report for a finished analysis run.
pub(crate) fn assemble(machine: &Machine, ctx: &AnalysisContext) -> TypegenData {
    let options = machine.options();
    let actions = category_report(&ctx.actions, |name| options.provides_action(name));
    let guards = category_report(&ctx.guards, |name| options.provides_guard(name));
    let services = category_report(&ctx.services, |name| options.provides_service(name));
    let delays = category_report(&ctx.delays, |name| options.provides_delay(name));

    let missing_implementations = MissingImplementations {
        actions: required_names(&actions),
        delays: required_names(&delays),
        guards: required_names(&guards),
        services: required_names(&services),
    };

    TypegenData {
        states: state_sources(machine, ctx),
        state_schema: schema_below(machine, machine.root()),
        internal_events: internal_events(ctx),
        actor_source_to_invocation_ids: ctx
            .service_src_to_ids
            .iter()
            .map(|(src, ids)| (src.clone(), ids.iter().cloned().collect()))
            .collect(),
        actions,
        guards,
        services,
        delays,
        missing_implementations,
    }
}

/// Materialize one category, dropping runtime-owned names. The category
/// flag is recomputed afterwards so a runtime-owned name alone can never
/// mark a category as requiring implementations.
fn category_report<F>(map: &ItemMap, provided: F) -> ItemReport
where
    F: Fn(&str) -> bool,
{
    let mut report = map.to_report(provided);
    report
        .lines
        .retain(|line| !events::is_reserved_name(&line.name));
    report.any_required = report.lines.iter().any(|line| line.required);
    report
}

/// Names the machine uses but the options do not provide. Lines are
/// already sorted, so the result is too.
fn required_names(report: &ItemReport) -> Vec<String> {
    report
        .lines
        .iter()
        .filter(|line| line.required)
        .map(|line| line.name.clone())
        .collect()
}

fn state_sources(machine: &Machine, ctx: &AnalysisContext) -> Vec<StateSources> {
    let mut states: Vec<StateSources> = machine
        .nodes()
        .map(|(id, node)| StateSources {
            id: node.id.clone(),
            source_events: ctx
                .source_events(id)
                .map(|events| events.iter().cloned().collect())
                .unwrap_or_default(),
        })
        .collect();
    states.sort_by(|a, b| a.id.cmp(&b.id));
    states
}

fn schema_below(machine: &Machine, node: NodeId) -> StateSchema {
    let mut keys = BTreeMap::new();
    for &child in machine.children(node) {
        let state = machine.node(child);
        if state.kind == StateKind::History {
            continue;
        }
        keys.insert(state.key.clone(), schema_below(machine, child));
    }
    StateSchema(keys)
}

/// Machine-raised events a consumer must still declare: the
/// initialization event always, every empty or runtime-shaped event the
/// analysis saw, and the completion/error pair of every identified
/// invocation.
fn internal_events(ctx: &AnalysisContext) -> Vec<String> {
    let mut internal: BTreeSet<String> = BTreeSet::new();
    internal.insert(events::INIT_EVENT.to_owned());

    let seen = ctx
        .source_events
        .values()
        .flatten()
        .chain(ctx.actions.iter().flat_map(|(_, events)| events))
        .chain(ctx.guards.iter().flat_map(|(_, events)| events))
        .chain(ctx.services.iter().flat_map(|(_, events)| events))
        .chain(ctx.delays.iter().flat_map(|(_, events)| events));
    for event in seen {
        if events::is_internal_event(event) {
            internal.insert(event.clone());
        }
    }

    for ids in ctx.service_src_to_ids.values() {
        for id in ids {
            internal.insert(events::done_invoke(id));
            internal.insert(events::error_platform(id));
        }
    }

    internal.into_iter().collect()
}

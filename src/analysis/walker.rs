//! The two reachability passes over the state tree.
//!
//! Pass one visits every node unconditionally: it registers invocation
//! sources, attributes exit actions to the forced-stop event, and resolves
//! every outgoing transition, which is what populates the source-events
//! map. Pass two then knows which events can enter each node and uses the
//! enterable closure to attribute entry actions, invocations, and named
//! delays to those events. History children are targets, not regions, and
//! are skipped by both passes.

use std::collections::BTreeSet;

use crate::events::{INLINE_ITEM, STOP_EVENT};
use crate::machine::{Machine, NodeId, StateKind};

use super::context::AnalysisContext;
use super::transitions::{collect_actions, resolve_transition};

/// Pass one: unconditional facts, pre-order over the whole tree.
pub(crate) fn collect_simple_information(
    machine: &Machine,
    ctx: &mut AnalysisContext,
    node: NodeId,
) {
    let state = machine.node(node);

    for invocation in &state.invocations {
        if invocation.src == INLINE_ITEM {
            continue;
        }
        ctx.record_invocation(&invocation.src, &invocation.id);
    }

    // Exit actions always fire when the machine is stopped, whether or not
    // any transition ever leaves this state.
    if !state.exit.is_empty() {
        let stop = BTreeSet::from([STOP_EVENT.to_owned()]);
        collect_actions(machine, ctx, &stop, &state.exit);
    }

    for transition in &state.transitions {
        resolve_transition(machine, ctx, node, transition);
    }

    for &child in machine.children(node) {
        if machine.node(child).kind == StateKind::History {
            continue;
        }
        collect_simple_information(machine, ctx, child);
    }
}

/// Pass two: attribute entry-side effects to the events that can enter
/// each node. Unreachable nodes are skipped but their descendants are
/// still visited, since a descendant can be entered directly by id.
pub(crate) fn collect_enterables(machine: &Machine, ctx: &mut AnalysisContext, node: NodeId) {
    let events = ctx.source_events(node).cloned();
    if let Some(events) = events {
        for member in enterable_closure(machine, node) {
            let state = machine.node(member);
            for invocation in &state.invocations {
                if invocation.src == INLINE_ITEM {
                    continue;
                }
                ctx.services
                    .add_event_to_item(&invocation.src, events.iter().cloned());
            }
            for delayed in &state.delayed {
                if let Some(name) = delayed.delay.name() {
                    ctx.delays.add_event_to_item(name, events.iter().cloned());
                }
            }
            collect_actions(machine, ctx, &events, &state.entry);
        }
    }

    for &child in machine.children(node) {
        if machine.node(child).kind == StateKind::History {
            continue;
        }
        collect_enterables(machine, ctx, child);
    }
}

/// Everything that becomes active when `node` is entered: the node itself
/// plus, for every default initial leaf, the chain between that leaf and
/// `node` inclusive.
fn enterable_closure(machine: &Machine, node: NodeId) -> Vec<NodeId> {
    let mut closure = vec![node];
    let mut seen = BTreeSet::from([node]);
    for leaf in machine.initial_leaves(node) {
        let mut current = leaf;
        loop {
            if seen.insert(current) {
                closure.push(current);
            }
            if current == node {
                break;
            }
            match machine.parent(current) {
                Some(parent) => current = parent,
                None => break,
            }
        }
    }
    closure
}

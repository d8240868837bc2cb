//! Completion analysis: what happens when final states are reached.
//!
//! Reaching a final state completes its parent, which can in turn complete
//! a parallel ancestor once every sibling region is final. The events that
//! can finalize each region therefore become exit-action triggers well
//! beyond the region itself. This pass finds the relevant final states,
//! walks their exit chains, and synchronizes attribution across parallel
//! boundaries: a parallel state only completes when all regions are final
//! at once, so each region's finalizing events also fire the other
//! regions' exits.

use std::collections::BTreeSet;

use crate::machine::{Machine, NodeId, StateKind};

use super::context::AnalysisContext;
use super::transitions::collect_actions;

/// The point where a final state's upward exit walk met a parallel
/// ancestor: the events that finalize the region, and the nodes whose
/// exits those events were attributed to.
struct Boundary {
    events: BTreeSet<String>,
    visited: Vec<NodeId>,
}

/// Attribute completion-driven exits across the whole machine.
pub(crate) fn analyze_completion(machine: &Machine, ctx: &mut AnalysisContext) {
    let mut boundaries: Vec<Boundary> = Vec::new();

    for final_state in relevant_final_states(machine, machine.root()) {
        let Some(events) = ctx.source_events(final_state).cloned() else {
            continue;
        };

        let mut visited = Vec::new();
        let mut current = final_state;
        loop {
            collect_actions(machine, ctx, &events, &machine.node(current).exit);
            visited.push(current);
            match machine.parent(current) {
                Some(parent) if machine.node(parent).kind == StateKind::Parallel => {
                    boundaries.push(Boundary { events, visited });
                    break;
                }
                Some(parent) => current = parent,
                None => break,
            }
        }
    }

    // Pairwise synchronization: each boundary's finalizing events also
    // exit every other boundary's visited chain.
    for first in 0..boundaries.len() {
        for second in (first + 1)..boundaries.len() {
            for &node in &boundaries[second].visited {
                collect_actions(
                    machine,
                    ctx,
                    &boundaries[first].events,
                    &machine.node(node).exit,
                );
            }
            for &node in &boundaries[first].visited {
                collect_actions(
                    machine,
                    ctx,
                    &boundaries[second].events,
                    &machine.node(node).exit,
                );
            }
        }
    }

    // The union of all finalizing events exits every ancestor of any
    // boundary node, each ancestor visited once.
    let mut completion: BTreeSet<String> = BTreeSet::new();
    for boundary in &boundaries {
        completion.extend(boundary.events.iter().cloned());
    }
    if completion.is_empty() {
        return;
    }
    let mut visited_ancestors: BTreeSet<NodeId> = BTreeSet::new();
    for boundary in &boundaries {
        let Some(&boundary_node) = boundary.visited.last() else {
            continue;
        };
        let mut current = boundary_node;
        while let Some(parent) = machine.parent(current) {
            if !visited_ancestors.insert(parent) {
                break;
            }
            collect_actions(machine, ctx, &completion, &machine.node(parent).exit);
            current = parent;
        }
    }
}

/// Final states that can contribute to completion.
///
/// A compound contributes its final children plus anything reachable
/// recursively below; a parallel contributes all of its regions' finals,
/// but only when every region has at least one. A region that can never
/// finish makes the whole parallel state uncompletable, so its siblings'
/// finals are irrelevant too.
fn relevant_final_states(machine: &Machine, node: NodeId) -> Vec<NodeId> {
    match machine.node(node).kind {
        StateKind::Final => vec![node],
        StateKind::Atomic | StateKind::History => Vec::new(),
        StateKind::Compound => machine
            .children(node)
            .iter()
            .copied()
            .filter(|&child| machine.node(child).kind != StateKind::History)
            .flat_map(|child| relevant_final_states(machine, child))
            .collect(),
        StateKind::Parallel => {
            let per_region: Vec<Vec<NodeId>> = machine
                .children(node)
                .iter()
                .copied()
                .filter(|&child| machine.node(child).kind != StateKind::History)
                .map(|child| relevant_final_states(machine, child))
                .collect();
            if per_region.iter().all(|finals| !finals.is_empty()) {
                per_region.concat()
            } else {
                Vec::new()
            }
        }
    }
}

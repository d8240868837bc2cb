//! Transition resolution: which side effects can one transition cause.
//!
//! Resolving a transition attributes its guard and actions to its event,
//! then works out which states the event can enter and which exit actions
//! it can fire. Internal transitions (target inside the source's subtree)
//! enter the chain down to the target and abandon untaken sibling
//! subtrees; external transitions exit up to the least common ancestor and
//! enter down the target's path. Nothing here recurses into children on
//! its own; the walker drives the traversal.

use std::collections::BTreeSet;

use crate::machine::{Action, Machine, NodeId, StateKind, Transition};

use super::context::AnalysisContext;

/// Attribute one transition's side effects to its event.
pub(crate) fn resolve_transition(
    machine: &Machine,
    ctx: &mut AnalysisContext,
    source: NodeId,
    transition: &Transition,
) {
    let events = BTreeSet::from([transition.event.clone()]);
    if let Some(guard) = &transition.guard {
        ctx.guards.add_event_to_item(guard, events.iter().cloned());
    }
    collect_actions(machine, ctx, &events, &transition.actions);

    for &target in &transition.targets {
        if target == source {
            // A self-target moves nothing unless it reenters.
            if transition.reenter {
                reenter_source(machine, ctx, &events, source);
            }
        } else if machine.is_descendant(target, source) {
            resolve_internal(machine, ctx, &events, source, target, transition.reenter);
        } else {
            resolve_external(machine, ctx, &events, source, target);
        }
    }
}

/// A reentering self-target abandons the source's current child
/// configuration, then the source runs its own exit and entry effects.
fn reenter_source(
    machine: &Machine,
    ctx: &mut AnalysisContext,
    events: &BTreeSet<String>,
    source: NodeId,
) {
    ctx.enter_state_all(source, events);
    for &child in machine.children(source) {
        collect_exit_tree(machine, ctx, events, child);
    }
    collect_actions(machine, ctx, events, &machine.node(source).exit);
}

/// Target inside the source's subtree: enter the chain from the target up
/// to (excluding) the source, and exit every source child subtree the
/// chain does not pass through.
fn resolve_internal(
    machine: &Machine,
    ctx: &mut AnalysisContext,
    events: &BTreeSet<String>,
    source: NodeId,
    target: NodeId,
    reenter: bool,
) {
    let mut entered = BTreeSet::new();
    let mut current = target;
    loop {
        entered.insert(current);
        match machine.parent(current) {
            Some(parent) if parent != source => current = parent,
            _ => break,
        }
    }
    if reenter {
        entered.insert(source);
    }

    for &node in &entered {
        ctx.enter_state_all(node, events);
    }
    for &child in machine.children(source) {
        if !subtree_intersects(machine, child, &entered) {
            collect_exit_tree(machine, ctx, events, child);
        }
    }
    if reenter {
        collect_actions(machine, ctx, events, &machine.node(source).exit);
    }
}

/// Target outside the source's subtree: the whole source subtree is
/// abandoned, ancestors up to the least common ancestor are exited, and
/// the target's path below the ancestor is entered.
fn resolve_external(
    machine: &Machine,
    ctx: &mut AnalysisContext,
    events: &BTreeSet<String>,
    source: NodeId,
    target: NodeId,
) {
    for &child in machine.children(source) {
        collect_exit_tree(machine, ctx, events, child);
    }
    collect_actions(machine, ctx, events, &machine.node(source).exit);

    let ancestor = common_ancestor(machine, source, target);
    let mut current = source;
    while let Some(parent) = machine.parent(current) {
        if parent == ancestor {
            break;
        }
        collect_actions(machine, ctx, events, &machine.node(parent).exit);
        current = parent;
    }

    let target_path = &machine.node(target).path;
    let ancestor_depth = machine.node(ancestor).path.len();
    let mut current = ancestor;
    for key in &target_path[ancestor_depth..] {
        match machine.child_by_key(current, key) {
            Some(child) => {
                ctx.enter_state_all(child, events);
                current = child;
            }
            None => break,
        }
    }
}

/// Least common ancestor of two nodes, found by comparing their paths
/// position by position and descending to the shared prefix.
fn common_ancestor(machine: &Machine, a: NodeId, b: NodeId) -> NodeId {
    let path_a = &machine.node(a).path;
    let path_b = &machine.node(b).path;
    let mut shared = 0;
    while shared < path_a.len() && shared < path_b.len() && path_a[shared] == path_b[shared] {
        shared += 1;
    }
    let mut current = machine.root();
    for key in &path_a[..shared] {
        match machine.child_by_key(current, key) {
            Some(child) => current = child,
            None => break,
        }
    }
    current
}

/// True when `members` contains `node` or any of its descendants.
fn subtree_intersects(machine: &Machine, node: NodeId, members: &BTreeSet<NodeId>) -> bool {
    members
        .iter()
        .any(|&member| member == node || machine.is_descendant(member, node))
}

/// Exit actions of `node` and every non-history descendant, attributed to
/// `events`.
fn collect_exit_tree(
    machine: &Machine,
    ctx: &mut AnalysisContext,
    events: &BTreeSet<String>,
    node: NodeId,
) {
    collect_actions(machine, ctx, events, &machine.node(node).exit);
    for &child in machine.children(node) {
        if machine.node(child).kind == StateKind::History {
            continue;
        }
        collect_exit_tree(machine, ctx, events, child);
    }
}

/// Attribute a list of actions to `events`, expanding conditional
/// composites in place: branch guards and branch actions inherit the outer
/// events rather than getting a trigger of their own. Names whose provided
/// implementation is itself composite are expanded the same way.
pub(crate) fn collect_actions(
    machine: &Machine,
    ctx: &mut AnalysisContext,
    events: &BTreeSet<String>,
    actions: &[Action],
) {
    let mut expanding = Vec::new();
    collect_into(machine, ctx, events, actions, &mut expanding);
}

fn collect_into<'m>(
    machine: &'m Machine,
    ctx: &mut AnalysisContext,
    events: &BTreeSet<String>,
    actions: &'m [Action],
    expanding: &mut Vec<&'m str>,
) {
    for action in actions {
        match action {
            Action::Named(name) => {
                ctx.actions.add_event_to_item(name, events.iter().cloned());
                // A provided body that mentions its own name stops here.
                if expanding.iter().any(|seen| *seen == name.as_str()) {
                    continue;
                }
                if let Some(body) = machine.provided_composite(name) {
                    expanding.push(name.as_str());
                    collect_into(machine, ctx, events, std::slice::from_ref(body), expanding);
                    expanding.pop();
                }
            }
            Action::Choose(branches) => {
                for branch in branches {
                    if let Some(guard) = &branch.guard {
                        ctx.guards.add_event_to_item(guard, events.iter().cloned());
                    }
                    collect_into(machine, ctx, events, &branch.actions, expanding);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::{ActionDefinition, MachineDefinition, MachineOptions};
    use serde_json::json;

    fn machine_with(definition: serde_json::Value, options: MachineOptions) -> Machine {
        let definition: MachineDefinition = serde_json::from_value(definition).unwrap();
        Machine::new(&definition, options).unwrap()
    }

    fn machine(definition: serde_json::Value) -> Machine {
        machine_with(definition, MachineOptions::new())
    }

    /// Resolve every transition on `id` answering to `event`.
    fn resolve(machine: &Machine, ctx: &mut AnalysisContext, id: &str, event: &str) {
        let node = machine.node_by_id(id).unwrap();
        let transitions: Vec<Transition> = machine
            .node(node)
            .transitions
            .iter()
            .filter(|t| t.event == event)
            .cloned()
            .collect();
        assert!(!transitions.is_empty(), "no `{event}` transition on `{id}`");
        for transition in &transitions {
            resolve_transition(machine, ctx, node, transition);
        }
    }

    fn action_events(ctx: &AnalysisContext, name: &str) -> Vec<String> {
        ctx.actions
            .events(name)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn entered_by(machine: &Machine, ctx: &AnalysisContext, id: &str) -> Vec<String> {
        let node = machine.node_by_id(id).unwrap();
        ctx.source_events(node)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    #[test]
    fn cross_branch_transitions_exit_up_to_but_not_including_the_ancestor() {
        let machine = machine(json!({
            "states": {
                "a": {
                    "entry": ["enterA"],
                    "exit": ["exitA"],
                    "states": {
                        "b": {
                            "exit": ["exitB"],
                            "states": {
                                "c": { "exit": ["exitC"], "on": { "GO": "#machine.a.d" } }
                            }
                        },
                        "d": { "entry": ["enterD"], "exit": ["exitD"] }
                    }
                }
            }
        }));
        let mut ctx = AnalysisContext::new(&machine);

        resolve(&machine, &mut ctx, "machine.a.b.c", "GO");

        assert_eq!(action_events(&ctx, "exitC"), ["GO"]);
        assert_eq!(action_events(&ctx, "exitB"), ["GO"]);
        assert!(action_events(&ctx, "exitA").is_empty());
        assert!(action_events(&ctx, "exitD").is_empty());
        assert_eq!(entered_by(&machine, &ctx, "machine.a.d"), ["GO"]);
        assert!(entered_by(&machine, &ctx, "machine.a").is_empty());
    }

    #[test]
    fn internal_transitions_enter_the_chain_and_abandon_untaken_siblings() {
        let machine = machine(json!({
            "states": {
                "box": {
                    "exit": ["exitBox"],
                    "on": { "DIVE": ".keep.deep" },
                    "states": {
                        "keep": { "states": { "deep": {} } },
                        "drop": {
                            "exit": ["exitDrop"],
                            "states": { "inner": { "exit": ["exitInner"] } }
                        }
                    }
                }
            }
        }));
        let mut ctx = AnalysisContext::new(&machine);

        resolve(&machine, &mut ctx, "machine.box", "DIVE");

        assert_eq!(entered_by(&machine, &ctx, "machine.box.keep"), ["DIVE"]);
        assert_eq!(entered_by(&machine, &ctx, "machine.box.keep.deep"), ["DIVE"]);
        assert_eq!(action_events(&ctx, "exitDrop"), ["DIVE"]);
        assert_eq!(action_events(&ctx, "exitInner"), ["DIVE"]);
        // The source itself neither exits nor re-enters without reenter.
        assert!(action_events(&ctx, "exitBox").is_empty());
        assert!(entered_by(&machine, &ctx, "machine.box").is_empty());
    }

    #[test]
    fn reentering_internal_transitions_add_the_source_itself() {
        let machine = machine(json!({
            "states": {
                "box": {
                    "exit": ["exitBox"],
                    "on": { "DIVE": { "target": ".keep", "reenter": true } },
                    "states": { "keep": {}, "drop": { "exit": ["exitDrop"] } }
                }
            }
        }));
        let mut ctx = AnalysisContext::new(&machine);

        resolve(&machine, &mut ctx, "machine.box", "DIVE");

        assert_eq!(entered_by(&machine, &ctx, "machine.box"), ["DIVE"]);
        assert_eq!(entered_by(&machine, &ctx, "machine.box.keep"), ["DIVE"]);
        assert_eq!(action_events(&ctx, "exitBox"), ["DIVE"]);
        assert_eq!(action_events(&ctx, "exitDrop"), ["DIVE"]);
    }

    #[test]
    fn plain_self_targets_cause_no_movement() {
        let machine = machine(json!({
            "states": {
                "x": {
                    "entry": ["enterX"],
                    "exit": ["exitX"],
                    "on": { "PING": { "target": "x", "actions": ["pong"] } },
                    "states": { "child": { "exit": ["exitChild"] } }
                }
            }
        }));
        let mut ctx = AnalysisContext::new(&machine);

        resolve(&machine, &mut ctx, "machine.x", "PING");

        assert_eq!(action_events(&ctx, "pong"), ["PING"]);
        assert!(action_events(&ctx, "exitX").is_empty());
        assert!(action_events(&ctx, "exitChild").is_empty());
        assert!(entered_by(&machine, &ctx, "machine.x").is_empty());
    }

    #[test]
    fn reentering_self_targets_exit_and_re_enter_the_source() {
        let machine = machine(json!({
            "states": {
                "x": {
                    "exit": ["exitX"],
                    "on": { "RESET": { "target": "x", "reenter": true } },
                    "states": { "child": { "exit": ["exitChild"] } }
                }
            }
        }));
        let mut ctx = AnalysisContext::new(&machine);

        resolve(&machine, &mut ctx, "machine.x", "RESET");

        assert_eq!(action_events(&ctx, "exitX"), ["RESET"]);
        assert_eq!(action_events(&ctx, "exitChild"), ["RESET"]);
        assert_eq!(entered_by(&machine, &ctx, "machine.x"), ["RESET"]);
    }

    #[test]
    fn targetless_transitions_register_only_guard_and_actions() {
        let machine = machine(json!({
            "states": {
                "x": {
                    "exit": ["exitX"],
                    "on": { "LOG": { "guard": "shouldLog", "actions": ["writeLog"] } }
                }
            }
        }));
        let mut ctx = AnalysisContext::new(&machine);

        resolve(&machine, &mut ctx, "machine.x", "LOG");

        assert_eq!(action_events(&ctx, "writeLog"), ["LOG"]);
        let guard_events: Vec<_> = ctx.guards.events("shouldLog").unwrap().iter().cloned().collect();
        assert_eq!(guard_events, ["LOG"]);
        assert!(action_events(&ctx, "exitX").is_empty());
    }

    #[test]
    fn multi_target_transitions_resolve_every_target() {
        let machine = machine(json!({
            "states": {
                "sync": {
                    "on": { "SPLIT": { "target": ["#machine.grid.row.two", "#machine.grid.col.beta"] } }
                },
                "grid": {
                    "type": "parallel",
                    "states": {
                        "row": { "states": { "one": {}, "two": {} } },
                        "col": { "states": { "alpha": {}, "beta": {} } }
                    }
                }
            }
        }));
        let mut ctx = AnalysisContext::new(&machine);

        resolve(&machine, &mut ctx, "machine.sync", "SPLIT");

        assert_eq!(entered_by(&machine, &ctx, "machine.grid.row.two"), ["SPLIT"]);
        assert_eq!(entered_by(&machine, &ctx, "machine.grid.col.beta"), ["SPLIT"]);
        assert_eq!(entered_by(&machine, &ctx, "machine.grid"), ["SPLIT"]);
    }

    #[test]
    fn transitions_to_an_ancestor_exit_the_abandoned_chain() {
        let machine = machine(json!({
            "states": {
                "a": {
                    "exit": ["exitA"],
                    "states": {
                        "b": {
                            "exit": ["exitB"],
                            "states": {
                                "c": { "exit": ["exitC"], "on": { "UP": "#machine.a" } }
                            }
                        }
                    }
                }
            }
        }));
        let mut ctx = AnalysisContext::new(&machine);

        resolve(&machine, &mut ctx, "machine.a.b.c", "UP");

        assert_eq!(action_events(&ctx, "exitC"), ["UP"]);
        assert_eq!(action_events(&ctx, "exitB"), ["UP"]);
        // The ancestor itself stays active, so its exit is not attributed.
        assert!(action_events(&ctx, "exitA").is_empty());
    }

    #[test]
    fn choose_branches_inherit_the_outer_event() {
        let machine = machine(json!({
            "states": {
                "x": {
                    "on": {
                        "DECIDE": {
                            "actions": [{
                                "choose": [
                                    { "guard": "isReady", "actions": ["launch"] },
                                    { "actions": ["hold"] }
                                ]
                            }]
                        }
                    }
                }
            }
        }));
        let mut ctx = AnalysisContext::new(&machine);

        resolve(&machine, &mut ctx, "machine.x", "DECIDE");

        assert_eq!(action_events(&ctx, "launch"), ["DECIDE"]);
        assert_eq!(action_events(&ctx, "hold"), ["DECIDE"]);
        let guard_events: Vec<_> = ctx.guards.events("isReady").unwrap().iter().cloned().collect();
        assert_eq!(guard_events, ["DECIDE"]);
    }

    #[test]
    fn provided_composite_bodies_expand_where_referenced() {
        let decide: ActionDefinition = serde_json::from_value(json!({
            "choose": [
                { "guard": "quorum", "actions": ["commit"] },
                { "actions": ["retry", "decide"] }
            ]
        }))
        .unwrap();
        let options = MachineOptions::new().action_body("decide", decide);
        let machine = machine_with(
            json!({
                "states": {
                    "x": { "on": { "VOTE": { "actions": ["decide"] } } }
                }
            }),
            options,
        );
        let mut ctx = AnalysisContext::new(&machine);

        resolve(&machine, &mut ctx, "machine.x", "VOTE");

        assert_eq!(action_events(&ctx, "decide"), ["VOTE"]);
        assert_eq!(action_events(&ctx, "commit"), ["VOTE"]);
        assert_eq!(action_events(&ctx, "retry"), ["VOTE"]);
        let guard_events: Vec<_> = ctx.guards.events("quorum").unwrap().iter().cloned().collect();
        assert_eq!(guard_events, ["VOTE"]);
    }
}

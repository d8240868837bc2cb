//! Definition lowering: unresolved trees in, linked arenas out.
//!
//! Building happens in two phases. The first walks the definition tree and
//! allocates one arena node per state, applying the defaulting rules for
//! ids and kinds. The second links everything that may point forward:
//! initial children, transition targets, and the synthesized handlers for
//! `always`, `after`, `onDone`, and invocation outcomes. Targets can name
//! states that appear later in the document, which is why linking cannot
//! happen during the first walk.

use std::collections::BTreeMap;

use thiserror::Error;

use super::definition::{ActionDefinition, MachineDefinition, StateDefinition, TransitionDefinition};
use super::node::{
    Action, ChooseBranch, DelaySpec, DelayedTransition, Invocation, NodeId, StateKind, StateNode,
    Transition,
};
use super::{Machine, MachineOptions};
use crate::events;

/// Id given to a root state that does not declare one.
pub const DEFAULT_MACHINE_ID: &str = "machine";

/// Errors that can occur while lowering a definition into a machine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    /// Two states resolved to the same id.
    #[error("duplicate state id `{id}`; explicit ids must be unique across the machine")]
    DuplicateId {
        /// The id that was claimed twice.
        id: String,
    },

    /// A transition target did not resolve to any state.
    #[error("state `{state}` targets `{target}`, which does not resolve to any state")]
    UnknownTarget {
        /// Id of the state declaring the transition.
        state: String,
        /// The target descriptor as written.
        target: String,
    },

    /// A state's `initial` key does not name one of its children.
    #[error("state `{state}` declares initial child `{initial}`, but has no child with that key")]
    UnknownInitial {
        /// Id of the state declaring the initial key.
        state: String,
        /// The initial key as written.
        initial: String,
    },

    /// The root state was declared as a history state.
    #[error("the root state cannot be a history state")]
    HistoryRoot,
}

/// Lower a definition into a linked machine.
pub(super) fn build(
    definition: &MachineDefinition,
    options: MachineOptions,
) -> Result<Machine, BuildError> {
    let mut builder = Builder {
        nodes: Vec::new(),
        ids: BTreeMap::new(),
        pending: Vec::new(),
    };

    let root = builder.lower(None, String::new(), definition)?;
    if builder.nodes[root.0].kind == StateKind::History {
        return Err(BuildError::HistoryRoot);
    }
    builder.link()?;

    let composites = resolve_composites(&options);
    Ok(Machine {
        nodes: builder.nodes,
        root,
        ids: builder.ids,
        options,
        composites,
    })
}

struct Builder<'d> {
    nodes: Vec<StateNode>,
    ids: BTreeMap<String, NodeId>,
    pending: Vec<(NodeId, &'d StateDefinition)>,
}

impl<'d> Builder<'d> {
    /// Phase one: allocate arena nodes depth-first. Parents are pushed
    /// before their children, the invariant every upward walk relies on.
    fn lower(
        &mut self,
        parent: Option<NodeId>,
        key: String,
        def: &'d StateDefinition,
    ) -> Result<NodeId, BuildError> {
        let (id, path) = match parent {
            None => (
                def.id
                    .clone()
                    .unwrap_or_else(|| DEFAULT_MACHINE_ID.to_owned()),
                Vec::new(),
            ),
            Some(parent_id) => {
                let parent_node = &self.nodes[parent_id.0];
                let mut path = parent_node.path.clone();
                path.push(key.clone());
                let id = def
                    .id
                    .clone()
                    .unwrap_or_else(|| format!("{}.{}", parent_node.id, key));
                (id, path)
            }
        };

        let kind = def.kind.unwrap_or(if def.states.is_empty() {
            StateKind::Atomic
        } else {
            StateKind::Compound
        });

        let node_id = NodeId(self.nodes.len());
        if self.ids.insert(id.clone(), node_id).is_some() {
            return Err(BuildError::DuplicateId { id });
        }
        self.nodes.push(StateNode {
            id,
            key,
            path,
            parent,
            kind,
            children: Vec::new(),
            initial: None,
            entry: def.entry.iter().map(resolve_action).collect(),
            exit: def.exit.iter().map(resolve_action).collect(),
            invocations: Vec::new(),
            delayed: Vec::new(),
            transitions: Vec::new(),
        });
        self.pending.push((node_id, def));

        for (child_key, child_def) in &def.states {
            let child = self.lower(Some(node_id), child_key.clone(), child_def)?;
            self.nodes[node_id.0].children.push(child);
        }
        Ok(node_id)
    }

    /// Phase two: resolve everything that may reference a later state.
    fn link(&mut self) -> Result<(), BuildError> {
        let pending = std::mem::take(&mut self.pending);
        for (node, def) in pending {
            self.link_initial(node, def)?;
            self.link_handlers(node, def)?;
        }
        Ok(())
    }

    fn link_initial(&mut self, node: NodeId, def: &StateDefinition) -> Result<(), BuildError> {
        if self.nodes[node.0].kind != StateKind::Compound {
            return Ok(());
        }
        let initial = match &def.initial {
            Some(key) => {
                self.child_by_key(node, key)
                    .ok_or_else(|| BuildError::UnknownInitial {
                        state: self.nodes[node.0].id.clone(),
                        initial: key.clone(),
                    })?
            }
            // First non-history child in document order.
            None => {
                match self
                    .nodes[node.0]
                    .children
                    .iter()
                    .copied()
                    .find(|child| self.nodes[child.0].kind != StateKind::History)
                {
                    Some(child) => child,
                    None => return Ok(()),
                }
            }
        };
        self.nodes[node.0].initial = Some(initial);
        Ok(())
    }

    /// Resolve `on` handlers and materialize the synthesized ones: always
    /// handlers listen on the empty event, `after` handlers on their timer
    /// event, `onDone` on the state's completion event, and invocation
    /// handlers on their done/error pair.
    fn link_handlers(&mut self, node: NodeId, def: &StateDefinition) -> Result<(), BuildError> {
        let source_id = self.nodes[node.0].id.clone();

        for (event, candidates) in &def.on {
            for candidate in candidates.iter() {
                let transition = self.resolve_transition(node, event.clone(), candidate)?;
                self.nodes[node.0].transitions.push(transition);
            }
        }

        for candidate in def.always.iter() {
            let transition = self.resolve_transition(node, String::new(), candidate)?;
            self.nodes[node.0].transitions.push(transition);
        }

        for (raw_delay, candidates) in &def.after {
            let event = events::after(raw_delay, &source_id);
            for candidate in candidates.iter() {
                let transition = self.resolve_transition(node, event.clone(), candidate)?;
                self.nodes[node.0].transitions.push(transition);
            }
            self.nodes[node.0].delayed.push(DelayedTransition {
                delay: DelaySpec::parse(raw_delay),
                event,
            });
        }

        if let Some(candidates) = &def.on_done {
            let event = events::done_state(&source_id);
            for candidate in candidates.iter() {
                let transition = self.resolve_transition(node, event.clone(), candidate)?;
                self.nodes[node.0].transitions.push(transition);
            }
        }

        for invoke in def.invoke.iter() {
            let id = invoke.id.clone().unwrap_or_else(|| invoke.src.clone());
            if let Some(candidates) = &invoke.on_done {
                let event = events::done_invoke(&id);
                for candidate in candidates.iter() {
                    let transition = self.resolve_transition(node, event.clone(), candidate)?;
                    self.nodes[node.0].transitions.push(transition);
                }
            }
            if let Some(candidates) = &invoke.on_error {
                let event = events::error_platform(&id);
                for candidate in candidates.iter() {
                    let transition = self.resolve_transition(node, event.clone(), candidate)?;
                    self.nodes[node.0].transitions.push(transition);
                }
            }
            self.nodes[node.0].invocations.push(Invocation {
                src: invoke.src.clone(),
                id,
            });
        }
        Ok(())
    }

    fn resolve_transition(
        &self,
        source: NodeId,
        event: String,
        def: &TransitionDefinition,
    ) -> Result<Transition, BuildError> {
        let mut targets = Vec::with_capacity(def.targets().len());
        for raw in def.targets() {
            targets.push(self.resolve_target(source, raw)?);
        }
        Ok(Transition {
            event,
            guard: def.guard().map(str::to_owned),
            actions: def.actions().iter().map(resolve_action).collect(),
            targets,
            reenter: def.reenter(),
        })
    }

    /// Resolve one target descriptor: `#id` (optionally continued with
    /// child keys), `.key` relative to the source, or a sibling key path.
    fn resolve_target(&self, source: NodeId, raw: &str) -> Result<NodeId, BuildError> {
        let resolved = if let Some(rest) = raw.strip_prefix('#') {
            self.resolve_id_path(rest)
        } else if let Some(rest) = raw.strip_prefix('.') {
            self.descend(source, rest)
        } else {
            match self.nodes[source.0].parent {
                Some(parent) => self.descend(parent, raw),
                // The root has no siblings; its keys mean its children.
                None => self.descend(source, raw),
            }
        };
        resolved.ok_or_else(|| BuildError::UnknownTarget {
            state: self.nodes[source.0].id.clone(),
            target: raw.to_owned(),
        })
    }

    /// Resolve `rest` of a `#`-target: an exact registered id, or the
    /// longest registered id prefix followed by child keys.
    fn resolve_id_path(&self, rest: &str) -> Option<NodeId> {
        if let Some(&node) = self.ids.get(rest) {
            return Some(node);
        }
        let mut split = rest.len();
        while let Some(dot) = rest[..split].rfind('.') {
            if let Some(&node) = self.ids.get(&rest[..dot]) {
                return self.descend(node, &rest[dot + 1..]);
            }
            split = dot;
        }
        None
    }

    fn descend(&self, from: NodeId, keys: &str) -> Option<NodeId> {
        let mut current = from;
        for key in keys.split('.') {
            current = self.child_by_key(current, key)?;
        }
        Some(current)
    }

    fn child_by_key(&self, node: NodeId, key: &str) -> Option<NodeId> {
        self.nodes[node.0]
            .children
            .iter()
            .copied()
            .find(|child| self.nodes[child.0].key == key)
    }
}

/// Resolve one definition action into its analysis form.
fn resolve_action(def: &ActionDefinition) -> Action {
    match def {
        ActionDefinition::Name(name) => Action::Named(name.clone()),
        ActionDefinition::Object(named) => Action::Named(named.name.clone()),
        ActionDefinition::Choose(choose) => Action::Choose(
            choose
                .choose
                .iter()
                .map(|branch| ChooseBranch {
                    guard: branch.guard.clone(),
                    actions: branch.actions.iter().map(resolve_action).collect(),
                })
                .collect(),
        ),
    }
}

/// Provided action bodies that are themselves composite, resolved once so
/// the analysis can expand them wherever their name is referenced. A plain
/// named body carries no nested references and is not kept.
fn resolve_composites(options: &MachineOptions) -> BTreeMap<String, Action> {
    options
        .actions
        .iter()
        .filter_map(|(name, body)| {
            body.as_ref()
                .map(|def| (name.clone(), resolve_action(def)))
        })
        .filter(|(_, action)| matches!(action, Action::Choose(_)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::Machine;
    use serde_json::json;

    fn machine(definition: serde_json::Value) -> Machine {
        let definition: MachineDefinition = serde_json::from_value(definition).unwrap();
        Machine::new(&definition, MachineOptions::new()).unwrap()
    }

    fn build_err(definition: serde_json::Value) -> BuildError {
        let definition: MachineDefinition = serde_json::from_value(definition).unwrap();
        Machine::new(&definition, MachineOptions::new()).unwrap_err()
    }

    #[test]
    fn ids_default_to_dotted_paths() {
        let machine = machine(json!({
            "states": {
                "a": { "states": { "b": {} } }
            }
        }));

        assert!(machine.node_by_id("machine").is_some());
        assert!(machine.node_by_id("machine.a").is_some());
        assert!(machine.node_by_id("machine.a.b").is_some());
    }

    #[test]
    fn explicit_ids_seed_their_descendants_defaults() {
        let machine = machine(json!({
            "id": "player",
            "states": {
                "paused": { "id": "pause", "states": { "deep": {} } }
            }
        }));

        assert!(machine.node_by_id("player").is_some());
        assert!(machine.node_by_id("pause").is_some());
        assert!(machine.node_by_id("pause.deep").is_some());
        assert!(machine.node_by_id("player.paused").is_none());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = build_err(json!({
            "states": {
                "a": { "id": "shared" },
                "b": { "id": "shared" }
            }
        }));

        assert_eq!(
            err,
            BuildError::DuplicateId {
                id: "shared".to_owned()
            }
        );
    }

    #[test]
    fn kinds_are_inferred_from_children() {
        let machine = machine(json!({
            "states": {
                "leaf": {},
                "branch": { "states": { "inner": {} } },
                "both": { "type": "parallel", "states": { "x": {}, "y": {} } },
                "end": { "type": "final" }
            }
        }));

        let kind_of = |id: &str| {
            let node = machine.node_by_id(id).unwrap();
            machine.node(node).kind
        };
        assert_eq!(kind_of("machine.leaf"), StateKind::Atomic);
        assert_eq!(kind_of("machine.branch"), StateKind::Compound);
        assert_eq!(kind_of("machine.both"), StateKind::Parallel);
        assert_eq!(kind_of("machine.end"), StateKind::Final);
    }

    #[test]
    fn initial_defaults_to_first_non_history_child() {
        let machine = machine(json!({
            "states": {
                "hist": { "type": "history" },
                "first": {},
                "second": {}
            }
        }));

        let root = machine.root();
        let initial = machine.node(root).initial.unwrap();
        assert_eq!(machine.node(initial).id, "machine.first");
    }

    #[test]
    fn explicit_initial_overrides_document_order() {
        let machine = machine(json!({
            "initial": "second",
            "states": { "first": {}, "second": {} }
        }));

        let initial = machine.node(machine.root()).initial.unwrap();
        assert_eq!(machine.node(initial).id, "machine.second");
    }

    #[test]
    fn unknown_initial_is_rejected_with_context() {
        let err = build_err(json!({
            "initial": "missing",
            "states": { "present": {} }
        }));

        assert_eq!(
            err,
            BuildError::UnknownInitial {
                state: "machine".to_owned(),
                initial: "missing".to_owned()
            }
        );
    }

    #[test]
    fn sibling_and_relative_targets_resolve() {
        let machine = machine(json!({
            "states": {
                "a": {
                    "on": { "NEXT": "b", "DOWN": ".inner", "DEEP": "b.nested" },
                    "states": { "inner": {} }
                },
                "b": { "states": { "nested": {} } }
            }
        }));

        let a = machine.node_by_id("machine.a").unwrap();
        let targets: Vec<_> = machine
            .node(a)
            .transitions
            .iter()
            .map(|t| {
                let target = t.targets[0];
                (t.event.clone(), machine.node(target).id.clone())
            })
            .collect();

        assert!(targets.contains(&("NEXT".to_owned(), "machine.b".to_owned())));
        assert!(targets.contains(&("DOWN".to_owned(), "machine.a.inner".to_owned())));
        assert!(targets.contains(&("DEEP".to_owned(), "machine.b.nested".to_owned())));
    }

    #[test]
    fn id_targets_resolve_across_the_tree() {
        let machine = machine(json!({
            "states": {
                "left": {
                    "states": { "deep": { "on": { "JUMP": "#landing.pad" } } }
                },
                "right": {
                    "id": "landing",
                    "states": { "pad": {} }
                }
            }
        }));

        let deep = machine.node_by_id("machine.left.deep").unwrap();
        let target = machine.node(deep).transitions[0].targets[0];
        assert_eq!(machine.node(target).id, "landing.pad");
    }

    #[test]
    fn root_keys_resolve_for_root_transitions() {
        let machine = machine(json!({
            "on": { "RESET": "idle" },
            "states": { "idle": {}, "busy": {} }
        }));

        let target = machine.node(machine.root()).transitions[0].targets[0];
        assert_eq!(machine.node(target).id, "machine.idle");
    }

    #[test]
    fn unknown_targets_name_both_ends() {
        let err = build_err(json!({
            "states": { "a": { "on": { "GO": "nowhere" } } }
        }));

        assert_eq!(
            err,
            BuildError::UnknownTarget {
                state: "machine.a".to_owned(),
                target: "nowhere".to_owned()
            }
        );
    }

    #[test]
    fn build_errors_are_self_contained() {
        let err = BuildError::UnknownTarget {
            state: "machine.a".to_owned(),
            target: "nowhere".to_owned(),
        };

        assert_eq!(
            err.to_string(),
            "state `machine.a` targets `nowhere`, which does not resolve to any state"
        );
        // Construction errors carry their full context in the message and
        // never wrap an underlying error.
        assert!(std::error::Error::source(&err).is_none());
    }

    #[test]
    fn history_roots_are_rejected() {
        let err = build_err(json!({ "type": "history" }));
        assert_eq!(err, BuildError::HistoryRoot);
    }

    #[test]
    fn after_handlers_materialize_timer_events() {
        let machine = machine(json!({
            "states": {
                "waiting": {
                    "after": {
                        "3000": "done",
                        "sessionTimeout": "done"
                    }
                },
                "done": {}
            }
        }));

        let waiting = machine.node_by_id("machine.waiting").unwrap();
        let node = machine.node(waiting);
        assert_eq!(node.delayed.len(), 2);
        assert_eq!(node.delayed[0].delay, DelaySpec::Duration(3000));
        assert_eq!(
            node.delayed[1].delay,
            DelaySpec::Named("sessionTimeout".to_owned())
        );

        let events: Vec<_> = node.transitions.iter().map(|t| t.event.clone()).collect();
        assert!(events.contains(&"machine.after(3000)#machine.waiting".to_owned()));
        assert!(events.contains(&"machine.after(sessionTimeout)#machine.waiting".to_owned()));
    }

    #[test]
    fn on_done_listens_on_the_completion_event() {
        let machine = machine(json!({
            "states": {
                "job": {
                    "initial": "run",
                    "states": { "run": { "on": { "FINISH": "end" } }, "end": { "type": "final" } },
                    "onDone": "after"
                },
                "after": {}
            }
        }));

        let job = machine.node_by_id("machine.job").unwrap();
        let events: Vec<_> = machine
            .node(job)
            .transitions
            .iter()
            .map(|t| t.event.clone())
            .collect();
        assert_eq!(events, ["done.state.machine.job"]);
    }

    #[test]
    fn invocation_ids_default_to_their_source() {
        let machine = machine(json!({
            "states": {
                "loading": {
                    "invoke": [
                        { "src": "fetchUser", "onDone": "ready", "onError": "failed" },
                        { "src": "fetchUser", "id": "second" }
                    ]
                },
                "ready": {},
                "failed": {}
            }
        }));

        let loading = machine.node_by_id("machine.loading").unwrap();
        let node = machine.node(loading);
        assert_eq!(node.invocations.len(), 2);
        assert_eq!(node.invocations[0].id, "fetchUser");
        assert_eq!(node.invocations[1].id, "second");

        let events: Vec<_> = node.transitions.iter().map(|t| t.event.clone()).collect();
        assert!(events.contains(&"done.invoke.fetchUser".to_owned()));
        assert!(events.contains(&"error.platform.fetchUser".to_owned()));
    }

    #[test]
    fn always_handlers_listen_on_the_empty_event() {
        let machine = machine(json!({
            "states": {
                "checking": { "always": { "target": "ok", "guard": "fine" } },
                "ok": {}
            }
        }));

        let checking = machine.node_by_id("machine.checking").unwrap();
        let transition = &machine.node(checking).transitions[0];
        assert_eq!(transition.event, "");
        assert_eq!(transition.guard.as_deref(), Some("fine"));
    }
}

//! Machine model: definitions in, a linked state tree out.
//!
//! A [`MachineDefinition`] is the plain serializable form a parser hands
//! over; [`Machine::new`] lowers it into an arena of [`StateNode`]s with
//! every target, initial child, and synthesized handler resolved. The
//! analysis side of the crate only ever sees the resolved form.
//!
//! # Example
//!
//! ```rust
//! use chartscope::machine::{Machine, MachineDefinition, MachineOptions};
//!
//! let definition: MachineDefinition = serde_json::from_value(serde_json::json!({
//!     "id": "light",
//!     "initial": "red",
//!     "states": {
//!         "red": { "on": { "TIMER": "green" } },
//!         "green": { "on": { "TIMER": "red" } }
//!     }
//! }))
//! .unwrap();
//!
//! let machine = Machine::new(&definition, MachineOptions::new()).unwrap();
//! assert_eq!(machine.node(machine.root()).id, "light");
//! assert!(machine.node_by_id("light.green").is_some());
//! ```

mod builder;
mod definition;
mod node;
mod options;

use std::collections::BTreeMap;

pub use builder::{BuildError, DEFAULT_MACHINE_ID};
pub use definition::{
    ActionDefinition, ChooseBranchDefinition, ChooseDefinition, InvokeDefinition,
    MachineDefinition, NamedActionDefinition, OneOrMany, StateDefinition, TransitionConfig,
    TransitionDefinition,
};
pub use node::{
    Action, ChooseBranch, DelaySpec, DelayedTransition, Invocation, NodeId, StateKind, StateNode,
    Transition,
};
pub use options::MachineOptions;

/// A resolved state machine.
///
/// States live in an arena where parents precede their children, so parent
/// links always point at smaller indices and upward walks terminate by
/// construction. All queries are cheap reads; a machine is immutable once
/// built.
#[derive(Clone, Debug)]
pub struct Machine {
    nodes: Vec<StateNode>,
    root: NodeId,
    ids: BTreeMap<String, NodeId>,
    options: MachineOptions,
    composites: BTreeMap<String, Action>,
}

impl Machine {
    /// Lower a definition into a machine, resolving ids, kinds, initial
    /// children, and transition targets.
    pub fn new(
        definition: &MachineDefinition,
        options: MachineOptions,
    ) -> Result<Self, BuildError> {
        builder::build(definition, options)
    }

    /// The root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Look up a node. The id must come from this machine.
    pub fn node(&self, id: NodeId) -> &StateNode {
        &self.nodes[id.0]
    }

    /// Number of states, history nodes included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// All nodes in creation order (parents before children).
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &StateNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (NodeId(index), node))
    }

    /// Find a node by its fully qualified id.
    pub fn node_by_id(&self, id: &str) -> Option<NodeId> {
        self.ids.get(id).copied()
    }

    /// Parent of a node; `None` for the root.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Children of a node in document order, history children included.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// The options the machine was built with.
    pub fn options(&self) -> &MachineOptions {
        &self.options
    }

    /// Resolved body of a provided action, when the options supplied a
    /// composite one.
    pub(crate) fn provided_composite(&self, name: &str) -> Option<&Action> {
        self.composites.get(name)
    }

    /// Child of `node` with the given key.
    pub(crate) fn child_by_key(&self, node: NodeId, key: &str) -> Option<NodeId> {
        self.nodes[node.0]
            .children
            .iter()
            .copied()
            .find(|&child| self.nodes[child.0].key == key)
    }

    /// True when `node` is a strict descendant of `ancestor`.
    pub fn is_descendant(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = self.nodes[node.0].parent;
        while let Some(candidate) = current {
            if candidate == ancestor {
                return true;
            }
            current = self.nodes[candidate.0].parent;
        }
        false
    }

    /// Leaves that become active when `node` is entered and no further
    /// events arrive: the node itself when atomic or final, the closure of
    /// default initial children for compounds, and one leaf set per region
    /// for parallels.
    pub fn initial_leaves(&self, node: NodeId) -> Vec<NodeId> {
        match self.nodes[node.0].kind {
            StateKind::Atomic | StateKind::Final => vec![node],
            StateKind::History => Vec::new(),
            StateKind::Compound => match self.nodes[node.0].initial {
                Some(child) => self.initial_leaves(child),
                // A childless compound behaves as a leaf.
                None => vec![node],
            },
            StateKind::Parallel => self.nodes[node.0]
                .children
                .iter()
                .copied()
                .filter(|&child| self.nodes[child.0].kind != StateKind::History)
                .flat_map(|child| self.initial_leaves(child))
                .collect(),
        }
    }
}

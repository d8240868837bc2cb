//! Resolved state tree nodes.
//!
//! Built machines store their states in an arena indexed by [`NodeId`].
//! Parents are always created before their children, so every parent index
//! is strictly smaller than its children's indices. Upward walks therefore
//! terminate by construction, which is what lets the analysis follow parent
//! links without cycle bookkeeping.

use serde::{Deserialize, Serialize};

/// Arena index of a state node within its [`Machine`](super::Machine).
///
/// Ids are only meaningful for the machine that produced them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Position of the node in the machine's arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// The five statechart node kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateKind {
    /// Leaf state with no children.
    Atomic,
    /// State with children of which exactly one is active at a time.
    Compound,
    /// State whose children are all active simultaneously.
    Parallel,
    /// Terminal state that completes its parent when entered.
    Final,
    /// Pseudo-state that redirects to previously active siblings. History
    /// nodes can be transition targets but never count as regions.
    History,
}

/// One resolved state node.
///
/// Targets, initial children, and parent links are all resolved to
/// [`NodeId`]s; the definition's shorthand forms are gone.
#[derive(Clone, Debug, PartialEq)]
pub struct StateNode {
    /// Fully qualified id, explicit or derived from the path.
    pub id: String,
    /// Key under the parent's `states` map; empty for the root.
    pub key: String,
    /// Keys from the root down to this node; empty for the root.
    pub path: Vec<String>,
    /// Parent node; `None` for the root.
    pub parent: Option<NodeId>,
    /// Node kind after defaulting rules are applied.
    pub kind: StateKind,
    /// Children in document order, history children included.
    pub children: Vec<NodeId>,
    /// Default child entered when this compound state is entered.
    pub initial: Option<NodeId>,
    /// Actions run on entry.
    pub entry: Vec<Action>,
    /// Actions run on exit.
    pub exit: Vec<Action>,
    /// Actors started while this state is active.
    pub invocations: Vec<Invocation>,
    /// Delayed transitions declared on this state.
    pub delayed: Vec<DelayedTransition>,
    /// Resolved transitions, including the materialized handlers for
    /// `always`, `after`, `onDone`, and invocation outcomes.
    pub transitions: Vec<Transition>,
}

/// One resolved transition.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    /// Event descriptor this transition answers to. Eventless transitions
    /// use the empty string; synthetic handlers use their runtime names.
    pub event: String,
    /// Guard name, if any.
    pub guard: Option<String>,
    /// Actions run when the transition is taken.
    pub actions: Vec<Action>,
    /// Resolved targets; empty for targetless transitions.
    pub targets: Vec<NodeId>,
    /// Force exit and re-entry even when no movement would occur.
    pub reenter: bool,
}

/// One resolved action reference.
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    /// Reference to a named implementation.
    Named(String),
    /// Conditional composite; the first branch whose guard passes runs.
    Choose(Vec<ChooseBranch>),
}

/// One branch of a resolved conditional composite.
#[derive(Clone, Debug, PartialEq)]
pub struct ChooseBranch {
    /// Guard for this branch; an absent guard always passes.
    pub guard: Option<String>,
    /// Actions run when this branch is selected.
    pub actions: Vec<Action>,
}

/// One invoked actor.
#[derive(Clone, Debug, PartialEq)]
pub struct Invocation {
    /// Actor source name, or the inline placeholder.
    pub src: String,
    /// Invocation id; defaulted to `src` during building.
    pub id: String,
}

/// One delayed transition record.
#[derive(Clone, Debug, PartialEq)]
pub struct DelayedTransition {
    /// The declared delay.
    pub delay: DelaySpec,
    /// The synthesized timer event its transitions answer to.
    pub event: String,
}

/// A delay as declared in a definition.
#[derive(Clone, Debug, PartialEq)]
pub enum DelaySpec {
    /// Fixed duration in milliseconds. Durations need no implementation, so
    /// the analysis ignores them.
    Duration(u64),
    /// Named delay resolved through the machine's options at run time.
    Named(String),
}

impl DelaySpec {
    /// Parse a definition's delay key. Unsigned integers are durations,
    /// everything else is a delay name.
    pub fn parse(raw: &str) -> DelaySpec {
        match raw.parse::<u64>() {
            Ok(millis) => DelaySpec::Duration(millis),
            Err(_) => DelaySpec::Named(raw.to_owned()),
        }
    }

    /// The delay's implementation name, if it has one.
    pub fn name(&self) -> Option<&str> {
        match self {
            DelaySpec::Duration(_) => None,
            DelaySpec::Named(name) => Some(name),
        }
    }
}

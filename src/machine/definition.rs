//! Plain-data machine definitions as parsers hand them over.
//!
//! A definition is the unresolved, serializable counterpart of a built
//! [`Machine`](super::Machine): states are keyed by name instead of linked,
//! targets are strings in the definition's target syntax, and every
//! shorthand a machine author can write is preserved. Front ends produce
//! these (typically as JSON) and never need to understand the analysis.
//!
//! # Example
//!
//! ```rust
//! use chartscope::machine::MachineDefinition;
//!
//! let definition: MachineDefinition = serde_json::from_value(serde_json::json!({
//!     "id": "toggle",
//!     "initial": "off",
//!     "states": {
//!         "off": { "on": { "FLIP": "on" } },
//!         "on": { "on": { "FLIP": "off" } }
//!     }
//! }))
//! .unwrap();
//!
//! assert_eq!(definition.states.len(), 2);
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::node::StateKind;

/// A machine definition is simply its root state's definition; the root's
/// `id` names the machine.
pub type MachineDefinition = StateDefinition;

/// One state in a definition tree.
///
/// Every field is optional so that the sparse JSON machine authors actually
/// write deserializes directly. Keys of `states` become node keys; document
/// order is preserved because defaulting rules depend on it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StateDefinition {
    /// Explicit node id. Defaults to `<parent id>.<key>`, or `machine` for
    /// the root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Node kind. When absent, a state with children is compound and a
    /// state without children is atomic.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<StateKind>,

    /// Key of the child entered by default. Compound states without an
    /// explicit `initial` default to their first non-history child in
    /// document order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial: Option<String>,

    /// Child states by key, in document order.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub states: IndexMap<String, StateDefinition>,

    /// Actions run when the state is entered.
    #[serde(skip_serializing_if = "OneOrMany::is_empty")]
    pub entry: OneOrMany<ActionDefinition>,

    /// Actions run when the state is exited.
    #[serde(skip_serializing_if = "OneOrMany::is_empty")]
    pub exit: OneOrMany<ActionDefinition>,

    /// Event handlers: event descriptor (an event name, the `*` wildcard,
    /// or `""` for always-active transitions) to one or more candidate
    /// transitions.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub on: IndexMap<String, OneOrMany<TransitionDefinition>>,

    /// Eventless transitions, re-evaluated whenever the state is active.
    #[serde(skip_serializing_if = "OneOrMany::is_empty")]
    pub always: OneOrMany<TransitionDefinition>,

    /// Delayed transitions: delay (milliseconds or a named delay) to one or
    /// more candidate transitions.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub after: IndexMap<String, OneOrMany<TransitionDefinition>>,

    /// Transitions taken when this state reaches completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_done: Option<OneOrMany<TransitionDefinition>>,

    /// Actors started while this state is active.
    #[serde(skip_serializing_if = "OneOrMany::is_empty")]
    pub invoke: OneOrMany<InvokeDefinition>,
}

/// One transition as written by a machine author.
///
/// The target-only shorthand `"GO": "sibling"` and the full object form
/// both deserialize into this type.
///
/// # Example
///
/// ```rust
/// use chartscope::machine::TransitionDefinition;
///
/// let shorthand: TransitionDefinition = serde_json::from_value(
///     serde_json::json!("active"),
/// )
/// .unwrap();
/// assert_eq!(shorthand.targets(), ["active"]);
///
/// let full: TransitionDefinition = serde_json::from_value(serde_json::json!({
///     "target": "#machine.done",
///     "guard": "isValid",
///     "actions": ["notify"],
///     "reenter": true
/// }))
/// .unwrap();
/// assert_eq!(full.guard(), Some("isValid"));
/// assert!(full.reenter());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransitionDefinition {
    /// Bare target string shorthand.
    Target(String),
    /// Full form with target, guard, actions, and the reenter flag.
    Config(TransitionConfig),
}

/// The object form of a transition.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransitionConfig {
    /// Target descriptor(s). Absent means a targetless transition that runs
    /// actions without leaving the state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<OneOrMany<String>>,

    /// Name of the guard that must pass for the transition to be taken.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guard: Option<String>,

    /// Actions run when the transition is taken.
    #[serde(skip_serializing_if = "OneOrMany::is_empty")]
    pub actions: OneOrMany<ActionDefinition>,

    /// Force exit and re-entry even when the target is the source itself or
    /// one of its descendants.
    pub reenter: bool,
}

impl TransitionDefinition {
    /// Target descriptors of this transition, empty when targetless.
    pub fn targets(&self) -> &[String] {
        match self {
            TransitionDefinition::Target(target) => std::slice::from_ref(target),
            TransitionDefinition::Config(config) => config
                .target
                .as_ref()
                .map(OneOrMany::as_slice)
                .unwrap_or(&[]),
        }
    }

    /// Guard name, if the transition declares one.
    pub fn guard(&self) -> Option<&str> {
        match self {
            TransitionDefinition::Target(_) => None,
            TransitionDefinition::Config(config) => config.guard.as_deref(),
        }
    }

    /// Actions run when the transition is taken.
    pub fn actions(&self) -> &[ActionDefinition] {
        match self {
            TransitionDefinition::Target(_) => &[],
            TransitionDefinition::Config(config) => config.actions.as_slice(),
        }
    }

    /// Whether the transition forces re-entry of its own subtree.
    pub fn reenter(&self) -> bool {
        match self {
            TransitionDefinition::Target(_) => false,
            TransitionDefinition::Config(config) => config.reenter,
        }
    }
}

/// One action reference as written by a machine author.
///
/// Parsers that meet an inline closure instead of a name substitute the
/// `__inline__` placeholder, which the report later omits.
///
/// # Example
///
/// ```rust
/// use chartscope::machine::ActionDefinition;
///
/// let by_name: ActionDefinition =
///     serde_json::from_value(serde_json::json!("notify")).unwrap();
/// assert!(matches!(by_name, ActionDefinition::Name(_)));
///
/// let conditional: ActionDefinition = serde_json::from_value(serde_json::json!({
///     "choose": [
///         { "guard": "isAdmin", "actions": ["grantAccess"] },
///         { "actions": ["denyAccess"] }
///     ]
/// }))
/// .unwrap();
/// assert!(matches!(conditional, ActionDefinition::Choose(_)));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionDefinition {
    /// Plain name shorthand.
    Name(String),
    /// Conditional composite: the first branch whose guard passes runs.
    Choose(ChooseDefinition),
    /// Object form carrying a name and optional parameters.
    Object(NamedActionDefinition),
}

/// The conditional composite action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChooseDefinition {
    /// Ordered branches; evaluation stops at the first passing guard.
    pub choose: Vec<ChooseBranchDefinition>,
}

/// One branch of a conditional composite action.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChooseBranchDefinition {
    /// Guard for this branch; an absent guard always passes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guard: Option<String>,

    /// Actions run when this branch is selected.
    #[serde(skip_serializing_if = "OneOrMany::is_empty")]
    pub actions: OneOrMany<ActionDefinition>,
}

/// The object form of a named action. Parameters ride along untouched; the
/// analysis only ever reads the name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NamedActionDefinition {
    /// Implementation name.
    #[serde(rename = "type")]
    pub name: String,

    /// Caller-supplied parameters, preserved verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// One invoked actor as written by a machine author.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeDefinition {
    /// Actor source name, or the inline placeholder for unnameable sources.
    pub src: String,

    /// Invocation id; defaults to `src` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Transitions taken when the actor completes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_done: Option<OneOrMany<TransitionDefinition>>,

    /// Transitions taken when the actor fails.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_error: Option<OneOrMany<TransitionDefinition>>,
}

/// A value machine authors may write either bare or as an array.
///
/// Definitions accept `"actions": "notify"` and `"actions": ["notify"]`
/// interchangeably; this wrapper keeps both spellings round-trippable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    /// A single bare value.
    One(T),
    /// An explicit array of values.
    Many(Vec<T>),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    /// View the value(s) as a slice.
    pub fn as_slice(&self) -> &[T] {
        match self {
            OneOrMany::One(value) => std::slice::from_ref(value),
            OneOrMany::Many(values) => values,
        }
    }

    /// True when no values are present.
    pub fn is_empty(&self) -> bool {
        match self {
            OneOrMany::One(_) => false,
            OneOrMany::Many(values) => values.is_empty(),
        }
    }

    /// Iterate over the value(s).
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    /// Take the value(s) as an owned vector.
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        }
    }
}

impl<T> From<T> for OneOrMany<T> {
    fn from(value: T) -> Self {
        OneOrMany::One(value)
    }
}

impl<T> From<Vec<T>> for OneOrMany<T> {
    fn from(values: Vec<T>) -> Self {
        OneOrMany::Many(values)
    }
}

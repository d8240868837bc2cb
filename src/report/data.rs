//! The analysis report consumed by downstream tooling.
//!
//! Type generators turn these fields into event-union types, diagnostics
//! surfaces read the missing-implementation lists, and visualizers read
//! the schema and per-state source events. Everything is sorted before it
//! lands here; serializing the same analysis twice yields byte-identical
//! JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::analysis::ItemReport;

/// Complete analysis output for one machine.
///
/// # Example
///
/// ```rust
/// use chartscope::machine::{Machine, MachineDefinition, MachineOptions};
///
/// let definition: MachineDefinition = serde_json::from_value(serde_json::json!({
///     "initial": "idle",
///     "states": {
///         "idle": { "on": { "START": "running" } },
///         "running": { "entry": ["spinUp"] }
///     }
/// }))
/// .unwrap();
/// let machine = Machine::new(&definition, MachineOptions::new()).unwrap();
///
/// let data = chartscope::introspect(&machine);
/// let spin_up = data.actions.lines.iter().find(|l| l.name == "spinUp").unwrap();
/// assert_eq!(spin_up.events, ["START"]);
/// assert!(data.state_schema.contains_path(&["running"]));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypegenData {
    /// Every state with the sorted events that can enter it, sorted by id.
    pub states: Vec<StateSources>,

    /// The state hierarchy as nested keys, history states omitted.
    pub state_schema: StateSchema,

    /// Action names and their causing events.
    pub actions: ItemReport,

    /// Guard names and their causing events.
    pub guards: ItemReport,

    /// Actor source names and their causing events.
    pub services: ItemReport,

    /// Named delays and their causing events.
    pub delays: ItemReport,

    /// Names referenced by the machine but not provided in its options.
    pub missing_implementations: MissingImplementations,

    /// Sorted machine-raised event names a consumer's event union must
    /// still declare.
    pub internal_events: Vec<String>,

    /// Actor source name to the sorted invocation ids using it.
    pub actor_source_to_invocation_ids: BTreeMap<String, Vec<String>>,
}

impl TypegenData {
    /// Serialize the report as pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// One state and the events that can enter it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSources {
    /// Fully qualified state id.
    pub id: String,
    /// Sorted events whose processing can enter the state; empty means the
    /// state is only active as part of the initial configuration, or never.
    pub source_events: Vec<String>,
}

/// The machine hierarchy as nested state keys with no further payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateSchema(pub BTreeMap<String, StateSchema>);

impl StateSchema {
    /// True when the given key path exists in the schema. The empty path
    /// is always present.
    pub fn contains_path(&self, path: &[&str]) -> bool {
        match path.split_first() {
            None => true,
            Some((head, rest)) => self
                .0
                .get(*head)
                .is_some_and(|child| child.contains_path(rest)),
        }
    }
}

/// Referenced-but-not-provided names per category, each list sorted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingImplementations {
    /// Action names with no provided implementation.
    pub actions: Vec<String>,
    /// Delay names with no provided implementation.
    pub delays: Vec<String>,
    /// Guard names with no provided implementation.
    pub guards: Vec<String>,
    /// Actor source names with no provided implementation.
    pub services: Vec<String>,
}

impl MissingImplementations {
    /// True when every referenced name has an implementation.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
            && self.delays.is_empty()
            && self.guards.is_empty()
            && self.services.is_empty()
    }
}

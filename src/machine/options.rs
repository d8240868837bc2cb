//! Implementations provided alongside a machine definition.
//!
//! A machine references actions, guards, actors, and delays by name; the
//! options record which of those names the surrounding code actually
//! supplies. The analysis never executes an implementation, it only needs
//! to know whether one exists: names provided here are reported as
//! optional, names only ever referenced are reported as required.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::definition::ActionDefinition;

/// Names supplied by the code that owns the machine.
///
/// Provided actions may carry a replacement body: an action provided as a
/// conditional composite pulls that composite's guards and nested actions
/// into the analysis wherever the name is used.
///
/// # Example
///
/// ```rust
/// use chartscope::machine::MachineOptions;
///
/// let options: MachineOptions = serde_json::from_value(serde_json::json!({
///     "actions": { "notify": null },
///     "guards": ["isValid"],
///     "delays": ["sessionTimeout"]
/// }))
/// .unwrap();
///
/// assert!(options.provides_action("notify"));
/// assert!(options.provides_guard("isValid"));
/// assert!(!options.provides_service("loadUser"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineOptions {
    /// Provided action names, each optionally carrying a replacement body.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub actions: IndexMap<String, Option<ActionDefinition>>,

    /// Provided guard names.
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub guards: BTreeSet<String>,

    /// Provided actor source names.
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub services: BTreeSet<String>,

    /// Provided delay names.
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub delays: BTreeSet<String>,
}

impl MachineOptions {
    /// Options that provide nothing; every referenced name will be
    /// reported as required.
    pub fn new() -> Self {
        MachineOptions::default()
    }

    /// Provide an action implementation by name.
    pub fn action(mut self, name: impl Into<String>) -> Self {
        self.actions.insert(name.into(), None);
        self
    }

    /// Provide an action whose implementation is itself a definition, such
    /// as a conditional composite. The body participates in the analysis
    /// wherever the name is referenced.
    pub fn action_body(mut self, name: impl Into<String>, body: ActionDefinition) -> Self {
        self.actions.insert(name.into(), Some(body));
        self
    }

    /// Provide a guard implementation by name.
    pub fn guard(mut self, name: impl Into<String>) -> Self {
        self.guards.insert(name.into());
        self
    }

    /// Provide an actor source by name.
    pub fn service(mut self, name: impl Into<String>) -> Self {
        self.services.insert(name.into());
        self
    }

    /// Provide a delay by name.
    pub fn delay(mut self, name: impl Into<String>) -> Self {
        self.delays.insert(name.into());
        self
    }

    /// True when an action implementation with this name is provided.
    pub fn provides_action(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// True when a guard implementation with this name is provided.
    pub fn provides_guard(&self, name: &str) -> bool {
        self.guards.contains(name)
    }

    /// True when an actor source with this name is provided.
    pub fn provides_service(&self, name: &str) -> bool {
        self.services.contains(name)
    }

    /// True when a delay with this name is provided.
    pub fn provides_delay(&self, name: &str) -> bool {
        self.delays.contains(name)
    }
}

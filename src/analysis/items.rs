//! Name-to-events registries.
//!
//! Every implementation category the analysis tracks (actions, guards,
//! actors, delays) is a mapping from implementation name to the set of
//! events that can cause it to run. Registration is additive and
//! idempotent: event sets only ever grow, so re-walking a shared state
//! can never lose an attribution recorded earlier.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::events::INLINE_ITEM;

/// Additive registry of implementation names and their causing events.
///
/// Names keep first-seen order internally; the report sorts them, so two
/// walks that discover the same facts in a different order produce the
/// same output.
///
/// # Example
///
/// ```rust
/// use chartscope::analysis::ItemMap;
///
/// let mut actions = ItemMap::new();
/// actions.add_event_to_item("notify", ["SUBMIT"]);
/// actions.add_event_to_item("notify", ["RETRY", "SUBMIT"]);
///
/// let events = actions.events("notify").unwrap();
/// assert_eq!(events.len(), 2);
/// ```
#[derive(Clone, Debug, Default)]
pub struct ItemMap {
    items: IndexMap<String, BTreeSet<String>>,
}

impl ItemMap {
    /// An empty registry.
    pub fn new() -> Self {
        ItemMap::default()
    }

    /// Register a name with no causing events yet. Registering an existing
    /// name leaves its events untouched.
    pub fn add_item(&mut self, name: impl Into<String>) {
        self.items.entry(name.into()).or_default();
    }

    /// Register a name and merge `events` into its causing set.
    pub fn add_event_to_item<I>(&mut self, name: &str, events: I)
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let set = self.items.entry(name.to_owned()).or_default();
        set.extend(events.into_iter().map(Into::into));
    }

    /// Causing events recorded for a name, if the name is registered.
    pub fn events(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.items.get(name)
    }

    /// True when a name is registered, with or without events.
    pub fn contains(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    /// Number of registered names, the inline placeholder included.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate over registered names and their events in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.items.iter().map(|(name, events)| (name.as_str(), events))
    }

    /// Materialize the registry into sorted report lines.
    ///
    /// `provided` answers whether an implementation exists for a name;
    /// names without one are marked required. The inline placeholder never
    /// becomes a line: inline implementations are their own providers.
    pub fn to_report<F>(&self, provided: F) -> ItemReport
    where
        F: Fn(&str) -> bool,
    {
        let mut lines: Vec<ItemLine> = self
            .items
            .iter()
            .filter(|(name, _)| name.as_str() != INLINE_ITEM)
            .map(|(name, events)| ItemLine {
                name: name.clone(),
                required: !provided(name),
                events: events.iter().cloned().collect(),
            })
            .collect();
        lines.sort_by(|a, b| a.name.cmp(&b.name));
        let any_required = lines.iter().any(|line| line.required);
        ItemReport { lines, any_required }
    }
}

/// One implementation name in a report category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemLine {
    /// Implementation name as referenced by the machine.
    pub name: String,
    /// True when no implementation was provided for the name.
    pub required: bool,
    /// Sorted events that can cause the implementation to run.
    pub events: Vec<String>,
}

/// One report category: sorted lines plus a category-level flag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemReport {
    /// Lines sorted by name.
    pub lines: Vec<ItemLine>,
    /// True when at least one line is required.
    pub any_required: bool,
}

//! Chartscope: static reachability analysis for hierarchical state machines
//!
//! Chartscope answers, without ever running a machine, which event names can
//! cause each state to be entered and each named action, guard, actor, or
//! delay to run. The analysis is a pure traversal over an immutable state
//! tree: no I/O, no shared state, deterministic output. Type generators,
//! diagnostics, and visualizers consume the resulting [`TypegenData`].
//!
//! # Core Concepts
//!
//! - **Machine**: a resolved statechart built from a plain serializable
//!   definition via [`Machine::new`]
//! - **Source events**: for every state, the events whose processing can
//!   enter it, seeded by the synthetic `init` event
//! - **Causing events**: for every named implementation, the events that
//!   can make it run, with required/optional derived from the supplied
//!   [`MachineOptions`]
//!
//! # Example
//!
//! ```rust
//! use chartscope::{introspect, Machine, MachineDefinition, MachineOptions};
//!
//! let definition: MachineDefinition = serde_json::from_value(serde_json::json!({
//!     "id": "door",
//!     "initial": "closed",
//!     "states": {
//!         "closed": {
//!             "on": { "OPEN": { "target": "open", "guard": "isUnlocked" } }
//!         },
//!         "open": {
//!             "entry": ["startHingeMotor"],
//!             "on": { "CLOSE": "closed" }
//!         }
//!     }
//! }))
//! .unwrap();
//!
//! let options = MachineOptions::new().guard("isUnlocked");
//! let machine = Machine::new(&definition, options).unwrap();
//! let data = introspect(&machine);
//!
//! let motor = data.actions.lines.iter().find(|l| l.name == "startHingeMotor").unwrap();
//! assert_eq!(motor.events, ["OPEN"]);
//! assert_eq!(data.missing_implementations.actions, ["startHingeMotor"]);
//! assert!(data.missing_implementations.guards.is_empty());
//! ```

pub mod analysis;
pub mod events;
pub mod machine;
pub mod report;

// Re-export commonly used types
pub use analysis::{introspect, ItemLine, ItemMap, ItemReport};
pub use machine::{BuildError, Machine, MachineDefinition, MachineOptions, StateDefinition};
pub use report::{MissingImplementations, StateSchema, StateSources, TypegenData};

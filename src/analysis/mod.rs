//! Static analysis over a built machine.
//!
//! The engine answers one question without running the machine: which
//! event names can cause each state to be entered and each named
//! implementation to run. It works in three passes over the immutable
//! state tree. Pass one resolves every transition, which attributes
//! guards, transition actions, and exit chains and populates the
//! source-events map. Pass two turns source events into entry-side
//! attribution through each node's enterable closure. The completion pass
//! then propagates finalizing events across parallel boundaries.
//!
//! Each run allocates its own accumulation context, so concurrent callers
//! analyzing different machines never share state.
//!
//! # Example
//!
//! ```rust
//! use chartscope::machine::{Machine, MachineDefinition, MachineOptions};
//!
//! let definition: MachineDefinition = serde_json::from_value(serde_json::json!({
//!     "initial": "closed",
//!     "states": {
//!         "closed": { "on": { "OPEN": "open" } },
//!         "open": { "entry": ["startHingeMotor"] }
//!     }
//! }))
//! .unwrap();
//! let machine = Machine::new(&definition, MachineOptions::new()).unwrap();
//!
//! let data = chartscope::introspect(&machine);
//! let motor = data.actions.lines.iter().find(|l| l.name == "startHingeMotor").unwrap();
//! assert_eq!(motor.events, ["OPEN"]);
//! assert!(motor.required);
//! ```

mod completion;
pub(crate) mod context;
mod items;
mod transitions;
mod walker;

pub use items::{ItemLine, ItemMap, ItemReport};

use crate::machine::Machine;
use crate::report::{self, TypegenData};

/// Analyze a machine and produce its full report.
///
/// The walk is deterministic: analyzing the same machine twice yields
/// identical output, field for field and byte for byte once serialized.
pub fn introspect(machine: &Machine) -> TypegenData {
    let mut ctx = context::AnalysisContext::new(machine);
    walker::collect_simple_information(machine, &mut ctx, machine.root());
    walker::collect_enterables(machine, &mut ctx, machine.root());
    completion::analyze_completion(machine, &mut ctx);
    report::assemble(machine, &ctx)
}

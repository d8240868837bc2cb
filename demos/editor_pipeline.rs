//! Document Editor Pipeline Introspection
//!
//! This example analyzes a document machine with a parallel checking stage.
//!
//! Key concepts:
//! - Parallel completion: both regions must reach a final state
//! - Union attribution: exit actions of the parallel stage are triggered by
//!   every event that can finish a region, not just the last one
//! - Synthesized events from invocations and onDone transitions
//! - Choose-based entry actions
//!
//! Run with: cargo run --example editor_pipeline

use chartscope::{introspect, Machine, MachineOptions};
use serde_json::json;

fn main() {
    println!("=== Editor Pipeline Introspection ===\n");

    let definition = serde_json::from_value(json!({
        "id": "editor",
        "initial": "editing",
        "states": {
            "editing": {
                "entry": [{
                    "choose": [
                        { "guard": "hasDraft", "actions": "restoreDraft" },
                        { "actions": "blankDocument" }
                    ]
                }],
                "on": { "SUBMIT": "#editor.checking" }
            },
            "checking": {
                "type": "parallel",
                "exit": "teardownCheckers",
                "onDone": { "target": "#editor.published", "actions": "announce" },
                "states": {
                    "lint": {
                        "initial": "running",
                        "states": {
                            "running": {
                                "invoke": {
                                    "src": "linter",
                                    "id": "lintRun",
                                    "onDone": "#editor.checking.lint.clean"
                                }
                            },
                            "clean": { "type": "final" }
                        }
                    },
                    "save": {
                        "initial": "saving",
                        "exit": "closeSaveHandle",
                        "states": {
                            "saving": { "on": { "SAVED": "#editor.checking.save.stored" } },
                            "stored": { "type": "final" }
                        }
                    }
                }
            },
            "published": { "entry": "celebrate" }
        }
    }))
    .unwrap();

    let options = MachineOptions::new().service("linter").guard("hasDraft");
    let machine = Machine::new(&definition, options).unwrap();
    let data = introspect(&machine);

    println!("States and the events that can enter them:");
    for state in &data.states {
        println!("  {:28} {:?}", state.id, state.source_events);
    }

    println!("\nExit actions see the union of region-finishing events:");
    for name in ["teardownCheckers", "closeSaveHandle"] {
        if let Some(line) = data.actions.lines.iter().find(|line| line.name == name) {
            println!("  {:18} {:?}", line.name, line.events);
        }
    }

    println!("\nInvoked actors:");
    for (src, ids) in &data.actor_source_to_invocation_ids {
        println!("  {src} -> {ids:?}");
    }

    println!("\nInternal events the consumer must accept:");
    for event in &data.internal_events {
        println!("  {event:?}");
    }

    println!("\nFull report as JSON:");
    println!("{}", data.to_json().unwrap());

    println!("\n=== Example Complete ===");
}

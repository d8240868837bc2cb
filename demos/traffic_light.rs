//! Traffic Light Introspection
//!
//! This example analyzes a pedestrian-crossing machine without running it.
//!
//! Key concepts:
//! - Source events: which events can enter each state
//! - Named delays and invoked services in the report
//! - Required vs. provided implementations
//! - Internal events a consumer's event type must include
//!
//! Run with: cargo run --example traffic_light

use chartscope::{introspect, Machine, MachineOptions};
use serde_json::json;

fn main() {
    println!("=== Traffic Light Introspection ===\n");

    let definition = serde_json::from_value(json!({
        "id": "crossing",
        "initial": "red",
        "states": {
            "red": {
                "entry": "lightRed",
                "on": { "REQUEST_WALK": "#crossing.walk" },
                "after": { "greenDelay": "#crossing.green" }
            },
            "green": {
                "entry": "lightGreen",
                "on": { "TIMER": "#crossing.yellow" }
            },
            "yellow": {
                "entry": "lightYellow",
                "exit": "clearYellow",
                "on": { "TIMER": "#crossing.red" }
            },
            "walk": {
                "entry": "lightWalk",
                "invoke": { "src": "chime", "id": "walkChime" },
                "on": {
                    "TIMER": { "target": "#crossing.red", "guard": "crossingEmpty" }
                }
            }
        }
    }))
    .unwrap();

    let options = MachineOptions::new().delay("greenDelay").service("chime");
    let machine = Machine::new(&definition, options).unwrap();
    let data = introspect(&machine);

    println!("States and the events that can enter them:");
    for state in &data.states {
        println!("  {:24} {:?}", state.id, state.source_events);
    }

    println!("\nActions and their causing events:");
    for line in &data.actions.lines {
        let status = if line.required { "required" } else { "provided" };
        println!("  {:12} [{status}] {:?}", line.name, line.events);
    }

    println!("\nStill missing implementations:");
    println!("  actions: {:?}", data.missing_implementations.actions);
    println!("  guards:  {:?}", data.missing_implementations.guards);
    println!("  delays:  {:?}", data.missing_implementations.delays);

    println!("\nInternal events the consumer must accept:");
    for event in &data.internal_events {
        println!("  {event:?}");
    }

    println!("\n=== Example Complete ===");
}

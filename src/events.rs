//! Synthetic event names owned by the machine runtime.
//!
//! A statechart raises events of its own while it runs: the initialization
//! event, the forced-stop event, delayed-transition timers, and the
//! completion or failure notifications of final states and invoked actors.
//! The analysis attributes side effects to these names without ever running
//! the machine, so this module is the single source of truth for how they
//! are spelled and classified.

/// Event attributed to everything the machine activates by default.
pub const INIT_EVENT: &str = "init";

/// Event attributed to exit actions that run when the machine is stopped
/// from the outside.
pub const STOP_EVENT: &str = "machine.stop";

/// Placeholder name parsers emit for implementations they cannot name,
/// such as closures written inline in the machine definition.
pub const INLINE_ITEM: &str = "__inline__";

/// Prefix reserved for names and events owned by the runtime. User-supplied
/// implementations must never collide with it, so the report omits any name
/// carrying it.
pub const RESERVED_PREFIX: &str = "machine.";

/// Wildcard event descriptor matching any user-sent event.
pub const WILDCARD_EVENT: &str = "*";

/// Name of the completion event raised when the state with the given id
/// reaches its final child (or, for parallel states, when every region does).
pub fn done_state(id: &str) -> String {
    format!("done.state.{id}")
}

/// Name of the completion event raised when the invocation with the given
/// id finishes successfully.
pub fn done_invoke(id: &str) -> String {
    format!("done.invoke.{id}")
}

/// Name of the failure event raised when the invocation with the given id
/// reports an error.
pub fn error_platform(id: &str) -> String {
    format!("error.platform.{id}")
}

/// Name of the timer event raised when a delayed transition elapses. The
/// node id disambiguates identical delays declared on different states.
pub fn after(delay: &str, id: &str) -> String {
    format!("machine.after({delay})#{id}")
}

/// True when `name` belongs to the runtime and must not surface as a
/// user-facing implementation line.
pub fn is_reserved_name(name: &str) -> bool {
    name.starts_with(RESERVED_PREFIX)
}

/// True when `event` is raised by the machine itself rather than sent by a
/// consumer. Downstream event unions must declare these separately, which is
/// why the report lists them on their own.
pub fn is_internal_event(event: &str) -> bool {
    event.is_empty()
        || event == INIT_EVENT
        || event.starts_with(RESERVED_PREFIX)
        || event.starts_with("done.state.")
        || event.starts_with("done.invoke.")
        || event.starts_with("error.platform.")
}

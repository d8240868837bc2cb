//! Report assembly and the shapes downstream tooling consumes.
//!
//! [`TypegenData`] is the single artifact of an analysis run: per-state
//! source events, the nested state schema, one sorted category report per
//! implementation kind, the missing-implementation lists, and the
//! machine-raised events a consumer must still declare. The assembler in
//! this module is internal; reports are obtained through
//! [`introspect`](crate::analysis::introspect).

mod assembler;
mod data;

pub use data::{MissingImplementations, StateSchema, StateSources, TypegenData};

pub(crate) use assembler::assemble;

//! Incremental query system for the Vela compiler.
//!
//! Compilation facts are computed by memoized queries: a query is a pure
//! function of its arguments and of the results of the queries it invokes.
//! The [`Context`] owns every cached result for the life of a compilation
//! session and decides, via recorded dependencies and a revision clock,
//! whether a cached result can be reused after inputs change.

mod engine;
mod entry;
mod error;
mod key;
mod revision;

pub use engine::{Context, Stats};
pub use entry::{Dependency, EntryState, QueryValue};
pub use error::{CycleError, QueryError};
pub use key::{Query, QueryArgs, QueryKey, QueryKind};
pub use revision::Revision;

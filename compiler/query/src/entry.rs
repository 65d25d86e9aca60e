use std::any::Any;
use std::fmt;
use std::rc::Rc;

use diagnostic::Diagnostic;

use crate::key::QueryKey;
use crate::revision::Revision;

/// Object-safe view of a stored query result.
///
/// `eq_dyn` gives the engine structural comparison for early cutoff: a
/// recomputation that produces an equal value leaves the entry's
/// `changed_at` untouched, so dependents stay valid.
pub trait QueryValue: fmt::Debug + 'static {
    fn eq_dyn(&self, other: &dyn QueryValue) -> bool;
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Rc<Self>) -> Rc<dyn Any>;
}

impl<T: fmt::Debug + PartialEq + 'static> QueryValue for T {
    fn eq_dyn(&self, other: &dyn QueryValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    NotComputed,
    InProgress,
    Done,
}

/// One query this entry's computation read, with the revision the
/// dependency's value had last changed at when it was read.
#[derive(Clone)]
pub struct Dependency {
    pub key: QueryKey,
    pub changed_at: Revision,
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} @ {}", self.key, self.changed_at)
    }
}

/// The record stored per query key.
///
/// A `Done` entry's value is immutable once stored; recomputation replaces
/// the whole record (value, dependencies, diagnostics) atomically. An entry
/// transitions `NotComputed -> InProgress -> Done`, or
/// `Done -> InProgress -> Done` on recomputation; it never regresses.
pub(crate) struct CacheEntry {
    pub state: EntryState,
    pub value: Option<Rc<dyn QueryValue>>,
    /// Revision at which the value last structurally changed.
    pub changed_at: Revision,
    /// Revision at which the entry was last computed or validated.
    pub checked_at: Revision,
    /// Every query the computation read, in the order first observed.
    pub dependencies: Vec<Dependency>,
    /// Diagnostics the computation reported; replaced on recomputation.
    pub diagnostics: Vec<Diagnostic>,
    /// Root input query: re-executes once per revision.
    pub input: bool,
    /// Interning constructor: exempt from eviction.
    pub intern: bool,
}

impl CacheEntry {
    pub fn new() -> CacheEntry {
        CacheEntry {
            state: EntryState::NotComputed,
            value: None,
            changed_at: Revision::ZERO,
            checked_at: Revision::ZERO,
            dependencies: Vec::new(),
            diagnostics: Vec::new(),
            input: false,
            intern: false,
        }
    }
}

use std::fmt;

use crate::key::QueryKey;

/// A query depends on itself, directly or transitively.
///
/// Well-formed queries must form a DAG, so this is a compiler bug rather
/// than a property of the user's program: it halts the whole compilation
/// and is never cached, so a later, differently-shaped call may still
/// succeed once the state that produced the cycle is gone.
#[derive(Debug, Clone)]
pub struct CycleError {
    /// The query whose re-entry closed the cycle.
    pub key: QueryKey,
    /// Everything in progress at the moment of re-entry, outermost first.
    pub chain: Vec<QueryKey>,
}

impl fmt::Display for CycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "query cycle detected: ")?;
        for key in &self.chain {
            write!(f, "{} -> ", key)?;
        }
        write!(f, "{}", self.key)
    }
}

#[derive(Debug, Clone)]
pub enum QueryError {
    Cycle(CycleError),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::Cycle(cycle) => cycle.fmt(f),
        }
    }
}

impl std::error::Error for QueryError {}

impl From<CycleError> for QueryError {
    fn from(cycle: CycleError) -> QueryError {
        QueryError::Cycle(cycle)
    }
}

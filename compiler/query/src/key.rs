use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::engine::Context;
use crate::error::QueryError;
use crate::revision::Revision;

/// A unique identifier for a query kind, by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryKind(pub &'static str);

/// A memoized computation, keyed by its kind and arguments.
///
/// `compute` must be pure with respect to its arguments and the results of
/// the queries it invokes through the context; the engine cannot verify
/// this, it is the implementor's contract. Queries are always invoked
/// through [`Context::invoke`], never called directly.
pub trait Query: 'static {
    type Args: Clone + Eq + Hash + fmt::Debug + 'static;
    type Value: PartialEq + fmt::Debug + 'static;

    const KIND: QueryKind;

    /// Root input query: re-executes once per revision, reading external
    /// state (the context's input store, the file system).
    const INPUT: bool = false;

    /// Interning constructor: its result's identity must outlive eviction.
    const INTERN: bool = false;

    fn compute(ctx: &Context, args: &Self::Args) -> Result<Self::Value, QueryError>;
}

/// Object-safe view of a query's argument tuple.
///
/// Equality and hashing delegate to the concrete type, so two keys are
/// equal iff their kinds match and their arguments compare equal, and
/// hashing stays consistent with that equality.
pub trait QueryArgs: fmt::Debug + 'static {
    fn eq_dyn(&self, other: &dyn QueryArgs) -> bool;
    fn hash_dyn(&self, state: &mut dyn Hasher);
    fn as_any(&self) -> &dyn Any;
}

impl<T: fmt::Debug + Eq + Hash + 'static> QueryArgs for T {
    fn eq_dyn(&self, other: &dyn QueryArgs) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }

    fn hash_dyn(&self, mut state: &mut dyn Hasher) {
        self.hash(&mut state);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// How the engine re-runs a query it only knows by key (during validity
/// checking, where the concrete `Query` type is no longer in scope).
pub(crate) type ForceFn = fn(&Context, &QueryKey) -> Result<Revision, QueryError>;

fn force_erased<Q: Query>(ctx: &Context, key: &QueryKey) -> Result<Revision, QueryError> {
    let args = key.args_as::<Q::Args>().clone();
    ctx.invoke::<Q>(args)?;
    Ok(ctx.changed_at(key))
}

/// The identity of one query invocation: kind plus argument tuple.
#[derive(Clone)]
pub struct QueryKey {
    kind: QueryKind,
    args: Rc<dyn QueryArgs>,
    force: ForceFn,
}

impl QueryKey {
    pub fn of<Q: Query>(args: Q::Args) -> QueryKey {
        QueryKey {
            kind: Q::KIND,
            args: Rc::new(args),
            force: force_erased::<Q>,
        }
    }

    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.kind.0
    }

    pub(crate) fn args_as<A: 'static>(&self) -> &A {
        self.args
            .as_any()
            .downcast_ref::<A>()
            .expect("query arguments have an unexpected type")
    }

    /// Bring the query this key names up to date, returning the revision
    /// its value last changed at.
    pub(crate) fn force(&self, ctx: &Context) -> Result<Revision, QueryError> {
        (self.force)(ctx, self)
    }
}

impl PartialEq for QueryKey {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.args.eq_dyn(other.args.as_ref())
    }
}

impl Eq for QueryKey {}

impl Hash for QueryKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.args.hash_dyn(state);
    }
}

impl fmt::Debug for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:?})", self.kind.0, self.args)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:?})", self.kind.0, self.args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    struct Width;

    impl Query for Width {
        type Args = u8;
        type Value = u8;
        const KIND: QueryKind = QueryKind("test_width");

        fn compute(_ctx: &Context, args: &u8) -> Result<u8, QueryError> {
            Ok(*args)
        }
    }

    fn hash_of(key: &QueryKey) -> u64 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn equal_args_equal_keys() {
        let a = QueryKey::of::<Width>(32);
        let b = QueryKey::of::<Width>(32);
        let c = QueryKey::of::<Width>(64);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn kind_distinguishes_keys() {
        struct OtherWidth;
        impl Query for OtherWidth {
            type Args = u8;
            type Value = u8;
            const KIND: QueryKind = QueryKind("test_other_width");
            fn compute(_ctx: &Context, args: &u8) -> Result<u8, QueryError> {
                Ok(*args)
            }
        }
        let a = QueryKey::of::<Width>(32);
        let b = QueryKey::of::<OtherWidth>(32);
        assert_ne!(a, b);
    }
}

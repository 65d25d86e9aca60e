//! Canonical Vela types, interned through the query context.
//!
//! Every distinct type exists at most once per [`Context`]: the public
//! constructors canonicalize their raw arguments (resolving the `0`
//! default-width sentinel) and then intern the result, so two requests for
//! the same type always return the same shared object and identity
//! comparison (`Rc::ptr_eq`) substitutes for structural comparison.
//!
//! Width domains are a caller contract: the parser/checker must map an
//! illegal width written in source to a diagnostic plus [`Type::Error`]
//! before ever calling a constructor here. An out-of-domain width reaching
//! a constructor is a compiler bug and fails an assertion.

use std::fmt;
use std::rc::Rc;

use query::{Context, Query, QueryError, QueryKind};

/// Width a `real(0)` sentinel resolves to.
pub const DEFAULT_REAL_WIDTH: u8 = 64;
/// Width an `int(0)` / `uint(0)` sentinel resolves to.
pub const DEFAULT_INT_WIDTH: u8 = 64;

pub const REAL_WIDTHS: &[u8] = &[32, 64];
pub const INT_WIDTHS: &[u8] = &[8, 16, 32, 64];

/// An immutable, interned Vela type.
///
/// Compound types hold shared references back into the context's interning
/// tables, never private copies, so the logical type graph may freely
/// share nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Bool,
    Int(u8),
    Uint(u8),
    Real(u8),
    Tuple(Vec<Rc<Type>>),
    /// Sentinel for "a type error was already reported here": dependent
    /// computations keep going instead of cascading.
    Error,
}

impl Type {
    pub fn bitwidth(&self) -> Option<u8> {
        match self {
            Type::Int(bits) | Type::Uint(bits) | Type::Real(bits) => Some(*bits),
            Type::Bool | Type::Tuple(_) | Type::Error => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Type::Error)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool => write!(f, "bool"),
            Type::Int(bits) => write!(f, "int({})", bits),
            Type::Uint(bits) => write!(f, "uint({})", bits),
            Type::Real(bits) => write!(f, "real({})", bits),
            Type::Tuple(elements) => {
                write!(f, "(")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, ")")
            }
            Type::Error => write!(f, "<error>"),
        }
    }
}

// One interning query per constructor. The computations have no
// dependencies, so the entries are valid for the life of the context, and
// INTERN exempts them from eviction: the identity guarantee survives
// revision bumps and garbage collection.

struct BoolTypeQuery;

impl Query for BoolTypeQuery {
    type Args = ();
    type Value = Type;
    const KIND: QueryKind = QueryKind("bool_type");
    const INTERN: bool = true;

    fn compute(_ctx: &Context, _args: &()) -> Result<Type, QueryError> {
        Ok(Type::Bool)
    }
}

struct IntTypeQuery;

impl Query for IntTypeQuery {
    type Args = u8;
    type Value = Type;
    const KIND: QueryKind = QueryKind("int_type");
    const INTERN: bool = true;

    fn compute(_ctx: &Context, bitwidth: &u8) -> Result<Type, QueryError> {
        Ok(Type::Int(*bitwidth))
    }
}

struct UintTypeQuery;

impl Query for UintTypeQuery {
    type Args = u8;
    type Value = Type;
    const KIND: QueryKind = QueryKind("uint_type");
    const INTERN: bool = true;

    fn compute(_ctx: &Context, bitwidth: &u8) -> Result<Type, QueryError> {
        Ok(Type::Uint(*bitwidth))
    }
}

struct RealTypeQuery;

impl Query for RealTypeQuery {
    type Args = u8;
    type Value = Type;
    const KIND: QueryKind = QueryKind("real_type");
    const INTERN: bool = true;

    fn compute(_ctx: &Context, bitwidth: &u8) -> Result<Type, QueryError> {
        Ok(Type::Real(*bitwidth))
    }
}

struct TupleTypeQuery;

impl Query for TupleTypeQuery {
    type Args = Vec<Rc<Type>>;
    type Value = Type;
    const KIND: QueryKind = QueryKind("tuple_type");
    const INTERN: bool = true;

    fn compute(_ctx: &Context, elements: &Vec<Rc<Type>>) -> Result<Type, QueryError> {
        Ok(Type::Tuple(elements.clone()))
    }
}

struct ErrorTypeQuery;

impl Query for ErrorTypeQuery {
    type Args = ();
    type Value = Type;
    const KIND: QueryKind = QueryKind("error_type");
    const INTERN: bool = true;

    fn compute(_ctx: &Context, _args: &()) -> Result<Type, QueryError> {
        Ok(Type::Error)
    }
}

fn intern<Q: Query<Value = Type>>(ctx: &Context, args: Q::Args) -> Rc<Type> {
    // Interning computations invoke nothing, so they cannot cycle.
    ctx.invoke::<Q>(args)
        .expect("interning query cannot fail")
}

pub fn bool_type(ctx: &Context) -> Rc<Type> {
    intern::<BoolTypeQuery>(ctx, ())
}

/// The canonical `int` type of the given width; `0` means the default.
pub fn int_type(ctx: &Context, bitwidth: u8) -> Rc<Type> {
    assert!(
        bitwidth == 0 || INT_WIDTHS.contains(&bitwidth),
        "unsupported int bitwidth: {bitwidth}"
    );
    let bitwidth = if bitwidth == 0 { DEFAULT_INT_WIDTH } else { bitwidth };
    intern::<IntTypeQuery>(ctx, bitwidth)
}

/// The canonical `uint` type of the given width; `0` means the default.
pub fn uint_type(ctx: &Context, bitwidth: u8) -> Rc<Type> {
    assert!(
        bitwidth == 0 || INT_WIDTHS.contains(&bitwidth),
        "unsupported uint bitwidth: {bitwidth}"
    );
    let bitwidth = if bitwidth == 0 { DEFAULT_INT_WIDTH } else { bitwidth };
    intern::<UintTypeQuery>(ctx, bitwidth)
}

/// The canonical `real` type of the given width; `0` means the default.
pub fn real_type(ctx: &Context, bitwidth: u8) -> Rc<Type> {
    assert!(
        bitwidth == 0 || REAL_WIDTHS.contains(&bitwidth),
        "unsupported real bitwidth: {bitwidth}"
    );
    let bitwidth = if bitwidth == 0 { DEFAULT_REAL_WIDTH } else { bitwidth };
    intern::<RealTypeQuery>(ctx, bitwidth)
}

/// The canonical tuple type over already-interned element types.
pub fn tuple_type(ctx: &Context, elements: Vec<Rc<Type>>) -> Rc<Type> {
    intern::<TupleTypeQuery>(ctx, elements)
}

pub fn error_type(ctx: &Context) -> Rc<Type> {
    intern::<ErrorTypeQuery>(ctx, ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_width_canonicalizes_to_the_concrete_default() {
        let ctx = Context::new();
        let defaulted = real_type(&ctx, 0);
        let concrete = real_type(&ctx, DEFAULT_REAL_WIDTH);
        assert!(Rc::ptr_eq(&defaulted, &concrete));
        // The constructor body ran exactly once for both requests.
        assert_eq!(ctx.stats().executions, 1);
    }

    #[test]
    fn distinct_widths_are_distinct_objects() {
        let ctx = Context::new();
        let narrow = real_type(&ctx, 32);
        let wide = real_type(&ctx, 64);
        assert!(!Rc::ptr_eq(&narrow, &wide));
        assert_ne!(*narrow, *wide);
    }

    #[test]
    fn identity_survives_unrelated_revision_bumps() {
        let ctx = Context::new();
        let before = real_type(&ctx, 32);
        let executions = ctx.stats().executions;

        ctx.bump_revision();
        let after = real_type(&ctx, 32);

        assert!(Rc::ptr_eq(&before, &after));
        assert_eq!(ctx.stats().executions, executions, "no recomputation");
    }

    #[test]
    fn identity_survives_garbage_collection() {
        let ctx = Context::new();
        ctx.set_eviction_window(0);
        let before = real_type(&ctx, 64);
        ctx.bump_revision();
        ctx.bump_revision();
        ctx.collect_garbage();
        let after = real_type(&ctx, 64);
        assert!(Rc::ptr_eq(&before, &after));
    }

    #[test]
    fn kinds_do_not_collide() {
        let ctx = Context::new();
        let int = int_type(&ctx, 32);
        let uint = uint_type(&ctx, 32);
        let real = real_type(&ctx, 32);
        assert!(!Rc::ptr_eq(&int, &uint));
        assert_ne!(*int, *real);
        assert_eq!(int.bitwidth(), Some(32));
    }

    #[test]
    fn tuples_intern_by_element_identity() {
        let ctx = Context::new();
        let a = tuple_type(&ctx, vec![int_type(&ctx, 0), real_type(&ctx, 32)]);
        let b = tuple_type(&ctx, vec![int_type(&ctx, 0), real_type(&ctx, 32)]);
        let c = tuple_type(&ctx, vec![int_type(&ctx, 0)]);
        assert!(Rc::ptr_eq(&a, &b));
        assert!(!Rc::ptr_eq(&a, &c));
    }

    #[test]
    fn display_forms() {
        let ctx = Context::new();
        assert_eq!(real_type(&ctx, 0).to_string(), "real(64)");
        assert_eq!(bool_type(&ctx).to_string(), "bool");
        let pair = tuple_type(&ctx, vec![int_type(&ctx, 8), bool_type(&ctx)]);
        assert_eq!(pair.to_string(), "(int(8), bool)");
        assert_eq!(error_type(&ctx).to_string(), "<error>");
    }

    #[test]
    #[should_panic(expected = "unsupported real bitwidth")]
    fn out_of_domain_width_is_a_contract_violation() {
        let ctx = Context::new();
        real_type(&ctx, 16);
    }
}

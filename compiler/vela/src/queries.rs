//! The compilation pipeline as queries: file text -> parse -> per-decl
//! types -> per-file check. Everything here is invoked through the query
//! context, so memoization, dependency tracking and invalidation apply
//! uniformly across the pipeline.

use std::rc::Rc;

use ast::{Decl, Literal, Module, Symbol, TypeExpr, TypeName};
use diagnostic::{Diagnostic, VelaError};
use query::{Context, Query, QueryError, QueryKind};
use ty::Type;
use vfs::{FilePath, FileText};

pub const CHECK_ERROR_BASE: u32 = 4000;
pub const CHECK_INVALID_WIDTH: u32 = CHECK_ERROR_BASE + 1;
pub const CHECK_TYPE_MISMATCH: u32 = CHECK_ERROR_BASE + 2;
pub const CHECK_NEGATIVE_UINT: u32 = CHECK_ERROR_BASE + 3;
pub const CHECK_DUPLICATE_NAME: u32 = CHECK_ERROR_BASE + 4;

/// Parse of one file. Lex and parse errors become diagnostics on this
/// entry; the tree itself is always best-effort, never absent.
pub struct ParseFile;

impl Query for ParseFile {
    type Args = FilePath;
    type Value = Module;
    const KIND: QueryKind = QueryKind("parse_file");

    fn compute(ctx: &Context, path: &FilePath) -> Result<Module, QueryError> {
        let text = ctx.invoke::<FileText>(*path)?;
        let (tokens, lex_errors) = lex::lex(&text);
        for error in &lex_errors {
            ctx.report(error.diagnostic(path.as_str()));
        }
        let mut parser = parse::Parser::new(&text, tokens);
        let module = parser.parse_module();
        for error in &parser.errors {
            ctx.report(error.diagnostic(path.as_str()));
        }
        Ok(module)
    }
}

/// The declared type of one `let`, resolved through the interning tables.
pub struct DeclType;

impl Query for DeclType {
    type Args = (FilePath, u32);
    type Value = Rc<Type>;
    const KIND: QueryKind = QueryKind("decl_type");

    fn compute(ctx: &Context, &(path, index): &(FilePath, u32)) -> Result<Rc<Type>, QueryError> {
        let module = ctx.invoke::<ParseFile>(path)?;
        // A stale dependent can force an index the current parse no longer
        // has; the parse diagnostics already cover whatever happened.
        let Some(decl) = module.decl(index as usize) else {
            return Ok(ty::error_type(ctx));
        };
        Ok(resolve_type_expr(ctx, path.as_str(), &decl.ty))
    }
}

/// Map a written type to its canonical interned type.
///
/// Width validation happens here, against the user's source: an illegal
/// width is a diagnostic plus the error type. Only validated widths reach
/// the `ty` constructors, whose domain assertions are for compiler bugs.
fn resolve_type_expr(ctx: &Context, file: &str, written: &TypeExpr) -> Rc<Type> {
    let legal: &[u8] = match written.name {
        TypeName::Bool => {
            if written.width.is_some() {
                ctx.report(
                    Diagnostic::error(file, "`bool` does not take a width")
                        .with_code(CHECK_INVALID_WIDTH)
                        .with_primary_span(written.span),
                );
                return ty::error_type(ctx);
            }
            return ty::bool_type(ctx);
        }
        TypeName::Int | TypeName::Uint => ty::INT_WIDTHS,
        TypeName::Real => ty::REAL_WIDTHS,
    };

    let bitwidth = match written.width {
        None => 0, // default-width sentinel, canonicalized by the constructor
        Some(width) if u8::try_from(width).is_ok_and(|w| legal.contains(&w)) => width as u8,
        Some(width) => {
            let span = written.width_span.unwrap_or(written.span);
            ctx.report(
                Diagnostic::error(
                    file,
                    format!("`{}` has no width {}", written.name.as_str(), width),
                )
                .with_code(CHECK_INVALID_WIDTH)
                .with_primary_span(span)
                .with_help(format!(
                    "supported widths for `{}` are {}",
                    written.name.as_str(),
                    legal
                        .iter()
                        .map(|w| w.to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                )),
            );
            return ty::error_type(ctx);
        }
    };

    match written.name {
        TypeName::Int => ty::int_type(ctx, bitwidth),
        TypeName::Uint => ty::uint_type(ctx, bitwidth),
        TypeName::Real => ty::real_type(ctx, bitwidth),
        TypeName::Bool => unreachable!("bool handled above"),
    }
}

/// Per-file result of checking: each declaration's name and type.
#[derive(Debug, Clone, PartialEq)]
pub struct FileSummary {
    pub decls: Vec<(Symbol, Rc<Type>)>,
}

impl FileSummary {
    pub fn type_of(&self, name: Symbol) -> Option<&Rc<Type>> {
        self.decls
            .iter()
            .find(|(decl_name, _)| *decl_name == name)
            .map(|(_, ty)| ty)
    }
}

/// Check one file: resolve every declaration's type and verify its
/// initializer fits. User errors accumulate as diagnostics while the
/// summary still covers every declaration (with the error type where
/// resolution failed).
pub struct CheckFile;

impl Query for CheckFile {
    type Args = FilePath;
    type Value = FileSummary;
    const KIND: QueryKind = QueryKind("check_file");

    fn compute(ctx: &Context, path: &FilePath) -> Result<FileSummary, QueryError> {
        let module = ctx.invoke::<ParseFile>(*path)?;
        let mut decls: Vec<(Symbol, Rc<Type>)> = Vec::new();

        for (index, decl) in module.decls.iter().enumerate() {
            let ty = ctx.invoke::<DeclType>((*path, index as u32))?;

            if decls.iter().any(|(name, _)| *name == decl.name) {
                ctx.report(
                    Diagnostic::error(
                        path.as_str(),
                        format!("`{}` is declared more than once", decl.name),
                    )
                    .with_code(CHECK_DUPLICATE_NAME)
                    .with_primary_span(decl.span),
                );
            }

            check_initializer(ctx, path.as_str(), decl, &ty);
            decls.push((decl.name, (*ty).clone()));
        }

        Ok(FileSummary { decls })
    }
}

fn check_initializer(ctx: &Context, file: &str, decl: &Decl, ty: &Type) {
    let compatible = match (&decl.init, ty) {
        // Resolution already reported; don't cascade.
        (_, Type::Error) => true,
        (Literal::Int(_, _), Type::Int(_)) => true,
        (Literal::Int(value, span), Type::Uint(_)) => {
            if *value < 0 {
                ctx.report(
                    Diagnostic::error(
                        file,
                        format!("`{}` is unsigned but its initializer is negative", decl.name),
                    )
                    .with_code(CHECK_NEGATIVE_UINT)
                    .with_primary_span(*span),
                );
                return;
            }
            true
        }
        // Integer literals widen to real.
        (Literal::Int(_, _), Type::Real(_)) => true,
        (Literal::Real(_, _), Type::Real(_)) => true,
        (Literal::Bool(_, _), Type::Bool) => true,
        _ => false,
    };

    if !compatible {
        ctx.report(
            Diagnostic::error(
                file,
                format!(
                    "initializer of `{}` is a {} but the declared type is `{}`",
                    decl.name,
                    decl.init.describe(),
                    ty
                ),
            )
            .with_code(CHECK_TYPE_MISMATCH)
            .with_primary_span(decl.init.span())
            .with_error_label(decl.ty.span, "declared here"),
        );
    }
}

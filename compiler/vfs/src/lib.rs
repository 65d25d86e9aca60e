//! Root inputs: source file text, exposed to the rest of the compiler as
//! an input query.
//!
//! The driver (or an editor integration) pushes new text with
//! [`set_file_text`], which is the input-change signal: it stores the raw
//! text and bumps the revision. The [`FileText`] query re-executes once
//! per revision, preferring stored text and falling back to the file
//! system; an unreadable file is a recoverable error (diagnostic plus
//! empty text), so dependent queries keep going.

use std::rc::Rc;

use diagnostic::Diagnostic;
use internment::Intern;
use query::{Context, Query, QueryError, QueryKind};

pub const VFS_ERROR_BASE: u32 = 3000;
pub const VFS_UNREADABLE_FILE: u32 = VFS_ERROR_BASE + 1;

/// Interned path of a compiled file.
pub type FilePath = Intern<String>;

pub fn file_path(path: &str) -> FilePath {
    Intern::new(path.to_owned())
}

/// The text of a source file. Input query: the only queries whose results
/// change without any dependency changing, and therefore the roots the
/// revision clock exists for.
pub struct FileText;

impl Query for FileText {
    type Args = FilePath;
    type Value = String;
    const KIND: QueryKind = QueryKind("file_text");
    const INPUT: bool = true;

    fn compute(ctx: &Context, path: &FilePath) -> Result<String, QueryError> {
        if let Some(text) = ctx.input_value::<FileText>(path) {
            return Ok((*text).clone());
        }
        match std::fs::read_to_string(path.as_str()) {
            Ok(text) => Ok(text),
            Err(error) => {
                ctx.report(
                    Diagnostic::error(path.as_str(), format!("Cannot read file: {}", error))
                        .with_code(VFS_UNREADABLE_FILE),
                );
                Ok(String::new())
            }
        }
    }
}

/// The input-change signal for file content.
pub fn set_file_text(ctx: &Context, path: &str, text: impl Into<String>) {
    ctx.set_input::<FileText>(file_path(path), text.into());
}

pub fn file_text(ctx: &Context, path: FilePath) -> Result<Rc<String>, QueryError> {
    ctx.invoke::<FileText>(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_text_wins() {
        let ctx = Context::new();
        set_file_text(&ctx, "mem.vl", "let x: int = 1;\n");
        let text = file_text(&ctx, file_path("mem.vl")).unwrap();
        assert_eq!(*text, "let x: int = 1;\n");
    }

    #[test]
    fn replacing_text_bumps_the_revision() {
        let ctx = Context::new();
        let before = ctx.current_revision();
        set_file_text(&ctx, "mem.vl", "a");
        set_file_text(&ctx, "mem.vl", "b");
        assert!(ctx.current_revision() > before);
        let text = file_text(&ctx, file_path("mem.vl")).unwrap();
        assert_eq!(*text, "b");
    }

    #[test]
    fn unreadable_file_reports_and_returns_empty() {
        let ctx = Context::new();
        let path = file_path("/nonexistent/vela/input.vl");
        let text = file_text(&ctx, path).unwrap();
        assert!(text.is_empty());
        let diags = ctx.diagnostics::<FileText>(path);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, Some(VFS_UNREADABLE_FILE));
    }

    #[test]
    fn reads_from_disk_when_nothing_is_stored() {
        let file = std::env::temp_dir().join(format!("vela-vfs-test-{}.vl", std::process::id()));
        std::fs::write(&file, "let d: bool = true;\n").unwrap();

        let ctx = Context::new();
        let path = file_path(file.to_str().unwrap());
        let text = file_text(&ctx, path).unwrap();
        assert_eq!(*text, "let d: bool = true;\n");

        std::fs::remove_file(&file).ok();
    }
}

mod queries;

use diagnostic::emitter;
use queries::CheckFile;
use query::Context;
use vfs::{FileText, file_path};

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let filename = if args.len() > 1 { &args[1] } else { "test.vl" };

    let ctx = Context::new();
    let path = file_path(filename);

    let summary = match ctx.invoke::<CheckFile>(path) {
        Ok(summary) => summary,
        Err(error) => {
            eprintln!("internal compiler error: {}", error);
            std::process::exit(101);
        }
    };

    let text = match ctx.invoke::<FileText>(path) {
        Ok(text) => text,
        Err(error) => {
            eprintln!("internal compiler error: {}", error);
            std::process::exit(101);
        }
    };

    let diagnostics = ctx.diagnostics::<CheckFile>(path);
    for diagnostic in &diagnostics {
        emitter::emit(diagnostic, &text);
    }

    for (name, ty) in &summary.decls {
        println!("{}: {}", name, ty);
    }

    let errors = diagnostic::error_count(&diagnostics);
    if errors > 0 {
        eprintln!("{} error(s)", errors);
        std::process::exit(1);
    }
}

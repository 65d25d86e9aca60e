//! Terminal rendering of diagnostics via ariadne.
//!
//! The caller supplies the current text of the diagnostic's file; spans
//! stored in a diagnostic are byte offsets into exactly that text.

use ariadne::{ColorGenerator, Label, Report, Source};

use crate::Diagnostic;

/// Convert a byte offset into a character offset for ariadne.
fn char_offset(source: &str, byte_offset: usize) -> usize {
    source
        .get(..byte_offset.min(source.len()))
        .map(|s| s.chars().count())
        .unwrap_or(0)
}

/// Render one diagnostic against the given source text.
pub fn emit(diagnostic: &Diagnostic, source: &str) {
    let file = &diagnostic.file;
    let mut colors = ColorGenerator::new();

    let primary_span = diagnostic
        .primary_span
        .or_else(|| diagnostic.labels.first().map(|label| label.span));
    let (char_start, char_end) = match primary_span {
        Some(span) => (
            char_offset(source, span.lo().0 as usize),
            char_offset(source, span.hi().0 as usize),
        ),
        None => (0, 0),
    };

    let mut report = Report::build(
        diagnostic.level.to_ariadne_kind(),
        (file, char_start..char_end),
    );

    if let Some(code) = diagnostic.code {
        report = report.with_code(code);
    }

    report = report.with_message(&diagnostic.message);

    for label in &diagnostic.labels {
        let color = colors.next();
        let label_start = char_offset(source, label.span.lo().0 as usize);
        let label_end = char_offset(source, label.span.hi().0 as usize);
        report = report.with_label(
            Label::new((file, label_start..label_end))
                .with_message(&label.message)
                .with_color(color),
        );
    }

    for note in &diagnostic.notes {
        report = report.with_note(note);
    }

    for help in &diagnostic.helps {
        report = report.with_help(help);
    }

    if let Err(e) = report.finish().print((file, Source::from(source))) {
        eprintln!("Error printing diagnostic: {}", e);
    }
}

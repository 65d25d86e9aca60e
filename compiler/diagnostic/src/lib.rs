pub mod emitter;

use ariadne::{Color, ReportKind};
use rustc_span::Span;

pub use emitter::emit;

/// Every layer's error type knows its code, its name, and how to turn
/// itself into a renderable diagnostic for the file it occurred in.
pub trait VelaError {
    fn error_code(&self) -> u32;
    fn error_name(&self) -> &'static str;
    fn diagnostic(&self, file: &str) -> Diagnostic;
}

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Error,
    Warning,
    Note,
    Help,
}

impl Level {
    pub fn to_ariadne_kind(&self) -> ReportKind {
        match self {
            Level::Error => ReportKind::Error,
            Level::Warning => ReportKind::Warning,
            Level::Note | Level::Help => ReportKind::Advice,
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Level::Error => Color::Red,
            Level::Warning => Color::Yellow,
            Level::Note => Color::Blue,
            Level::Help => Color::Cyan,
        }
    }
}

/// A labelled sub-message attached to a diagnostic
#[derive(Debug, Clone)]
pub struct DiagnosticLabel {
    pub span: Span,
    pub message: String,
    pub level: Level,
}

/// A complete diagnostic. Spans are byte offsets local to `file`
/// (every file starts at offset zero).
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub level: Level,
    pub code: Option<u32>,
    pub message: String,
    pub file: String,
    pub primary_span: Option<Span>,
    pub labels: Vec<DiagnosticLabel>,
    pub notes: Vec<String>,
    pub helps: Vec<String>,
}

impl Diagnostic {
    pub fn new(level: Level, file: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            code: None,
            message: message.into(),
            file: file.into(),
            primary_span: None,
            labels: Vec::new(),
            notes: Vec::new(),
            helps: Vec::new(),
        }
    }

    pub fn error(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Level::Error, file, message)
    }

    pub fn warning(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Level::Warning, file, message)
    }

    pub fn note(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Level::Note, file, message)
    }

    pub fn is_error(&self) -> bool {
        self.level == Level::Error
    }

    pub fn with_code(mut self, code: u32) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_primary_span(mut self, span: Span) -> Self {
        self.primary_span = Some(span);
        self
    }

    pub fn with_label(mut self, span: Span, message: impl Into<String>, level: Level) -> Self {
        self.labels.push(DiagnosticLabel {
            span,
            message: message.into(),
            level,
        });
        self
    }

    pub fn with_error_label(self, span: Span, message: impl Into<String>) -> Self {
        self.with_label(span, message, Level::Error)
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.helps.push(help.into());
        self
    }
}

/// Count of errors in a batch of diagnostics.
pub fn error_count(diagnostics: &[Diagnostic]) -> usize {
    diagnostics.iter().filter(|d| d.is_error()).count()
}

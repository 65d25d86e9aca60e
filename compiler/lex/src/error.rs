use diagnostic::{Diagnostic, VelaError};
use rustc_span::{BytePos, Span};
use std::fmt;

/// Global error codes for the lexer
pub const LEX_ERROR_BASE: u32 = 1000;
pub const LEX_INVALID_NUMBER: u32 = LEX_ERROR_BASE + 1;
pub const LEX_UNEXPECTED_CHAR: u32 = LEX_ERROR_BASE + 2;

pub type LexResult = Result<crate::Token, LexError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    /// Invalid number format
    InvalidNumber { start: u32, end: u32, message: String },
    /// Unexpected character
    UnexpectedChar {
        position: u32,
        char: char,
        message: String,
    },
}

impl LexError {
    pub fn message(&self) -> &str {
        match self {
            LexError::InvalidNumber { message, .. } => message,
            LexError::UnexpectedChar { message, .. } => message,
        }
    }

    pub fn to_span(&self) -> Span {
        match self {
            LexError::InvalidNumber { start, end, .. } => {
                Span::new(BytePos(*start), BytePos(*end))
            }
            LexError::UnexpectedChar { position, char, .. } => Span::new(
                BytePos(*position),
                BytePos(position + char.len_utf8() as u32),
            ),
        }
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for LexError {}

impl VelaError for LexError {
    fn error_code(&self) -> u32 {
        match self {
            LexError::InvalidNumber { .. } => LEX_INVALID_NUMBER,
            LexError::UnexpectedChar { .. } => LEX_UNEXPECTED_CHAR,
        }
    }

    fn error_name(&self) -> &'static str {
        match self {
            LexError::InvalidNumber { .. } => "invalid number",
            LexError::UnexpectedChar { .. } => "unexpected character",
        }
    }

    fn diagnostic(&self, file: &str) -> Diagnostic {
        Diagnostic::error(file, self.message().to_string())
            .with_code(self.error_code())
            .with_primary_span(self.to_span())
            .with_error_label(self.to_span(), self.error_name())
    }
}

use diagnostic::{Diagnostic, VelaError};
use lex::TokenKind;

pub const PARSE_ERROR_BASE: u32 = 2000;
pub const PARSE_UNEXPECTED_TOKEN: u32 = PARSE_ERROR_BASE + 1;
pub const PARSE_INVALID_SYNTAX: u32 = PARSE_ERROR_BASE + 2;

#[derive(Debug, Clone)]
pub enum ParseError {
    UnexpectedToken {
        message: String,
        expected: TokenKind,
        found: TokenKind,
        span: rustc_span::Span,
    },
    InvalidSyntax {
        message: String,
        found: TokenKind,
        span: rustc_span::Span,
    },
}

impl ParseError {
    pub fn message(&self) -> &str {
        match self {
            ParseError::UnexpectedToken { message, .. } => message,
            ParseError::InvalidSyntax { message, .. } => message,
        }
    }

    pub fn span(&self) -> rustc_span::Span {
        match self {
            ParseError::UnexpectedToken { span, .. } => *span,
            ParseError::InvalidSyntax { span, .. } => *span,
        }
    }

    pub fn unexpected_token(expected: TokenKind, found: TokenKind, span: rustc_span::Span) -> Self {
        ParseError::UnexpectedToken {
            message: format!("Expected `{}`, found `{}`", expected.lexme(), found.lexme()),
            expected,
            found,
            span,
        }
    }

    pub fn invalid_syntax(message: String, found: TokenKind, span: rustc_span::Span) -> Self {
        ParseError::InvalidSyntax {
            message,
            found,
            span,
        }
    }
}

impl VelaError for ParseError {
    fn error_code(&self) -> u32 {
        match self {
            ParseError::UnexpectedToken { .. } => PARSE_UNEXPECTED_TOKEN,
            ParseError::InvalidSyntax { .. } => PARSE_INVALID_SYNTAX,
        }
    }

    fn error_name(&self) -> &'static str {
        match self {
            ParseError::UnexpectedToken { .. } => "unexpected token",
            ParseError::InvalidSyntax { .. } => "invalid syntax",
        }
    }

    fn diagnostic(&self, file: &str) -> Diagnostic {
        Diagnostic::error(file, self.message().to_string())
            .with_code(self.error_code())
            .with_primary_span(self.span())
            .with_error_label(self.span(), self.error_name())
    }
}

use super::error::{LexError, LexResult};
use super::token::{Index, Token, TokenKind};

/// Check if a character can be the start of an identifier
fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

/// Check if a character can be a continuation of an identifier
fn is_identifier_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

pub struct Lexer<'a> {
    src: &'a str,
    cursor: Index,
    remaining: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            cursor: 0,
            remaining: src,
        }
    }

    /// Get the current character without moving the cursor
    fn current_char(&self) -> Option<char> {
        self.remaining.chars().next()
    }

    /// Move the cursor to the next character
    fn advance(&mut self) -> Option<char> {
        let ch = self.current_char()?;
        let ch_len = ch.len_utf8();
        self.cursor += ch_len;
        self.remaining = &self.remaining[ch_len..];
        Some(ch)
    }

    fn advance_while(&mut self, predicate: impl Fn(char) -> bool) {
        while self.current_char().is_some_and(&predicate) {
            self.advance();
        }
    }

    /// Skip whitespace and `--` line comments.
    fn skip_trivia(&mut self) {
        loop {
            self.advance_while(char::is_whitespace);
            if self.remaining.starts_with("--") {
                self.advance_while(|c| c != '\n');
            } else {
                return;
            }
        }
    }

    /// Skip past the offending character after an error.
    pub fn recover_from_error(&mut self) {
        self.advance();
    }

    pub fn next(&mut self) -> LexResult {
        self.skip_trivia();

        let start = self.cursor;
        let Some(ch) = self.current_char() else {
            return Ok(Token::new(TokenKind::Eof, start, start));
        };

        let simple = match ch {
            ':' => Some(TokenKind::Colon),
            '=' => Some(TokenKind::Eq),
            ';' => Some(TokenKind::Semi),
            ',' => Some(TokenKind::Comma),
            '(' => Some(TokenKind::LParen),
            ')' => Some(TokenKind::RParen),
            _ => None,
        };
        if let Some(kind) = simple {
            self.advance();
            return Ok(Token::new(kind, start, self.cursor));
        }

        if ch.is_ascii_digit() {
            return self.number(start);
        }

        if is_identifier_start(ch) {
            self.advance_while(is_identifier_continue);
            let text = &self.src[start..self.cursor];
            let kind = Token::keyword(text).unwrap_or(TokenKind::Id);
            return Ok(Token::new(kind, start, self.cursor));
        }

        Err(LexError::UnexpectedChar {
            position: start as u32,
            char: ch,
            message: format!("Unexpected character `{}`", ch),
        })
    }

    /// Integer or real literal. A real has a fractional part, an exponent,
    /// or both; `1.` without a following digit is invalid.
    fn number(&mut self, start: Index) -> LexResult {
        self.advance_while(|c| c.is_ascii_digit() || c == '_');

        let mut kind = TokenKind::Int;
        if self.remaining.starts_with('.') {
            kind = TokenKind::Real;
            self.advance();
            if !self.current_char().is_some_and(|c| c.is_ascii_digit()) {
                return Err(self.invalid_number(start, "missing digits after `.`"));
            }
            self.advance_while(|c| c.is_ascii_digit() || c == '_');
        }

        if matches!(self.current_char(), Some('e' | 'E')) {
            kind = TokenKind::Real;
            self.advance();
            if matches!(self.current_char(), Some('+' | '-')) {
                self.advance();
            }
            if !self.current_char().is_some_and(|c| c.is_ascii_digit()) {
                return Err(self.invalid_number(start, "missing exponent digits"));
            }
            self.advance_while(|c| c.is_ascii_digit());
        }

        if self.current_char().is_some_and(is_identifier_start) {
            return Err(self.invalid_number(start, "identifier characters after number"));
        }

        Ok(Token::new(kind, start, self.cursor))
    }

    fn invalid_number(&self, start: Index, what: &str) -> LexError {
        LexError::InvalidNumber {
            start: start as u32,
            end: self.cursor as u32,
            message: format!("Invalid number literal: {}", what),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lex;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let (tokens, errors) = lex(src);
        assert!(errors.is_empty(), "unexpected lex errors: {errors:?}");
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_a_declaration() {
        use TokenKind::*;
        assert_eq!(
            kinds("let x: real(32) = 1.5;"),
            vec![Sof, Let, Id, Colon, KwReal, LParen, Int, RParen, Eq, Real, Semi, Eof]
        );
    }

    #[test]
    fn skips_line_comments() {
        use TokenKind::*;
        assert_eq!(kinds("-- nothing\nlet -- mid\n;"), vec![Sof, Let, Semi, Eof]);
    }

    #[test]
    fn real_literal_forms() {
        use TokenKind::*;
        assert_eq!(kinds("1.5 2e3 1.25e-2 42"), vec![Sof, Real, Real, Real, Int, Eof]);
    }

    #[test]
    fn invalid_number_reports_and_recovers() {
        let (tokens, errors) = lex("let x = 1.;");
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], LexError::InvalidNumber { .. }));
        // lexing continues to the end of the input
        assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
    }

    #[test]
    fn unexpected_character() {
        let (_, errors) = lex("let § = 1;");
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], LexError::UnexpectedChar { char: '§', .. }));
    }

    #[test]
    fn token_spans_cover_the_lexeme() {
        let (tokens, _) = lex("let abc;");
        let id = tokens.iter().find(|t| t.kind == TokenKind::Id).unwrap();
        assert_eq!((id.from, id.to), (4, 7));
        assert_eq!(id.span().lo().0, 4);
    }
}

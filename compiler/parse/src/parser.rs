use ast::{Decl, Literal, Module, Symbol, TypeExpr, TypeName, sym};
use lex::{Token, TokenKind};
use rustc_span::Span;
use thin_vec::ThinVec;

use crate::error::ParseError;

pub struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Token>,
    cursor: usize,
    pub errors: Vec<ParseError>,
}

impl<'a> Parser<'a> {
    pub fn new(src: &'a str, tokens: Vec<Token>) -> Self {
        // Skip the leading start-of-file marker.
        let cursor = usize::from(matches!(tokens.first().map(|t| t.kind), Some(TokenKind::Sof)));
        Self {
            src,
            tokens,
            cursor,
            errors: Vec::new(),
        }
    }

    fn peek(&self) -> Token {
        self.tokens
            .get(self.cursor)
            .copied()
            .unwrap_or(Token::new(TokenKind::Eof, self.src.len(), self.src.len()))
    }

    fn bump(&mut self) -> Token {
        let token = self.peek();
        if self.cursor < self.tokens.len() {
            self.cursor += 1;
        }
        token
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        let token = self.peek();
        if token.kind == kind {
            Ok(self.bump())
        } else {
            Err(ParseError::unexpected_token(kind, token.kind, token.span()))
        }
    }

    fn text(&self, token: Token) -> &'a str {
        &self.src[token.from..token.to]
    }

    /// Skip forward past the next `;` (or to end of file) after an error.
    fn synchronize(&mut self) {
        loop {
            match self.peek().kind {
                TokenKind::Eof => return,
                TokenKind::Semi => {
                    self.bump();
                    return;
                }
                _ => {
                    self.bump();
                }
            }
        }
    }

    /// Parse the whole file, collecting errors and keeping every
    /// declaration that parsed cleanly.
    pub fn parse_module(&mut self) -> Module {
        let mut decls = ThinVec::new();
        while self.peek().kind != TokenKind::Eof {
            match self.parse_decl() {
                Ok(decl) => decls.push(decl),
                Err(error) => {
                    self.errors.push(error);
                    self.synchronize();
                }
            }
        }
        Module { decls }
    }

    /// `let NAME: TYPE = LITERAL;`
    fn parse_decl(&mut self) -> Result<Decl, ParseError> {
        let let_token = self.expect(TokenKind::Let)?;
        let name = self.parse_name()?;
        self.expect(TokenKind::Colon)?;
        let ty = self.parse_type_expr()?;
        self.expect(TokenKind::Eq)?;
        let init = self.parse_literal()?;
        let semi = self.expect(TokenKind::Semi)?;
        Ok(Decl {
            name,
            ty,
            init,
            span: Span::new(let_token.span().lo(), semi.span().hi()),
        })
    }

    fn parse_name(&mut self) -> Result<Symbol, ParseError> {
        let token = self.expect(TokenKind::Id)?;
        Ok(sym(self.text(token)))
    }

    /// `bool | int | uint | real`, optionally `( WIDTH )`.
    fn parse_type_expr(&mut self) -> Result<TypeExpr, ParseError> {
        let token = self.peek();
        let name = match token.kind {
            TokenKind::KwBool => TypeName::Bool,
            TokenKind::KwInt => TypeName::Int,
            TokenKind::KwUint => TypeName::Uint,
            TokenKind::KwReal => TypeName::Real,
            found => {
                return Err(ParseError::invalid_syntax(
                    format!("Expected a type name, found `{}`", found.lexme()),
                    found,
                    token.span(),
                ));
            }
        };
        self.bump();

        let mut width = None;
        let mut width_span = None;
        let mut hi = token.span().hi();
        if self.peek().kind == TokenKind::LParen {
            self.bump();
            let width_token = self.expect(TokenKind::Int)?;
            let digits: String = self.text(width_token).replace('_', "");
            match digits.parse::<u64>() {
                Ok(value) => width = Some(value),
                Err(_) => {
                    return Err(ParseError::invalid_syntax(
                        "Width literal is out of range".to_string(),
                        width_token.kind,
                        width_token.span(),
                    ));
                }
            }
            width_span = Some(width_token.span());
            let close = self.expect(TokenKind::RParen)?;
            hi = close.span().hi();
        }

        Ok(TypeExpr {
            name,
            width,
            width_span,
            span: Span::new(token.span().lo(), hi),
        })
    }

    fn parse_literal(&mut self) -> Result<Literal, ParseError> {
        let token = self.peek();
        let span = token.span();
        let literal = match token.kind {
            TokenKind::Int => {
                let digits: String = self.text(token).replace('_', "");
                match digits.parse::<i64>() {
                    Ok(value) => Literal::Int(value, span),
                    Err(_) => {
                        return Err(ParseError::invalid_syntax(
                            "Integer literal is out of range".to_string(),
                            token.kind,
                            span,
                        ));
                    }
                }
            }
            TokenKind::Real => {
                let digits: String = self.text(token).replace('_', "");
                match digits.parse::<f64>() {
                    Ok(value) => Literal::Real(value, span),
                    Err(_) => {
                        return Err(ParseError::invalid_syntax(
                            "Malformed real literal".to_string(),
                            token.kind,
                            span,
                        ));
                    }
                }
            }
            TokenKind::True => Literal::Bool(true, span),
            TokenKind::False => Literal::Bool(false, span),
            found => {
                return Err(ParseError::invalid_syntax(
                    format!("Expected a literal, found `{}`", found.lexme()),
                    found,
                    span,
                ));
            }
        };
        self.bump();
        Ok(literal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    #[test]
    fn parses_declarations() {
        let (module, errors) = parse("let x: real(32) = 1.5;\nlet ok: bool = true;\n");
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(module.decls.len(), 2);
        let x = &module.decls[0];
        assert_eq!(x.name, sym("x"));
        assert_eq!(x.ty.name, TypeName::Real);
        assert_eq!(x.ty.width, Some(32));
        assert!(matches!(x.init, Literal::Real(v, _) if v == 1.5));
    }

    #[test]
    fn default_width_is_none() {
        let (module, errors) = parse("let n: int = 7;");
        assert!(errors.is_empty());
        assert_eq!(module.decls[0].ty.width, None);
    }

    #[test]
    fn recovers_at_semicolons() {
        let (module, errors) = parse("let : int = 1;\nlet y: int = 2;");
        assert_eq!(errors.len(), 1);
        assert_eq!(module.decls.len(), 1);
        assert_eq!(module.decls[0].name, sym("y"));
    }

    #[test]
    fn reports_missing_literal() {
        let (_, errors) = parse("let x: int = ;");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message().contains("Expected a literal"));
    }

    #[test]
    fn illegal_width_is_parsed_not_rejected() {
        // Domain checking is the checker's job, not the parser's.
        let (module, errors) = parse("let x: real(31) = 1.0;");
        assert!(errors.is_empty());
        assert_eq!(module.decls[0].ty.width, Some(31));
    }

    #[test]
    fn spans_are_file_local() {
        let (module, _) = parse("let x: int = 1;");
        let decl = &module.decls[0];
        assert_eq!(decl.span.lo().0, 0);
        assert_eq!(decl.span.hi().0 as usize, "let x: int = 1;".len());
    }
}

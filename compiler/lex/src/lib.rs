pub mod error;
pub mod lexer;
pub mod token;

pub use error::{LexError, LexResult};
pub use lexer::Lexer;
pub use token::{Index, Token, TokenKind};

pub fn lex(src: &str) -> (Vec<Token>, Vec<LexError>) {
    let mut lexer = Lexer::new(src);
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    tokens.push(Token::new(TokenKind::Sof, 0, 0));

    loop {
        let next = lexer.next();
        match next {
            Ok(t) => {
                tokens.push(t);
                if matches!(t.kind, TokenKind::Eof) {
                    break;
                }
            }
            Err(e) => {
                errors.push(e);
                lexer.recover_from_error();
                continue;
            }
        }
    }

    (tokens, errors)
}

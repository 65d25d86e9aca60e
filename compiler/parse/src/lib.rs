pub mod error;
pub mod parser;

pub use error::ParseError;
pub use parser::Parser;

use ast::Module;

/// Lex and parse in one step. Lex errors are dropped here; callers that
/// need them (the parse query) run the lexer themselves.
pub fn parse(src: &str) -> (Module, Vec<ParseError>) {
    let (tokens, _) = lex::lex(src);
    let mut parser = Parser::new(src, tokens);
    let module = parser.parse_module();
    (module, parser.errors)
}

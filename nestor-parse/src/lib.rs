#![forbid(unsafe_code)]

mod error;
mod parser;

use nestor_lex::Lexer;
use miette::IntoDiagnostic;

pub use error::ParseError;
pub use parser::Parser;

pub fn parse_source(src: &str) -> miette::Result<nestor_ast::Program> {
    let tokens = Lexer::new(src).lex().into_diagnostic()?;
    let mut parser = Parser::new(&tokens);
    parser.parse_program().into_diagnostic()
}

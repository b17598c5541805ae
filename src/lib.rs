//! Tree-walking interpreter for Lily, a small expression-oriented
//! scripting language: lexer, Pratt parser, and an evaluator with
//! lexical environments and first-class closures.

use thiserror::Error;

pub mod ast;
pub mod environment;
pub mod evaluator;
pub mod lexer;
pub mod parser;

pub use environment::Environment;
pub use evaluator::{Evaluator, RuntimeError, Value};
pub use lexer::{LexError, Lexer, Token};
pub use parser::{ParseError, Parser};

use ast::Program;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Parses `source` into a program. Deterministic and stateless; every
/// call starts from a fresh lexer.
pub fn parse(source: &str) -> Result<Program, ParseError> {
    Parser::new(Lexer::new(source))?.parse_program()
}

/// Evaluates `program` against `env` and yields the program's value.
pub fn eval(program: &Program, env: Environment) -> Result<Value, RuntimeError> {
    Evaluator::with_env(env).eval_program(program)
}

/// Parses and evaluates `source` in a fresh environment.
pub fn run(source: &str) -> Result<Value, Error> {
    let program = parse(source)?;
    Ok(eval(&program, Environment::new())?)
}

//! Notation compiler — source text → AST → beat-time score.

pub mod ast;
pub mod compile;
pub mod error;
pub mod parser;
pub mod pitch;
pub mod primes;

pub use ast::*;
pub use compile::{Compiled, ItemTime, RulerPoint, RulerState};
pub use error::{CompileError, Error, ParseError};

use crate::score::{to_real_time, RealTimeScore};

/// The notation compiler.
///
/// Parses source text into an AST, compiles it to a beat-time score, and
/// optionally resolves it to milliseconds.
pub struct Compiler;

impl Compiler {
    /// Parse notation source into an AST.
    pub fn parse(source: &str) -> Result<Ast, ParseError> {
        parser::parse(source)
    }

    /// Parse and compile notation source into a beat-time score.
    ///
    /// `Ok(None)` means the source parsed but had nothing to score (empty
    /// or param-only input).
    pub fn compile(source: &str) -> Result<Option<Compiled>, Error> {
        let ast = Self::parse(source)?;
        Ok(compile::compile(&ast)?)
    }

    /// Parse, compile, and resolve notation source to real time.
    pub fn render(source: &str) -> Result<Option<(RealTimeScore, RulerState)>, Error> {
        let compiled = Self::compile(source)?;
        Ok(compiled.map(|compiled| (to_real_time(&compiled.score), compiled.ruler)))
    }
}

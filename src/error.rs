//! Diagnostics shared by every stage of the compiler.
//!
//! Compilation is fail-fast: the first problem found becomes a `CompileError`
//! and is propagated with `?` up to the driver, which reports it and exits.
//! Every variant that originates in the source text carries the 1-based line
//! on which it was detected.

use std::path::PathBuf;

use snafu::Snafu;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CompileError {
  #[snafu(display("error: file must end in '.pl0': {}", path.display()))]
  BadExtension { path: PathBuf },

  #[snafu(display("error: couldn't read {}: {source}", path.display()))]
  ReadSource {
    path: PathBuf,
    source: std::io::Error,
  },

  #[snafu(display("error: {line}: unterminated comment"))]
  UnterminatedComment { line: usize },

  #[snafu(display("error: {line}: invalid number: {text}"))]
  InvalidNumber { line: usize, text: String },

  #[snafu(display("error: {line}: unknown token: '{text}'"))]
  UnknownToken { line: usize, text: String },

  #[snafu(display("error: {line}: syntax error: expected {expected}, found {found}"))]
  Syntax {
    line: usize,
    expected: String,
    found: String,
  },

  #[snafu(display("error: {line}: invalid conditional"))]
  InvalidConditional { line: usize },

  #[snafu(display("error: {line}: {statement} takes an identifier or a number"))]
  WriteOperand {
    line: usize,
    statement: &'static str,
  },

  #[snafu(display("error: {line}: undefined symbol: {name}"))]
  UndefinedSymbol { line: usize, name: String },

  #[snafu(display("error: {line}: duplicate symbol: {name}"))]
  DuplicateSymbol { line: usize, name: String },

  #[snafu(display("error: {line}: must be a variable: {name}"))]
  MustBeVariable { line: usize, name: String },

  #[snafu(display("error: {line}: must not be a procedure: {name}"))]
  MustNotBeProcedure { line: usize, name: String },

  #[snafu(display("error: {line}: must be a procedure: {name}"))]
  MustBeProcedure { line: usize, name: String },

  #[snafu(display("error: {line}: nesting depth exceeded"))]
  NestingDepthExceeded { line: usize },

  #[snafu(display("error: {line}: nesting depth fell below 0"))]
  NestingDepthUnderflow { line: usize },

  #[snafu(display("error: {line}: statements or expressions nested too deeply"))]
  NestedTooDeeply { line: usize },

  #[snafu(display("error: {line}: extra tokens at end of file"))]
  ExtraTokens { line: usize },
}

impl CompileError {
  /// Source line the error was detected on, if it came from the source text.
  pub fn line(&self) -> Option<usize> {
    match self {
      Self::BadExtension { .. } | Self::ReadSource { .. } => None,
      Self::UnterminatedComment { line }
      | Self::InvalidNumber { line, .. }
      | Self::UnknownToken { line, .. }
      | Self::Syntax { line, .. }
      | Self::InvalidConditional { line }
      | Self::WriteOperand { line, .. }
      | Self::UndefinedSymbol { line, .. }
      | Self::DuplicateSymbol { line, .. }
      | Self::MustBeVariable { line, .. }
      | Self::MustNotBeProcedure { line, .. }
      | Self::MustBeProcedure { line, .. }
      | Self::NestingDepthExceeded { line }
      | Self::NestingDepthUnderflow { line }
      | Self::NestedTooDeeply { line }
      | Self::ExtraTokens { line } => Some(*line),
    }
  }
}

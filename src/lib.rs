//! Crate root: wires together the compilation pipeline.
//!
//! PL/0 is compiled to C in a single pass with no syntax tree in between:
//! - `tokenizer` hands out one classified token at a time.
//! - `symbols` tracks declared names across nested blocks.
//! - `parser` recognises the grammar, checks names and drives emission.
//! - `codegen` defines the emission interface and the C backend.
//! - `source` loads `.pl0` files.
//! - `error` holds the single fail-fast error type.

pub mod codegen;
pub mod error;
pub mod parser;
pub mod source;
mod symbols;
pub mod tokenizer;

use std::path::Path;

use log::debug;

pub use codegen::{Backend, CBackend};
pub use error::{CompileError, CompileResult};
pub use source::SourceFile;

/// Compile PL/0 source text into C.
pub fn compile(source: &str) -> CompileResult<String> {
  let backend = parser::parse(source, CBackend::new())?;
  let c = backend.finish();
  debug!("generated {} bytes of C", c.len());
  Ok(c)
}

/// Load a `.pl0` file and compile it.
pub fn compile_file(path: impl AsRef<Path>) -> CompileResult<String> {
  let source = SourceFile::read(path)?;
  debug!("compiling {}", source.path().display());
  compile(source.text())
}

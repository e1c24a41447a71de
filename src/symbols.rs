//! Scoped symbol table.
//!
//! Symbols live in one append-ordered vector. Lookup scans from the tail so
//! the most recent declaration of a name wins, which is exactly shadowing
//! because inner declarations are always appended after outer ones. Closing a
//! procedure block truncates the vector back to the most recent procedure
//! symbol, dropping the block's constants and variables while keeping the
//! procedure's own name callable.

use log::debug;
use snafu::{OptionExt, ensure};

use crate::error::{
  CompileResult, DuplicateSymbolSnafu, MustBeProcedureSnafu, MustBeVariableSnafu,
  MustNotBeProcedureSnafu, UndefinedSymbolSnafu,
};

/// Name under which the top-level program is registered.
pub const PROGRAM_SYMBOL: &str = "main";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
  Constant,
  Variable,
  Procedure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
  pub name: String,
  pub role: Role,
  pub depth: usize,
}

/// The syntactic position a name is used in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Usage {
  /// Assignment and read targets.
  Store,
  /// Values inside expressions and write operands.
  Load,
  /// Target of `call`.
  Call,
}

#[derive(Debug, Clone)]
pub struct SymbolTable {
  symbols: Vec<Symbol>,
}

impl SymbolTable {
  /// A table holding only the program sentinel, which is never removed.
  pub fn new() -> Self {
    Self {
      symbols: vec![Symbol {
        name: PROGRAM_SYMBOL.to_string(),
        role: Role::Procedure,
        depth: 0,
      }],
    }
  }

  pub(crate) fn len(&self) -> usize {
    self.symbols.len()
  }

  #[cfg(test)]
  pub(crate) fn iter(&self) -> impl Iterator<Item = &Symbol> {
    self.symbols.iter()
  }

  /// Append `name` at `depth`. Fails if `name` already exists at that depth.
  pub fn declare(
    &mut self,
    name: &str,
    role: Role,
    depth: usize,
    line: usize,
  ) -> CompileResult<()> {
    ensure!(
      !self
        .symbols
        .iter()
        .any(|symbol| symbol.name == name && symbol.depth == depth),
      DuplicateSymbolSnafu { line, name }
    );
    debug!("declare {role:?} {name} at depth {depth}");
    self.symbols.push(Symbol {
      name: name.to_string(),
      role,
      depth,
    });
    Ok(())
  }

  /// The most recently declared symbol called `name`.
  pub fn resolve(&self, name: &str, line: usize) -> CompileResult<&Symbol> {
    self
      .symbols
      .iter()
      .rev()
      .find(|symbol| symbol.name == name)
      .context(UndefinedSymbolSnafu { line, name })
  }

  /// Resolve `name` and make sure its role fits where it is used.
  pub fn check(&self, name: &str, usage: Usage, line: usize) -> CompileResult<&Symbol> {
    let symbol = self.resolve(name, line)?;
    match usage {
      Usage::Store => ensure!(
        symbol.role == Role::Variable,
        MustBeVariableSnafu { line, name }
      ),
      Usage::Load => ensure!(
        symbol.role != Role::Procedure,
        MustNotBeProcedureSnafu { line, name }
      ),
      Usage::Call => ensure!(
        symbol.role == Role::Procedure,
        MustBeProcedureSnafu { line, name }
      ),
    }
    Ok(symbol)
  }

  /// Drop every trailing non-procedure symbol.
  pub fn leave_scope(&mut self) {
    // The sentinel is a procedure, so there is always a stopping point.
    let keep = self
      .symbols
      .iter()
      .rposition(|symbol| symbol.role == Role::Procedure)
      .map_or(1, |index| index + 1);
    if keep < self.symbols.len() {
      debug!(
        "scope closed, dropping {} symbol(s) after {}",
        self.symbols.len() - keep,
        self.symbols[keep - 1].name
      );
    }
    self.symbols.truncate(keep);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::CompileError;
  use pretty_assertions::assert_eq;

  #[test]
  fn starts_with_program_sentinel() {
    let table = SymbolTable::new();
    assert_eq!(table.len(), 1);
    let main = table.resolve(PROGRAM_SYMBOL, 1).unwrap();
    assert_eq!(main.role, Role::Procedure);
    assert_eq!(main.depth, 0);
  }

  #[test]
  fn resolve_after_declare() {
    let mut table = SymbolTable::new();
    table.declare("x", Role::Variable, 0, 1).unwrap();
    table.declare("k", Role::Constant, 0, 1).unwrap();
    assert_eq!(table.resolve("x", 2).unwrap().role, Role::Variable);
    assert_eq!(table.resolve("k", 2).unwrap().role, Role::Constant);

    let err = table.resolve("y", 7).unwrap_err();
    assert_eq!(err.to_string(), "error: 7: undefined symbol: y");
  }

  #[test]
  fn duplicate_in_same_scope() {
    let mut table = SymbolTable::new();
    table.declare("x", Role::Variable, 0, 1).unwrap();
    let err = table.declare("x", Role::Constant, 0, 2).unwrap_err();
    assert!(matches!(err, CompileError::DuplicateSymbol { line: 2, .. }));
  }

  #[test]
  fn program_name_is_taken_at_top_level() {
    let mut table = SymbolTable::new();
    assert!(table.declare(PROGRAM_SYMBOL, Role::Variable, 0, 1).is_err());
  }

  #[test]
  fn shadowing_and_teardown() {
    let mut table = SymbolTable::new();
    table.declare("x", Role::Variable, 0, 1).unwrap();
    table.declare("p", Role::Procedure, 0, 2).unwrap();
    table.declare("x", Role::Constant, 1, 3).unwrap();
    table.declare("y", Role::Variable, 1, 3).unwrap();

    let inner = table.resolve("x", 4).unwrap();
    assert_eq!((inner.role, inner.depth), (Role::Constant, 1));

    table.leave_scope();

    let outer = table.resolve("x", 5).unwrap();
    assert_eq!((outer.role, outer.depth), (Role::Variable, 0));
    assert!(matches!(
      table.resolve("y", 5),
      Err(CompileError::UndefinedSymbol { .. })
    ));
    assert_eq!(table.resolve("p", 5).unwrap().role, Role::Procedure);
  }

  #[test]
  fn teardown_never_removes_sentinel() {
    let mut table = SymbolTable::new();
    table.declare("a", Role::Variable, 0, 1).unwrap();
    table.leave_scope();
    table.leave_scope();
    assert_eq!(table.len(), 1);
    assert_eq!(table.iter().next().unwrap().name, PROGRAM_SYMBOL);
  }

  #[test]
  fn role_checks() {
    let mut table = SymbolTable::new();
    table.declare("v", Role::Variable, 0, 1).unwrap();
    table.declare("c", Role::Constant, 0, 1).unwrap();
    table.declare("p", Role::Procedure, 0, 1).unwrap();

    assert!(table.check("v", Usage::Store, 2).is_ok());
    assert!(matches!(
      table.check("c", Usage::Store, 2),
      Err(CompileError::MustBeVariable { .. })
    ));
    assert!(matches!(
      table.check("p", Usage::Store, 2),
      Err(CompileError::MustBeVariable { .. })
    ));

    assert!(table.check("v", Usage::Load, 2).is_ok());
    assert!(table.check("c", Usage::Load, 2).is_ok());
    assert!(matches!(
      table.check("p", Usage::Load, 2),
      Err(CompileError::MustNotBeProcedure { .. })
    ));

    assert!(table.check("p", Usage::Call, 2).is_ok());
    assert!(matches!(
      table.check("v", Usage::Call, 2),
      Err(CompileError::MustBeProcedure { .. })
    ));
  }
}

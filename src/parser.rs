//! Recursive-descent parser, semantic checker and code generator in one pass.
//!
//! ```text
//! program    = block "." .
//! block      = [ "const" ident "=" number { "," ident "=" number } ";" ]
//!              [ "var" ident { "," ident } ";" ]
//!              { "procedure" ident ";" block ";" } statement .
//! statement  = [ ident ":=" expression
//!              | "call" ident
//!              | "begin" statement { ";" statement } "end"
//!              | "if" condition "then" statement
//!              | "while" condition "do" statement
//!              | "readInt" [ "into" ] ident
//!              | "writeInt" ( ident | number )
//!              | "readChar" [ "into" ] ident
//!              | "writeChar" ( ident | number ) ] .
//! condition  = "odd" expression
//!            | expression ( "=" | "#" | "<" | ">" ) expression .
//! expression = [ "+" | "-" ] term { ( "+" | "-" ) term } .
//! term       = factor { ( "*" | "/" ) factor } .
//! factor     = ident | number | "(" expression ")" .
//! ```
//!
//! The grammar is LL(1): the current token alone picks the production. Each
//! rule validates names against the symbol table and hands fragments to the
//! backend the moment it recognises them; nothing is kept once a rule returns.

use log::debug;
use snafu::{OptionExt, ensure};

use crate::codegen::{Backend, Operand};
use crate::error::{
  CompileResult, ExtraTokensSnafu, InvalidConditionalSnafu, NestedTooDeeplySnafu,
  NestingDepthExceededSnafu, NestingDepthUnderflowSnafu, SyntaxSnafu, WriteOperandSnafu,
};
use crate::symbols::{Role, SymbolTable, Usage};
use crate::tokenizer::{Lexer, Token, TokenKind, describe_token};

/// Program block plus one level of procedures.
pub const MAX_NESTING: usize = 2;

/// Longest chain of nested statements and parenthesised expressions. Keeps
/// the recursion bounded on hostile input.
pub const MAX_RECURSION: usize = 256;

/// Translate a whole program, returning the backend that received the output.
pub fn parse<B: Backend>(source: &str, backend: B) -> CompileResult<B> {
  Parser::new(source, backend)?.program()
}

/// State of one compilation: scan cursor, current token, symbols, nesting.
pub struct Parser<'a, B> {
  lexer: Lexer<'a>,
  token: Token,
  symbols: SymbolTable,
  depth: usize,
  recursion: usize,
  in_procedure: bool,
  backend: B,
}

impl<'a, B: Backend> Parser<'a, B> {
  /// Prime the lexer with the first token and seed the symbol table.
  pub fn new(source: &'a str, backend: B) -> CompileResult<Self> {
    let mut lexer = Lexer::new(source);
    let token = lexer.next_token()?;
    Ok(Self {
      lexer,
      token,
      symbols: SymbolTable::new(),
      depth: 0,
      recursion: 0,
      in_procedure: false,
      backend,
    })
  }

  #[cfg(test)]
  fn symbols(&self) -> &SymbolTable {
    &self.symbols
  }

  /// `program = block "." .`
  pub fn program(mut self) -> CompileResult<B> {
    self.backend.prologue();
    self.block()?;
    self.expect(TokenKind::Dot)?;
    ensure!(
      self.token.kind == TokenKind::Eof,
      ExtraTokensSnafu {
        line: self.token.line
      }
    );
    debug!(
      "compiled {} line(s), {} symbol(s) live at exit",
      self.lexer.line(),
      self.symbols.len()
    );
    Ok(self.backend)
  }

  fn next(&mut self) -> CompileResult<()> {
    self.token = self.lexer.next_token()?;
    Ok(())
  }

  fn unexpected<T>(&self, expected: impl Into<String>) -> CompileResult<T> {
    SyntaxSnafu {
      line: self.token.line,
      expected: expected.into(),
      found: describe_token(&self.token),
    }
    .fail()
  }

  /// Consume a token of `kind` or fail with a syntax error.
  fn expect(&mut self, kind: TokenKind) -> CompileResult<()> {
    if self.token.kind != kind {
      return self.unexpected(kind.to_string());
    }
    self.next()
  }

  /// Like `expect`, but emit the token's fragment first.
  fn emit_expect(&mut self, kind: TokenKind) -> CompileResult<()> {
    if self.token.kind != kind {
      return self.unexpected(kind.to_string());
    }
    self.backend.fragment(&self.token);
    self.next()
  }

  /// Emit the current token and move past it.
  fn emit_next(&mut self) -> CompileResult<()> {
    self.backend.fragment(&self.token);
    self.next()
  }

  fn descend(&mut self) -> CompileResult<()> {
    ensure!(
      self.recursion < MAX_RECURSION,
      NestedTooDeeplySnafu {
        line: self.token.line
      }
    );
    self.recursion += 1;
    Ok(())
  }

  fn ascend(&mut self) {
    self.recursion -= 1;
  }

  /// Depth recorded on declarations made in the block being parsed. The
  /// program's own names share depth 0 with the sentinel.
  fn scope(&self) -> usize {
    self.depth.saturating_sub(1)
  }

  /// Declare the current identifier with `role` and move past it.
  fn declaration(&mut self, role: Role) -> CompileResult<String> {
    if self.token.kind != TokenKind::Ident {
      return self.unexpected(TokenKind::Ident.to_string());
    }
    let name = self.token.text.clone();
    self
      .symbols
      .declare(&name, role, self.scope(), self.token.line)?;
    self.next()?;
    Ok(name)
  }

  fn number(&mut self) -> CompileResult<i64> {
    if self.token.kind == TokenKind::Number
      && let Some(value) = self.token.value
    {
      self.next()?;
      return Ok(value);
    }
    self.unexpected(TokenKind::Number.to_string())
  }

  fn block(&mut self) -> CompileResult<()> {
    ensure!(
      self.depth < MAX_NESTING,
      NestingDepthExceededSnafu {
        line: self.token.line
      }
    );
    self.depth += 1;

    if self.token.kind == TokenKind::Const {
      self.next()?;
      self.const_declaration()?;
      while self.token.kind == TokenKind::Comma {
        self.next()?;
        self.const_declaration()?;
      }
      self.expect(TokenKind::Semicolon)?;
    }

    if self.token.kind == TokenKind::Var {
      self.next()?;
      self.var_declaration()?;
      while self.token.kind == TokenKind::Comma {
        self.next()?;
        self.var_declaration()?;
      }
      self.expect(TokenKind::Semicolon)?;
      self.backend.end_variables();
    }

    while self.token.kind == TokenKind::Procedure {
      self.in_procedure = true;
      self.next()?;
      let name = self.declaration(Role::Procedure)?;
      debug!("procedure {name} at depth {}", self.depth);
      self.backend.procedure(&name);
      self.expect(TokenKind::Semicolon)?;

      self.block()?;

      self.expect(TokenKind::Semicolon)?;
      self.in_procedure = false;
      self.symbols.leave_scope();
    }

    if !self.in_procedure {
      self.backend.entry_point();
    }

    self.statement()?;

    self.backend.epilogue(!self.in_procedure);

    self.depth = self
      .depth
      .checked_sub(1)
      .context(NestingDepthUnderflowSnafu {
        line: self.token.line,
      })?;
    Ok(())
  }

  fn const_declaration(&mut self) -> CompileResult<()> {
    let name = self.declaration(Role::Constant)?;
    self.expect(TokenKind::Equal)?;
    let value = self.number()?;
    self.backend.constant(&name, value);
    Ok(())
  }

  fn var_declaration(&mut self) -> CompileResult<()> {
    let name = self.declaration(Role::Variable)?;
    self.backend.variable(&name);
    Ok(())
  }

  fn statement(&mut self) -> CompileResult<()> {
    match self.token.kind {
      TokenKind::Ident => {
        self
          .symbols
          .check(&self.token.text, Usage::Store, self.token.line)?;
        self.emit_next()?;
        self.emit_expect(TokenKind::Assign)?;
        self.expression()
      }
      TokenKind::Call => {
        self.next()?;
        if self.token.kind == TokenKind::Ident {
          self
            .symbols
            .check(&self.token.text, Usage::Call, self.token.line)?;
          self.backend.call(&self.token.text);
        }
        self.expect(TokenKind::Ident)
      }
      TokenKind::Begin => {
        self.emit_next()?;
        self.descend()?;
        self.statement()?;
        while self.token.kind == TokenKind::Semicolon {
          self.backend.separator();
          self.next()?;
          self.statement()?;
        }
        self.ascend();
        self.emit_expect(TokenKind::End)
      }
      TokenKind::If => {
        self.emit_next()?;
        self.condition()?;
        self.emit_expect(TokenKind::Then)?;
        self.nested_statement()
      }
      TokenKind::While => {
        self.emit_next()?;
        self.condition()?;
        self.emit_expect(TokenKind::Do)?;
        self.nested_statement()
      }
      TokenKind::WriteInt | TokenKind::WriteChar => self.write(),
      TokenKind::ReadInt | TokenKind::ReadChar => self.read(),
      // Empty statement.
      _ => Ok(()),
    }
  }

  fn nested_statement(&mut self) -> CompileResult<()> {
    self.descend()?;
    self.statement()?;
    self.ascend();
    Ok(())
  }

  /// `("writeInt" | "writeChar") ( ident | number )`
  fn write(&mut self) -> CompileResult<()> {
    let statement = self.token.kind;
    self.next()?;

    let operand = match self.token.kind {
      TokenKind::Ident => {
        self
          .symbols
          .check(&self.token.text, Usage::Load, self.token.line)?;
        Operand::Ident(&self.token.text)
      }
      TokenKind::Number => Operand::Number(self.token.value.unwrap_or_default()),
      _ => {
        return WriteOperandSnafu {
          line: self.token.line,
          statement: statement.as_str(),
        }
        .fail();
      }
    };

    if statement == TokenKind::WriteInt {
      self.backend.write_int(operand);
    } else {
      self.backend.write_char(operand);
    }
    self.next()
  }

  /// `("readInt" | "readChar") [ "into" ] ident`
  fn read(&mut self) -> CompileResult<()> {
    let statement = self.token.kind;
    self.next()?;
    if self.token.kind == TokenKind::Into {
      self.next()?;
    }

    if self.token.kind == TokenKind::Ident {
      self
        .symbols
        .check(&self.token.text, Usage::Store, self.token.line)?;
      if statement == TokenKind::ReadInt {
        self.backend.read_int(&self.token.text);
      } else {
        self.backend.read_char(&self.token.text);
      }
    }
    self.expect(TokenKind::Ident)
  }

  fn condition(&mut self) -> CompileResult<()> {
    if self.token.kind == TokenKind::Odd {
      self.emit_next()?;
      self.expression()?;
      self.backend.odd();
      return Ok(());
    }

    self.expression()?;
    match self.token.kind {
      TokenKind::Equal | TokenKind::Hash | TokenKind::LessThan | TokenKind::GreaterThan => {
        self.emit_next()?
      }
      _ => {
        return InvalidConditionalSnafu {
          line: self.token.line,
        }
        .fail();
      }
    }
    self.expression()
  }

  fn expression(&mut self) -> CompileResult<()> {
    if matches!(self.token.kind, TokenKind::Plus | TokenKind::Minus) {
      self.emit_next()?;
    }
    self.term()?;
    while matches!(self.token.kind, TokenKind::Plus | TokenKind::Minus) {
      self.emit_next()?;
      self.term()?;
    }
    Ok(())
  }

  fn term(&mut self) -> CompileResult<()> {
    self.factor()?;
    while matches!(self.token.kind, TokenKind::Multiply | TokenKind::Divide) {
      self.emit_next()?;
      self.factor()?;
    }
    Ok(())
  }

  fn factor(&mut self) -> CompileResult<()> {
    match self.token.kind {
      TokenKind::Ident => {
        self
          .symbols
          .check(&self.token.text, Usage::Load, self.token.line)?;
        self.emit_next()
      }
      TokenKind::Number => self.emit_next(),
      TokenKind::LParen => {
        self.emit_next()?;
        self.descend()?;
        self.expression()?;
        self.ascend();
        self.emit_expect(TokenKind::RParen)
      }
      _ => self.unexpected("identifier, number or \"(\""),
    }
  }
}

//! Code generation: the fragments the parser emits while it recognises input.
//!
//! The parser never builds a tree. Each production calls into a `Backend` as
//! soon as it is recognised, so the emitted text is a direct trace of the
//! parse. `CBackend` lowers those calls into C99 source held in memory.

use crate::tokenizer::{Token, TokenKind};

/// Size of the line buffer `readInt` reads into, terminator included.
pub const READ_INT_BUFFER: usize = 24;

/// Operand of `writeInt` / `writeChar`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand<'a> {
  Ident(&'a str),
  Number(i64),
}

/// Sink for syntax-directed translation.
pub trait Backend {
  /// Fixed text preceding everything else.
  fn prologue(&mut self);
  fn constant(&mut self, name: &str, value: i64);
  fn variable(&mut self, name: &str);
  /// Called once a `var` list has been terminated.
  fn end_variables(&mut self);
  /// Open the body of a named, parameterless procedure.
  fn procedure(&mut self, name: &str);
  /// Open the body of the program entry point.
  fn entry_point(&mut self);
  /// Close the body opened by `procedure` or `entry_point`.
  fn epilogue(&mut self, entry_point: bool);
  /// Emit whatever a recognised token translates to on its own.
  fn fragment(&mut self, token: &Token);
  /// Separator between statements of a `begin ... end` list.
  fn separator(&mut self);
  fn call(&mut self, name: &str);
  /// Close an `odd` condition opened by its `fragment`.
  fn odd(&mut self);
  fn write_int(&mut self, operand: Operand<'_>);
  fn write_char(&mut self, operand: Operand<'_>);
  fn read_int(&mut self, name: &str);
  fn read_char(&mut self, name: &str);
}

const INCLUDES: &str = "#include <limits.h>
#include <stdio.h>
#include <stdlib.h>
#include <string.h>

";

// `errno` is an ordinary PL/0 name, so this must not include <errno.h>.
const READ_INT_HELPER: &str = r#"static long
__pl0_readint(void)
{
	char *start, *end, *p;
	unsigned long magnitude = 0, limit;
	int negative = 0;

	if (fgets(__stdin, sizeof(__stdin), stdin) == NULL)
		__stdin[0] = '\0';
	start = __stdin;
	while (*start == ' ' || *start == '\t')
		start++;
	end = start + strlen(start);
	while (end > start && (end[-1] == '\n' || end[-1] == '\r' ||
	    end[-1] == ' ' || end[-1] == '\t'))
		*--end = '\0';
	p = start;
	if (*p == '-' || *p == '+')
		negative = *p++ == '-';
	limit = negative ? (unsigned long) LONG_MAX + 1 : (unsigned long) LONG_MAX;
	if (*p == '\0')
		goto invalid;
	for (; *p != '\0'; p++) {
		if (*p < '0' || *p > '9')
			goto invalid;
		if (magnitude > (limit - (unsigned long) (*p - '0')) / 10)
			goto invalid;
		magnitude = magnitude * 10 + (unsigned long) (*p - '0');
	}
	if (!negative)
		return (long) magnitude;
	return magnitude == limit ? LONG_MIN : -(long) magnitude;

invalid:
	(void) fprintf(stderr, "invalid number: %s\n", start);
	exit(1);
}

"#;

/// Emits C99 into an in-memory buffer.
#[derive(Debug, Default)]
pub struct CBackend {
  out: String,
}

impl CBackend {
  pub fn new() -> Self {
    Self::default()
  }

  /// Text generated so far.
  pub fn output(&self) -> &str {
    &self.out
  }

  pub fn finish(self) -> String {
    self.out
  }

  fn operand(operand: Operand<'_>) -> String {
    match operand {
      Operand::Ident(name) => name.to_string(),
      Operand::Number(value) => value.to_string(),
    }
  }
}

impl Backend for CBackend {
  fn prologue(&mut self) {
    self.out.push_str(INCLUDES);
    self
      .out
      .push_str(&format!("static char __stdin[{READ_INT_BUFFER}];\n\n"));
    self.out.push_str(READ_INT_HELPER);
  }

  fn constant(&mut self, name: &str, value: i64) {
    self.out.push_str(&format!("const long {name}={value};\n"));
  }

  fn variable(&mut self, name: &str) {
    self.out.push_str(&format!("long {name};\n"));
  }

  fn end_variables(&mut self) {
    self.out.push('\n');
  }

  fn procedure(&mut self, name: &str) {
    self.out.push_str("void\n");
    self.out.push_str(&format!("{name}(void)\n"));
    self.out.push_str("{\n");
  }

  fn entry_point(&mut self) {
    self.out.push_str("int\n");
    self.out.push_str("main(int argc, char *argv[])\n");
    self.out.push_str("{\n");
  }

  fn epilogue(&mut self, entry_point: bool) {
    self.out.push(';');
    if entry_point {
      self.out.push_str("return 0;");
    }
    self.out.push_str("\n}\n\n");
  }

  fn fragment(&mut self, token: &Token) {
    let text = match token.kind {
      TokenKind::Ident => token.text.as_str(),
      TokenKind::Number => {
        // Emit the value rather than the digits so `010` stays decimal.
        let value = token.value.unwrap_or_default();
        self.out.push_str(&value.to_string());
        return;
      }
      TokenKind::Begin => "{\n",
      TokenKind::End => ";\n}\n",
      TokenKind::If => "if(",
      TokenKind::Then | TokenKind::Do => ")",
      TokenKind::Odd => "(",
      TokenKind::While => "while(",
      TokenKind::Equal => "==",
      TokenKind::Comma => ",",
      TokenKind::Assign => "=",
      TokenKind::Hash => "!=",
      TokenKind::LessThan => "<",
      TokenKind::GreaterThan => ">",
      TokenKind::Plus => "+",
      TokenKind::Minus => "-",
      TokenKind::Multiply => "*",
      TokenKind::Divide => "/",
      TokenKind::LParen => "(",
      TokenKind::RParen => ")",
      // Translated by dedicated backend calls, or by nothing at all.
      TokenKind::Const
      | TokenKind::Var
      | TokenKind::Procedure
      | TokenKind::Call
      | TokenKind::WriteInt
      | TokenKind::WriteChar
      | TokenKind::ReadInt
      | TokenKind::ReadChar
      | TokenKind::Into
      | TokenKind::Dot
      | TokenKind::Semicolon
      | TokenKind::Eof => "",
    };
    self.out.push_str(text);
  }

  fn separator(&mut self) {
    self.out.push_str(";\n");
  }

  fn call(&mut self, name: &str) {
    self.out.push_str(&format!("{name}();\n"));
  }

  fn odd(&mut self) {
    self.out.push_str(")&1");
  }

  fn write_int(&mut self, operand: Operand<'_>) {
    let operand = Self::operand(operand);
    self
      .out
      .push_str(&format!("(void) fprintf(stdout, \"%ld\", (long) {operand});"));
  }

  fn write_char(&mut self, operand: Operand<'_>) {
    let operand = Self::operand(operand);
    self.out.push_str(&format!(
      "(void) fprintf(stdout, \"%c\", (unsigned char) {operand});"
    ));
  }

  fn read_int(&mut self, name: &str) {
    self.out.push_str(&format!("{name}=__pl0_readint();"));
  }

  fn read_char(&mut self, name: &str) {
    self
      .out
      .push_str(&format!("{name}=(unsigned char) fgetc(stdin);"));
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn declarations() {
    let mut backend = CBackend::new();
    backend.constant("k", 10);
    backend.variable("x");
    backend.variable("y");
    backend.end_variables();
    assert_eq!(backend.output(), "const long k=10;\nlong x;\nlong y;\n\n");
  }

  #[test]
  fn procedure_and_entry_point_shapes() {
    let mut backend = CBackend::new();
    backend.procedure("p");
    backend.epilogue(false);
    backend.entry_point();
    backend.epilogue(true);
    assert_eq!(
      backend.finish(),
      "void\np(void)\n{\n;\n}\n\nint\nmain(int argc, char *argv[])\n{\n;return 0;\n}\n\n"
    );
  }

  #[test]
  fn relational_fragments() {
    let mut backend = CBackend::new();
    for kind in [
      TokenKind::Equal,
      TokenKind::Hash,
      TokenKind::LessThan,
      TokenKind::GreaterThan,
    ] {
      backend.fragment(&Token::new(kind, 1));
      backend.out.push(' ');
    }
    assert_eq!(backend.output(), "== != < > ");
  }

  #[test]
  fn keywords_with_dedicated_calls_have_no_fragment() {
    let mut backend = CBackend::new();
    for kind in [
      TokenKind::Const,
      TokenKind::Var,
      TokenKind::Procedure,
      TokenKind::Call,
      TokenKind::WriteInt,
      TokenKind::WriteChar,
      TokenKind::ReadInt,
      TokenKind::ReadChar,
      TokenKind::Into,
      TokenKind::Dot,
      TokenKind::Semicolon,
      TokenKind::Eof,
    ] {
      backend.fragment(&Token::new(kind, 1));
    }
    assert_eq!(backend.output(), "");
  }

  #[test]
  fn number_fragment_uses_decimal_value() {
    let mut backend = CBackend::new();
    backend.fragment(&Token {
      kind: TokenKind::Number,
      text: "010".to_string(),
      value: Some(10),
      line: 1,
    });
    assert_eq!(backend.output(), "10");
  }

  #[test]
  fn io_statements() {
    let mut backend = CBackend::new();
    backend.write_int(Operand::Ident("x"));
    backend.write_char(Operand::Number(10));
    backend.read_int("x");
    backend.read_char("c");
    assert_eq!(
      backend.output(),
      "(void) fprintf(stdout, \"%ld\", (long) x);\
       (void) fprintf(stdout, \"%c\", (unsigned char) 10);\
       x=__pl0_readint();\
       c=(unsigned char) fgetc(stdin);"
    );
  }

  #[test]
  fn prologue_declares_input_buffer() {
    let mut backend = CBackend::new();
    backend.prologue();
    assert!(backend.output().starts_with("#include <limits.h>\n"));
    assert!(!backend.output().contains("errno"));
    assert!(backend.output().contains("static char __stdin[24];"));
    assert!(backend.output().contains("__pl0_readint(void)"));
  }
}

//! Lexical analysis: pulls one classified token at a time out of the source.
//!
//! The parser drives the lexer on demand, so no token stream is ever
//! materialised. Whitespace and `{ ... }` comments are skipped between
//! tokens; newlines inside either bump the line counter used for diagnostics.

use std::fmt;

use log::trace;
use snafu::{OptionExt, ensure};

use crate::error::{
  CompileResult, InvalidNumberSnafu, UnknownTokenSnafu, UnterminatedCommentSnafu,
};

/// Kinds of tokens recognised by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
  Ident,
  Number,
  Const,
  Var,
  Procedure,
  Call,
  Begin,
  End,
  If,
  Then,
  While,
  Do,
  Odd,
  WriteInt,
  WriteChar,
  ReadInt,
  ReadChar,
  Into,
  Dot,
  Equal,
  Comma,
  Semicolon,
  Assign,
  Hash,
  LessThan,
  GreaterThan,
  Plus,
  Minus,
  Multiply,
  Divide,
  LParen,
  RParen,
  Eof,
}

impl TokenKind {
  /// Keywords are matched case-sensitively.
  pub fn keyword(text: &str) -> Option<Self> {
    let kind = match text {
      "const" => Self::Const,
      "var" => Self::Var,
      "procedure" => Self::Procedure,
      "call" => Self::Call,
      "begin" => Self::Begin,
      "end" => Self::End,
      "if" => Self::If,
      "then" => Self::Then,
      "while" => Self::While,
      "do" => Self::Do,
      "odd" => Self::Odd,
      "writeInt" => Self::WriteInt,
      "writeChar" => Self::WriteChar,
      "readInt" => Self::ReadInt,
      "readChar" => Self::ReadChar,
      "into" => Self::Into,
      _ => return None,
    };
    Some(kind)
  }

  fn punctuator(c: u8) -> Option<Self> {
    let kind = match c {
      b'.' => Self::Dot,
      b'=' => Self::Equal,
      b',' => Self::Comma,
      b';' => Self::Semicolon,
      b'#' => Self::Hash,
      b'<' => Self::LessThan,
      b'>' => Self::GreaterThan,
      b'+' => Self::Plus,
      b'-' => Self::Minus,
      b'*' => Self::Multiply,
      b'/' => Self::Divide,
      b'(' => Self::LParen,
      b')' => Self::RParen,
      _ => return None,
    };
    Some(kind)
  }

  /// Source spelling of the token, or a description for the open classes.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Ident => "identifier",
      Self::Number => "number",
      Self::Const => "const",
      Self::Var => "var",
      Self::Procedure => "procedure",
      Self::Call => "call",
      Self::Begin => "begin",
      Self::End => "end",
      Self::If => "if",
      Self::Then => "then",
      Self::While => "while",
      Self::Do => "do",
      Self::Odd => "odd",
      Self::WriteInt => "writeInt",
      Self::WriteChar => "writeChar",
      Self::ReadInt => "readInt",
      Self::ReadChar => "readChar",
      Self::Into => "into",
      Self::Dot => ".",
      Self::Equal => "=",
      Self::Comma => ",",
      Self::Semicolon => ";",
      Self::Assign => ":=",
      Self::Hash => "#",
      Self::LessThan => "<",
      Self::GreaterThan => ">",
      Self::Plus => "+",
      Self::Minus => "-",
      Self::Multiply => "*",
      Self::Divide => "/",
      Self::LParen => "(",
      Self::RParen => ")",
      Self::Eof => "end of file",
    }
  }
}

impl fmt::Display for TokenKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Ident | Self::Number | Self::Eof => f.write_str(self.as_str()),
      _ => write!(f, "\"{}\"", self.as_str()),
    }
  }
}

/// One lexical unit. `text` holds the identifier spelling or the literal's
/// digits (separators stripped); it is empty for everything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
  pub kind: TokenKind,
  pub text: String,
  pub value: Option<i64>,
  pub line: usize,
}

impl Token {
  pub fn new(kind: TokenKind, line: usize) -> Self {
    Self {
      kind,
      text: String::new(),
      value: None,
      line,
    }
  }
}

/// Human-friendly description used in diagnostics.
pub fn describe_token(token: &Token) -> String {
  match token.kind {
    TokenKind::Ident => format!("identifier \"{}\"", token.text),
    TokenKind::Number => format!("number {}", token.text),
    kind => kind.to_string(),
  }
}

/// Strip `_` separators and parse what is left as a non-negative `i64`.
pub fn parse_number(text: &str, line: usize) -> CompileResult<i64> {
  let digits: String = text.chars().filter(|c| *c != '_').collect();
  ensure!(
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()),
    InvalidNumberSnafu { line, text }
  );
  digits.parse::<i64>().ok().context(InvalidNumberSnafu {
    line,
    text: digits.as_str(),
  })
}

/// Scan cursor over the source text.
pub struct Lexer<'a> {
  source: &'a str,
  pos: usize,
  line: usize,
}

impl<'a> Lexer<'a> {
  pub fn new(source: &'a str) -> Self {
    Self {
      source,
      pos: 0,
      line: 1,
    }
  }

  /// Current line counter (1-based).
  pub fn line(&self) -> usize {
    self.line
  }

  fn peek(&self) -> Option<u8> {
    self.source.as_bytes().get(self.pos).copied()
  }

  /// Advance past the next token and return it; `Eof` once input runs out.
  pub fn next_token(&mut self) -> CompileResult<Token> {
    let token = self.scan()?;
    trace!("line {}: {}", token.line, describe_token(&token));
    Ok(token)
  }

  fn scan(&mut self) -> CompileResult<Token> {
    loop {
      self.skip_whitespace();
      if self.peek() == Some(b'{') {
        self.skip_comment()?;
        continue;
      }
      break;
    }

    let Some(c) = self.peek() else {
      return Ok(Token::new(TokenKind::Eof, self.line));
    };

    if c.is_ascii_alphabetic() || c == b'_' {
      return Ok(self.ident());
    }

    if c.is_ascii_digit() {
      return self.number();
    }

    if let Some(kind) = TokenKind::punctuator(c) {
      self.pos += 1;
      return Ok(Token::new(kind, self.line));
    }

    if c == b':' {
      self.pos += 1;
      if self.peek() == Some(b'=') {
        self.pos += 1;
        return Ok(Token::new(TokenKind::Assign, self.line));
      }
      let text = match self.source[self.pos..].chars().next() {
        Some(next) => format!(":{next}"),
        None => ":".to_string(),
      };
      return UnknownTokenSnafu {
        line: self.line,
        text,
      }
      .fail();
    }

    let text = self.source[self.pos..]
      .chars()
      .next()
      .map(String::from)
      .unwrap_or_default();
    UnknownTokenSnafu {
      line: self.line,
      text,
    }
    .fail()
  }

  fn skip_whitespace(&mut self) {
    while let Some(c @ (b' ' | b'\t' | b'\n')) = self.peek() {
      if c == b'\n' {
        self.line += 1;
      }
      self.pos += 1;
    }
  }

  fn skip_comment(&mut self) -> CompileResult<()> {
    let start_line = self.line;
    self.pos += 1;
    loop {
      match self.peek() {
        Some(b'}') => {
          self.pos += 1;
          return Ok(());
        }
        Some(b'\n') => self.line += 1,
        Some(_) => {}
        None => {
          trace!("comment opened on line {start_line} never closed");
          return UnterminatedCommentSnafu { line: self.line }.fail();
        }
      }
      self.pos += 1;
    }
  }

  fn ident(&mut self) -> Token {
    let start = self.pos;
    while let Some(c) = self.peek()
      && (c.is_ascii_alphanumeric() || c == b'_')
    {
      self.pos += 1;
    }
    let text = &self.source[start..self.pos];
    match TokenKind::keyword(text) {
      Some(kind) => Token::new(kind, self.line),
      None => Token {
        kind: TokenKind::Ident,
        text: text.to_string(),
        value: None,
        line: self.line,
      },
    }
  }

  fn number(&mut self) -> CompileResult<Token> {
    let start = self.pos;
    while let Some(c) = self.peek()
      && (c.is_ascii_digit() || c == b'_')
    {
      self.pos += 1;
    }
    let raw = &self.source[start..self.pos];
    let value = parse_number(raw, self.line)?;
    Ok(Token {
      kind: TokenKind::Number,
      text: raw.chars().filter(|c| *c != '_').collect(),
      value: Some(value),
      line: self.line,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::CompileError;
  use pretty_assertions::assert_eq;
  use proptest::prelude::*;

  fn kinds(source: &str) -> Vec<TokenKind> {
    let mut lexer = Lexer::new(source);
    let mut out = Vec::new();
    loop {
      let token = lexer.next_token().unwrap();
      let kind = token.kind;
      out.push(kind);
      if kind == TokenKind::Eof {
        return out;
      }
    }
  }

  fn first_error(source: &str) -> CompileError {
    let mut lexer = Lexer::new(source);
    loop {
      match lexer.next_token() {
        Ok(token) if token.kind == TokenKind::Eof => panic!("no error in {source:?}"),
        Ok(_) => {}
        Err(err) => return err,
      }
    }
  }

  #[test]
  fn keywords_and_punctuation() {
    use TokenKind::*;
    assert_eq!(
      kinds("var x; begin x := 1; writeInt x end."),
      vec![
        Var, Ident, Semicolon, Begin, Ident, Assign, Number, Semicolon, WriteInt, Ident, End, Dot,
        Eof
      ]
    );
    assert_eq!(
      kinds("= , # < > + - * / ( )"),
      vec![
        Equal,
        Comma,
        Hash,
        LessThan,
        GreaterThan,
        Plus,
        Minus,
        Multiply,
        Divide,
        LParen,
        RParen,
        Eof
      ]
    );
  }

  #[test]
  fn keywords_are_case_sensitive() {
    let mut lexer = Lexer::new("Begin writeint readChar into");
    let begin = lexer.next_token().unwrap();
    assert_eq!(begin.kind, TokenKind::Ident);
    assert_eq!(begin.text, "Begin");
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Ident);
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::ReadChar);
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Into);
  }

  #[test]
  fn identifiers_may_contain_underscores_and_digits() {
    let mut lexer = Lexer::new("_tmp1 a_b2");
    assert_eq!(lexer.next_token().unwrap().text, "_tmp1");
    assert_eq!(lexer.next_token().unwrap().text, "a_b2");
  }

  #[test]
  fn comments_and_newlines_advance_line() {
    let mut lexer = Lexer::new("{ one\ntwo }\n\nx");
    let token = lexer.next_token().unwrap();
    assert_eq!(token.kind, TokenKind::Ident);
    assert_eq!(token.line, 4);
  }

  #[test]
  fn unterminated_comment() {
    let err = first_error("x {\nnever closed");
    assert!(matches!(err, CompileError::UnterminatedComment { line: 2 }));
  }

  #[test]
  fn number_literals() {
    assert_eq!(parse_number("123", 1).unwrap(), 123);
    assert_eq!(parse_number("1_000", 1).unwrap(), 1000);
    assert_eq!(parse_number("9223372036854775807", 1).unwrap(), i64::MAX);

    let mut lexer = Lexer::new("1_000");
    let token = lexer.next_token().unwrap();
    assert_eq!(token.text, "1000");
    assert_eq!(token.value, Some(1000));
  }

  #[test]
  fn invalid_numbers() {
    assert!(matches!(
      parse_number("99999999999999999999", 1),
      Err(CompileError::InvalidNumber { .. })
    ));
    assert!(matches!(
      parse_number("_", 1),
      Err(CompileError::InvalidNumber { .. })
    ));
    let err = first_error("begin x := 9223372036854775808 end");
    assert_eq!(
      err.to_string(),
      "error: 1: invalid number: 9223372036854775808"
    );
  }

  #[test]
  fn assign_requires_equals() {
    let err = first_error("x :+ 1");
    assert_eq!(err.to_string(), "error: 1: unknown token: ':+'");
    let err = first_error("x :");
    assert_eq!(err.to_string(), "error: 1: unknown token: ':'");
  }

  #[test]
  fn unknown_character() {
    let err = first_error("x\n  @");
    assert_eq!(err.to_string(), "error: 2: unknown token: '@'");
    let err = first_error("é");
    assert_eq!(err.to_string(), "error: 1: unknown token: 'é'");
  }

  #[test]
  fn carriage_return_is_not_whitespace() {
    assert!(matches!(
      first_error("x\r\n"),
      CompileError::UnknownToken { .. }
    ));
  }

  fn with_separators(n: u64, every: usize) -> String {
    let digits = n.to_string();
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
      if i > 0 && i % every == 0 {
        out.push('_');
      }
      out.push(c);
    }
    out
  }

  proptest! {
    #[test]
    fn separators_do_not_change_value(n in 0u64..=i64::MAX as u64, every in 1usize..5) {
      let text = with_separators(n, every);
      prop_assert_eq!(parse_number(&text, 1).unwrap(), n as i64);
    }

    #[test]
    fn values_above_max_are_rejected(n in (i64::MAX as u64 + 1)..=u64::MAX) {
      prop_assert!(parse_number(&n.to_string(), 1).is_err());
    }
  }
}

//! Recursive-descent parser for gamma-regex production bodies (§4,
//! §6): `'xxx'` denotes a terminal, a bare identifier a non-terminal,
//! `| * + ? ( )` the regex operators, with whitespace and
//! `#`-comments allowed between tokens.

use gammaparse_runtime::CharFlow;

use super::ast::{GammaNode, Quantifier, SymbolRef};
use crate::error::{GammaError, GammaResult};

pub struct GammaParser<'a> {
  flow: CharFlow<std::str::Chars<'a>>,
}

impl<'a> GammaParser<'a> {
  pub fn parse(source: &'a str) -> GammaResult<GammaNode> {
    let mut parser = Self { flow: CharFlow::from_str(source) };
    parser.flow.skip_blanks_and_comments();
    let node = parser.parse_choice()?;
    parser.flow.skip_blanks_and_comments();
    if parser.flow.has_more() {
      return Err(parser.lex_error(&format!("unexpected trailing character {:?}", parser.flow.peek())));
    }
    Ok(node)
  }

  fn lex_error(&mut self, message: &str) -> GammaError {
    GammaError::Lex { message: message.to_string(), line: self.flow.line(), column: self.flow.column() }
  }

  fn parse_choice(&mut self) -> GammaResult<GammaNode> {
    let mut branches = vec![self.parse_sequence()?];
    self.flow.skip_blanks_and_comments();
    while self.flow.check('|') {
      self.flow.skip_blanks_and_comments();
      branches.push(self.parse_sequence()?);
      self.flow.skip_blanks_and_comments();
    }
    if branches.len() == 1 {
      Ok(branches.pop().unwrap())
    } else {
      Ok(GammaNode::Choice(branches))
    }
  }

  fn parse_sequence(&mut self) -> GammaResult<GammaNode> {
    let mut items = Vec::new();
    loop {
      self.flow.skip_blanks_and_comments();
      match self.flow.peek() {
        None | Some('|') | Some(')') | Some(';') => break,
        _ => items.push(self.parse_quantified()?),
      }
    }
    if items.len() == 1 {
      Ok(items.pop().unwrap())
    } else {
      Ok(GammaNode::Sequence(items))
    }
  }

  fn parse_quantified(&mut self) -> GammaResult<GammaNode> {
    let mut node = self.parse_atom()?;
    loop {
      if self.flow.check('*') {
        node = GammaNode::Quantified(Box::new(node), Quantifier::Star);
      } else if self.flow.check('+') {
        node = GammaNode::Quantified(Box::new(node), Quantifier::Plus);
      } else if self.flow.check('?') {
        node = GammaNode::Quantified(Box::new(node), Quantifier::Optional);
      } else {
        break;
      }
    }
    Ok(node)
  }

  fn parse_atom(&mut self) -> GammaResult<GammaNode> {
    if self.flow.check('(') {
      self.flow.skip_blanks_and_comments();
      let inner = self.parse_choice()?;
      self.flow.skip_blanks_and_comments();
      self.flow.read(')').map_err(GammaError::from)?;
      return Ok(inner);
    }
    if self.flow.check('\'') {
      return self.parse_terminal_literal();
    }
    self.parse_identifier()
  }

  fn parse_terminal_literal(&mut self) -> GammaResult<GammaNode> {
    let mut text = String::new();
    loop {
      if self.flow.check('\'') {
        break;
      }
      if !self.flow.has_more() {
        return Err(self.lex_error("unterminated terminal literal"));
      }
      if self.flow.check('\\') {
        let escaped = self.flow.next_char().map_err(GammaError::from)?;
        text.push(escaped);
      } else {
        text.push(self.flow.next_char().map_err(GammaError::from)?);
      }
    }
    Ok(GammaNode::Symbol(SymbolRef::Terminal(text)))
  }

  fn parse_identifier(&mut self) -> GammaResult<GammaNode> {
    let Some(first) = self.flow.peek() else {
      return Err(self.lex_error("expected a terminal or non-terminal"));
    };
    if !(first.is_alphabetic() || first == '_') {
      return Err(self.lex_error(&format!("unexpected character {:?} in gamma-regex body", first)));
    }
    let mut name = String::new();
    name.push(self.flow.next_char().map_err(GammaError::from)?);
    while let Some(c) = self.flow.peek() {
      if c.is_alphanumeric() || c == '_' {
        name.push(self.flow.next_char().map_err(GammaError::from)?);
      } else {
        break;
      }
    }
    Ok(GammaNode::Symbol(SymbolRef::NonTerminal(name)))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_left_associative_arithmetic_body() {
    let node = GammaParser::parse("(E '+')? T").unwrap();
    match node {
      GammaNode::Sequence(items) => assert_eq!(items.len(), 2),
      other => panic!("expected a sequence, got {:?}", other),
    }
  }

  #[test]
  fn parses_terminal_alternation() {
    let node = GammaParser::parse("'id' | 'number' | '(' E ')'").unwrap();
    assert!(matches!(node, GammaNode::Choice(branches) if branches.len() == 3));
  }

  #[test]
  fn unterminated_terminal_literal_is_a_lex_error() {
    let err = GammaParser::parse("'id").unwrap_err();
    assert!(matches!(err, GammaError::Lex { .. }));
  }

  #[test]
  fn comments_between_tokens_are_skipped() {
    let node = GammaParser::parse("E # the left operand\n '+' T").unwrap();
    assert!(matches!(node, GammaNode::Sequence(items) if items.len() == 3));
  }
}

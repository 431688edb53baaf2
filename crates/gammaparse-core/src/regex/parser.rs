//! Recursive-descent parser for the lexical-pattern mini-language
//! (§4.3): `E → T ('|' T)* ; T → F* ; F → B ('+'|'*'|'?')* ; B → char |
//! '(' E ')' | '[' class ']'`.

use gammaparse_runtime::CharFlow;

use super::ast::{Quantifier, RegexNode};
use crate::error::{GammaError, GammaResult};
use crate::interval::{Range, UNIVERSE_HIGH};

pub struct RegexParser<'a> {
  flow: CharFlow<std::str::Chars<'a>>,
}

impl<'a> RegexParser<'a> {
  pub fn parse(source: &'a str) -> GammaResult<RegexNode> {
    let mut parser = Self { flow: CharFlow::from_str(source) };
    let node = parser.parse_choice()?;
    if parser.flow.has_more() {
      return Err(parser.lex_error(&format!("unexpected trailing character {:?}", parser.flow.peek())));
    }
    Ok(node)
  }

  fn lex_error(&mut self, message: &str) -> GammaError {
    GammaError::Lex { message: message.to_string(), line: self.flow.line(), column: self.flow.column() }
  }

  // E → T ('|' T)*
  fn parse_choice(&mut self) -> GammaResult<RegexNode> {
    let mut branches = vec![self.parse_sequence()?];
    while self.flow.check('|') {
      branches.push(self.parse_sequence()?);
    }
    if branches.len() == 1 {
      Ok(branches.pop().unwrap())
    } else {
      Ok(RegexNode::Choice(branches))
    }
  }

  // T → F*
  fn parse_sequence(&mut self) -> GammaResult<RegexNode> {
    let mut items = Vec::new();
    while self.flow.has_more() && !matches!(self.flow.peek(), Some('|') | Some(')')) {
      items.push(self.parse_quantified()?);
    }
    if items.len() == 1 {
      Ok(items.pop().unwrap())
    } else {
      Ok(RegexNode::Sequence(items))
    }
  }

  // F → B ('+'|'*'|'?')*
  fn parse_quantified(&mut self) -> GammaResult<RegexNode> {
    let mut node = self.parse_atom()?;
    loop {
      if self.flow.check('*') {
        node = RegexNode::Quantified(Box::new(node), Quantifier::Star);
      } else if self.flow.check('+') {
        node = RegexNode::Quantified(Box::new(node), Quantifier::Plus);
      } else if self.flow.check('?') {
        node = RegexNode::Quantified(Box::new(node), Quantifier::Optional);
      } else {
        break;
      }
    }
    Ok(node)
  }

  // B → char | '(' E ')' | '[' class ']'
  fn parse_atom(&mut self) -> GammaResult<RegexNode> {
    if self.flow.check('(') {
      let inner = self.parse_choice()?;
      self.flow.read(')').map_err(GammaError::from)?;
      return Ok(inner);
    }
    if self.flow.check('[') {
      let ranges = self.parse_class()?;
      return Ok(RegexNode::Class(ranges));
    }
    if self.flow.check('.') {
      return Ok(RegexNode::Class(vec![Range::new(0, UNIVERSE_HIGH)]));
    }
    if self.flow.check('\\') {
      let ranges = self.parse_escape()?;
      return Ok(RegexNode::Class(ranges));
    }
    if !self.flow.has_more() {
      return Err(self.lex_error("expected a pattern atom, found end of input"));
    }
    let c = self.flow.next_char().map_err(GammaError::from)?;
    Ok(RegexNode::single_char(c as u32))
  }

  /// Parses the body of `[...]` after the opening bracket has already
  /// been consumed. Inside: a leading `^` negates the whole class; the
  /// remainder is an implicit union of terms, each term an
  /// intersection (`&`) of factors.
  fn parse_class(&mut self) -> GammaResult<Vec<Range>> {
    let negate = self.flow.check('^');
    let mut union_acc: Vec<Range> = Vec::new();

    loop {
      if self.flow.check(']') {
        break;
      }
      if !self.flow.has_more() {
        return Err(self.lex_error("unterminated character class"));
      }
      let term = self.parse_class_term()?;
      union_acc = Range::union_list(&[&union_acc, &term]);
    }

    if negate {
      union_acc = Range::invert_over_universe(&union_acc);
    }
    Ok(Range::disjoint_list(&union_acc))
  }

  fn parse_class_term(&mut self) -> GammaResult<Vec<Range>> {
    let mut acc = self.parse_class_factor()?;
    while self.flow.check('&') {
      let rhs = self.parse_class_factor()?;
      acc = Range::intersect_lists(&Range::ensure_disjoint(&acc), &Range::ensure_disjoint(&rhs));
    }
    Ok(acc)
  }

  fn parse_class_factor(&mut self) -> GammaResult<Vec<Range>> {
    if self.flow.check('[') {
      return self.parse_class();
    }
    if self.flow.check('\\') {
      return self.parse_escape();
    }
    let start = self.read_class_char()?;
    if self.flow.check('-') {
      let end = self.read_class_char()?;
      if end < start {
        return Err(self.lex_error("malformed range: end precedes start"));
      }
      return Ok(vec![Range::new(start, end)]);
    }
    Ok(vec![Range::single(start)])
  }

  /// A range endpoint must be a single character (§4.3): an escape is
  /// permitted here only if it denotes exactly one codepoint.
  fn read_class_char(&mut self) -> GammaResult<u32> {
    if self.flow.check('\\') {
      let ranges = self.parse_escape()?;
      if ranges.len() == 1 && ranges[0].start == ranges[0].end {
        return Ok(ranges[0].start);
      }
      return Err(self.lex_error("malformed range: endpoint must be a single character"));
    }
    if !self.flow.has_more() {
      return Err(self.lex_error("unterminated character class"));
    }
    let c = self.flow.next_char().map_err(GammaError::from)?;
    Ok(c as u32)
  }

  /// Parses an escape sequence after the leading `\` has already been
  /// consumed.
  fn parse_escape(&mut self) -> GammaResult<Vec<Range>> {
    if !self.flow.has_more() {
      return Err(self.lex_error("unterminated escape sequence"));
    }
    let c = self.flow.next_char().map_err(GammaError::from)?;
    match c {
      'n' => Ok(vec![Range::single('\n' as u32)]),
      't' => Ok(vec![Range::single('\t' as u32)]),
      'r' => Ok(vec![Range::single('\r' as u32)]),
      'f' => Ok(vec![Range::single(0x0C)]),
      'a' => Ok(vec![Range::single(0x07)]),
      'e' => Ok(vec![Range::single(0x1B)]),
      'x' => self.parse_hex_escape(),
      'u' => {
        let cp = self.read_hex_digits(4)?;
        Ok(vec![Range::single(cp)])
      }
      's' => Ok(Self::space_ranges()),
      'S' => Ok(Range::invert_over_universe(&Self::space_ranges())),
      'w' => Ok(Self::word_ranges()),
      'W' => Ok(Range::invert_over_universe(&Self::word_ranges())),
      'd' => Ok(Self::digit_ranges()),
      'D' => Ok(Range::invert_over_universe(&Self::digit_ranges())),
      'p' => self.parse_posix_escape(),
      other => Ok(vec![Range::single(other as u32)]),
    }
  }

  fn parse_hex_escape(&mut self) -> GammaResult<Vec<Range>> {
    if self.flow.check('{') {
      let mut digits = String::new();
      loop {
        if self.flow.check('}') {
          break;
        }
        if !self.flow.has_more() {
          return Err(self.lex_error("unterminated \\x{...} escape"));
        }
        digits.push(self.flow.next_char().map_err(GammaError::from)?);
      }
      if digits.is_empty() {
        return Err(self.lex_error("empty \\x{...} escape"));
      }
      let cp = u32::from_str_radix(&digits, 16).map_err(|_| self.lex_error("malformed \\x{...} escape"))?;
      Ok(vec![Range::single(cp)])
    } else {
      let cp = self.read_hex_digits(2)?;
      Ok(vec![Range::single(cp)])
    }
  }

  fn read_hex_digits(&mut self, count: usize) -> GammaResult<u32> {
    let mut digits = String::new();
    for _ in 0..count {
      if !self.flow.has_more() {
        return Err(self.lex_error("unterminated hex escape"));
      }
      digits.push(self.flow.next_char().map_err(GammaError::from)?);
    }
    u32::from_str_radix(&digits, 16).map_err(|_| self.lex_error("malformed hex escape"))
  }

  fn parse_posix_escape(&mut self) -> GammaResult<Vec<Range>> {
    if !self.flow.check('{') {
      return Err(self.lex_error("expected '{' after \\p"));
    }
    let mut name = String::new();
    loop {
      if self.flow.check('}') {
        break;
      }
      if !self.flow.has_more() {
        return Err(self.lex_error("unterminated \\p{...} escape"));
      }
      name.push(self.flow.next_char().map_err(GammaError::from)?);
    }
    Self::posix_class(&name).map_err(|message| self.lex_error(&message))
  }

  fn digit_ranges() -> Vec<Range> {
    vec![Range::new('0' as u32, '9' as u32)]
  }

  fn lower_ranges() -> Vec<Range> {
    vec![Range::new('a' as u32, 'z' as u32)]
  }

  fn upper_ranges() -> Vec<Range> {
    vec![Range::new('A' as u32, 'Z' as u32)]
  }

  fn alpha_ranges() -> Vec<Range> {
    Range::union_list(&[&Self::lower_ranges(), &Self::upper_ranges()])
  }

  fn alnum_ranges() -> Vec<Range> {
    Range::union_list(&[&Self::alpha_ranges(), &Self::digit_ranges()])
  }

  fn space_ranges() -> Vec<Range> {
    vec![Range::new(0x09, 0x0D), Range::new(0x20, 0x20)]
  }

  fn word_ranges() -> Vec<Range> {
    Range::union_list(&[&Self::alnum_ranges(), &[Range::single(0x5F)]])
  }

  fn cntrl_ranges() -> Vec<Range> {
    vec![Range::new(0x00, 0x1F), Range::new(0x7F, 0x7F)]
  }

  fn ascii_ranges() -> Vec<Range> {
    vec![Range::new(0x00, 0x7F)]
  }

  fn xdigit_ranges() -> Vec<Range> {
    Range::union_list(&[&Self::digit_ranges(), &[Range::new('a' as u32, 'f' as u32), Range::new('A' as u32, 'F' as u32)]])
  }

  fn posix_class(name: &str) -> Result<Vec<Range>, String> {
    match name {
      "Space" => Ok(Self::space_ranges()),
      "Lower" => Ok(Self::lower_ranges()),
      "Upper" => Ok(Self::upper_ranges()),
      "ASCII" => Ok(Self::ascii_ranges()),
      "Alpha" => Ok(Self::alpha_ranges()),
      "Digit" => Ok(Self::digit_ranges()),
      "Alnum" => Ok(Self::alnum_ranges()),
      "Cntrl" => Ok(Self::cntrl_ranges()),
      "XDigit" => Ok(Self::xdigit_ranges()),
      other => Err(format!("unknown POSIX class \\p{{{}}}", other)),
    }
  }
}

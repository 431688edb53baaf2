use crate::error::{RuntimeError, RuntimeResult};

/// A peeking/advancing character stream with line/column tracking.
///
/// `peek` is idempotent: successive peeks without an intervening
/// consume return the same character. The line counter increments on
/// `'\n'`; the column resets to zero on a newline and increments
/// otherwise.
pub struct CharFlow<I: Iterator<Item = char>> {
  chars:   I,
  current: Option<Option<char>>,
  line:    u32,
  column:  u32,
}

impl<I: Iterator<Item = char>> CharFlow<I> {
  pub fn new(chars: I) -> Self {
    Self { chars, current: None, line: 0, column: 0 }
  }

  pub fn line(&self) -> u32 {
    self.line
  }

  pub fn column(&self) -> u32 {
    self.column
  }

  /// Returns the current character without consuming it, or `None` at
  /// end of stream.
  pub fn peek(&mut self) -> Option<char> {
    if self.current.is_none() {
      self.current = Some(self.chars.next());
    }
    self.current.unwrap()
  }

  pub fn has_more(&mut self) -> bool {
    self.peek().is_some()
  }

  /// Consumes and returns the current character. Fails at end of
  /// stream.
  pub fn next_char(&mut self) -> RuntimeResult<char> {
    if !self.has_more() {
      return Err(RuntimeError::StepPastEof { line: self.line, column: self.column });
    }
    let result = self.peek().unwrap();
    self.step();
    Ok(result)
  }

  /// Consumes the current character if it equals `target`, else fails
  /// with a message naming the line/column.
  pub fn read(&mut self, target: char) -> RuntimeResult<()> {
    if !self.has_more() {
      return Err(RuntimeError::UnexpectedEof { line: self.line, column: self.column, expected: target });
    }
    let found = self.peek().unwrap();
    if found != target {
      return Err(RuntimeError::Mismatch { line: self.line, column: self.column, expected: target, found });
    }
    self.step();
    Ok(())
  }

  /// Consumes the current character iff it equals `target`.
  pub fn check(&mut self, target: char) -> bool {
    if self.has_more() && self.peek().unwrap() == target {
      self.step();
      true
    } else {
      false
    }
  }

  fn step(&mut self) {
    if self.peek() == Some('\n') {
      self.line += 1;
      self.column = 0;
    } else {
      self.column += 1;
    }
    self.current = None;
  }

  pub fn skip_blanks(&mut self) {
    while self.has_more() && self.peek().unwrap().is_whitespace() {
      self.step();
    }
  }

  /// Skips whitespace and `#`-to-newline comments.
  pub fn skip_blanks_and_comments(&mut self) {
    loop {
      if !self.has_more() {
        return;
      }

      if self.peek().unwrap().is_whitespace() {
        let _ = self.next_char();
        continue;
      }

      if self.peek() == Some('#') {
        let _ = self.read('#');
        while self.has_more() && !self.check('\n') {
          let _ = self.next_char();
        }
        continue;
      }

      return;
    }
  }
}

impl<'a> CharFlow<std::str::Chars<'a>> {
  pub fn from_str(source: &'a str) -> Self {
    Self::new(source.chars())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn peek_is_idempotent() {
    let mut flow = CharFlow::from_str("ab");
    assert_eq!(flow.peek(), Some('a'));
    assert_eq!(flow.peek(), Some('a'));
    assert_eq!(flow.next_char().unwrap(), 'a');
    assert_eq!(flow.peek(), Some('b'));
  }

  #[test]
  fn tracks_line_and_column() {
    let mut flow = CharFlow::from_str("ab\ncd");
    assert_eq!((flow.line(), flow.column()), (0, 0));
    flow.next_char().unwrap();
    assert_eq!((flow.line(), flow.column()), (0, 1));
    flow.next_char().unwrap();
    assert_eq!((flow.line(), flow.column()), (0, 2));
    flow.next_char().unwrap();
    assert_eq!((flow.line(), flow.column()), (1, 0));
  }

  #[test]
  fn read_mismatch_reports_position() {
    let mut flow = CharFlow::from_str("x");
    let err = flow.read('y').unwrap_err();
    assert_eq!(err, RuntimeError::Mismatch { line: 0, column: 0, expected: 'y', found: 'x' });
  }

  #[test]
  fn read_at_eof_reports_unexpected_eof() {
    let mut flow = CharFlow::from_str("");
    let err = flow.read('y').unwrap_err();
    assert_eq!(err, RuntimeError::UnexpectedEof { line: 0, column: 0, expected: 'y' });
  }

  #[test]
  fn skip_blanks_and_comments_consumes_both() {
    let mut flow = CharFlow::from_str("   # a comment\nrest");
    flow.skip_blanks_and_comments();
    assert_eq!(flow.peek(), Some('r'));
  }

  #[test]
  fn check_only_consumes_on_match() {
    let mut flow = CharFlow::from_str("ab");
    assert!(!flow.check('b'));
    assert!(flow.check('a'));
    assert_eq!(flow.peek(), Some('b'));
  }
}

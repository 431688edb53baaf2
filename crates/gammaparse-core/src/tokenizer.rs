//! Tokenizer runtime (§4.6, C7): longest-match scan with reluctance
//! short-circuit and a caller-supplied skipper predicate, over the
//! DFA `TokenizerBuilder` (C6, `crate::tokenizer_builder`) produces.

use std::collections::{HashSet, VecDeque};
use std::rc::Rc;

use gammaparse_runtime::{CharFlow, Token};

use crate::error::{GammaError, GammaResult};

/// `(token-id, reluctant-flag, above: set of token-ids)` carried on a
/// lexical pattern's final NFA node (§4.5). Two entries for the same
/// token-id merge (reluctance OR-ed, above-sets unioned); otherwise
/// `above` settles which one wins at a shared DFA state.
#[derive(Clone, Debug)]
pub struct LexEntry {
  pub token_id:  u32,
  pub reluctant: bool,
  pub above:     HashSet<u32>,
}

/// A sorted, pairwise-disjoint list of `(range, target)` pairs with
/// binary-search lookup: since the list is built once, fully
/// populated, and never mutated again, a sorted array gives the same
/// O(log n) query complexity as a balanced BST with none of the
/// rebalancing machinery.
pub struct IntervalIndex {
  entries: Vec<(crate::interval::Range, usize)>,
}

impl IntervalIndex {
  pub fn new(mut entries: Vec<(crate::interval::Range, usize)>) -> Self {
    entries.sort_by_key(|(range, _)| range.start);
    Self { entries }
  }

  pub fn find(&self, codepoint: u32) -> Option<usize> {
    let idx = self.entries.partition_point(|(range, _)| range.start <= codepoint);
    if idx == 0 {
      return None;
    }
    let (range, target) = &self.entries[idx - 1];
    if range.start <= codepoint && codepoint <= range.end {
      Some(*target)
    } else {
      None
    }
  }
}

pub struct TokenizerNode {
  pub entry: Option<LexEntry>,
  pub index: IntervalIndex,
}

/// A thin adapter over `CharFlow` that gives the tokenizer its own
/// local multi-character pushback: when a longest-match walk
/// overshoots past the last accepting state into a dead end, the
/// excess characters are handed back here so the next `read_token`
/// call replays them before touching the underlying flow again.
/// `CharFlow` itself stays single-character (§9 open question); this
/// buffering is private to the tokenizer, not a `CharFlow` feature.
pub struct CodepointBuffer<'a, I: Iterator<Item = char>> {
  flow:      &'a mut CharFlow<I>,
  overshoot: VecDeque<char>,
}

impl<'a, I: Iterator<Item = char>> CodepointBuffer<'a, I> {
  pub fn new(flow: &'a mut CharFlow<I>) -> Self {
    Self { flow, overshoot: VecDeque::new() }
  }

  pub fn line(&self) -> u32 {
    self.flow.line()
  }

  pub fn column(&self) -> u32 {
    self.flow.column()
  }

  fn peek(&mut self) -> Option<char> {
    if let Some(&c) = self.overshoot.front() {
      Some(c)
    } else {
      self.flow.peek()
    }
  }

  fn advance(&mut self) -> GammaResult<char> {
    if let Some(c) = self.overshoot.pop_front() {
      Ok(c)
    } else {
      Ok(self.flow.next_char()?)
    }
  }

  fn push_back(&mut self, chars: Vec<char>) {
    for c in chars.into_iter().rev() {
      self.overshoot.push_front(c);
    }
  }

  fn has_more(&mut self) -> bool {
    !self.overshoot.is_empty() || self.flow.has_more()
  }
}

pub struct Tokenizer {
  pub(crate) nodes:   Vec<TokenizerNode>,
  pub(crate) start:   usize,
  pub(crate) eof_id:  u32,
  pub skipper: Option<Rc<dyn Fn(&Token<u32>) -> bool>>,
}

impl Tokenizer {
  /// Longest-match scan from the DFA root. Reluctant patterns commit
  /// as soon as they become accepting; otherwise the walk continues
  /// while a transition matches the peeked codepoint, remembering the
  /// last accepting state so a later dead end can fall back to it.
  pub fn read_token<I: Iterator<Item = char>>(&self, buf: &mut CodepointBuffer<I>) -> GammaResult<Token<u32>> {
    let start_line = buf.line();
    let start_column = buf.column();

    if !buf.has_more() {
      return Ok(Token::new(self.eof_id, String::new(), start_line, start_column));
    }

    let mut current = self.start;
    let mut accumulated = String::new();
    let mut last_accept: Option<(LexEntry, usize)> = None;

    loop {
      if let Some(entry) = self.nodes[current].entry.clone() {
        let reluctant = entry.reluctant;
        last_accept = Some((entry, accumulated.chars().count()));
        if reluctant {
          break;
        }
      }

      let Some(peeked) = buf.peek() else { break };
      match self.nodes[current].index.find(peeked as u32) {
        Some(target) => {
          let c = buf.advance()?;
          accumulated.push(c);
          current = target;
        }
        None => break,
      }
    }

    match last_accept {
      Some((entry, accept_len)) => {
        if accept_len < accumulated.chars().count() {
          let overshoot: Vec<char> = accumulated.chars().skip(accept_len).collect();
          buf.push_back(overshoot);
          accumulated = accumulated.chars().take(accept_len).collect();
        }
        Ok(Token::new(entry.token_id, accumulated, start_line, start_column))
      }
      None => {
        let offending = accumulated.chars().next().or_else(|| buf.peek()).unwrap_or('\u{0}');
        Err(GammaError::Tokenize { message: offending.to_string(), line: start_line, column: start_column })
      }
    }
  }

  /// Applies `skipper` in a loop until the next non-skipped token.
  pub fn next_token<I: Iterator<Item = char>>(&self, buf: &mut CodepointBuffer<I>) -> GammaResult<Token<u32>> {
    loop {
      let token = self.read_token(buf)?;
      let skip = self.skipper.as_ref().is_some_and(|skipper| skipper(&token));
      if !skip {
        return Ok(token);
      }
      if token.key == self.eof_id {
        return Ok(token);
      }
    }
  }

  /// A finite stream of tokens terminating with (and including) the
  /// `EOF` token.
  pub fn iterator<'a, I: Iterator<Item = char> + 'a>(&'a self, flow: &'a mut CharFlow<I>) -> TokenIterator<'a, I> {
    TokenIterator { tokenizer: self, buf: CodepointBuffer::new(flow), done: false }
  }
}

pub struct TokenIterator<'a, I: Iterator<Item = char>> {
  tokenizer: &'a Tokenizer,
  buf:       CodepointBuffer<'a, I>,
  done:      bool,
}

impl<'a, I: Iterator<Item = char>> Iterator for TokenIterator<'a, I> {
  type Item = GammaResult<Token<u32>>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.done {
      return None;
    }
    match self.tokenizer.next_token(&mut self.buf) {
      Ok(token) => {
        if token.key == self.tokenizer.eof_id {
          self.done = true;
        }
        Some(Ok(token))
      }
      Err(err) => {
        self.done = true;
        Some(Err(err))
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::interval::Range;

  #[test]
  fn reluctant_pattern_stops_at_first_accept() {
    // node 0 --'a'..'z'--> node 1 (accept, reluctant), node 1 loops on itself too,
    // but reluctance means we never take the self-loop.
    let mut nodes = vec![
      TokenizerNode { entry: None, index: IntervalIndex::new(vec![(Range::new('a' as u32, 'z' as u32), 1)]) },
      TokenizerNode {
        entry: Some(LexEntry { token_id: 7, reluctant: true, above: HashSet::new() }),
        index: IntervalIndex::new(vec![(Range::new('a' as u32, 'z' as u32), 1)]),
      },
    ];
    let tokenizer = Tokenizer { nodes: std::mem::take(&mut nodes), start: 0, eof_id: 0, skipper: None };

    let mut flow = CharFlow::from_str("abc");
    let mut buf = CodepointBuffer::new(&mut flow);
    let token = tokenizer.read_token(&mut buf).unwrap();
    assert_eq!(token.data, "a");
    assert_eq!(token.key, 7);
  }

  #[test]
  fn overshoot_past_accept_is_returned_to_the_stream() {
    // Patterns: "a" (token 1) and "ab" (token 2, non-reluctant).
    // Input "ac": after 'a' we are accepting (token 1) and there's a
    // transition on 'b' only, so peek('c') has no match — the walk
    // must stop at "a", not fail.
    let nodes = vec![
      TokenizerNode { entry: None, index: IntervalIndex::new(vec![(Range::single('a' as u32), 1)]) },
      TokenizerNode {
        entry: Some(LexEntry { token_id: 1, reluctant: false, above: HashSet::new() }),
        index: IntervalIndex::new(vec![(Range::single('b' as u32), 2)]),
      },
      TokenizerNode { entry: Some(LexEntry { token_id: 2, reluctant: false, above: HashSet::new() }), index: IntervalIndex::new(vec![]) },
    ];
    let tokenizer = Tokenizer { nodes, start: 0, eof_id: 0, skipper: None };

    let mut flow = CharFlow::from_str("ac");
    let mut buf = CodepointBuffer::new(&mut flow);
    let first = tokenizer.read_token(&mut buf).unwrap();
    assert_eq!(first.data, "a");
    assert_eq!(first.key, 1);
    assert_eq!(buf.peek(), Some('c'));
  }

  #[test]
  fn eof_yields_configured_eof_key_with_empty_data() {
    let nodes = vec![TokenizerNode { entry: None, index: IntervalIndex::new(vec![]) }];
    let tokenizer = Tokenizer { nodes, start: 0, eof_id: 99, skipper: None };
    let mut flow = CharFlow::from_str("");
    let mut buf = CodepointBuffer::new(&mut flow);
    let token = tokenizer.read_token(&mut buf).unwrap();
    assert_eq!(token.key, 99);
    assert_eq!(token.data, "");
  }
}

//! Tokenizer builder (§4.5, C6): Thompson-compiles every lexical
//! pattern into one shared NFA, determinizes it over codepoint
//! intervals, and resolves the resulting per-state entry conflicts via
//! the `above` relation.

use std::collections::HashSet;

use crate::automata::{determinize_interval, Nfa};
use crate::error::{GammaError, GammaResult};
use crate::interval::Range;
use crate::regex::{Quantifier, RegexNode, RegexParser};
use crate::tokenizer::{IntervalIndex, LexEntry, Tokenizer, TokenizerNode};

/// Thompson-compiles a lexical pattern body into `nfa`, returning the
/// fragment's `(start, end)` states. A `Class` node emits one state
/// pair with one raw transition per range in the class (§4.5).
fn thompson_compile_regex(node: &RegexNode, nfa: &mut Nfa<Range, LexEntry>) -> (usize, usize) {
  match node {
    RegexNode::Class(ranges) => {
      let start = nfa.add_state();
      let end = nfa.add_state();
      for range in ranges {
        nfa.add_transition(start, *range, end);
      }
      (start, end)
    }
    RegexNode::Sequence(items) => {
      if items.is_empty() {
        let start = nfa.add_state();
        let end = nfa.add_state();
        nfa.add_epsilon(start, end);
        return (start, end);
      }
      let mut iter = items.iter();
      let (first_start, mut previous_end) = thompson_compile_regex(iter.next().unwrap(), nfa);
      for item in iter {
        let (item_start, item_end) = thompson_compile_regex(item, nfa);
        nfa.add_epsilon(previous_end, item_start);
        previous_end = item_end;
      }
      (first_start, previous_end)
    }
    RegexNode::Choice(branches) => {
      let start = nfa.add_state();
      let end = nfa.add_state();
      for branch in branches {
        let (branch_start, branch_end) = thompson_compile_regex(branch, nfa);
        nfa.add_epsilon(start, branch_start);
        nfa.add_epsilon(branch_end, end);
      }
      (start, end)
    }
    RegexNode::Quantified(inner, quantifier) => {
      let (inner_start, inner_end) = thompson_compile_regex(inner, nfa);
      let start = nfa.add_state();
      let end = nfa.add_state();
      nfa.add_epsilon(start, inner_start);
      nfa.add_epsilon(inner_end, end);
      match quantifier {
        Quantifier::Star => {
          nfa.add_epsilon(start, end);
          nfa.add_epsilon(inner_end, inner_start);
        }
        Quantifier::Plus => {
          nfa.add_epsilon(inner_end, inner_start);
        }
        Quantifier::Optional => {
          nfa.add_epsilon(start, end);
        }
      }
      (start, end)
    }
  }
}

/// Merges two entries landing on the same DFA subset (§4.5): same
/// token-id entries combine (reluctance OR-ed, above-sets unioned);
/// otherwise the `above` relation settles which one survives, and
/// silence on both sides is a fatal ambiguity.
fn combine_entries(resident: LexEntry, incoming: LexEntry) -> GammaResult<LexEntry> {
  if resident.token_id == incoming.token_id {
    let reluctant = resident.reluctant || incoming.reluctant;
    let above: HashSet<u32> = resident.above.union(&incoming.above).copied().collect();
    Ok(LexEntry { token_id: resident.token_id, reluctant, above })
  } else if incoming.above.contains(&resident.token_id) {
    Ok(incoming)
  } else if resident.above.contains(&incoming.token_id) {
    Ok(resident)
  } else {
    Err(GammaError::Build(format!(
      "ambiguous pattern: tokens {} and {} both accept the same input with no `above` relation between them",
      resident.token_id, incoming.token_id
    )))
  }
}

pub struct TokenizerBuilder {
  nfa:  Nfa<Range, LexEntry>,
  root: usize,
}

impl Default for TokenizerBuilder {
  fn default() -> Self {
    Self::new()
  }
}

impl TokenizerBuilder {
  pub fn new() -> Self {
    let mut nfa = Nfa::new();
    let root = nfa.add_state();
    Self { nfa, root }
  }

  /// Parses `pattern_text` as a lexical pattern and links its
  /// compiled fragment from the shared root via epsilon, tagging its
  /// final state with `token_id`/`reluctant`/`above`.
  pub fn add_raw_pattern(&mut self, pattern_text: &str, token_id: u32, reluctant: bool, above: HashSet<u32>) -> GammaResult<()> {
    let ast = RegexParser::parse(pattern_text)?;
    let (start, end) = thompson_compile_regex(&ast, &mut self.nfa);
    self.nfa.add_epsilon(self.root, start);
    self.nfa.set_entry(end, LexEntry { token_id, reluctant, above });
    Ok(())
  }

  /// Determinizes the combined NFA and resolves per-state entry
  /// conflicts, producing a runnable `Tokenizer`.
  pub fn build(&self, eof_id: u32) -> GammaResult<Tokenizer> {
    let dfa = determinize_interval(&self.nfa, self.root);

    let mut nodes = Vec::with_capacity(dfa.state_count());
    for state in 0..dfa.state_count() {
      let mut entry: Option<LexEntry> = None;
      for &nfa_node in dfa.subset_nodes(state) {
        if let Some(candidate) = &self.nfa.nodes[nfa_node].entry {
          entry = Some(match entry {
            None => candidate.clone(),
            Some(resident) => combine_entries(resident, candidate.clone())?,
          });
        }
      }

      let index = IntervalIndex::new(dfa.transitions[state].clone());
      nodes.push(TokenizerNode { entry, index });
    }

    Ok(Tokenizer { nodes, start: dfa.start, eof_id, skipper: None })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn disjoint_patterns_round_trip_through_build() {
    let mut builder = TokenizerBuilder::new();
    builder.add_raw_pattern("a+", 1, false, HashSet::new()).unwrap();
    builder.add_raw_pattern("b+", 2, false, HashSet::new()).unwrap();
    let tokenizer = builder.build(0).unwrap();

    let mut flow = gammaparse_runtime::CharFlow::from_str("aaab");
    let mut buf = crate::tokenizer::CodepointBuffer::new(&mut flow);
    let first = tokenizer.read_token(&mut buf).unwrap();
    assert_eq!(first.key, 1);
    assert_eq!(first.data, "aaa");
    let second = tokenizer.read_token(&mut buf).unwrap();
    assert_eq!(second.key, 2);
    assert_eq!(second.data, "b");
  }

  #[test]
  fn above_relation_resolves_keyword_identifier_overlap() {
    // "or" is a keyword (token 1); identifiers (`\w+`, token 2) would
    // otherwise also accept "or" — token 1 is declared above token 2.
    let mut builder = TokenizerBuilder::new();
    let mut above = HashSet::new();
    above.insert(2u32);
    builder.add_raw_pattern("or", 1, false, above).unwrap();
    builder.add_raw_pattern("\\w+", 2, false, HashSet::new()).unwrap();
    let tokenizer = builder.build(0).unwrap();

    let mut flow = gammaparse_runtime::CharFlow::from_str("or");
    let mut buf = crate::tokenizer::CodepointBuffer::new(&mut flow);
    let token = tokenizer.read_token(&mut buf).unwrap();
    assert_eq!(token.key, 1);
    assert_eq!(token.data, "or");

    let mut flow2 = gammaparse_runtime::CharFlow::from_str("ord");
    let mut buf2 = crate::tokenizer::CodepointBuffer::new(&mut flow2);
    let token2 = tokenizer.read_token(&mut buf2).unwrap();
    assert_eq!(token2.key, 2);
    assert_eq!(token2.data, "ord");
  }

  #[test]
  fn genuinely_ambiguous_patterns_fail_to_build() {
    let mut builder = TokenizerBuilder::new();
    builder.add_raw_pattern("a", 1, false, HashSet::new()).unwrap();
    builder.add_raw_pattern("a", 2, false, HashSet::new()).unwrap();
    let result = builder.build(0);
    assert!(result.is_err());
  }
}

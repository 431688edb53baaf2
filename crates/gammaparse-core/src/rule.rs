//! Per-rule DFA builder (§4.7, C8): compiles one production's
//! gamma-regex body into a forward DFA by Thompson construction plus
//! determinization (§4.4), then builds the reversed DFA the reduce
//! driver walks to delimit a variable-length operand window.

use std::collections::HashMap;

use crate::automata::{determinize_exact, Nfa};
use crate::error::{GammaError, GammaResult};
use crate::gamma::{GammaNode, Quantifier, SymbolRef};
use crate::symbols::Symbol;

/// A DFA node of a production body (§3 DATA MODEL). `id` is unique
/// within one rule; node 0 is always the start state.
#[derive(Clone, Debug)]
pub struct GammaRegexNode {
  pub id:          usize,
  pub transitions: HashMap<Symbol, usize>,
  pub is_final:    bool,
}

/// One grammar production: `nonTerminal => body`, with both its
/// forward DFA (`nodes`) and the reversed DFA the reduce driver walks
/// (`reversedNodes`).
pub struct Rule {
  pub id:             u32,
  pub non_terminal:   crate::symbols::NonTerminal,
  pub nodes:          Vec<GammaRegexNode>,
  pub reversed_nodes: Vec<GammaRegexNode>,
  pub name:           Option<String>,
  pub tags:           Option<std::collections::HashSet<String>>,
}

impl Rule {
  pub fn start_node(&self) -> &GammaRegexNode {
    &self.nodes[0]
  }
}

/// Thompson-compiles `node` into `nfa`, returning `(start, end)`
/// state ids of the resulting fragment. `resolve` turns a bare
/// `SymbolRef` name into an interned `Symbol` (terminal or
/// non-terminal lookup in the builder's tables).
fn thompson_compile(node: &GammaNode, nfa: &mut Nfa<Symbol, ()>, resolve: &mut impl FnMut(&SymbolRef) -> GammaResult<Symbol>) -> GammaResult<(usize, usize)> {
  match node {
    GammaNode::Symbol(symbol_ref) => {
      let symbol = resolve(symbol_ref)?;
      let start = nfa.add_state();
      let end = nfa.add_state();
      nfa.add_transition(start, symbol, end);
      Ok((start, end))
    }
    GammaNode::Sequence(items) => {
      if items.is_empty() {
        let start = nfa.add_state();
        let end = nfa.add_state();
        nfa.add_epsilon(start, end);
        return Ok((start, end));
      }
      let mut iter = items.iter();
      let (first_start, mut previous_end) = thompson_compile(iter.next().unwrap(), nfa, resolve)?;
      for item in iter {
        let (item_start, item_end) = thompson_compile(item, nfa, resolve)?;
        nfa.add_epsilon(previous_end, item_start);
        previous_end = item_end;
      }
      Ok((first_start, previous_end))
    }
    GammaNode::Choice(branches) => {
      let start = nfa.add_state();
      let end = nfa.add_state();
      for branch in branches {
        let (branch_start, branch_end) = thompson_compile(branch, nfa, resolve)?;
        nfa.add_epsilon(start, branch_start);
        nfa.add_epsilon(branch_end, end);
      }
      Ok((start, end))
    }
    GammaNode::Quantified(inner, quantifier) => {
      let (inner_start, inner_end) = thompson_compile(inner, nfa, resolve)?;
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
      Ok((start, end))
    }
  }
}

fn dfa_to_nodes(dfa: &crate::automata::Dfa<Symbol>, final_node: usize) -> Vec<GammaRegexNode> {
  (0..dfa.state_count())
    .map(|id| GammaRegexNode {
      id,
      transitions: dfa.transitions[id].iter().cloned().collect(),
      is_final: dfa.subset_nodes(id).contains(&final_node),
    })
    .collect()
}

/// Builds both DFAs for a rule body. `resolve` interns bare symbol
/// names against the builder's terminal/non-terminal tables.
pub fn build_rule_dfas(body: &GammaNode, resolve: &mut impl FnMut(&SymbolRef) -> GammaResult<Symbol>) -> GammaResult<(Vec<GammaRegexNode>, Vec<GammaRegexNode>)> {
  let mut forward_nfa: Nfa<Symbol, ()> = Nfa::new();
  let (start, end) = thompson_compile(body, &mut forward_nfa, resolve)?;
  forward_nfa.set_entry(end, ());

  let forward_dfa = determinize_exact(&forward_nfa, start);
  debug_assert_eq!(forward_dfa.start, 0, "subset construction always interns the start subset first");
  let forward_nodes = dfa_to_nodes(&forward_dfa, end);

  // Reverse the forward DFA's own transitions to build the NFA the
  // reversed automaton determinizes from (§4.7): a fresh start with
  // epsilon to every forward-final state, edges flipped.
  let mut reversed_nfa: Nfa<Symbol, ()> = Nfa::new();
  for _ in 0..forward_dfa.state_count() {
    reversed_nfa.add_state();
  }
  let reversed_start = reversed_nfa.add_state();
  for (state, edges) in forward_dfa.transitions.iter().enumerate() {
    for (symbol, target) in edges {
      reversed_nfa.add_transition(*target, symbol.clone(), state);
    }
  }
  for (state, node) in forward_nodes.iter().enumerate() {
    if node.is_final {
      reversed_nfa.add_epsilon(reversed_start, state);
    }
  }

  let reversed_dfa = determinize_exact(&reversed_nfa, reversed_start);
  debug_assert_eq!(reversed_dfa.start, 0);
  // The reversed DFA's finals are exactly the subsets containing the
  // forward automaton's start node (node 0 of the forward DFA).
  let reversed_nodes = dfa_to_nodes(&reversed_dfa, 0);

  Ok((forward_nodes, reversed_nodes))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::symbols::SolidTerminal;

  fn terminal(name: &str) -> Symbol {
    Symbol::Terminal(SolidTerminal::new(name))
  }

  #[test]
  fn sequence_body_accepts_exactly_its_symbols_in_order() {
    let a = terminal("a");
    let b = terminal("b");
    let body = GammaNode::Sequence(vec![GammaNode::Symbol(SymbolRef::Terminal("a".into())), GammaNode::Symbol(SymbolRef::Terminal("b".into()))]);

    let mut calls = vec![a.clone(), b.clone()].into_iter();
    let (nodes, reversed) = build_rule_dfas(&body, &mut |_| Ok(calls.next().unwrap())).unwrap();

    assert!(!nodes[0].is_final);
    let after_a = *nodes[0].transitions.get(&a).unwrap();
    let after_b = *nodes[after_a].transitions.get(&b).unwrap();
    assert!(nodes[after_b].is_final);

    assert!(!reversed.is_empty());
    assert!(reversed[0].transitions.get(&b).is_some());
  }

  #[test]
  fn optional_prefix_accepts_with_and_without_it() {
    let plus = terminal("+");
    let body = GammaNode::Sequence(vec![
      GammaNode::Quantified(Box::new(GammaNode::Symbol(SymbolRef::Terminal("+".into()))), Quantifier::Optional),
      GammaNode::Symbol(SymbolRef::NonTerminal("T".into())),
    ]);
    let t = Symbol::NonTerminal(crate::symbols::NonTerminal::new("T"));
    let mut resolved = vec![plus.clone(), t.clone()].into_iter();

    let (nodes, _) = build_rule_dfas(&body, &mut |_| Ok(resolved.next().unwrap())).unwrap();
    // From the start, either skip straight to T, or consume '+' then T.
    assert!(nodes[0].transitions.contains_key(&t) || nodes[0].transitions.contains_key(&plus));
  }
}

//! Shift/reduce parser runtime (§4.11, C12): drives the action table
//! produced by `crate::action_table` against a token stream using
//! three parallel stacks, delimiting each reduction's operand window
//! by walking the reducing rule's reversed DFA from the top of the
//! symbol stack downward.

use std::collections::HashMap;
use std::rc::Rc;

use gammaparse_runtime::{PushbackIterator, Token};

use crate::action_table::{BranchingContext, ParserAction, ParserState};
use crate::error::{GammaError, GammaResult};
use crate::rule::Rule;
use crate::symbols::Symbol;

enum ResolvedStep {
  Shift(usize),
  Reduce(Rc<Rule>),
  Accept,
}

/// A compiled, runnable grammar: action/goto tables plus enough of the
/// symbol-interning context to translate tokenizer output (raw
/// terminal ids) into grammar symbols.
pub struct Parser<D> {
  states:    Vec<ParserState<D>>,
  rules:     Vec<Rc<Rule>>,
  terminals: HashMap<u32, Symbol>,
  eof_id:    u32,
}

impl<D> Parser<D> {
  pub fn new(states: Vec<ParserState<D>>, rules: Vec<Rc<Rule>>, terminals: HashMap<u32, Symbol>, eof_id: u32) -> Self {
    Self { states, rules, terminals, eof_id }
  }

  pub fn states(&self) -> &[ParserState<D>] {
    &self.states
  }

  pub fn rules(&self) -> &[Rc<Rule>] {
    &self.rules
  }

  /// Walks `rule`'s reversed DFA from its start against the top of
  /// `symbol_stack`, one symbol at a time, for as long as a transition
  /// exists and the state lying beneath the symbol being consumed still
  /// has `rule` active (§4.10, §4.11). Deliberately not gated on
  /// reaching a final reversed node: a rule whose body is an optional
  /// prefix of more of itself passes through a final reversed node at
  /// its shortest accepting path while a longer one is still being
  /// shifted, so only the transition/activeRules dead end marks the
  /// true end of the operand window.
  fn reduction_length(&self, rule: &Rule, state_stack: &[usize], symbol_stack: &[Symbol]) -> usize {
    let mut node = 0usize;
    let mut steps = 0usize;

    while steps < symbol_stack.len() {
      let symbol_index = symbol_stack.len() - 1 - steps;
      let Some(&target) = rule.reversed_nodes[node].transitions.get(&symbol_stack[symbol_index]) else { break };
      if !self.states[state_stack[symbol_index]].active_rules[rule.id as usize] {
        break;
      }
      node = target;
      steps += 1;
    }

    steps
  }

  fn resolve_action(&self, action: ParserAction<D>, token: &Token<Symbol>, state_stack: &[usize], symbol_stack: &[Symbol], data_stack: &[D]) -> GammaResult<ResolvedStep> {
    match action {
      ParserAction::Shift(target) => Ok(ResolvedStep::Shift(target)),
      ParserAction::Reduce(rule) => Ok(ResolvedStep::Reduce(rule)),
      ParserAction::Accept => Ok(ResolvedStep::Accept),
      ParserAction::Branching(selector) => {
        let context = BranchingContext { token, state_stack, symbol_stack, data_stack };
        let resolved = selector(&context).ok_or_else(|| GammaError::Parse("branching selector returned no action".to_string()))?;
        self.resolve_action(resolved, token, state_stack, symbol_stack, data_stack)
      }
    }
  }

  /// Parses `tokens` (as produced by `Tokenizer::iterator`, raw
  /// terminal ids), building a `D` value per shifted token via
  /// `shift_value` and folding each reduction's popped `D` values
  /// into one via `reduce`.
  pub fn parse<I>(&self, tokens: I, mut shift_value: impl FnMut(&Token<Symbol>) -> D, mut reduce: impl FnMut(&Rule, Vec<D>) -> D) -> GammaResult<D>
  where
    I: Iterator<Item = Token<u32>>,
  {
    let eof_id = self.eof_id;
    let terminals = &self.terminals;
    let resolved = tokens.map(move |raw| {
      let symbol = if raw.key == eof_id {
        Symbol::Special(crate::symbols::SpecialTerminal::Eof)
      } else {
        terminals.get(&raw.key).cloned().unwrap_or(Symbol::Special(crate::symbols::SpecialTerminal::Eof))
      };
      Token::new(symbol, raw.data, raw.line, raw.column)
    });
    let mut tokens = PushbackIterator::new(resolved);

    let mut state_stack: Vec<usize> = vec![0];
    let mut symbol_stack: Vec<Symbol> = Vec::new();
    let mut data_stack: Vec<D> = Vec::new();

    loop {
      let token = tokens.next().ok_or_else(|| GammaError::Parse("token stream ended before an accept action".to_string()))?;
      let terminal_id = token.key.terminal_id().ok_or_else(|| GammaError::Parse(format!("token '{}' does not map to a parseable terminal", token.key)))?;

      let current_state = *state_stack.last().expect("state stack is never empty");
      let action = self.states[current_state].actions[terminal_id as usize]
        .clone()
        .ok_or_else(|| GammaError::Parse(format!("no action for terminal '{}' in state {}", token.key, current_state)))?;

      match self.resolve_action(action, &token, &state_stack, &symbol_stack, &data_stack)? {
        ResolvedStep::Shift(target) => {
          data_stack.push(shift_value(&token));
          symbol_stack.push(token.key);
          state_stack.push(target);
        }
        ResolvedStep::Reduce(rule) => {
          let pop_count = self.reduction_length(&rule, &state_stack, &symbol_stack);
          let start = symbol_stack.len() - pop_count;
          let children: Vec<D> = data_stack.split_off(start);
          symbol_stack.truncate(start);
          state_stack.truncate(state_stack.len() - pop_count);

          let value = reduce(&rule, children);

          let new_top = *state_stack.last().expect("state stack is never empty");
          let goto = self.states[new_top].gotos[rule.non_terminal.id() as usize]
            .ok_or_else(|| GammaError::Parse(format!("no goto for non-terminal '{}' from state {}", rule.non_terminal, new_top)))?;

          symbol_stack.push(Symbol::NonTerminal(rule.non_terminal.clone()));
          data_stack.push(value);
          state_stack.push(goto);

          tokens.push(token);
        }
        ResolvedStep::Accept => {
          return data_stack.pop().ok_or_else(|| GammaError::Parse("accept reached with an empty data stack".to_string()));
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::builder::ParserBuilder;
  use crate::gamma::{GammaNode, Quantifier, SymbolRef};

  #[derive(Clone, Debug, PartialEq)]
  enum Val {
    Leaf(String),
    Node(Vec<Val>),
  }

  #[test]
  fn sequence_rule_reduces_shifted_leaves_in_order() {
    let builder: ParserBuilder<Val> = ParserBuilder::new();
    let a = builder.get_terminal("a");
    let b = builder.get_terminal("b");
    builder.add_rule(
      "S",
      GammaNode::Sequence(vec![GammaNode::Symbol(SymbolRef::Terminal("a".into())), GammaNode::Symbol(SymbolRef::Terminal("b".into()))]),
      None,
      None,
    );
    let parser = builder.build("S").unwrap();

    let tokens = vec![Token::new(a.id(), "a".to_string(), 1, 1), Token::new(b.id(), "b".to_string(), 1, 2), Token::new(0u32, String::new(), 1, 3)];

    let result = parser
      .parse(
        tokens.into_iter(),
        |token| Val::Leaf(token.data.clone()),
        |_rule, children| Val::Node(children),
      )
      .unwrap();

    assert_eq!(result, Val::Node(vec![Val::Leaf("a".to_string()), Val::Leaf("b".to_string())]));
  }

  #[test]
  fn optional_prefix_rule_accepts_with_and_without_the_prefix() {
    let builder: ParserBuilder<Val> = ParserBuilder::new();
    let plus = builder.get_terminal("+");
    let id = builder.get_terminal("id");
    builder.add_rule(
      "E",
      GammaNode::Sequence(vec![
        GammaNode::Quantified(Box::new(GammaNode::Symbol(SymbolRef::Terminal("+".into()))), Quantifier::Optional),
        GammaNode::Symbol(SymbolRef::Terminal("id".into())),
      ]),
      None,
      None,
    );
    let parser = builder.build("E").unwrap();

    let with_prefix = vec![Token::new(plus.id(), "+".to_string(), 1, 1), Token::new(id.id(), "x".to_string(), 1, 2), Token::new(0u32, String::new(), 1, 3)];
    let result = parser
      .parse(with_prefix.into_iter(), |token| Val::Leaf(token.data.clone()), |_rule, children| Val::Node(children))
      .unwrap();
    assert_eq!(result, Val::Node(vec![Val::Leaf("+".to_string()), Val::Leaf("x".to_string())]));

    let without_prefix = vec![Token::new(id.id(), "y".to_string(), 1, 1), Token::new(0u32, String::new(), 1, 2)];
    let result = parser
      .parse(without_prefix.into_iter(), |token| Val::Leaf(token.data.clone()), |_rule, children| Val::Node(children))
      .unwrap();
    assert_eq!(result, Val::Node(vec![Val::Leaf("y".to_string())]));
  }
}

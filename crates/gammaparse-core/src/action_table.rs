//! Action-table synthesis (§4.10, C11): derives SHIFT/REDUCE/ACCEPT/
//! GOTO per (state, terminal), resolving conflicts via a
//! caller-supplied arbiter that may defer the decision to run time
//! through a `Branching` action.

use std::collections::HashMap;
use std::rc::Rc;

use crate::canonical::{CanonicalCollection, ConstrainedMarkedRule};
use crate::error::{GammaError, GammaResult};
use crate::rule::Rule;
use crate::symbols::Symbol;

/// The runtime context a `Branching` selector is evaluated against
/// (§4.11): enough of the shift/reduce driver's state to let a
/// caller-supplied callback pick precedence/associativity.
pub struct BranchingContext<'a, D> {
  pub token:        &'a gammaparse_runtime::Token<Symbol>,
  pub state_stack:  &'a [usize],
  pub symbol_stack: &'a [Symbol],
  pub data_stack:   &'a [D],
}

pub type Selector<D> = Rc<dyn Fn(&BranchingContext<D>) -> Option<ParserAction<D>>>;

pub enum ParserAction<D> {
  Shift(usize),
  Reduce(Rc<Rule>),
  Accept,
  /// Defers the choice to a caller callback at parse time; used by the
  /// conflict resolver to encode precedence/associativity decisions.
  Branching(Selector<D>),
}

impl<D> Clone for ParserAction<D> {
  fn clone(&self) -> Self {
    match self {
      ParserAction::Shift(target) => ParserAction::Shift(*target),
      ParserAction::Reduce(rule) => ParserAction::Reduce(rule.clone()),
      ParserAction::Accept => ParserAction::Accept,
      ParserAction::Branching(selector) => ParserAction::Branching(selector.clone()),
    }
  }
}

impl<D> ParserAction<D> {
  fn candidate_key(&self) -> (u8, u32) {
    match self {
      ParserAction::Shift(target) => (0, *target as u32),
      ParserAction::Reduce(rule) => (1, rule.id),
      ParserAction::Accept => (2, 0),
      ParserAction::Branching(_) => (3, 0),
    }
  }
}

/// One distinct action candidate for a (state, terminal) cell, along
/// with the constrained marked rules that proposed it — passed to the
/// conflict solver verbatim so it can inspect rule names/precedence.
pub struct ActionGroup<D> {
  pub action:  ParserAction<D>,
  pub sources: Vec<ConstrainedMarkedRule>,
}

pub type ConflictSolver<D> = Rc<dyn Fn(&[ActionGroup<D>]) -> Option<ParserAction<D>>>;

pub struct ParserState<D> {
  pub id:           usize,
  pub actions:      Vec<Option<ParserAction<D>>>,
  pub gotos:        Vec<Option<usize>>,
  pub active_rules: Vec<bool>,
}

#[allow(clippy::too_many_arguments)]
pub fn build_action_table<D>(
  collection: &CanonicalCollection,
  terminal_count: usize,
  non_terminal_count: usize,
  rule_count: usize,
  root_non_terminal_id: u32,
  eof_id: u32,
  conflict_solver: Option<&ConflictSolver<D>>,
) -> GammaResult<Vec<ParserState<D>>> {
  let mut states = Vec::with_capacity(collection.nodes.len());

  for node in &collection.nodes {
    let mut actions: Vec<Option<ParserAction<D>>> = vec![None; terminal_count];

    for terminal_id in 0..terminal_count as u32 {
      let mut candidates: HashMap<(u8, u32), (ParserAction<D>, Vec<ConstrainedMarkedRule>)> = HashMap::new();

      for cmr in &node.constrained_rules {
        let dfa_node = &cmr.marked_rule.rule.nodes[cmr.marked_rule.mark];

        for (symbol, _target) in &dfa_node.transitions {
          if symbol.terminal_id() == Some(terminal_id) {
            if let Some(&shift_target) = node.transitions.get(symbol) {
              let action = ParserAction::Shift(shift_target);
              candidates.entry(action.candidate_key()).or_insert_with(|| (action, Vec::new())).1.push(cmr.clone());
            }
          }
        }

        if dfa_node.is_final && cmr.look_aheads.contains(&terminal_id) {
          let action = if cmr.marked_rule.rule.non_terminal.id() == root_non_terminal_id && terminal_id == eof_id {
            ParserAction::Accept
          } else {
            ParserAction::Reduce(cmr.marked_rule.rule.clone())
          };
          candidates.entry(action.candidate_key()).or_insert_with(|| (action, Vec::new())).1.push(cmr.clone());
        }
      }

      let resolved = match candidates.len() {
        0 => None,
        1 => Some(candidates.into_values().next().unwrap().0),
        _ => {
          let groups: Vec<ActionGroup<D>> = candidates.into_values().map(|(action, sources)| ActionGroup { action, sources }).collect();
          let resolved = match conflict_solver {
            Some(solver) => solver(&groups),
            None => None,
          };
          match resolved {
            Some(action) => Some(action),
            None => return Err(GammaError::Build(format!("unsolved conflict at state {} on terminal id {}", node.id, terminal_id))),
          }
        }
      };

      actions[terminal_id as usize] = resolved;
    }

    let mut gotos: Vec<Option<usize>> = vec![None; non_terminal_count];
    for (symbol, &target) in &node.transitions {
      if let Symbol::NonTerminal(nt) = symbol {
        gotos[nt.id() as usize] = Some(target);
      }
    }

    let mut active_rules = vec![false; rule_count];
    for cmr in &node.constrained_rules {
      active_rules[cmr.marked_rule.rule.id as usize] = true;
    }

    states.push(ParserState { id: node.id, actions, gotos, active_rules });
  }

  Ok(states)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn candidate_key_distinguishes_shift_targets_and_reduce_rules() {
    let shift_a: ParserAction<()> = ParserAction::Shift(3);
    let shift_b: ParserAction<()> = ParserAction::Shift(4);
    assert_ne!(shift_a.candidate_key(), shift_b.candidate_key());

    let accept_a: ParserAction<()> = ParserAction::Accept;
    let accept_b: ParserAction<()> = ParserAction::Accept;
    assert_eq!(accept_a.candidate_key(), accept_b.candidate_key());
  }
}

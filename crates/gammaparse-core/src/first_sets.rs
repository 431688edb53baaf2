//! FIRST-set fixed point over non-terminals and their rules' forward
//! DFAs (§4.8, C9).

use std::collections::{HashMap, HashSet};

use crate::rule::Rule;
use crate::symbols::{SpecialTerminal, Symbol};

pub type FirstSets = HashMap<u32, HashSet<Symbol>>;

/// Reachability walk from node 0 of one rule's forward DFA,
/// collecting the terminals (and `EMPTY`, if the walk reaches a final
/// node) directly visible given the current (possibly still growing)
/// `first_sets` table. A non-terminal transition is only followed
/// past its own node when that non-terminal's current FIRST set
/// already contains `EMPTY` — i.e. it can vanish and exposes what
/// comes after it.
fn additions_for_rule(rule: &Rule, first_sets: &FirstSets) -> HashSet<Symbol> {
  let mut additions = HashSet::new();
  let mut visited = HashSet::new();
  let mut stack = vec![0usize];

  while let Some(node_id) = stack.pop() {
    if !visited.insert(node_id) {
      continue;
    }
    let node = &rule.nodes[node_id];
    if node.is_final {
      additions.insert(Symbol::Special(SpecialTerminal::Empty));
    }
    for (symbol, target) in &node.transitions {
      match symbol {
        Symbol::NonTerminal(nt) => {
          if let Some(set) = first_sets.get(&nt.id()) {
            for item in set {
              if !matches!(item, Symbol::Special(SpecialTerminal::Empty)) {
                additions.insert(item.clone());
              }
            }
            if set.contains(&Symbol::Special(SpecialTerminal::Empty)) {
              stack.push(*target);
            }
          }
        }
        terminal => {
          additions.insert(terminal.clone());
        }
      }
    }
  }

  additions
}

/// Computes `firstSets[N]` for every non-terminal with at least one
/// rule, as a fixed point over all rules simultaneously (§4.8).
pub fn compute_first_sets(rules: &[Rule]) -> FirstSets {
  let mut first_sets: FirstSets = HashMap::new();

  loop {
    let mut grew = false;
    let per_rule_additions: Vec<(u32, HashSet<Symbol>)> = rules.iter().map(|rule| (rule.non_terminal.id(), additions_for_rule(rule, &first_sets))).collect();

    for (nt_id, additions) in per_rule_additions {
      let entry = first_sets.entry(nt_id).or_default();
      for item in additions {
        if entry.insert(item) {
          grew = true;
        }
      }
    }

    if !grew {
      break;
    }
  }

  first_sets
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::gamma::{GammaNode, Quantifier, SymbolRef};
  use crate::rule::build_rule_dfas;
  use crate::symbols::{NonTerminal, SolidTerminal};

  #[test]
  fn empty_is_present_iff_a_rule_can_vanish() {
    let nt = NonTerminal::new("Opt");
    nt.set_id(1);
    let terminal = SolidTerminal::new("x");
    terminal.set_id(1);

    let body = GammaNode::Quantified(Box::new(GammaNode::Symbol(SymbolRef::Terminal("x".into()))), Quantifier::Optional);
    let mut resolved = vec![Symbol::Terminal(terminal)].into_iter();
    let (nodes, reversed_nodes) = build_rule_dfas(&body, &mut |_| Ok(resolved.next().unwrap())).unwrap();

    let rule = Rule { id: 0, non_terminal: nt.clone(), nodes, reversed_nodes, name: None, tags: None };
    let first_sets = compute_first_sets(std::slice::from_ref(&rule));

    assert!(first_sets[&1].contains(&Symbol::Special(SpecialTerminal::Empty)));
  }
}

//! Canonical-collection builder (§4.9, C10): closures over
//! constrained marked rules ("ParserBuilderNode"s), GOTO transitions,
//! and per-node follow sets.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::error::{GammaError, GammaResult};
use crate::first_sets::FirstSets;
use crate::rule::Rule;
use crate::symbols::{SpecialTerminal, Symbol};

/// A lookahead set is a set of terminal ids (including `EOF`'s id 0);
/// `EMPTY` never appears here (§3: "never appears in any action table
/// column").
pub type LookAheadSet = BTreeSet<u32>;

/// A `(rule, DFA-node)` pair: "in the middle of recognising this rule
/// at this point in its body DFA". Equal iff same rule and mark.
#[derive(Clone)]
pub struct MarkedRule {
  pub rule: Rc<Rule>,
  pub mark: usize,
}

impl PartialEq for MarkedRule {
  fn eq(&self, other: &Self) -> bool {
    self.rule.id == other.rule.id && self.mark == other.mark
  }
}
impl Eq for MarkedRule {}

impl Hash for MarkedRule {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.rule.id.hash(state);
    self.mark.hash(state);
  }
}

/// A marked rule annotated with a lookahead terminal set: the LR(1)
/// unit of canonical-collection construction. `follow_sets[i]` is the
/// set of terminals that may follow a completion of the rule's DFA
/// while currently at node `i`, computed against this instance's own
/// `look_aheads`. Equality ignores `follow_sets` — it is derived, not
/// identity.
#[derive(Clone)]
pub struct ConstrainedMarkedRule {
  pub marked_rule: MarkedRule,
  pub look_aheads: LookAheadSet,
  pub follow_sets: Rc<Vec<LookAheadSet>>,
}

impl PartialEq for ConstrainedMarkedRule {
  fn eq(&self, other: &Self) -> bool {
    self.marked_rule == other.marked_rule && self.look_aheads == other.look_aheads
  }
}
impl Eq for ConstrainedMarkedRule {}

impl Hash for ConstrainedMarkedRule {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.marked_rule.hash(state);
    self.look_aheads.hash(state);
  }
}

/// A closed, lookahead-merged set of constrained marked rules: one
/// parser state.
pub struct ParserBuilderNode {
  pub id:                usize,
  pub constrained_rules: Vec<ConstrainedMarkedRule>,
  pub transitions:       HashMap<Symbol, usize>,
}

pub struct CanonicalCollection {
  pub nodes: Vec<ParserBuilderNode>,
}

/// Per-node follow sets for one constrained marked rule (§4.9, second
/// half): a reverse-adjacency fixed point over the rule's own DFA,
/// seeded at final nodes with `look_aheads`.
fn compute_follow_sets(rule: &Rule, look_aheads: &LookAheadSet, first_sets: &FirstSets) -> Vec<LookAheadSet> {
  let n = rule.nodes.len();
  let mut follow: Vec<LookAheadSet> = vec![BTreeSet::new(); n];
  let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
  for (i, node) in rule.nodes.iter().enumerate() {
    for target in node.transitions.values() {
      predecessors[*target].push(i);
    }
  }

  let mut queue: VecDeque<usize> = VecDeque::new();
  let mut queued: HashSet<usize> = HashSet::new();
  for (i, node) in rule.nodes.iter().enumerate() {
    if node.is_final && queued.insert(i) {
      queue.push_back(i);
    }
  }

  while let Some(node_id) = queue.pop_front() {
    queued.remove(&node_id);
    let node = &rule.nodes[node_id];

    let mut additions: LookAheadSet = BTreeSet::new();
    if node.is_final {
      additions.extend(look_aheads.iter().copied());
    }
    for (symbol, target) in &node.transitions {
      match symbol {
        Symbol::NonTerminal(nt) => {
          if let Some(first) = first_sets.get(&nt.id()) {
            for item in first {
              if matches!(item, Symbol::Special(SpecialTerminal::Empty)) {
                continue;
              }
              if let Some(tid) = item.terminal_id() {
                additions.insert(tid);
              }
            }
            if first.contains(&Symbol::Special(SpecialTerminal::Empty)) {
              additions.extend(follow[*target].iter().copied());
            }
          }
        }
        other => {
          if let Some(tid) = other.terminal_id() {
            additions.insert(tid);
          }
        }
      }
    }

    let before = follow[node_id].len();
    follow[node_id].extend(additions);
    if follow[node_id].len() != before {
      for &pred in &predecessors[node_id] {
        if queued.insert(pred) {
          queue.push_back(pred);
        }
      }
    }
  }

  follow
}

/// Closure (§4.9): given seed constrained marked rules, repeatedly
/// expand through non-terminal transitions — each generator of a
/// non-terminal M reached from the current-mark node gets a new
/// constrained marked rule `(mark = 0, lookAheads = followSet(target))`
/// — merging lookaheads for rules sharing the same `(rule, mark)`
/// until the set stops growing.
fn closure(seeds: Vec<ConstrainedMarkedRule>, rule_lookup: &HashMap<u32, Rc<Rule>>, generators: &HashMap<u32, Vec<u32>>, first_sets: &FirstSets) -> Vec<ConstrainedMarkedRule> {
  let mut merged: HashMap<(u32, usize), LookAheadSet> = HashMap::new();
  let mut queue: VecDeque<(u32, usize)> = VecDeque::new();
  let mut in_queue: HashSet<(u32, usize)> = HashSet::new();

  for cmr in seeds {
    let key = (cmr.marked_rule.rule.id, cmr.marked_rule.mark);
    merged.entry(key).or_default().extend(cmr.look_aheads.iter().copied());
    if in_queue.insert(key) {
      queue.push_back(key);
    }
  }

  while let Some(key) = queue.pop_front() {
    in_queue.remove(&key);
    let (rule_id, mark) = key;
    let rule = &rule_lookup[&rule_id];
    let look_aheads = merged[&key].clone();
    let follow_sets = compute_follow_sets(rule, &look_aheads, first_sets);
    let node = &rule.nodes[mark];

    for (symbol, target) in &node.transitions {
      if let Symbol::NonTerminal(nt) = symbol {
        let new_lookaheads = &follow_sets[*target];
        if let Some(gens) = generators.get(&nt.id()) {
          for &gen_rule_id in gens {
            let gen_key = (gen_rule_id, 0);
            let gen_entry = merged.entry(gen_key).or_default();
            let before = gen_entry.len();
            gen_entry.extend(new_lookaheads.iter().copied());
            if gen_entry.len() != before && in_queue.insert(gen_key) {
              queue.push_back(gen_key);
            }
          }
        }
      }
    }
  }

  merged
    .into_iter()
    .map(|((rule_id, mark), look_aheads)| {
      let rule = rule_lookup[&rule_id].clone();
      let follow_sets = compute_follow_sets(&rule, &look_aheads, first_sets);
      ConstrainedMarkedRule { marked_rule: MarkedRule { rule, mark }, look_aheads, follow_sets: Rc::new(follow_sets) }
    })
    .collect()
}

pub struct CanonicalCollectionBuilder<'a> {
  rule_lookup: HashMap<u32, Rc<Rule>>,
  generators:  HashMap<u32, Vec<u32>>,
  first_sets:  &'a FirstSets,
}

impl<'a> CanonicalCollectionBuilder<'a> {
  pub fn new(rules: &[Rc<Rule>], first_sets: &'a FirstSets) -> Self {
    let mut rule_lookup = HashMap::new();
    let mut generators: HashMap<u32, Vec<u32>> = HashMap::new();
    for rule in rules {
      rule_lookup.insert(rule.id, rule.clone());
      generators.entry(rule.non_terminal.id()).or_default().push(rule.id);
    }
    Self { rule_lookup, generators, first_sets }
  }

  fn canonical_key(rules: &[ConstrainedMarkedRule]) -> Vec<(u32, usize, LookAheadSet)> {
    let mut key: Vec<_> = rules.iter().map(|r| (r.marked_rule.rule.id, r.marked_rule.mark, r.look_aheads.clone())).collect();
    key.sort();
    key
  }

  /// Builds the canonical collection rooted at `root_non_terminal_id`,
  /// seeded with `{ MarkedRule(G, 0), lookAheads = {eof_id} }` for
  /// each generator G of the root.
  pub fn build(&self, root_non_terminal_id: u32, eof_id: u32) -> GammaResult<CanonicalCollection> {
    let root_generators = self.generators.get(&root_non_terminal_id).cloned().unwrap_or_default();
    if root_generators.is_empty() {
      return Err(GammaError::Build(format!("root non-terminal (id {}) has no producing rules", root_non_terminal_id)));
    }

    let seed: Vec<ConstrainedMarkedRule> = root_generators
      .iter()
      .map(|&rule_id| {
        let rule = self.rule_lookup[&rule_id].clone();
        let mut look_aheads = LookAheadSet::new();
        look_aheads.insert(eof_id);
        let follow_sets = compute_follow_sets(&rule, &look_aheads, self.first_sets);
        ConstrainedMarkedRule { marked_rule: MarkedRule { rule, mark: 0 }, look_aheads, follow_sets: Rc::new(follow_sets) }
      })
      .collect();

    let closed_seed = closure(seed, &self.rule_lookup, &self.generators, self.first_sets);

    let mut nodes: Vec<ParserBuilderNode> = Vec::new();
    let mut interned: HashMap<Vec<(u32, usize, LookAheadSet)>, usize> = HashMap::new();
    let mut queue: VecDeque<usize> = VecDeque::new();

    let start_key = Self::canonical_key(&closed_seed);
    interned.insert(start_key, 0);
    nodes.push(ParserBuilderNode { id: 0, constrained_rules: closed_seed, transitions: HashMap::new() });
    queue.push_back(0);

    while let Some(node_id) = queue.pop_front() {
      let mut outgoing: HashMap<Symbol, Vec<ConstrainedMarkedRule>> = HashMap::new();
      for cmr in nodes[node_id].constrained_rules.clone() {
        let node = &cmr.marked_rule.rule.nodes[cmr.marked_rule.mark];
        for (symbol, target) in &node.transitions {
          let advanced = ConstrainedMarkedRule {
            marked_rule: MarkedRule { rule: cmr.marked_rule.rule.clone(), mark: *target },
            look_aheads: cmr.look_aheads.clone(),
            follow_sets: cmr.follow_sets.clone(),
          };
          outgoing.entry(symbol.clone()).or_default().push(advanced);
        }
      }

      for (symbol, seeds) in outgoing {
        let closed = closure(seeds, &self.rule_lookup, &self.generators, self.first_sets);
        let key = Self::canonical_key(&closed);
        let target_id = if let Some(&id) = interned.get(&key) {
          id
        } else {
          let id = nodes.len();
          interned.insert(key, id);
          nodes.push(ParserBuilderNode { id, constrained_rules: closed, transitions: HashMap::new() });
          queue.push_back(id);
          id
        };
        nodes[node_id].transitions.insert(symbol, target_id);
      }
    }

    Ok(CanonicalCollection { nodes })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::first_sets::compute_first_sets;
  use crate::gamma::{GammaNode, SymbolRef};
  use crate::rule::build_rule_dfas;
  use crate::symbols::{NonTerminal, SolidTerminal};

  fn single_terminal_rule(rule_id: u32, nt: &NonTerminal, terminal: &SolidTerminal) -> Rule {
    let symbol = Symbol::Terminal(terminal.clone());
    let mut resolved = vec![symbol].into_iter();
    let body = GammaNode::Symbol(SymbolRef::Terminal(terminal.name().to_string()));
    let (nodes, reversed_nodes) = build_rule_dfas(&body, &mut |_| Ok(resolved.next().unwrap())).unwrap();
    Rule { id: rule_id, non_terminal: nt.clone(), nodes, reversed_nodes, name: None, tags: None }
  }

  #[test]
  fn root_rule_seeds_with_eof_lookahead_and_builds_two_states() {
    let s = NonTerminal::new("S");
    s.set_id(0);
    let a = SolidTerminal::new("a");
    a.set_id(1);
    let rule = Rc::new(single_terminal_rule(0, &s, &a));

    let first_sets = compute_first_sets(std::slice::from_ref(&*rule));
    let builder = CanonicalCollectionBuilder::new(std::slice::from_ref(&rule), &first_sets);
    let collection = builder.build(s.id(), SpecialTerminal::EOF_ID).unwrap();

    // Start state: one constrained marked rule at mark 0, lookahead {EOF}.
    assert_eq!(collection.nodes.len(), 2);
    assert_eq!(collection.nodes[0].constrained_rules.len(), 1);
    let seed = &collection.nodes[0].constrained_rules[0];
    assert_eq!(seed.marked_rule.mark, 0);
    assert_eq!(seed.look_aheads, BTreeSet::from([SpecialTerminal::EOF_ID]));

    // Shifting 'a' reaches a state whose sole constrained rule is final.
    let shift_target = collection.nodes[0].transitions[&Symbol::Terminal(a)];
    assert_eq!(shift_target, 1);
    let advanced = &collection.nodes[1].constrained_rules[0];
    assert!(rule.nodes[advanced.marked_rule.mark].is_final);
  }

  #[test]
  fn closure_pulls_in_generators_of_a_referenced_non_terminal() {
    // S => N; N => 'a'. Closing the seed {S@0, {EOF}} must add
    // {N@0, {EOF}} since nothing follows N inside S's body.
    let s = NonTerminal::new("S");
    s.set_id(0);
    let n = NonTerminal::new("N");
    n.set_id(1);
    let a = SolidTerminal::new("a");
    a.set_id(1);

    let n_symbol = Symbol::NonTerminal(n.clone());
    let mut s_resolved = vec![n_symbol].into_iter();
    let s_body = GammaNode::Symbol(SymbolRef::NonTerminal("N".to_string()));
    let (s_nodes, s_reversed) = build_rule_dfas(&s_body, &mut |_| Ok(s_resolved.next().unwrap())).unwrap();
    let s_rule = Rc::new(Rule { id: 0, non_terminal: s.clone(), nodes: s_nodes, reversed_nodes: s_reversed, name: None, tags: None });

    let n_rule = Rc::new(single_terminal_rule(1, &n, &a));

    let rules = vec![s_rule.clone(), n_rule.clone()];
    let plain_rules: Vec<Rule> = rules
      .iter()
      .map(|r| Rule { id: r.id, non_terminal: r.non_terminal.clone(), nodes: r.nodes.clone(), reversed_nodes: r.reversed_nodes.clone(), name: r.name.clone(), tags: r.tags.clone() })
      .collect();
    let first_sets = compute_first_sets(&plain_rules);
    let builder = CanonicalCollectionBuilder::new(&rules, &first_sets);
    let collection = builder.build(s.id(), SpecialTerminal::EOF_ID).unwrap();

    let start = &collection.nodes[0];
    assert_eq!(start.constrained_rules.len(), 2);
    let n_entry = start
      .constrained_rules
      .iter()
      .find(|cmr| cmr.marked_rule.rule.id == 1)
      .expect("closure should pull in N's rule");
    assert_eq!(n_entry.marked_rule.mark, 0);
    assert_eq!(n_entry.look_aheads, BTreeSet::from([SpecialTerminal::EOF_ID]));
  }
}

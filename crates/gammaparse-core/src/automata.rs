//! Shared NFA→DFA kernel (§4.4, C5), reused by the lexical regex engine
//! (keys = codepoint `Range`) and the gamma-regex engine (keys =
//! `Symbol`). Build-time graphs are arena-owned: nodes are addressed by
//! `usize` id, never by direct handle, so the structures stay acyclic
//! in the Rust borrow-checker sense even though the automata they
//! represent are cyclic.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::hash::Hash;

use crate::interval::Range;

#[derive(Clone, Debug)]
pub struct NfaNode<K, E> {
  pub transitions: Vec<(K, usize)>,
  pub epsilon:     Vec<usize>,
  pub entry:       Option<E>,
}

impl<K, E> NfaNode<K, E> {
  fn new() -> Self {
    Self { transitions: Vec::new(), epsilon: Vec::new(), entry: None }
  }
}

/// A build-time automaton: raw transitions plus epsilon edges. `E` is
/// an opaque payload the kernel never inspects, attached to
/// accepting nodes by the caller (token-id/reluctant/above for the
/// tokenizer, nothing for gamma-regex rule DFAs).
pub struct Nfa<K, E> {
  pub nodes: Vec<NfaNode<K, E>>,
}

impl<K, E> Nfa<K, E> {
  pub fn new() -> Self {
    Self { nodes: Vec::new() }
  }

  pub fn add_state(&mut self) -> usize {
    let id = self.nodes.len();
    self.nodes.push(NfaNode::new());
    id
  }

  pub fn add_transition(&mut self, from: usize, key: K, to: usize) {
    self.nodes[from].transitions.push((key, to));
  }

  pub fn add_epsilon(&mut self, from: usize, to: usize) {
    self.nodes[from].epsilon.push(to);
  }

  pub fn set_entry(&mut self, node: usize, entry: E) {
    self.nodes[node].entry = Some(entry);
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  /// Fixed-point epsilon closure of a single node (§4.4 step 1).
  pub fn epsilon_closure(&self, start: usize) -> BTreeSet<usize> {
    self.epsilon_closure_of_set([start])
  }

  /// Fixed-point epsilon closure of a set of seed nodes: each closure
  /// starts as the seed set, then repeatedly unions in the
  /// epsilon-neighbours of every member until nothing new is added.
  pub fn epsilon_closure_of_set(&self, seeds: impl IntoIterator<Item = usize>) -> BTreeSet<usize> {
    let mut closure: BTreeSet<usize> = seeds.into_iter().collect();
    loop {
      let additions: Vec<usize> =
        closure.iter().flat_map(|&n| self.nodes[n].epsilon.iter().copied()).filter(|n| !closure.contains(n)).collect();
      if additions.is_empty() {
        break;
      }
      closure.extend(additions);
    }
    closure
  }
}

impl<K, E> Default for Nfa<K, E> {
  fn default() -> Self {
    Self::new()
  }
}

/// A determinized automaton: `transitions[state]` holds that state's
/// outgoing `(key, target-state)` edges, and `subsets[state]` is the
/// originating NFA-node subset (so callers can recover entry
/// annotations or membership tests, e.g. "does this subset contain
/// forward node 0", without the kernel knowing about either).
pub struct Dfa<K> {
  pub start:       usize,
  pub transitions: Vec<Vec<(K, usize)>>,
  pub subsets:     Vec<BTreeSet<usize>>,
}

impl<K> Dfa<K> {
  pub fn state_count(&self) -> usize {
    self.subsets.len()
  }

  pub fn subset_nodes(&self, state: usize) -> &BTreeSet<usize> {
    &self.subsets[state]
  }
}

fn intern<K>(
  subset: BTreeSet<usize>,
  interned: &mut HashMap<BTreeSet<usize>, usize>,
  subsets: &mut Vec<BTreeSet<usize>>,
  transitions: &mut Vec<Vec<(K, usize)>>,
  queue: &mut VecDeque<usize>,
) -> usize {
  if let Some(&id) = interned.get(&subset) {
    return id;
  }
  let id = subsets.len();
  interned.insert(subset.clone(), id);
  subsets.push(subset);
  transitions.push(Vec::new());
  queue.push_back(id);
  id
}

/// Subset construction (§4.4 step 2), parameterised over how a
/// frontier subset's raw outgoing transitions are grouped into
/// `(key, raw-target-set)` pairs; each group is then epsilon-closed
/// and interned by the shared driver. `determinize_exact` and
/// `determinize_interval` below are the two concrete groupings the
/// spec calls for.
fn subset_construct<K, E>(nfa: &Nfa<K, E>, start: usize, group: impl Fn(&Nfa<K, E>, &BTreeSet<usize>) -> Vec<(K, BTreeSet<usize>)>) -> Dfa<K> {
  let start_subset = nfa.epsilon_closure(start);
  let mut interned: HashMap<BTreeSet<usize>, usize> = HashMap::new();
  let mut subsets: Vec<BTreeSet<usize>> = Vec::new();
  let mut transitions: Vec<Vec<(K, usize)>> = Vec::new();
  let mut queue: VecDeque<usize> = VecDeque::new();

  let start_id = intern(start_subset, &mut interned, &mut subsets, &mut transitions, &mut queue);

  while let Some(subset_id) = queue.pop_front() {
    let subset = subsets[subset_id].clone();
    for (key, raw_targets) in group(nfa, &subset) {
      let closed = nfa.epsilon_closure_of_set(raw_targets);
      let target_id = intern(closed, &mut interned, &mut subsets, &mut transitions, &mut queue);
      transitions[subset_id].push((key, target_id));
    }
  }

  Dfa { start: start_id, transitions, subsets }
}

/// Determinize with exact-equality key grouping, used by the
/// gamma-regex engine (keys are grammar symbols, so "same key" is
/// literal equality, not interval overlap).
pub fn determinize_exact<K, E>(nfa: &Nfa<K, E>, start: usize) -> Dfa<K>
where
  K: Eq + Hash + Clone,
{
  subset_construct(nfa, start, |nfa, subset| {
    let mut grouped: HashMap<K, BTreeSet<usize>> = HashMap::new();
    for &node in subset {
      for (key, target) in &nfa.nodes[node].transitions {
        grouped.entry(key.clone()).or_default().insert(*target);
      }
    }
    grouped.into_iter().collect()
  })
}

/// Determinize with interval-key grouping, used by the lexical regex
/// engine: outgoing `(Range, target)` pairs across the frontier are
/// split into pairwise-disjoint ranges via `disjointValuedList` so the
/// resulting keys are pairwise disjoint and each carries the full set
/// of reached nodes (§4.4 step 2, second case).
pub fn determinize_interval<E>(nfa: &Nfa<Range, E>, start: usize) -> Dfa<Range> {
  subset_construct(nfa, start, |nfa, subset| {
    let mut points: Vec<(Range, Vec<usize>)> = Vec::new();
    for &node in subset {
      for (range, target) in &nfa.nodes[node].transitions {
        points.push((*range, vec![*target]));
      }
    }
    Range::disjoint_valued_list(points).into_iter().map(|(range, targets)| (range, targets.into_iter().collect::<BTreeSet<usize>>())).collect()
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn exact_determinize_merges_equivalent_epsilon_paths() {
    // Two epsilon paths both labelled 'a' converge on a shared final,
    // mirroring alternation `a|a` — subset construction must produce
    // one DFA with a single accepting state reachable on 'a'.
    let mut nfa: Nfa<char, ()> = Nfa::new();
    let start = nfa.add_state();
    let left = nfa.add_state();
    let right = nfa.add_state();
    let final_left = nfa.add_state();
    let final_right = nfa.add_state();
    let accept = nfa.add_state();
    nfa.add_epsilon(start, left);
    nfa.add_epsilon(start, right);
    nfa.add_transition(left, 'a', final_left);
    nfa.add_transition(right, 'a', final_right);
    nfa.add_epsilon(final_left, accept);
    nfa.add_epsilon(final_right, accept);
    nfa.set_entry(accept, ());

    let dfa = determinize_exact(&nfa, start);
    assert_eq!(dfa.transitions[dfa.start].len(), 1);
    let (key, target) = dfa.transitions[dfa.start][0];
    assert_eq!(key, 'a');
    assert!(dfa.subset_nodes(target).contains(&accept));
  }

  #[test]
  fn interval_determinize_splits_overlapping_ranges() {
    let mut nfa: Nfa<Range, ()> = Nfa::new();
    let start = nfa.add_state();
    let a = nfa.add_state();
    let b = nfa.add_state();
    nfa.add_transition(start, Range::new(0, 10), a);
    nfa.add_transition(start, Range::new(5, 15), b);

    let dfa = determinize_interval(&nfa, start);
    let mut ranges: Vec<Range> = dfa.transitions[dfa.start].iter().map(|(r, _)| *r).collect();
    ranges.sort();
    assert_eq!(ranges, vec![Range::new(0, 4), Range::new(5, 10), Range::new(11, 15)]);
  }
}

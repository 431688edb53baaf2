//! Public grammar-construction API (§6): `ParserBuilder` interns
//! terminals/non-terminals, collects rule bodies, and compiles the
//! whole grammar into a runnable `Parser` in one `build` call.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::action_table::{build_action_table, ConflictSolver};
use crate::canonical::CanonicalCollectionBuilder;
use crate::error::{GammaError, GammaResult};
use crate::first_sets::compute_first_sets;
use crate::gamma::{GammaNode, GammaParser, SymbolRef};
use crate::parser_runtime::Parser;
use crate::rule::{build_rule_dfas, Rule};
use crate::symbols::{NonTerminal, SolidTerminal, SpecialTerminal, Symbol};

struct RuleSpec {
  non_terminal: String,
  body:         GammaNode,
  name:         Option<String>,
  tags:         Option<HashSet<String>>,
}

/// Interns symbols by name and accumulates rule bodies until `build`
/// compiles the whole grammar. Id 0 in the terminal namespace is
/// reserved for `EOF` (§3); user terminals start at 1.
pub struct ParserBuilder<D> {
  terminals:            RefCell<HashMap<String, SolidTerminal>>,
  non_terminals:        RefCell<HashMap<String, NonTerminal>>,
  next_terminal_id:     Cell<u32>,
  next_non_terminal_id: Cell<u32>,
  rules:                RefCell<Vec<RuleSpec>>,
  conflict_solver:      RefCell<Option<ConflictSolver<D>>>,
}

impl<D> Default for ParserBuilder<D> {
  fn default() -> Self {
    Self::new()
  }
}

impl<D> ParserBuilder<D> {
  pub fn new() -> Self {
    Self {
      terminals:            RefCell::new(HashMap::new()),
      non_terminals:        RefCell::new(HashMap::new()),
      next_terminal_id:     Cell::new(SpecialTerminal::EOF_ID + 1),
      next_non_terminal_id: Cell::new(0),
      rules:                RefCell::new(Vec::new()),
      conflict_solver:      RefCell::new(None),
    }
  }

  /// Interns (or returns the existing) terminal named `name`,
  /// assigning it the next free terminal id on first use.
  pub fn get_terminal(&self, name: &str) -> SolidTerminal {
    if let Some(existing) = self.terminals.borrow().get(name) {
      return existing.clone();
    }
    let terminal = SolidTerminal::new(name);
    let id = self.next_terminal_id.get();
    terminal.set_id(id);
    self.next_terminal_id.set(id + 1);
    self.terminals.borrow_mut().insert(name.to_string(), terminal.clone());
    terminal
  }

  /// Interns (or returns the existing) non-terminal named `name`.
  pub fn get_non_terminal(&self, name: &str) -> NonTerminal {
    if let Some(existing) = self.non_terminals.borrow().get(name) {
      return existing.clone();
    }
    let non_terminal = NonTerminal::new(name);
    let id = self.next_non_terminal_id.get();
    non_terminal.set_id(id);
    self.next_non_terminal_id.set(id + 1);
    self.non_terminals.borrow_mut().insert(name.to_string(), non_terminal.clone());
    non_terminal
  }

  /// Registers a production whose body is already a parsed `GammaNode`
  /// tree (for callers building the AST programmatically).
  pub fn add_rule(&self, non_terminal: &str, body: GammaNode, name: Option<String>, tags: Option<HashSet<String>>) {
    self.get_non_terminal(non_terminal);
    self.rules.borrow_mut().push(RuleSpec { non_terminal: non_terminal.to_string(), body, name, tags });
  }

  /// Registers a production, parsing `pattern_text` as a gamma-regex
  /// body (§4).
  pub fn add_raw_rule(&self, non_terminal: &str, pattern_text: &str, name: Option<String>, tags: Option<HashSet<String>>) -> GammaResult<()> {
    let body = GammaParser::parse(pattern_text)?;
    self.add_rule(non_terminal, body, name, tags);
    Ok(())
  }

  /// Installs a conflict solver consulted during action-table
  /// synthesis whenever a (state, terminal) cell has more than one
  /// candidate action (§4.10/§4.11).
  pub fn set_conflict_solver(&self, solver: ConflictSolver<D>) {
    *self.conflict_solver.borrow_mut() = Some(solver);
  }

  /// Compiles every registered rule and produces a `Parser` rooted at
  /// `root_non_terminal`.
  pub fn build(&self, root_non_terminal: &str) -> GammaResult<Parser<D>> {
    let root = self.get_non_terminal(root_non_terminal);
    let specs = self.rules.borrow();

    let mut rules: Vec<Rc<Rule>> = Vec::with_capacity(specs.len());
    for (rule_id, spec) in specs.iter().enumerate() {
      let non_terminal = self.get_non_terminal(&spec.non_terminal);
      let terminals = &self.terminals;
      let non_terminals = &self.non_terminals;
      let mut resolve = |symbol_ref: &SymbolRef| -> GammaResult<Symbol> {
        match symbol_ref {
          SymbolRef::Terminal(text) => {
            if let Some(existing) = terminals.borrow().get(text) {
              return Ok(Symbol::Terminal(existing.clone()));
            }
            let terminal = SolidTerminal::new(text);
            let id = self.next_terminal_id.get();
            terminal.set_id(id);
            self.next_terminal_id.set(id + 1);
            terminals.borrow_mut().insert(text.clone(), terminal.clone());
            Ok(Symbol::Terminal(terminal))
          }
          SymbolRef::NonTerminal(name) => {
            if let Some(existing) = non_terminals.borrow().get(name) {
              return Ok(Symbol::NonTerminal(existing.clone()));
            }
            let nt = NonTerminal::new(name);
            let id = self.next_non_terminal_id.get();
            nt.set_id(id);
            self.next_non_terminal_id.set(id + 1);
            non_terminals.borrow_mut().insert(name.clone(), nt.clone());
            Ok(Symbol::NonTerminal(nt))
          }
        }
      };

      let (nodes, reversed_nodes) = build_rule_dfas(&spec.body, &mut resolve)?;
      rules.push(Rc::new(Rule { id: rule_id as u32, non_terminal, nodes, reversed_nodes, name: spec.name.clone(), tags: spec.tags.clone() }));
    }

    if rules.is_empty() {
      return Err(GammaError::Build("grammar has no rules".to_string()));
    }

    let plain_rules: Vec<Rule> = rules
      .iter()
      .map(|rule| Rule {
        id:             rule.id,
        non_terminal:   rule.non_terminal.clone(),
        nodes:          rule.nodes.clone(),
        reversed_nodes: rule.reversed_nodes.clone(),
        name:           rule.name.clone(),
        tags:           rule.tags.clone(),
      })
      .collect();
    let first_sets = compute_first_sets(&plain_rules);

    let collection_builder = CanonicalCollectionBuilder::new(&rules, &first_sets);
    let collection = collection_builder.build(root.id(), SpecialTerminal::EOF_ID)?;

    let terminal_count = self.next_terminal_id.get() as usize;
    let non_terminal_count = self.next_non_terminal_id.get() as usize;

    let states = build_action_table(&collection, terminal_count, non_terminal_count, rules.len(), root.id(), SpecialTerminal::EOF_ID, self.conflict_solver.borrow().as_ref())?;

    let terminal_symbols: HashMap<u32, Symbol> =
      self.terminals.borrow().values().map(|terminal| (terminal.id(), Symbol::Terminal(terminal.clone()))).collect();

    Ok(Parser::new(states, rules, terminal_symbols, SpecialTerminal::EOF_ID))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::gamma::SymbolRef;

  #[test]
  fn single_terminal_grammar_builds_and_accepts() {
    let builder: ParserBuilder<()> = ParserBuilder::new();
    builder.add_rule("S", GammaNode::Symbol(SymbolRef::Terminal("a".into())), None, None);
    let parser = builder.build("S").unwrap();
    assert!(!parser.states().is_empty());
  }
}

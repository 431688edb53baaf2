//! Gamma-regex AST (§4 C4): a production body parsed into a tree of
//! `{Symbol, Sequence, Choice, Quantified}`. Symbols are still bare
//! names here — `crate::rule` resolves them against the builder's
//! terminal/non-terminal interning table when compiling this tree
//! into a rule DFA (C8).

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quantifier {
  Star,
  Plus,
  Optional,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SymbolRef {
  Terminal(String),
  NonTerminal(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GammaNode {
  Symbol(SymbolRef),
  Sequence(Vec<GammaNode>),
  Choice(Vec<GammaNode>),
  Quantified(Box<GammaNode>, Quantifier),
}

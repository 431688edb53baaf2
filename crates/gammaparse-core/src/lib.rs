//! Compiles a gamma-regular grammar (productions whose bodies are
//! regular expressions over grammar symbols rather than linear item
//! positions) into a longest-match tokenizer DFA and a shift/reduce
//! parse table, then drives both against an input character stream.
//!
//! The pipeline, leaves first:
//!
//! - [`interval`] — disjoint-interval-list algebra over codepoint
//!   ranges (C2), shared by the lexical regex engine.
//! - [`regex`] — the lexical-pattern mini-language: AST plus parser
//!   (C3).
//! - [`gamma`] — the gamma-regex production-body language: AST plus
//!   parser (C4).
//! - [`automata`] — the NFA→DFA kernel shared by both engines: epsilon
//!   closure, subset construction, exact-key and interval-key
//!   determinization (C5).
//! - [`tokenizer_builder`] / [`tokenizer`] — assembles lexical patterns
//!   into one DFA with `above`-relation conflict resolution (C6), and
//!   the longest-match runtime scanner that DFA drives (C7).
//! - [`rule`] — per-production forward and reversed DFA construction
//!   (C8).
//! - [`first_sets`] — FIRST-set fixed point over non-terminals (C9).
//! - [`canonical`] — canonical-collection closure, GOTO, and per-node
//!   follow sets (C10).
//! - [`action_table`] — SHIFT/REDUCE/ACCEPT/GOTO synthesis with
//!   conflict resolution (C11).
//! - [`parser_runtime`] — the shift/reduce driver that walks reversed
//!   per-rule DFAs to delimit reduction operand windows (C12).
//! - [`builder`] — the public grammar-construction API tying the
//!   whole pipeline together (§6).

pub mod action_table;
pub mod automata;
pub mod builder;
pub mod canonical;
pub mod error;
pub mod first_sets;
pub mod gamma;
pub mod interval;
pub mod parser_runtime;
pub mod regex;
pub mod rule;
pub mod symbols;
pub mod tokenizer;
pub mod tokenizer_builder;

pub use action_table::{ActionGroup, BranchingContext, ConflictSolver, ParserAction, ParserState, Selector};
pub use builder::ParserBuilder;
pub use error::{GammaError, GammaResult};
pub use first_sets::{compute_first_sets, FirstSets};
pub use interval::Range;
pub use parser_runtime::Parser;
pub use rule::{build_rule_dfas, GammaRegexNode, Rule};
pub use symbols::{NonTerminal, SolidTerminal, SpecialTerminal, Symbol};
pub use tokenizer::{CodepointBuffer, Tokenizer, TokenIterator};
pub use tokenizer_builder::TokenizerBuilder;

pub use gammaparse_runtime::{CharFlow, PushbackIterator, Token};

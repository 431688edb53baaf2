//! The grammar symbol hierarchy (§3 DATA MODEL).
//!
//! `SolidTerminal` and `NonTerminal` are interned by name inside
//! `ParserBuilder`; equality and hashing are by identity (pointer
//! equality of the shared `Rc`), matching spec §3: "Equality and
//! hashing of symbols are by identity after the builder has assigned
//! `id`. Before `id` assignment, symbols are equal iff they are the
//! same object; the builder interns by name."

use std::cell::Cell;
use std::fmt::{self, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::rc::Rc;

struct SolidTerminalData {
  name: String,
  id:   Cell<u32>,
}

/// A concrete token kind. `id` is assigned during `ParserBuilder::build`;
/// `name` is user-visible.
#[derive(Clone)]
pub struct SolidTerminal(Rc<SolidTerminalData>);

impl SolidTerminal {
  pub(crate) fn new(name: impl Into<String>) -> Self {
    Self(Rc::new(SolidTerminalData { name: name.into(), id: Cell::new(u32::MAX) }))
  }

  pub fn name(&self) -> &str {
    &self.0.name
  }

  pub fn id(&self) -> u32 {
    self.0.id.get()
  }

  pub(crate) fn set_id(&self, id: u32) {
    self.0.id.set(id);
  }
}

impl PartialEq for SolidTerminal {
  fn eq(&self, other: &Self) -> bool {
    Rc::ptr_eq(&self.0, &other.0)
  }
}
impl Eq for SolidTerminal {}

impl Hash for SolidTerminal {
  fn hash<H: Hasher>(&self, state: &mut H) {
    (Rc::as_ptr(&self.0) as usize).hash(state)
  }
}

impl Display for SolidTerminal {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    write!(f, "'{}'", self.0.name)
  }
}

impl fmt::Debug for SolidTerminal {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    write!(f, "SolidTerminal(name={:?})", self.0.name)
  }
}

struct NonTerminalData {
  name: String,
  id:   Cell<u32>,
}

/// A grammar non-terminal.
#[derive(Clone)]
pub struct NonTerminal(Rc<NonTerminalData>);

impl NonTerminal {
  pub(crate) fn new(name: impl Into<String>) -> Self {
    Self(Rc::new(NonTerminalData { name: name.into(), id: Cell::new(u32::MAX) }))
  }

  pub fn name(&self) -> &str {
    &self.0.name
  }

  pub fn id(&self) -> u32 {
    self.0.id.get()
  }

  pub(crate) fn set_id(&self, id: u32) {
    self.0.id.set(id);
  }
}

impl PartialEq for NonTerminal {
  fn eq(&self, other: &Self) -> bool {
    Rc::ptr_eq(&self.0, &other.0)
  }
}
impl Eq for NonTerminal {}

impl Hash for NonTerminal {
  fn hash<H: Hasher>(&self, state: &mut H) {
    (Rc::as_ptr(&self.0) as usize).hash(state)
  }
}

impl Display for NonTerminal {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0.name)
  }
}

impl fmt::Debug for NonTerminal {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    write!(f, "NonTerminal(name={:?})", self.0.name)
  }
}

/// The two fixed singleton terminals: `Eof` (id = 0, terminates every
/// token stream and the root production) and `Empty` (the
/// empty-string marker used only inside FIRST sets; spec §3: "never
/// appears in any action table column").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpecialTerminal {
  Eof,
  Empty,
}

impl SpecialTerminal {
  pub const EOF_ID: u32 = 0;

  pub fn id(self) -> u32 {
    match self {
      Self::Eof => Self::EOF_ID,
      Self::Empty => u32::MAX,
    }
  }
}

impl Display for SpecialTerminal {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    match self {
      Self::Eof => write!(f, "EOF"),
      Self::Empty => write!(f, "EMPTY"),
    }
  }
}

/// Polymorphic grammar symbol: a concrete terminal, one of the two
/// special singleton terminals, or a non-terminal.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Symbol {
  Terminal(SolidTerminal),
  Special(SpecialTerminal),
  NonTerminal(NonTerminal),
}

impl Symbol {
  pub fn is_non_terminal(&self) -> bool {
    matches!(self, Symbol::NonTerminal(_))
  }

  pub fn as_non_terminal(&self) -> Option<&NonTerminal> {
    match self {
      Symbol::NonTerminal(n) => Some(n),
      _ => None,
    }
  }

  pub fn as_terminal(&self) -> Option<&SolidTerminal> {
    match self {
      Symbol::Terminal(t) => Some(t),
      _ => None,
    }
  }

  /// The column index of this symbol in the action table, if it is a
  /// terminal participating in parsing (`EMPTY` has none — spec §3).
  pub fn terminal_id(&self) -> Option<u32> {
    match self {
      Symbol::Terminal(t) => Some(t.id()),
      Symbol::Special(SpecialTerminal::Eof) => Some(SpecialTerminal::EOF_ID),
      _ => None,
    }
  }
}

impl Display for Symbol {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    match self {
      Symbol::Terminal(t) => Display::fmt(t, f),
      Symbol::Special(s) => Display::fmt(s, f),
      Symbol::NonTerminal(n) => Display::fmt(n, f),
    }
  }
}

impl From<SolidTerminal> for Symbol {
  fn from(value: SolidTerminal) -> Self {
    Symbol::Terminal(value)
  }
}

impl From<NonTerminal> for Symbol {
  fn from(value: NonTerminal) -> Self {
    Symbol::NonTerminal(value)
  }
}

impl From<SpecialTerminal> for Symbol {
  fn from(value: SpecialTerminal) -> Self {
    Symbol::Special(value)
  }
}

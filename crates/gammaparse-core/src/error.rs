use std::fmt::{self, Display, Formatter};

/// Every error `gammaparse_core` can produce, grouped by phase:
/// lex-time, build-time, tokenize-time, parse-time. A single
/// hand-rolled enum with a manual `Display` rather than a
/// derive-macro error crate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GammaError {
  /// Malformed lexical or gamma-regex pattern text: unterminated
  /// string/class, unknown POSIX class, malformed escape or range.
  Lex { message: String, line: u32, column: u32 },
  /// A build-time failure: ambiguous lexical acceptance, an unsolved
  /// parse-action conflict, or a non-terminal with no generators.
  Build(String),
  /// `readToken` could not advance: no DFA transition and no current
  /// accept.
  Tokenize { message: String, line: u32, column: u32 },
  /// `parse` hit an empty action cell, or a branching selector
  /// returned nothing.
  Parse(String),
}

impl Display for GammaError {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    match self {
      Self::Lex { message, line, column } => write!(f, "Lex error at {}:{}: {}", line, column, message),
      Self::Build(message) => write!(f, "Grammar build error: {}", message),
      Self::Tokenize { message, line, column } => write!(f, "Unable to parse '{}' at line {}, column {}", message, line, column),
      Self::Parse(message) => write!(f, "Parse error: {}", message),
    }
  }
}

impl std::error::Error for GammaError {}

impl From<gammaparse_runtime::RuntimeError> for GammaError {
  fn from(err: gammaparse_runtime::RuntimeError) -> Self {
    use gammaparse_runtime::RuntimeError::*;
    match err {
      UnexpectedEof { line, column, .. } | Mismatch { line, column, .. } | StepPastEof { line, column } => {
        Self::Lex { message: err.to_string(), line, column }
      }
    }
  }
}

pub type GammaResult<T> = Result<T, GammaError>;

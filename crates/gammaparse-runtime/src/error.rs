use std::fmt::{self, Display, Formatter};

/// Every error a `gammaparse_runtime` operation can produce.
///
/// A single enum with a manual `Display` impl rather than a `thiserror`
/// derive, since nothing here needs more than a formatted message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RuntimeError {
  /// The stream ended where a specific character was expected.
  UnexpectedEof { line: u32, column: u32, expected: char },
  /// A specific character was expected but a different one was found.
  Mismatch { line: u32, column: u32, expected: char, found: char },
  /// `next` was called against an exhausted stream.
  StepPastEof { line: u32, column: u32 },
}

impl Display for RuntimeError {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    match self {
      Self::UnexpectedEof { line, column, expected } => write!(
        f,
        "At line {}, column {}, expected '{}' but got end of stream",
        line, column, expected
      ),
      Self::Mismatch { line, column, expected, found } => write!(
        f,
        "At line {}, column {}, expected '{}' but got '{}'",
        line, column, expected, found
      ),
      Self::StepPastEof { line, column } => {
        write!(f, "At line {}, column {}, tried to step but got end of stream", line, column)
      }
    }
  }
}

impl std::error::Error for RuntimeError {}

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// A lexeme produced by a tokenizer: the terminal it matched, the
/// matched text, and the line/column where it started.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token<K> {
  pub key:    K,
  pub data:   String,
  pub line:   u32,
  pub column: u32,
}

impl<K> Token<K> {
  pub fn new(key: K, data: String, line: u32, column: u32) -> Self {
    Self { key, data, line, column }
  }
}

impl<K: std::fmt::Display> std::fmt::Display for Token<K> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}('{}') at {}:{}", self.key, self.data, self.line, self.column)
  }
}

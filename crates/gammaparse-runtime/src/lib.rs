//! Grammar-agnostic runtime primitives shared by `gammaparse_core`:
//! the character stream, the token record, and the pushback iterator
//! adaptor used by the shift/reduce driver.

mod char_flow;
mod error;
mod pushback;
mod token;

pub use char_flow::CharFlow;
pub use error::{RuntimeError, RuntimeResult};
pub use pushback::PushbackIterator;
pub use token::Token;

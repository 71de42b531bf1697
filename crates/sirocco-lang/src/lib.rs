//! Sirocco: a tree-walking interpreter for a small statically-flavored
//! scripting language that drives a grid "playground" world.
//!
//! ```
//! use sirocco_lang::{Interpreter, compile};
//!
//! let program = compile("let x = 2\nprint(x * 21)").unwrap();
//! let mut interp = Interpreter::new(program);
//! interp.run().unwrap();
//! assert_eq!(interp.take_output(), "42\n");
//! ```

pub mod error;
pub mod runtime;
pub mod syntax;

pub use error::{Error, ErrorCode, RuntimeError};
pub use runtime::interpreter::{Completion, Interpreter};
pub use runtime::value::{Content, DataType, Mutability, Value};
pub use runtime::world::{ActorId, NullWorld, World, WorldRef};
pub use syntax::ast::Program;

use syntax::lexer::Lexer;
use syntax::parser::Parser;

/// Lexes and parses a source string, accumulating every error it can find.
pub fn compile(source: &str) -> Result<Program, Vec<Error>> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens).parse()
}

/*!
  A compiler and stack machine for a tiny point-free language over 64-bit words.

  Programs are single-argument-list lambdas built from bit operations, `if0` and `fold`. The
  compiler emits bytecode directly while it parses, and every emission is checked against a
  static model of the value stack, so a `Block` that compiles cannot underflow when it runs.
*/

#[macro_use] extern crate prettytable;
#[macro_use] extern crate lazy_static;

pub mod error;
pub mod slot;
pub mod bytecode;
pub mod block;
pub mod vm;
pub mod compiler;
pub mod driver;

pub use crate::block::Block;
pub use crate::bytecode::Word;
pub use crate::compiler::compile;
pub use crate::driver::{fingerprint, program_text, Driver, Summary};
pub use crate::error::{CompileError, EmitError, Error, ExecuteError};

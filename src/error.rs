//! Error types. Emission errors are raised while a `Block` is under construction, compile errors
//! while source text is being translated, and execution errors by the execution contract itself.

use thiserror::Error;

use crate::compiler::MAX_NESTING;
use crate::slot::SLOT_COUNT;

/// A verification failure raised by the static stack-depth checker in `Block`.
#[derive(Error, Clone, Debug, Eq, PartialEq)]
pub enum EmitError {
  #[error("{operation} needs {required} stack value(s) but only {available} are present")]
  StackUnderflow {
    operation : &'static str,
    required  : usize,
    available : usize
  },

  #[error("slot {0} is outside the register file of {count} slots", count = SLOT_COUNT)]
  InvalidSlot(usize),

  #[error("a jump over {0} bytes does not fit a 16-bit offset")]
  JumpTooFar(usize),

  #[error("the {branch} branch of a conditional is not closed (entry depth {initial}, exit depth {depth})")]
  OpenBranch {
    branch  : &'static str,
    initial : usize,
    depth   : usize
  },
}

/// Why a program failed to compile. Offsets are byte offsets into the source text.
#[derive(Error, Clone, Debug, Eq, PartialEq)]
pub enum CompileError {
  #[error("unexpected character {character:?} at offset {offset}")]
  UnexpectedCharacter {
    character : char,
    offset    : usize
  },

  #[error("unexpected end of input, expected {expected}")]
  UnexpectedEnd {
    expected: &'static str
  },

  #[error("expected {expected} at offset {offset}, found `{found}`")]
  UnexpectedToken {
    expected : &'static str,
    found    : String,
    offset   : usize
  },

  #[error("`{0}` is not a bound name or an integer literal")]
  UnknownIdentifier(String),

  #[error("`{0}` is not an operator")]
  UnknownOperator(String),

  #[error("`{0}` is a reserved word and cannot be used as a name")]
  ReservedWord(String),

  #[error("fold binds `{0}` twice")]
  DuplicateBinding(String),

  #[error("`{0}` is not a valid 64-bit integer literal")]
  InvalidLiteral(String),

  #[error("binding `{name}` needs slot {slot}, but only {count} slots exist", count = SLOT_COUNT)]
  RegisterFileExhausted {
    name : String,
    slot : usize
  },

  #[error("expression at offset {offset} is nested deeper than {limit} levels", limit = MAX_NESTING)]
  TooDeep {
    offset: usize
  },

  #[error("trailing input at offset {offset}")]
  TrailingInput {
    offset: usize
  },

  #[error(transparent)]
  Emit(#[from] EmitError),
}

/// A violation of the execution contract, detected before any instruction runs.
#[derive(Error, Clone, Debug, Eq, PartialEq)]
pub enum ExecuteError {
  #[error("{0} inputs given, but at most {count} are accepted", count = SLOT_COUNT)]
  TooManyInputs(usize),

  #[error("block is not executable (entry depth {initial}, exit depth {depth})")]
  NotClosed {
    initial : usize,
    depth   : usize
  },
}

/// Errors surfaced by the batch driver.
#[derive(Error, Debug)]
pub enum Error {
  #[error(transparent)]
  Compile(#[from] CompileError),

  #[error(transparent)]
  Execute(#[from] ExecuteError),

  #[error("i/o failure: {0}")]
  Io(#[from] std::io::Error),

  #[error("could not start the worker pool: {0}")]
  WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

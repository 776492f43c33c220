/*!
  Translates program text straight into a `Block`. There is no syntax tree: each production
  is recognized and emitted in the same pass, and the stack-depth checks of `Block` run as the
  code is produced.

  The language is given by the following EBNF:
  ```text
  program := "(" "lambda" "(" id* ")" expr ")"
  expr    := id | integer-literal
           | "(" unop expr ")"  | "(" binop expr expr ")"
           | "(" "if0" expr expr expr ")"
           | "(" "fold" expr expr "(" "lambda" "(" id id ")" expr ")" ")"
  unop    := "not" | "shl1" | "shr1" | "shr4" | "shr16"
  binop   := "and" | "or" | "xor" | "plus"
  ```
*/

use std::collections::HashSet;
use std::str::FromStr;

use strum_macros::{Display as StrumDisplay, EnumString};

use crate::block::Block;
use crate::error::{CompileError, EmitError};
use super::tokenizer::{parse_integer, Token, Tokenizer};
use super::variables::Variables;

/// A fold always runs over the 8 bytes of a word, so its body is unrolled this many times.
pub const FOLD_WIDTH: usize = 8;

/// Parenthesized expressions may nest this deep. The compiler recurses once per level.
pub const MAX_NESTING: usize = 512;

/// The operators that may head a parenthesized expression.
#[derive(StrumDisplay, EnumString, Clone, Copy, Eq, PartialEq, Debug, Hash)]
enum Form {
  #[strum(to_string = "not")]   Not,
  #[strum(to_string = "shl1")]  Shl1,
  #[strum(to_string = "shr1")]  Shr1,
  #[strum(to_string = "shr4")]  Shr4,
  #[strum(to_string = "shr16")] Shr16,
  #[strum(to_string = "and")]   And,
  #[strum(to_string = "or")]    Or,
  #[strum(to_string = "xor")]   Xor,
  #[strum(to_string = "plus")]  Plus,
  #[strum(to_string = "if0")]   If0,
  #[strum(to_string = "fold")]  Fold,
}

const LAMBDA: &str = "lambda";

lazy_static! {
  static ref RESERVED_WORDS: HashSet<&'static str> = [
    "not", "shl1", "shr1", "shr4", "shr16",
    "and", "or", "xor", "plus",
    "if0",
    LAMBDA,
    "fold",
    "(", ")"
  ].iter().copied().collect();
}

/// An identifier does not start with a decimal digit and is not a reserved word.
pub fn is_identifier(token: &str) -> bool {
  match token.chars().next() {
    Some(first) => !first.is_ascii_digit() && !RESERVED_WORDS.contains(token),
    None        => false
  }
}

/// Compiles a complete program into a closed block. Nothing but whitespace may follow it.
pub fn compile(text: &str) -> Result<Block, CompileError> {
  let mut compiler = Compiler::new(text);
  let block = compiler.lambda()?;

  match compiler.tokens.at_end() {
    true  => {
      tracing::debug!(bytes = block.len(), "compiled {}", text);
      Ok(block)
    }
    false => Err(CompileError::TrailingInput { offset: compiler.tokens.next_offset() })
  }
}

type Emitter = fn(&mut Block) -> Result<(), EmitError>;

struct Compiler<'a> {
  tokens  : Tokenizer<'a>,
  nesting : usize          // Parenthesized expressions currently open
}

impl<'a> Compiler<'a> {

  fn new(text: &'a str) -> Self {
    Compiler {
      tokens  : Tokenizer::new(text),
      nesting : 0
    }
  }

  // region Token helpers

  /// The next token, where one is required.
  fn next(&mut self, expected: &'static str) -> Result<Token<'a>, CompileError> {
    match self.tokens.next_token()? {
      Some(token) => Ok(token),
      None        => Err(CompileError::UnexpectedEnd { expected })
    }
  }

  fn unexpected(&self, expected: &'static str, found: Token<'a>) -> CompileError {
    CompileError::UnexpectedToken {
      expected,
      found  : found.to_string(),
      offset : self.token_offset(found)
    }
  }

  /// Offset of a token that was just read.
  fn token_offset(&self, token: Token<'a>) -> usize {
    let length = match token {
      Token::Atom(atom) => atom.len(),
      _                 => 1
    };
    self.tokens.offset() - length
  }

  fn expect(&mut self, expected: Token<'static>, description: &'static str)
    -> Result<(), CompileError>
  {
    let token = self.next(description)?;
    match token == expected {
      true  => Ok(()),
      false => Err(self.unexpected(description, token))
    }
  }

  fn expect_open(&mut self) -> Result<(), CompileError> {
    self.expect(Token::Open, "`(`")
  }

  fn expect_close(&mut self) -> Result<(), CompileError> {
    self.expect(Token::Close, "`)`")
  }

  fn expect_lambda(&mut self) -> Result<(), CompileError> {
    self.expect(Token::Atom(LAMBDA), "`lambda`")
  }

  /// A name in a binding position.
  fn binding(&mut self) -> Result<&'a str, CompileError> {
    match self.next("a name")? {
      Token::Atom(atom) if is_identifier(atom)           => Ok(atom),
      Token::Atom(atom) if RESERVED_WORDS.contains(atom) => Err(CompileError::ReservedWord(atom.to_string())),
      token                                              => Err(self.unexpected("a name", token))
    }
  }

  // endregion

  // region Productions

  /// program := "(" "lambda" "(" id* ")" expr ")"
  fn lambda(&mut self) -> Result<Block, CompileError> {
    self.expect_open()?;
    self.expect_lambda()?;
    self.expect_open()?;

    let mut variables = Variables::new();
    loop {
      match self.next("a parameter or `)`")? {
        Token::Close => break,
        Token::Atom(atom) if is_identifier(atom) => {
          variables.bind(atom)?;
        }
        Token::Atom(atom) if RESERVED_WORDS.contains(atom) => {
          return Err(CompileError::ReservedWord(atom.to_string()));
        }
        token => return Err(self.unexpected("a parameter or `)`", token))
      }
    }

    let block = self.closed_expression(&variables)?;
    self.expect_close()?;
    Ok(block)
  }

  /// Compiles an expression into a block of its own, as needed for branches and fold bodies.
  fn closed_expression(&mut self, variables: &Variables) -> Result<Block, CompileError> {
    let mut block = Block::new(0);
    self.expression(variables, &mut block)?;
    Ok(block)
  }

  /// expr := id | integer-literal | "(" form ")"
  fn expression(&mut self, variables: &Variables, block: &mut Block) -> Result<(), CompileError> {
    match self.next("an expression")? {
      Token::Atom(atom) => self.atom(atom, variables, block),
      Token::Open       => self.nested_form(variables, block),
      Token::Close      => Err(self.unexpected("an expression", Token::Close))
    }
  }

  /// A form one level deeper than the enclosing expression.
  fn nested_form(&mut self, variables: &Variables, block: &mut Block) -> Result<(), CompileError> {
    if self.nesting >= MAX_NESTING {
      return Err(CompileError::TooDeep { offset: self.token_offset(Token::Open) });
    }
    self.nesting += 1;
    let result = self.form(variables, block);
    self.nesting -= 1;
    result
  }

  /// A bound name loads its slot, a literal loads a constant.
  fn atom(&mut self, atom: &'a str, variables: &Variables, block: &mut Block)
    -> Result<(), CompileError>
  {
    if let Some(slot) = variables.lookup(atom) {
      block.emit_load_arg(slot.idx())?;
      return Ok(());
    }

    if let Some(value) = parse_integer(atom) {
      block.emit_load_const(value)?;
      return Ok(());
    }

    match atom.chars().next() {
      Some(first) if first.is_ascii_digit() => Err(CompileError::InvalidLiteral(atom.to_string())),
      _ if RESERVED_WORDS.contains(atom)    => Err(CompileError::ReservedWord(atom.to_string())),
      _                                     => Err(CompileError::UnknownIdentifier(atom.to_string()))
    }
  }

  /// Everything after an opening parenthesis in expression position.
  fn form(&mut self, variables: &Variables, block: &mut Block) -> Result<(), CompileError> {
    let operator =
      match self.next("an operator")? {
        Token::Atom(atom) => {
          Form::from_str(atom).map_err(|_| CompileError::UnknownOperator(atom.to_string()))?
        }
        token => return Err(self.unexpected("an operator", token))
      };

    match operator {
      Form::Not   => self.unary(variables, block, Block::emit_not),
      Form::Shl1  => self.unary(variables, block, Block::emit_shl1),
      Form::Shr1  => self.unary(variables, block, Block::emit_shr1),
      Form::Shr4  => self.unary(variables, block, Block::emit_shr4),
      Form::Shr16 => self.unary(variables, block, Block::emit_shr16),
      Form::And   => self.binary(variables, block, Block::emit_and),
      Form::Or    => self.binary(variables, block, Block::emit_or),
      Form::Xor   => self.binary(variables, block, Block::emit_xor),
      Form::Plus  => self.binary(variables, block, Block::emit_plus),
      Form::If0   => self.if0(variables, block),
      Form::Fold  => self.fold(variables, block),
    }
  }

  /// "(" unop expr ")"
  fn unary(&mut self, variables: &Variables, block: &mut Block, emit: Emitter)
    -> Result<(), CompileError>
  {
    self.expression(variables, block)?;
    self.expect_close()?;
    emit(block)?;
    Ok(())
  }

  /// "(" binop expr expr ")"
  fn binary(&mut self, variables: &Variables, block: &mut Block, emit: Emitter)
    -> Result<(), CompileError>
  {
    self.expression(variables, block)?;
    self.expression(variables, block)?;
    self.expect_close()?;
    emit(block)?;
    Ok(())
  }

  /// "(" "if0" expr expr expr ")"
  fn if0(&mut self, variables: &Variables, block: &mut Block) -> Result<(), CompileError> {
    self.expression(variables, block)?;
    let then_block = self.closed_expression(variables)?;
    let else_block = self.closed_expression(variables)?;
    self.expect_close()?;
    block.conditional(&then_block, &else_block)?;
    Ok(())
  }

  /**
    "(" "fold" expr expr "(" "lambda" "(" id id ")" expr ")" ")"

    The seed is unfolded into its 8 bytes, the initial accumulator is pushed on top, and the
    body is unrolled once per byte:
    ```text
        <seed> unfold <init>
        store_arg acc   store_arg elem   <body>     ; byte 0, the least significant
        ...
        store_arg acc   store_arg elem   <body>     ; byte 7
    ```
    Each body leaves the next accumulator on top of the remaining bytes.
  */
  fn fold(&mut self, variables: &Variables, block: &mut Block) -> Result<(), CompileError> {
    self.expression(variables, block)?;
    block.emit_unfold()?;
    self.expression(variables, block)?;

    self.expect_open()?;
    self.expect_lambda()?;
    self.expect_open()?;
    let element     = self.binding()?;
    let accumulator = self.binding()?;
    self.expect_close()?;
    if element == accumulator {
      return Err(CompileError::DuplicateBinding(element.to_string()));
    }

    let (body_variables, element_slot, accumulator_slot) =
      variables.with_fold_bindings(element, accumulator)?;
    let body = self.closed_expression(&body_variables)?;
    self.expect_close()?; // lambda
    self.expect_close()?; // fold

    for _ in 0..FOLD_WIDTH {
      block.emit_store_arg(accumulator_slot.idx())?;
      block.emit_store_arg(element_slot.idx())?;
      block.append(&body)?;
    }
    Ok(())
  }

  // endregion

}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::bytecode::{disassemble, Instruction};

  #[test]
  fn identifiers() {
    assert!(is_identifier("x"));
    assert!(is_identifier("_1"));
    assert!(is_identifier("lambda2"));
    assert!(!is_identifier("1x"));
    assert!(!is_identifier("fold"));
    assert!(!is_identifier("shr16"));
    assert!(!is_identifier("("));
    assert!(!is_identifier(""));
  }

  #[test]
  fn every_form_is_reserved() {
    for name in ["not", "shl1", "shr1", "shr4", "shr16", "and", "or", "xor", "plus", "if0", "fold"].iter() {
      let form = Form::from_str(name).unwrap();
      assert_eq!(form.to_string(), *name);
      assert!(RESERVED_WORDS.contains(name));
    }
  }

  #[test]
  fn compiles_straight_to_bytecode() {
    let block = compile("(lambda (x y) (plus x (shl1 y)))").unwrap();
    let instructions: Vec<String> =
      disassemble(block.code()).iter().map(|(_, i)| i.to_string()).collect();
    assert_eq!(instructions, vec!["load_arg 0", "load_arg 1", "shl1", "plus"]);
    assert!(block.is_closed());
  }

  #[test]
  fn fold_is_unrolled_eight_times() {
    let block = compile("(lambda (x) (fold x 0 (lambda (y z) (or y z))))").unwrap();
    let instructions: Vec<Instruction> =
      disassemble(block.code()).into_iter().map(|(_, i)| i).collect();
    // load_arg 0, unfold, load_const 0, then 8 x (store, store, load, load, or)
    assert_eq!(instructions.len(), 3 + FOLD_WIDTH * 5);
    assert_eq!(instructions[3].to_string(), "store_arg 2");
    assert_eq!(instructions[4].to_string(), "store_arg 1");
    assert_eq!(block.depth(), 1);
  }

  #[test]
  fn error_offsets_point_at_the_token() {
    assert_eq!(
      compile("(lambda (x) x) y"),
      Err(CompileError::TrailingInput { offset: 15 })
    );
    assert_eq!(
      compile("(lambda (x) (not x x))"),
      Err(CompileError::UnexpectedToken { expected: "`)`", found: "x".to_string(), offset: 19 })
    );
  }

  fn nested_nots(depth: usize) -> String {
    format!("(lambda (x) {}x{})", "(not ".repeat(depth), ")".repeat(depth))
  }

  #[test]
  fn nesting_is_bounded() {
    let block = compile(&nested_nots(MAX_NESTING)).unwrap();
    assert_eq!(block.execute(&[0]), Ok(0));

    // `(lambda (x) ` is 12 bytes and every `(not ` is 5.
    assert_eq!(
      compile(&nested_nots(MAX_NESTING + 1)).err(),
      Some(CompileError::TooDeep { offset: 12 + 5 * MAX_NESTING })
    );
    assert!(matches!(
      compile(&nested_nots(20 * MAX_NESTING)),
      Err(CompileError::TooDeep { .. })
    ));
  }

  #[test]
  fn nesting_counts_every_form() {
    let mixed = |pairs: usize| {
      format!("(lambda (x) {}x{})", "(if0 x 0 (plus 1 ".repeat(pairs), "))".repeat(pairs))
    };
    assert!(compile(&mixed(MAX_NESTING / 2)).is_ok());
    assert!(matches!(
      compile(&mixed(MAX_NESTING / 2 + 1)),
      Err(CompileError::TooDeep { .. })
    ));
  }
}

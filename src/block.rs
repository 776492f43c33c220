/*!
  A `Block` is an append-only buffer of bytecode together with the abstract stack depth it
  leaves behind. Every emission is checked against the depth tracked so far, so a block that
  finishes construction cannot underflow the value stack when it runs.

  Blocks nest: the compiler builds the branches of a conditional and the body of a fold as
  blocks of their own and splices them into their parent with `append`.
*/

use std::convert::TryFrom;
use std::fmt::{Display, Formatter};

use crate::bytecode::*;
use crate::error::{EmitError, ExecuteError};
use crate::slot::Slot;
use crate::vm::Machine;

/// A `jnz` or `jmp` emitted with a placeholder offset, waiting for `Block::resolve_jump`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct JumpSite {
  opcode : Opcode,
  at     : usize
}

impl JumpSite {
  /// The offset of the first byte after the jump, where its skip distance is measured from.
  fn end(&self) -> usize {
    self.at + JUMP_SIZE
  }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Block {
  initial_depth : usize,   // Stack depth assumed on entry
  depth         : usize,   // Stack depth after the last emitted instruction
  code          : Vec<u8>
}

impl Block {

  // region Construction

  /// Creates an empty block that assumes `initial_depth` values are already on the stack.
  pub fn new(initial_depth: usize) -> Block {
    Block {
      initial_depth,
      depth : initial_depth,
      code  : Vec::new()
    }
  }

  pub fn initial_depth(&self) -> usize {
    self.initial_depth
  }

  pub fn depth(&self) -> usize {
    self.depth
  }

  pub fn code(&self) -> &[u8] {
    &self.code
  }

  pub fn len(&self) -> usize {
    self.code.len()
  }

  pub fn is_empty(&self) -> bool {
    self.code.is_empty()
  }

  /// A closed block starts on an empty stack and leaves exactly one value. Only closed blocks
  /// can be executed or used as the branches of a conditional.
  pub fn is_closed(&self) -> bool {
    self.initial_depth == 0 && self.depth == 1
  }

  /// Checks that `needed` values are on the stack before `operation` runs.
  fn require_depth(&self, operation: &'static str, needed: usize) -> Result<(), EmitError> {
    match self.depth >= needed {
      true  => Ok(()),
      false => Err(EmitError::StackUnderflow {
        operation,
        required  : needed,
        available : self.depth
      })
    }
  }

  /// Verifies the instruction's stack effect, then encodes it.
  fn emit(&mut self, instruction: Instruction) -> Result<(), EmitError> {
    let opcode = instruction.opcode();
    let (consumed, produced) = opcode.stack_effect();
    self.require_depth(opcode.into(), consumed)?;

    encode_instruction(&instruction, &mut self.code);
    self.depth = self.depth - consumed + produced;
    Ok(())
  }

  // endregion

  // region Emitters

  pub fn emit_not(&mut self) -> Result<(), EmitError> {
    self.emit(Instruction::Nullary(Opcode::Not))
  }

  pub fn emit_shl1(&mut self) -> Result<(), EmitError> {
    self.emit(Instruction::Nullary(Opcode::Shl1))
  }

  pub fn emit_shr1(&mut self) -> Result<(), EmitError> {
    self.emit(Instruction::Nullary(Opcode::Shr1))
  }

  pub fn emit_shr4(&mut self) -> Result<(), EmitError> {
    self.emit(Instruction::Nullary(Opcode::Shr4))
  }

  pub fn emit_shr16(&mut self) -> Result<(), EmitError> {
    self.emit(Instruction::Nullary(Opcode::Shr16))
  }

  pub fn emit_and(&mut self) -> Result<(), EmitError> {
    self.emit(Instruction::Nullary(Opcode::And))
  }

  pub fn emit_or(&mut self) -> Result<(), EmitError> {
    self.emit(Instruction::Nullary(Opcode::Or))
  }

  pub fn emit_xor(&mut self) -> Result<(), EmitError> {
    self.emit(Instruction::Nullary(Opcode::Xor))
  }

  pub fn emit_plus(&mut self) -> Result<(), EmitError> {
    self.emit(Instruction::Nullary(Opcode::Plus))
  }

  /// Replaces the top word with its 8 bytes, the most significant byte deepest.
  pub fn emit_unfold(&mut self) -> Result<(), EmitError> {
    self.emit(Instruction::Nullary(Opcode::Unfold))
  }

  pub fn emit_store_arg(&mut self, n: usize) -> Result<(), EmitError> {
    let slot = Slot::new(n)?;
    self.emit(Instruction::StoreArg(slot))
  }

  pub fn emit_load_arg(&mut self, n: usize) -> Result<(), EmitError> {
    let slot = Slot::new(n)?;
    self.emit(Instruction::LoadArg(slot))
  }

  /// Constants below 8 are emitted as single byte opcodes.
  pub fn emit_load_const(&mut self, c: Word) -> Result<(), EmitError> {
    self.emit(Instruction::LoadConst(c))
  }

  /**
    Emits a raw `jnz` that skips `offset` bytes past its own encoding when the popped condition
    is not zero. Nothing checks the stack depth at the target, so raw jumps stay inside the
    crate; `conditional` is the only way to branch from outside.
  */
  pub(crate) fn emit_jump_if_nonzero(&mut self, offset: usize) -> Result<(), EmitError> {
    let offset = u16::try_from(offset).map_err(|_| EmitError::JumpTooFar(offset))?;
    self.emit(Instruction::JumpIfNonZero(offset))
  }

  /// Emits a raw `jmp` that skips `offset` bytes past its own encoding.
  pub(crate) fn emit_jump(&mut self, offset: usize) -> Result<(), EmitError> {
    let offset = u16::try_from(offset).map_err(|_| EmitError::JumpTooFar(offset))?;
    self.emit(Instruction::Jump(offset))
  }

  /// Splices the code of `other` onto this block, folding in its stack depth delta.
  pub fn append(&mut self, other: &Block) -> Result<(), EmitError> {
    self.require_depth("append", other.initial_depth)?;

    self.code.extend_from_slice(&other.code);
    self.depth = self.depth - other.initial_depth + other.depth;
    Ok(())
  }

  /**
    Emits `if0`: consumes the condition on top of the stack and leaves the value of
    `then_block` if it was zero, or of `else_block` otherwise. The layout is

    ```text
        jnz +(len(then) + 3)
        <then>
        jmp +len(else)
        <else>
    ```

    Both branches are emitted inline; there is no shared tail.
  */
  pub fn conditional(&mut self, then_block: &Block, else_block: &Block)
    -> Result<(), EmitError>
  {
    then_block.require_closed("then")?;
    else_block.require_closed("else")?;
    self.require_depth("if0", 1)?;
    // Check both distances before anything is emitted so a failure leaves `self` untouched.
    for distance in [then_block.len() + JUMP_SIZE, else_block.len()].iter() {
      if u16::try_from(*distance).is_err() {
        return Err(EmitError::JumpTooFar(*distance));
      }
    }

    let skip_then = self.reserve_jump(Opcode::JumpIfNonZero)?;
    self.append(then_block)?;
    let skip_else = self.reserve_jump(Opcode::Jump)?;
    self.resolve_jump(skip_then)?;
    self.append(else_block)?;
    self.resolve_jump(skip_else)?;

    // Only one of the two branch results is ever pushed.
    self.depth -= 1;
    Ok(())
  }

  fn require_closed(&self, branch: &'static str) -> Result<(), EmitError> {
    match self.is_closed() {
      true  => Ok(()),
      false => Err(EmitError::OpenBranch {
        branch,
        initial : self.initial_depth,
        depth   : self.depth
      })
    }
  }

  /// Emits a jump whose offset is filled in later by `resolve_jump`.
  fn reserve_jump(&mut self, opcode: Opcode) -> Result<JumpSite, EmitError> {
    let at = self.code.len();
    match opcode {
      Opcode::JumpIfNonZero => self.emit_jump_if_nonzero(0)?,
      _                     => self.emit_jump(0)?,
    }
    Ok(JumpSite { opcode, at })
  }

  /// Points a reserved jump at the current end of the code.
  fn resolve_jump(&mut self, site: JumpSite) -> Result<(), EmitError> {
    let distance = self.code.len() - site.end();
    let offset   = u16::try_from(distance).map_err(|_| EmitError::JumpTooFar(distance))?;
    let resolved = match site.opcode {
      Opcode::JumpIfNonZero => Instruction::JumpIfNonZero(offset),
      _                     => Instruction::Jump(offset),
    };
    patch_instruction(&resolved, &mut self.code, site.at);
    Ok(())
  }

  // endregion

  // region Execution

  /**
    Runs the block with `inputs` loaded into the first argument slots; the remaining slots
    start at zero. The block must be closed and at most 8 inputs may be given.
  */
  pub fn execute(&self, inputs: &[Word]) -> Result<Word, ExecuteError> {
    if !self.is_closed() {
      return Err(ExecuteError::NotClosed {
        initial : self.initial_depth,
        depth   : self.depth
      });
    }
    let mut machine = Machine::new(inputs)?;
    Ok(machine.run(&self.code))
  }

  // endregion

}

impl Display for Block {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(
      f,
      "% {} bytes, stack depth {} -> {}\n{}",
      self.code.len(), self.initial_depth, self.depth, listing(&self.code)
    )
  }
}

/*!
  This module is responsible for the encoding and decoding of binary instructions.

  Every instruction starts with its opcode byte. `load_const` is followed by its value as 8
  little-endian bytes and the two jumps by their offset as 2 little-endian bytes; all other
  instructions are the opcode byte alone.
*/
use std::convert::{TryFrom, TryInto};

use super::{Instruction, Opcode, Word, LOAD_ARG, LOAD_SMALL, STORE_ARG};
use crate::slot::Slot;

/**
  Encodes the instruction onto the end of `code`. It is the caller's responsibility to only
  wrap operand-free opcodes in `Instruction::Nullary`.
*/
pub fn encode_instruction(instruction: &Instruction, code: &mut Vec<u8>) {
  code.push(instruction.opcode().code());
  match instruction {

    Instruction::LoadConst(value) if instruction.opcode() == Opcode::LoadConst => {
      code.extend_from_slice(&value.to_le_bytes());
    }

    | Instruction::JumpIfNonZero(offset)
    | Instruction::Jump(offset) => {
      code.extend_from_slice(&offset.to_le_bytes());
    }

    _ => {}

  }
}

/**
  Overwrites the encoding already present at `code[at..]` with `instruction`. This is how
  reserved jumps are resolved once their targets are known; the replacement must have the same
  size as what it replaces.
*/
pub fn patch_instruction(instruction: &Instruction, code: &mut [u8], at: usize) {
  let mut encoded: Vec<u8> = Vec::with_capacity(instruction.size());
  encode_instruction(instruction, &mut encoded);
  code[at..at + encoded.len()].copy_from_slice(&encoded);
}

/**
  Decodes the instruction starting at `code[at]`. Returns `None` if the byte is not an opcode
  or the operand runs past the end of the buffer.
*/
pub fn try_decode_instruction(code: &[u8], at: usize) -> Option<Instruction> {
  let opcode  = Opcode::try_from(*code.get(at)?).ok()?;
  let operand = code.get(at + 1..at + opcode.size())?;

  let instruction =
    match opcode {

      Opcode::LoadConst     => Instruction::LoadConst(Word::from_le_bytes(operand.try_into().ok()?)),

      Opcode::JumpIfNonZero => Instruction::JumpIfNonZero(u16::from_le_bytes(operand.try_into().ok()?)),

      Opcode::Jump          => Instruction::Jump(u16::from_le_bytes(operand.try_into().ok()?)),

      opcode => {
        if let Some(n) = STORE_ARG.iter().position(|o| *o == opcode) {
          Instruction::StoreArg(Slot::new(n).ok()?)
        } else if let Some(n) = LOAD_ARG.iter().position(|o| *o == opcode) {
          Instruction::LoadArg(Slot::new(n).ok()?)
        } else if let Some(n) = LOAD_SMALL.iter().position(|o| *o == opcode) {
          Instruction::LoadConst(n as Word)
        } else {
          Instruction::Nullary(opcode)
        }
      }

    };

  Some(instruction)
}

use std::fmt::{Display, Formatter};

use strum_macros::{Display as StrumDisplay, IntoStaticStr, EnumString};
use num_enum::{TryFromPrimitive, IntoPrimitive};

use crate::slot::{Slot, SLOT_COUNT};
use super::Word;

/**
  Opcodes of the virtual machine.

  Rust stores fieldless enum variants as consecutive bytes, so the discriminant is the encoded
  opcode byte. The slot-indexed families are contiguous runs of `SLOT_COUNT` opcodes, which
  lets the tables below map a slot or small constant straight to its opcode. Consequently, the
  order the opcodes are listed below is significant.
  Order-dependencies:
      ```
      STORE_ARG, LOAD_ARG, LOAD_SMALL
      Opcode::operand_size()
      binary::try_decode_instruction()
      ```
*/
#[derive(
StrumDisplay, IntoStaticStr, EnumString, TryFromPrimitive, IntoPrimitive,
Clone,        Copy,          Eq,         PartialEq,        Debug,         Hash
)]
#[repr(u8)]
pub enum Opcode {
  // Unary bit operations: [x] -> [f(x)]
  #[strum(to_string = "not")]        Not,
  #[strum(to_string = "shl1")]       Shl1,
  #[strum(to_string = "shr1")]       Shr1,
  #[strum(to_string = "shr4")]       Shr4,
  #[strum(to_string = "shr16")]      Shr16,

  // Binary operations: [x, y] -> [f(x, y)]
  #[strum(to_string = "and")]        And,
  #[strum(to_string = "or")]         Or,
  #[strum(to_string = "xor")]        Xor,
  #[strum(to_string = "plus")]       Plus,

  // [x] -> [b7, b6, ..., b0], most significant byte deepest
  #[strum(to_string = "unfold")]     Unfold,
  // Opcode 10

  // [x] -> [], A[n] = x
  #[strum(to_string = "store_arg0")] StoreArg0,
  #[strum(to_string = "store_arg1")] StoreArg1,
  #[strum(to_string = "store_arg2")] StoreArg2,
  #[strum(to_string = "store_arg3")] StoreArg3,
  #[strum(to_string = "store_arg4")] StoreArg4,
  #[strum(to_string = "store_arg5")] StoreArg5,
  #[strum(to_string = "store_arg6")] StoreArg6,
  #[strum(to_string = "store_arg7")] StoreArg7,

  // [] -> [A[n]]
  #[strum(to_string = "load_arg0")]  LoadArg0,
  #[strum(to_string = "load_arg1")]  LoadArg1,
  #[strum(to_string = "load_arg2")]  LoadArg2,
  #[strum(to_string = "load_arg3")]  LoadArg3,
  #[strum(to_string = "load_arg4")]  LoadArg4,
  #[strum(to_string = "load_arg5")]  LoadArg5,
  #[strum(to_string = "load_arg6")]  LoadArg6,
  #[strum(to_string = "load_arg7")]  LoadArg7,

  // [] -> [n]
  #[strum(to_string = "load_0")]     Load0,
  #[strum(to_string = "load_1")]     Load1,
  #[strum(to_string = "load_2")]     Load2,
  #[strum(to_string = "load_3")]     Load3,
  #[strum(to_string = "load_4")]     Load4,
  #[strum(to_string = "load_5")]     Load5,
  #[strum(to_string = "load_6")]     Load6,
  #[strum(to_string = "load_7")]     Load7,
  // Opcode 34

  // Opcodes with operands //
  // [] -> [c], followed by 8 little-endian bytes
  #[strum(to_string = "load_const")] LoadConst,
  // [x] -> [], followed by a 2 byte little-endian forward offset
  #[strum(to_string = "jnz")]        JumpIfNonZero,
  // [] -> [], followed by a 2 byte little-endian forward offset
  #[strum(to_string = "jmp")]        Jump,
}

pub const STORE_ARG: [Opcode; SLOT_COUNT] = [
  Opcode::StoreArg0, Opcode::StoreArg1, Opcode::StoreArg2, Opcode::StoreArg3,
  Opcode::StoreArg4, Opcode::StoreArg5, Opcode::StoreArg6, Opcode::StoreArg7,
];

pub const LOAD_ARG: [Opcode; SLOT_COUNT] = [
  Opcode::LoadArg0, Opcode::LoadArg1, Opcode::LoadArg2, Opcode::LoadArg3,
  Opcode::LoadArg4, Opcode::LoadArg5, Opcode::LoadArg6, Opcode::LoadArg7,
];

/// Constants below `LOAD_SMALL.len()` get a dedicated single byte opcode.
pub const LOAD_SMALL: [Opcode; 8] = [
  Opcode::Load0, Opcode::Load1, Opcode::Load2, Opcode::Load3,
  Opcode::Load4, Opcode::Load5, Opcode::Load6, Opcode::Load7,
];

/// Size in bytes of the little-endian offset that follows a jump opcode.
pub const JUMP_OPERAND_SIZE: usize = 2;

/// The size in bytes of an encoded jump, which jump offsets do not include.
pub const JUMP_SIZE: usize = 1 + JUMP_OPERAND_SIZE;

impl Opcode {
  pub fn code(&self) -> u8 {
    Into::<u8>::into(*self)
  }

  /// Byte size of the operand that follows the opcode byte.
  pub fn operand_size(&self) -> usize {
    match self {
      Opcode::LoadConst                     => std::mem::size_of::<Word>(),
      Opcode::JumpIfNonZero | Opcode::Jump  => JUMP_OPERAND_SIZE,
      _                                     => 0
    }
  }

  /// The full encoded size of an instruction with this opcode.
  pub fn size(&self) -> usize {
    1 + self.operand_size()
  }

  /**
    The fixed stack effect of the opcode as `(consumed, produced)`. An instruction may only be
    emitted when the tracked depth is at least `consumed`; afterwards the depth is
    `depth - consumed + produced`.
  */
  pub fn stack_effect(&self) -> (usize, usize) {
    match self {
      | Opcode::Not
      | Opcode::Shl1
      | Opcode::Shr1
      | Opcode::Shr4
      | Opcode::Shr16          => (1, 1),

      | Opcode::And
      | Opcode::Or
      | Opcode::Xor
      | Opcode::Plus           => (2, 1),

      Opcode::Unfold           => (1, 8),

      Opcode::JumpIfNonZero    => (1, 0),
      Opcode::Jump             => (0, 0),

      opcode if STORE_ARG.contains(opcode) => (1, 0),

      // Loads of arguments and constants.
      _                        => (0, 1),
    }
  }
}

/**
  Holds the unencoded components of an instruction. Operands are typed: slots are range checked
  at construction, and jump offsets are already narrowed to 16 bits.

  A `LoadConst` of a value below 8 encodes as one of the `load_N` opcodes, so decoding
  a `load_N` yields `LoadConst(N)` back.
*/
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Instruction {
  /// Any operation without an operand: the bit operations and `unfold`.
  Nullary(Opcode),
  StoreArg(Slot),
  LoadArg(Slot),
  LoadConst(Word),
  /// Pops the condition and skips `offset` bytes past the jump when it is not zero.
  JumpIfNonZero(u16),
  /// Skips `offset` bytes past the jump.
  Jump(u16),
}

impl Instruction {
  /// The opcode byte this instruction encodes to.
  pub fn opcode(&self) -> Opcode {
    match self {
      Instruction::Nullary(opcode)   => *opcode,
      Instruction::StoreArg(slot)    => STORE_ARG[slot.idx()],
      Instruction::LoadArg(slot)     => LOAD_ARG[slot.idx()],
      Instruction::LoadConst(value) if *value < LOAD_SMALL.len() as Word
                                     => LOAD_SMALL[*value as usize],
      Instruction::LoadConst(_)      => Opcode::LoadConst,
      Instruction::JumpIfNonZero(_)  => Opcode::JumpIfNonZero,
      Instruction::Jump(_)           => Opcode::Jump,
    }
  }

  pub fn size(&self) -> usize {
    self.opcode().size()
  }
}

impl Display for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {

      Instruction::Nullary(opcode) => {
        write!(f, "{}", opcode)
      }

      Instruction::StoreArg(slot) => {
        write!(f, "store_arg {}", slot.idx())
      }

      Instruction::LoadArg(slot) => {
        write!(f, "load_arg {}", slot.idx())
      }

      Instruction::LoadConst(value) => {
        write!(f, "load_const {:#x}", value)
      }

      Instruction::JumpIfNonZero(offset) => {
        write!(f, "jnz +{}", offset)
      }

      Instruction::Jump(offset) => {
        write!(f, "jmp +{}", offset)
      }

    }
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use std::convert::TryFrom;
  use std::str::FromStr;

  #[test]
  fn opcode_bytes_follow_declaration_order() {
    assert_eq!(Opcode::Not.code(), 0);
    assert_eq!(Opcode::Unfold.code(), 9);
    assert_eq!(Opcode::StoreArg0.code(), 10);
    assert_eq!(Opcode::LoadArg0.code(), 18);
    assert_eq!(Opcode::Load0.code(), 26);
    assert_eq!(Opcode::LoadConst.code(), 34);
    assert_eq!(Opcode::Jump.code(), 36);
    assert!(Opcode::try_from(37u8).is_err());
  }

  #[test]
  fn slot_families_are_contiguous() {
    for n in 0..SLOT_COUNT {
      assert_eq!(STORE_ARG[n].code() as usize, Opcode::StoreArg0.code() as usize + n);
      assert_eq!(LOAD_ARG[n].code() as usize, Opcode::LoadArg0.code() as usize + n);
      assert_eq!(LOAD_SMALL[n].code() as usize, Opcode::Load0.code() as usize + n);
    }
  }

  #[test]
  fn mnemonics_round_trip_through_strum() {
    assert_eq!(Opcode::Shr16.to_string(), "shr16");
    assert_eq!(Opcode::from_str("jnz"), Ok(Opcode::JumpIfNonZero));
    let name: &'static str = Opcode::StoreArg3.into();
    assert_eq!(name, "store_arg3");
  }

  #[test]
  fn small_constants_pick_dedicated_opcodes() {
    assert_eq!(Instruction::LoadConst(0).opcode(), Opcode::Load0);
    assert_eq!(Instruction::LoadConst(7).opcode(), Opcode::Load7);
    assert_eq!(Instruction::LoadConst(7).size(), 1);
    assert_eq!(Instruction::LoadConst(8).opcode(), Opcode::LoadConst);
    assert_eq!(Instruction::LoadConst(8).size(), 9);
    assert_eq!(Instruction::Jump(0).size(), JUMP_SIZE);
  }

  #[test]
  fn stack_effects() {
    assert_eq!(Opcode::Shr4.stack_effect(), (1, 1));
    assert_eq!(Opcode::Plus.stack_effect(), (2, 1));
    assert_eq!(Opcode::Unfold.stack_effect(), (1, 8));
    assert_eq!(Opcode::StoreArg5.stack_effect(), (1, 0));
    assert_eq!(Opcode::LoadArg5.stack_effect(), (0, 1));
    assert_eq!(Opcode::Load5.stack_effect(), (0, 1));
    assert_eq!(Opcode::LoadConst.stack_effect(), (0, 1));
    assert_eq!(Opcode::JumpIfNonZero.stack_effect(), (1, 0));
    assert_eq!(Opcode::Jump.stack_effect(), (0, 0));
  }
}

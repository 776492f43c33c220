//! The stack machine that executes a finished `Block`. All state is local to one `Machine`, so
//! a block can be run from any number of threads at once.

use std::fmt::{Display, Formatter};

use prettytable::Table;

use crate::bytecode::*;
use crate::error::ExecuteError;
use crate::slot::SLOT_COUNT;

pub struct Machine {
  stack : Vec<Word>,          // The value stack
  args  : [Word; SLOT_COUNT], // Argument slots, `A`
  ip    : usize               // Instruction pointer, a byte offset into the code
}

impl Machine {

  // region Display methods

  fn make_register_table(name: char, registers: &[Word], highlight: Option<usize>) -> Table {
    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Address", ubl->"Contents"]);

    for (i, word) in registers.iter().enumerate() {
      match Some(i) == highlight {

        true  => {
          table.add_row(
            row![r->format!("* --> {}[{}] =", name, i), format!("{:#018x}", word)]
          );
        }

        false => {
          table.add_row(
            row![r->format!("{}[{}] =", name, i), format!("{:#018x}", word)]
          );
        }

      } // end match on highlight
    } // end for
    table
  }

  // endregion

  // region Low-level utility methods

  /// Creates a machine with an empty stack and `inputs` copied into the first slots.
  pub fn new(inputs: &[Word]) -> Result<Machine, ExecuteError> {
    if inputs.len() > SLOT_COUNT {
      return Err(ExecuteError::TooManyInputs(inputs.len()));
    }
    let mut args = [0; SLOT_COUNT];
    args[..inputs.len()].copy_from_slice(inputs);

    Ok(Machine {
      stack : Vec::new(),
      args,
      ip    : 0
    })
  }

  fn pop(&mut self) -> Word {
    match self.stack.pop() {
      Some(word) => word,
      None       => unreachable!("stack underflow in a verified block at offset {}", self.ip)
    }
  }

  fn push(&mut self, word: Word) {
    self.stack.push(word);
  }

  /// Replaces the top of the stack with `f(top)`.
  fn apply_unary(&mut self, f: impl Fn(Word) -> Word) {
    let top = self.pop();
    self.push(f(top));
  }

  /// Pops `y`, then `x`, and pushes `f(x, y)`.
  fn apply_binary(&mut self, f: impl Fn(Word, Word) -> Word) {
    let y = self.pop();
    let x = self.pop();
    self.push(f(x, y));
  }

  // endregion

  // region Interpretation

  /**
    Runs `code` from offset 0 until the instruction pointer leaves the buffer and returns the
    value left on top of the stack.

    `code` must come from a closed `Block`. Buffers built any other way are outside the
    contract of this function.
  */
  pub fn run(&mut self, code: &[u8]) -> Word {
    #[cfg(feature = "trace_computation")]
    tracing::trace!("initial state\n{}", self);

    while self.ip < code.len() {
      let instruction =
        match try_decode_instruction(code, self.ip) {
          Some(instruction) => instruction,
          None              => unreachable!("invalid instruction at offset {}", self.ip)
        };
      self.step(instruction);

      #[cfg(feature = "trace_computation")]
      tracing::trace!("{}\n{}", instruction, self);
    }

    self.pop()
  }

  /// Executes one instruction and advances the instruction pointer past it and any jump.
  fn step(&mut self, instruction: Instruction) {
    let mut next = self.ip + instruction.size();

    match instruction {

      Instruction::Nullary(opcode) => {
        match opcode {
          Opcode::Not    => self.apply_unary(|x| !x),
          Opcode::Shl1   => self.apply_unary(|x| x << 1),
          Opcode::Shr1   => self.apply_unary(|x| x >> 1),
          Opcode::Shr4   => self.apply_unary(|x| x >> 4),
          Opcode::Shr16  => self.apply_unary(|x| x >> 16),
          Opcode::And    => self.apply_binary(|x, y| x & y),
          Opcode::Or     => self.apply_binary(|x, y| x | y),
          Opcode::Xor    => self.apply_binary(|x, y| x ^ y),
          Opcode::Plus   => self.apply_binary(|x, y| x.wrapping_add(y)),
          Opcode::Unfold => self.unfold(),
          opcode         => unreachable!("{} takes an operand", opcode)
        }
      }

      Instruction::StoreArg(slot) => {
        let word = self.pop();
        self.args[slot.idx()] = word;
      }

      Instruction::LoadArg(slot) => {
        self.push(self.args[slot.idx()]);
      }

      Instruction::LoadConst(value) => {
        self.push(value);
      }

      Instruction::JumpIfNonZero(offset) => {
        if self.pop() != 0 {
          next += offset as usize;
        }
      }

      Instruction::Jump(offset) => {
        next += offset as usize;
      }

    } // end match instruction

    self.ip = next;
  }

  /// Replaces the top word with its bytes, most significant first, so the low byte ends on top.
  fn unfold(&mut self) {
    let word = self.pop();
    for byte in word.to_be_bytes().iter() {
      self.push(*byte as Word);
    }
  }

  /// The current value of an argument slot.
  #[cfg(test)]
  pub fn arg(&self, slot: crate::slot::Slot) -> Word {
    self.args[slot.idx()]
  }

  // endregion

}

impl Display for Machine {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let top     = self.stack.len().checked_sub(1);
    let s_table = Machine::make_register_table('S', &self.stack, top);
    let a_table = Machine::make_register_table('A', &self.args,  None);

    let mut combined_table = table!([s_table, a_table]);

    combined_table.set_titles(row![ub->"Stack", ub->"Arguments"]);
    combined_table.set_format(*TABLE_DISPLAY_FORMAT);

    write!(f, "IP: {}\n{}", self.ip, combined_table)
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::slot::Slot;

  fn assemble(program: &[Instruction]) -> Vec<u8> {
    let mut code = vec![];
    for instruction in program {
      encode_instruction(instruction, &mut code);
    }
    code
  }

  #[test]
  fn inputs_fill_the_first_slots() {
    let machine = Machine::new(&[4, 5]).unwrap();
    let values: Vec<Word> = Slot::all().map(|slot| machine.arg(slot)).collect();
    assert_eq!(values, vec![4, 5, 0, 0, 0, 0, 0, 0]);
    assert!(Machine::new(&[0; 9]).is_err());
  }

  #[test]
  fn unfold_leaves_low_byte_on_top() {
    let code = assemble(&[
      Instruction::LoadConst(0x1122334455667788),
      Instruction::Nullary(Opcode::Unfold),
      Instruction::StoreArg(Slot::new(0).unwrap()),
      Instruction::StoreArg(Slot::new(1).unwrap()),
    ]);
    let mut machine = Machine::new(&[]).unwrap();
    // Six bytes remain; the run returns the top one.
    assert_eq!(machine.run(&code), 0x66);
    assert_eq!(machine.arg(Slot::new(0).unwrap()), 0x88);
    assert_eq!(machine.arg(Slot::new(1).unwrap()), 0x77);
  }

  #[test]
  fn binary_operations_combine_the_two_top_values() {
    let code = assemble(&[
      Instruction::LoadConst(0xf0),
      Instruction::LoadConst(0x0f),
      Instruction::Nullary(Opcode::Xor),
    ]);
    assert_eq!(Machine::new(&[]).unwrap().run(&code), 0xff);
  }

  #[test]
  fn state_renders_as_tables() {
    let machine = Machine::new(&[1]).unwrap();
    let text = machine.to_string();
    assert!(text.contains("IP: 0"));
    assert!(text.contains("A[0] ="));
  }
}

/*!

  The VM operates on 64 bit words. Instructions are variable width and byte aligned: one opcode
  byte, optionally followed by a little-endian operand. The sizes of instruction components are
  as follows:

    Opcode:        8 bits
    Constant:     64 bits (`load_const` only)
    Jump offset:  16 bits (`jnz` and `jmp` only)

  Slot indices and small constants are not operands. They are folded into the opcode itself,
  since loads of arguments and of the constants 0 through 7 dominate real programs and each
  of them then fits in a single byte.

  Instructions are built as typed `Instruction` values and only become bytes in `binary`. Jump
  offsets count the bytes skipped past the end of the jump itself and are always forward, so no
  encoded program can loop.

*/

mod binary;
mod instruction;
mod assembly;

/// The machine word, the only type of value the language has.
pub type Word = u64;

pub use binary::{encode_instruction, patch_instruction, try_decode_instruction};
pub use instruction::{Instruction, Opcode, JUMP_SIZE, LOAD_ARG, LOAD_SMALL, STORE_ARG};
pub use assembly::{disassemble, listing, TABLE_DISPLAY_FORMAT};

/*!
  The human readable textual form of bytecode is called assembly. This module decodes a byte
  buffer back into `Instruction`s and lays them out as a listing for diagnostics.
*/

use prettytable::{format as TableFormat, Table};

use super::{try_decode_instruction, Instruction};

lazy_static! {
  pub static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}

/**
  Decodes `code` into `(offset, instruction)` pairs. Decoding stops at the first byte that is
  not a valid instruction, which never happens for a buffer built through `Block`.
*/
pub fn disassemble(code: &[u8]) -> Vec<(usize, Instruction)> {
  let mut instructions = vec![];
  let mut at = 0;

  while let Some(instruction) = try_decode_instruction(code, at) {
    instructions.push((at, instruction));
    at += instruction.size();
  }

  instructions
}

/// Renders `code` as a table of offsets, raw bytes, and assembly.
pub fn listing(code: &[u8]) -> Table {
  let mut table = Table::new();

  table.set_format(*TABLE_DISPLAY_FORMAT);
  table.set_titles(row![ubr->"Offset", ubl->"Bytes", ubl->"Instruction"]);

  for (at, instruction) in disassemble(code) {
    let bytes =
      code[at..at + instruction.size()]
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect::<Vec<String>>()
        .join(" ");
    table.add_row(row![r->at, bytes, instruction]);
  }

  table
}

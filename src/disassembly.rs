/*!
  Renders a program as text, one line per instruction:

  ```text
        0:  b7 01 00 00 05 00 00 00                          r1 = 5
        8:  05 00 fe ff 00 00 00 00                          goto -2
  ```

  The address column is the instruction's byte offset in hexadecimal, the byte dump is the
  instruction as encoded in the requested format, and branch offsets are recomputed from the
  resolved target for that format.
*/

use prettytable::{format as TableFormat, Table};

use crate::bytecode::{Instruction, InstructionRef};
use crate::error::EncodeError;
use crate::format::Format;
use crate::program::Program;

/// Width of the dump column, enough for a double-width load in canonical form.
const DUMP_WIDTH: usize = 47;

lazy_static! {
  pub(crate) static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
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

/// One rendered instruction.
struct Line {
  address  : usize,
  dump     : String,
  assembly : String,
}

fn hex_dump(bytes: &[u8]) -> String {
  bytes
    .iter()
    .map(|byte| format!("{:02x}", byte))
    .collect::<Vec<String>>()
    .join(" ")
}

fn encoded(instruction: &Instruction, format: Format) -> Vec<u8> {
  match format {
    Format::Canonical  => instruction.encode_canonical().as_bytes().to_vec(),
    Format::Compressed => instruction.encode_compressed()
  }
}

fn render(program: &Program, format: Format) -> Result<Vec<Line>, EncodeError> {
  (0..program.len())
    .map(|index| -> Result<Line, EncodeError> {
      let instruction = program.relocated(InstructionRef::new(index), format)?;
      Ok(Line {
        address: instruction.address_in(format),
        dump: hex_dump(&encoded(&instruction, format)),
        assembly: instruction.disassemble(),
      })
    })
    .collect()
}

/// Renders every instruction of `program` as it appears in a `format` image.
pub fn disassemble(program: &Program, format: Format) -> Result<Vec<String>, EncodeError> {
  Ok(
    render(program, format)?
      .into_iter()
      .map(|line| format!("{:>8x}:  {:<width$}  {}", line.address, line.dump, line.assembly, width = DUMP_WIDTH))
      .collect()
  )
}

/// The same rendering as `disassemble`, as a table.
pub fn disassembly_table(program: &Program, format: Format) -> Result<Table, EncodeError> {
  let mut table = Table::new();

  table.set_format(*TABLE_DISPLAY_FORMAT);
  table.set_titles(row![ubr->"Address", ubl->"Bytes", ubl->"Assembly"]);

  for line in render(program, format)? {
    table.add_row(row![r->format!("{:x}", line.address), line.dump, line.assembly]);
  }
  Ok(table)
}

impl Program {
  pub fn disassemble(&self, format: Format) -> Result<Vec<String>, EncodeError> {
    disassemble(self, format)
  }

  /// The assembly text of one instruction as it reads in a `format` image. A branch's offset
  /// is recomputed from its target in that format's units.
  pub fn disassemble_instruction(
    &self,
    reference: InstructionRef,
    format: Format
  ) -> Result<String, EncodeError> {
    Ok(self.relocated(reference, format)?.disassemble())
  }

  /// The assembly text of one instruction as it reads in a compressed image, where branch
  /// offsets count bytes.
  pub fn disassemble_compressed(&self, reference: InstructionRef) -> Result<String, EncodeError> {
    self.disassemble_instruction(reference, Format::Compressed)
  }
}

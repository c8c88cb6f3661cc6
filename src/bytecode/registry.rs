//! The opcode registry maps opcode bytes to the `Opcode` variant that decodes them. It is
//! built once, on first use, and is read-only afterwards, so it may be shared freely between
//! threads decoding different programs.

use bimap::BiMap;
use prettytable::Table;
use strum::IntoEnumIterator;

use super::Opcode;
use crate::disassembly::TABLE_DISPLAY_FORMAT;
use crate::error::DecodeError;

lazy_static! {
  pub static ref REGISTRY: BiMap<u8, Opcode> =
    Opcode::iter().map(|opcode| (opcode.code(), opcode)).collect();
}

/// Finds the opcode for `byte`. An unregistered byte is reported as an unknown opcode at
/// offset 0; program decoders rebase it onto the record's position.
pub fn lookup(byte: u8) -> Result<Opcode, DecodeError> {
  REGISTRY
    .get_by_left(&byte)
    .copied()
    .ok_or(DecodeError::UnknownOpcode {opcode: byte, offset: 0})
}

/// Renders the registry in opcode order.
pub fn opcode_table() -> Table {
  let mut table = Table::new();

  table.set_format(*TABLE_DISPLAY_FORMAT);
  table.set_titles(row![ubr->"Opcode", ubl->"Mnemonic", ubl->"Family", ubr->"Canonical", ubr->"Compressed"]);

  let mut entries: Vec<(&u8, &Opcode)> = REGISTRY.iter().collect();
  entries.sort();

  for (code, opcode) in entries {
    table.add_row(row![
      r->format!("{:#04x}", code),
      opcode.mnemonic(),
      opcode.family(),
      r->opcode.canonical_size(),
      r->opcode.compressed_size()
    ]);
  }
  table
}

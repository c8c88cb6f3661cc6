/*!
  Encoding and decoding of compressed instructions. The layout of each family is listed on
  `Family`. Fields the family does not carry decode as zero, so only instructions whose
  dropped fields are already zero survive a trip through the compressed format unchanged.
*/

use nom::{
  combinator::map,
  number::complete::{le_i16, le_i32, le_u64, le_u8},
  sequence::tuple,
  IResult
};

use super::{binary::check_record, registry, Family, Instruction, Opcode};
use crate::error::DecodeError;

/// The fields a compressed record can carry. Absent fields are zero.
#[derive(Default)]
struct Fields {
  registers : u8,
  offset    : i16,
  immediate : i32,
  wide      : u64,
}

fn compressed_record(family: Family, input: &[u8]) -> IResult<&[u8], Fields> {
  match family {

    Family::Alu | Family::Exit => {
      map(tuple((le_u8, le_u8)), |(_, registers)| {
        Fields {registers, ..Fields::default()}
      })(input)
    }

    Family::AluImm | Family::Call => {
      map(tuple((le_u8, le_u8, le_i32)), |(_, registers, immediate)| {
        Fields {registers, immediate, ..Fields::default()}
      })(input)
    }

    Family::Memory | Family::Branch | Family::Jump => {
      map(tuple((le_u8, le_u8, le_i16)), |(_, registers, offset)| {
        Fields {registers, offset, ..Fields::default()}
      })(input)
    }

    Family::StoreImm | Family::BranchImm => {
      map(tuple((le_u8, le_u8, le_i16, le_i32)), |(_, registers, offset, immediate)| {
        Fields {registers, offset, immediate, ..Fields::default()}
      })(input)
    }

    Family::Wide => {
      map(tuple((le_u8, le_u8, le_u64)), |(_, registers, wide)| {
        Fields {registers, wide, ..Fields::default()}
      })(input)
    }

  }
}

impl Instruction {

  /// Decodes the compressed record at the start of `bytes`, whatever its opcode.
  pub fn decode_compressed(
    bytes              : &[u8],
    address            : usize,
    compressed_address : usize
  ) -> Result<Instruction, DecodeError> {
    let byte = bytes.first().copied().ok_or(
      DecodeError::TruncatedRecord {expected: 1, available: 0, offset: 0}
    )?;
    Instruction::decode_compressed_as(registry::lookup(byte)?, bytes, address, compressed_address)
  }

  /**
    Decodes the compressed record at the start of `bytes` as an `opcode` instruction located
    at the given canonical and compressed addresses. Fails with `OpcodeMismatch` if the record
    belongs to a different opcode.
  */
  pub fn decode_compressed_as(
    opcode             : Opcode,
    bytes              : &[u8],
    address            : usize,
    compressed_address : usize
  ) -> Result<Instruction, DecodeError> {
    let family = opcode.family();
    let size   = family.compressed_size();
    check_record(opcode, bytes, size)?;

    let (_, fields) = compressed_record(family, bytes).map_err(|_| {
      DecodeError::TruncatedRecord {expected: size, available: bytes.len(), offset: 0}
    })?;

    let mut instruction = Instruction {
      registers: fields.registers,
      offset: fields.offset,
      immediate: fields.immediate,
      address,
      compressed_address,
      ..Instruction::new(opcode, 0, 0, 0, 0)
    };
    if family == Family::Wide {
      instruction.set_wide_immediate(fields.wide);
    }

    Ok(instruction)
  }

  /// Encodes the instruction in its family's compressed layout.
  pub fn encode_compressed(&self) -> Vec<u8> {
    let family    = self.family();
    let mut bytes = Vec::with_capacity(family.compressed_size());

    bytes.push(self.opcode());
    bytes.push(self.registers);

    if family.has_offset() {
      bytes.extend_from_slice(&self.offset.to_le_bytes());
    }
    if family.has_immediate() {
      bytes.extend_from_slice(&self.immediate.to_le_bytes());
    }
    if family == Family::Wide {
      bytes.extend_from_slice(&self.wide_immediate().to_le_bytes());
    }

    bytes
  }
}

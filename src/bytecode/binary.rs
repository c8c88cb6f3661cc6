/*!
  This module is responsible for the encoding and decoding of canonical instructions.

  [Opcode:8][Registers:8][Offset:16][Immediate:32]   little-endian, 8 bytes

  Double-width loads append a second record, [0:8][0:8][0:16][ImmediateHigh:32].
*/

use nom::{
  number::complete::{le_i16, le_i32, le_u8},
  sequence::tuple,
  IResult
};

use super::{registry, Family, Instruction, Opcode};
use crate::error::DecodeError;

// If you change this you must also change `canonical_record` and `encode_canonical`.
pub const CANONICAL_RECORD_SIZE: usize = 8;

type Record = (u8, u8, i16, i32);

/// An `Either` type for an encoded instruction, allowing the instruction to be either one
/// record or two.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EncodedInstruction {
  Single([u8; CANONICAL_RECORD_SIZE]),
  Double([u8; 2 * CANONICAL_RECORD_SIZE])
}

impl EncodedInstruction {
  pub fn as_bytes(&self) -> &[u8] {
    match self {
      EncodedInstruction::Single(bytes) => &bytes[..],
      EncodedInstruction::Double(bytes) => &bytes[..]
    }
  }

  pub fn len(&self) -> usize {
    self.as_bytes().len()
  }
}

fn canonical_record(input: &[u8]) -> IResult<&[u8], Record> {
  tuple((le_u8, le_u8, le_i16, le_i32))(input)
}

fn write_record(bytes: &mut [u8], opcode: u8, registers: u8, offset: i16, immediate: i32) {
  bytes[0] = opcode;
  bytes[1] = registers;
  bytes[2..4].copy_from_slice(&offset.to_le_bytes());
  bytes[4..8].copy_from_slice(&immediate.to_le_bytes());
}

/// Checks that `bytes` holds a complete record for `opcode` and starts with its byte.
pub(super) fn check_record(opcode: Opcode, bytes: &[u8], size: usize) -> Result<(), DecodeError> {
  match bytes.first() {
    None => {
      return Err(DecodeError::TruncatedRecord {expected: size, available: 0, offset: 0});
    }
    Some(&found) if found != opcode.code() => {
      return Err(DecodeError::OpcodeMismatch {expected: opcode.code(), found});
    }
    _ => {}
  }

  if bytes.len() < size {
    return Err(DecodeError::TruncatedRecord {expected: size, available: bytes.len(), offset: 0});
  }
  Ok(())
}

impl Instruction {

  /// Decodes the canonical record at the start of `bytes`, whatever its opcode.
  pub fn decode_canonical(bytes: &[u8]) -> Result<Instruction, DecodeError> {
    let byte = bytes.first().copied().ok_or(
      DecodeError::TruncatedRecord {expected: CANONICAL_RECORD_SIZE, available: 0, offset: 0}
    )?;
    Instruction::decode_canonical_as(registry::lookup(byte)?, bytes)
  }

  /**
    Decodes the canonical record at the start of `bytes` as an `opcode` instruction. Fails
    with `OpcodeMismatch` if the record belongs to a different opcode. Bytes past the record
    are ignored.
  */
  pub fn decode_canonical_as(opcode: Opcode, bytes: &[u8]) -> Result<Instruction, DecodeError> {
    let size = opcode.canonical_size();
    check_record(opcode, bytes, size)?;

    let truncated = || DecodeError::TruncatedRecord {
      expected: size,
      available: bytes.len(),
      offset: 0
    };

    let (rest, (_, registers, offset, immediate)) =
      canonical_record(bytes).map_err(|_| truncated())?;

    let mut instruction = Instruction {
      registers,
      offset,
      immediate,
      ..Instruction::new(opcode, 0, 0, 0, 0)
    };

    if opcode.family() == Family::Wide {
      // Only the immediate of the second record carries information.
      let (_, (_, _, _, immediate_high)) =
        canonical_record(rest).map_err(|_| truncated())?;
      instruction.immediate_high = immediate_high;
    }

    Ok(instruction)
  }

  /// Encodes the instruction as one canonical record, or two for a double-width load.
  pub fn encode_canonical(&self) -> EncodedInstruction {
    match self.family() {

      Family::Wide => {
        let mut bytes = [0u8; 2 * CANONICAL_RECORD_SIZE];
        write_record(&mut bytes[..CANONICAL_RECORD_SIZE], self.opcode(), self.registers, self.offset, self.immediate);
        write_record(&mut bytes[CANONICAL_RECORD_SIZE..], 0, 0, 0, self.immediate_high);
        EncodedInstruction::Double(bytes)
      }

      _ => {
        let mut bytes = [0u8; CANONICAL_RECORD_SIZE];
        write_record(&mut bytes, self.opcode(), self.registers, self.offset, self.immediate);
        EncodedInstruction::Single(bytes)
      }

    }
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;
  use strum::IntoEnumIterator;

  const FIELD_SAMPLES: [(u8, u8, i16, i32); 5] = [
    (0, 0, 0, 0),
    (15, 15, i16::MAX, i32::MAX),
    (1, 10, i16::MIN, i32::MIN),
    (7, 3, -1, -1),
    (10, 0, 0x1234, 0x0BAD_F00D),
  ];

  #[test]
  fn round_trip_every_opcode(){
    for opcode in Opcode::iter() {
      for &(dst, src, offset, immediate) in FIELD_SAMPLES.iter() {
        let mut instruction = Instruction::new(opcode, dst, src, offset, immediate);
        if opcode.family() == Family::Wide {
          instruction.immediate_high = immediate.wrapping_mul(3);
        }

        let encoded = instruction.encode_canonical();
        assert_eq!(encoded.len(), opcode.canonical_size());
        assert_eq!(Instruction::decode_canonical(encoded.as_bytes()), Ok(instruction.clone()));
        assert_eq!(Instruction::decode_canonical_as(opcode, encoded.as_bytes()), Ok(instruction));
      }
    }
  }

  #[test]
  fn record_layout(){
    let instruction = Instruction::new(Opcode::StxW, 3, 4, 8, 0x0102_0304);
    assert_eq!(
      instruction.encode_canonical().as_bytes(),
      &[0x63, 0x43, 0x08, 0x00, 0x04, 0x03, 0x02, 0x01]
    );
  }

  #[test]
  fn decode_double_width_load(){
    let bytes = [
      0x18, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
      0x00, 0x00, 0x00, 0x00, 0x78, 0x56, 0x34, 0x12,
    ];
    let instruction = Instruction::decode_canonical(&bytes).unwrap();
    assert_eq!(instruction.opcode, Opcode::Lddw);
    assert_eq!(instruction.dst_register(), 1);
    assert_eq!(instruction.src_register(), 0);
    assert_eq!(instruction.wide_immediate(), 0x1234_5678_0000_0000);
    assert_eq!(instruction.encode_canonical().as_bytes(), &bytes[..]);
  }

  #[test]
  fn decode_return(){
    let instruction = Instruction::decode_canonical(&[0x95, 0, 0, 0, 0, 0, 0, 0]).unwrap();
    assert_eq!(instruction.opcode, Opcode::Exit);
    assert_eq!(instruction.disassemble(), "Return r0");
  }

  #[test]
  fn opcode_mismatch(){
    let bytes = [0x95, 0, 0, 0, 0, 0, 0, 0];
    assert_eq!(
      Instruction::decode_canonical_as(Opcode::Ja, &bytes),
      Err(DecodeError::OpcodeMismatch {expected: 0x05, found: 0x95})
    );
  }

  #[test]
  fn truncated_records(){
    assert_eq!(
      Instruction::decode_canonical(&[0x95, 0, 0]),
      Err(DecodeError::TruncatedRecord {expected: 8, available: 3, offset: 0})
    );
    assert_eq!(
      Instruction::decode_canonical(&[0x18, 0, 0, 0, 0, 0, 0, 0, 0, 0]),
      Err(DecodeError::TruncatedRecord {expected: 16, available: 10, offset: 0})
    );
    assert_eq!(
      Instruction::decode_canonical(&[]),
      Err(DecodeError::TruncatedRecord {expected: 8, available: 0, offset: 0})
    );
  }

  #[test]
  fn unknown_opcode(){
    assert_eq!(
      Instruction::decode_canonical(&[0xFF, 0, 0, 0, 0, 0, 0, 0]),
      Err(DecodeError::UnknownOpcode {opcode: 0xFF, offset: 0})
    );
  }
}

/*!
  A `Program` is an ordered, owned sequence of instructions decoded from, or destined for, a
  canonical or compressed image.

  Decoding is two passes. The first walks the image record by record, assigning each
  instruction its byte offset in both formats. The second links every branch to the
  instruction its stored offset lands on:

  ```text
  canonical:   target = address + (offset + 1) * 8
  compressed:  target = compressed_address + offset + compressed_size
  ```

  Once linked, a branch's offset is derived from its target and is recomputed in the units
  of whichever format is being written. Offsets are never copied from one format to the other.
*/

use std::ops::Index;

use tracing::{debug, trace};

use crate::bytecode::{lookup, Instruction, InstructionRef, CANONICAL_RECORD_SIZE};
use crate::error::{CodecError, DecodeError, EncodeError};
use crate::format::Format;

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Program {
  instructions: Vec<Instruction>
}

impl Program {

  // region Construction

  /**
    Builds a program from instructions constructed in memory. Both address spaces are laid
    out from scratch. Branch targets carried by the instructions are kept; use `set_target`
    to link the rest before encoding.
  */
  pub fn new(instructions: Vec<Instruction>) -> Program {
    let mut program = Program {instructions};
    program.layout();
    program
  }

  /// Decodes and links an image in the given format.
  pub fn decode(bytes: &[u8], format: Format) -> Result<Program, DecodeError> {
    let mut program = Program::decode_unlinked(bytes, format)?;
    program.link(format)?;

    debug!(
      "decoded {} instructions from a {} byte {} image",
      program.len(), bytes.len(), format
    );
    Ok(program)
  }

  /// Decodes and links a canonical image.
  pub fn decode_canonical(bytes: &[u8]) -> Result<Program, DecodeError> {
    Program::decode(bytes, Format::Canonical)
  }

  /// Decodes and links a compressed image.
  pub fn decode_compressed(bytes: &[u8]) -> Result<Program, DecodeError> {
    Program::decode(bytes, Format::Compressed)
  }

  /**
    The first decoding pass. Stops at the first unknown opcode or short record and reports
    its byte offset. Branch offsets are left exactly as they were read, in the units of
    `format`.
  */
  pub fn decode_unlinked(bytes: &[u8], format: Format) -> Result<Program, DecodeError> {
    let mut instructions       = Vec::new();
    let mut address            = 0usize;
    let mut compressed_address = 0usize;

    loop {
      let cursor = match format {
        Format::Canonical  => address,
        Format::Compressed => compressed_address
      };
      if cursor >= bytes.len() {
        break;
      }

      let record = &bytes[cursor..];
      let opcode = lookup(record[0]).map_err(|e| e.at(cursor))?;

      let mut instruction = match format {
        Format::Canonical => {
          Instruction::decode_canonical_as(opcode, record).map_err(|e| e.at(cursor))?
        }
        Format::Compressed => {
          Instruction::decode_compressed_as(opcode, record, address, compressed_address)
            .map_err(|e| e.at(cursor))?
        }
      };
      instruction.address = address;
      instruction.set_compressed_address(compressed_address);

      address            += instruction.canonical_size();
      compressed_address += instruction.compressed_size();
      instructions.push(instruction);
    }

    Ok(Program {instructions})
  }

  // endregion

  // region Accessors

  pub fn len(&self) -> usize {
    self.instructions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.instructions.is_empty()
  }

  pub fn instructions(&self) -> &[Instruction] {
    &self.instructions
  }

  pub fn into_instructions(self) -> Vec<Instruction> {
    self.instructions
  }

  pub fn iter(&self) -> impl Iterator<Item = (InstructionRef, &Instruction)> {
    self.instructions
        .iter()
        .enumerate()
        .map(|(i, instruction)| (InstructionRef(i), instruction))
  }

  pub fn get(&self, reference: InstructionRef) -> Option<&Instruction> {
    self.instructions.get(reference.0)
  }

  /// The instruction a branch is linked to.
  pub fn target_of(&self, branch: InstructionRef) -> Option<&Instruction> {
    self.get(branch)
        .and_then(Instruction::target)
        .and_then(|target| self.get(target))
  }

  /// Total size in bytes of the program encoded in `format`.
  pub fn size(&self, format: Format) -> usize {
    self.instructions.iter().map(|instruction| instruction.size(format)).sum()
  }

  /// Finds the instruction starting at byte `address` of the `format` image.
  pub fn find_by_address(&self, address: usize, format: Format) -> Option<InstructionRef> {
    self.instructions
        .binary_search_by_key(&address, |instruction| instruction.address_in(format))
        .ok()
        .map(InstructionRef)
  }

  // endregion

  // region Relocation

  /**
    Reassigns `address` and `compressed_address` to every instruction from its position in
    the sequence.
  */
  pub fn layout(&mut self) {
    let mut address            = 0;
    let mut compressed_address = 0;

    for instruction in self.instructions.iter_mut() {
      instruction.address = address;
      instruction.set_compressed_address(compressed_address);
      address            += instruction.canonical_size();
      compressed_address += instruction.compressed_size();
    }
  }

  /**
    Links `branch` to `target` and recomputes the branch's offset in canonical units.
    Fails if `branch` is not a branch, if either reference is out of range, or if the
    distance does not fit in the offset field.
  */
  pub fn set_target(
    &mut self,
    branch: InstructionRef,
    target: InstructionRef
  ) -> Result<(), EncodeError> {
    let offset = {
      let source = self.checked(branch)?;
      if !source.is_branch() {
        return Err(EncodeError::NotABranch {index: branch.0});
      }
      relative_offset(source, self.checked(target)?, Format::Canonical)?
    };

    let source    = &mut self.instructions[branch.0];
    source.target = Some(target);
    source.offset = offset;
    Ok(())
  }

  /**
    The second decoding pass: resolves every branch's stored `format` offset to the
    instruction it lands on and links the two. A branch landing between instructions, or
    outside the program, is an unresolved branch target.
  */
  pub fn link(&mut self, format: Format) -> Result<(), DecodeError> {
    for index in 0..self.instructions.len() {
      let branch = &self.instructions[index];
      if !branch.is_branch() {
        continue;
      }

      let origin  = branch.address_in(format);
      let landing = landing_address(branch, format);
      let target  = landing
        .and_then(|address| self.find_by_address(address, format))
        .ok_or(DecodeError::UnresolvedBranchTarget {offset: origin})?;

      trace!("linked branch at {} byte {} to instruction {}", format, origin, target);
      self.set_target(InstructionRef(index), target)
          .map_err(|_| DecodeError::UnresolvedBranchTarget {offset: origin})?;
    }
    Ok(())
  }

  /**
    A copy of the instruction at `reference` as it is written in `format`. A branch's offset
    is recomputed from its target; a branch without a target cannot be written.
  */
  pub fn relocated(
    &self,
    reference: InstructionRef,
    format: Format
  ) -> Result<Instruction, EncodeError> {
    let instruction = self.checked(reference)?;
    let mut relocated = instruction.clone();

    if instruction.is_branch() {
      let target = instruction
        .target
        .ok_or(EncodeError::UnresolvedBranchTarget {offset: instruction.address_in(format)})?;
      relocated.offset = relative_offset(instruction, self.checked(target)?, format)?;
    }
    Ok(relocated)
  }

  fn checked(&self, reference: InstructionRef) -> Result<&Instruction, EncodeError> {
    self.get(reference).ok_or(EncodeError::InvalidReference {index: reference.0})
  }

  // endregion

  // region Encoding

  pub fn encode(&self, format: Format) -> Result<Vec<u8>, EncodeError> {
    let mut bytes = Vec::with_capacity(self.size(format));

    for index in 0..self.instructions.len() {
      let instruction = self.relocated(InstructionRef(index), format)?;
      match format {
        Format::Canonical  => bytes.extend_from_slice(instruction.encode_canonical().as_bytes()),
        Format::Compressed => bytes.extend_from_slice(&instruction.encode_compressed())
      }
    }

    debug!("encoded {} instructions into {} {} bytes", self.len(), bytes.len(), format);
    Ok(bytes)
  }

  pub fn encode_canonical(&self) -> Result<Vec<u8>, EncodeError> {
    self.encode(Format::Canonical)
  }

  pub fn encode_compressed(&self) -> Result<Vec<u8>, EncodeError> {
    self.encode(Format::Compressed)
  }

  // endregion
}

impl Index<InstructionRef> for Program {
  type Output = Instruction;

  fn index(&self, reference: InstructionRef) -> &Instruction {
    &self.instructions[reference.0]
  }
}

pub fn decode_canonical_program(bytes: &[u8]) -> Result<Program, DecodeError> {
  Program::decode_canonical(bytes)
}

pub fn decode_compressed_program(bytes: &[u8]) -> Result<Program, DecodeError> {
  Program::decode_compressed(bytes)
}

/// Converts a canonical image into a compressed one.
pub fn compress(canonical: &[u8]) -> Result<Vec<u8>, CodecError> {
  convert(canonical, Format::Canonical)
}

/// Converts a compressed image back into a canonical one.
pub fn decompress(compressed: &[u8]) -> Result<Vec<u8>, CodecError> {
  convert(compressed, Format::Compressed)
}

/// Decodes an image in format `from` and re-encodes it in the other format.
pub fn convert(bytes: &[u8], from: Format) -> Result<Vec<u8>, CodecError> {
  let program = Program::decode(bytes, from)?;
  Ok(program.encode(from.other())?)
}

/// Where a branch's stored offset lands, read in the units of `format`.
fn landing_address(branch: &Instruction, format: Format) -> Option<usize> {
  let origin = branch.address_in(format) as i64;
  let next   = origin + branch.size(format) as i64;

  let landing = match format {
    Format::Canonical  => next + branch.offset as i64 * CANONICAL_RECORD_SIZE as i64,
    Format::Compressed => next + branch.offset as i64
  };

  match landing {
    l if l < 0 => None,
    l          => Some(l as usize)
  }
}

/// The offset field that makes `branch` land on `target` in `format`.
fn relative_offset(
  branch: &Instruction,
  target: &Instruction,
  format: Format
) -> Result<i16, EncodeError> {
  let origin = branch.address_in(format);
  let next   = (origin + branch.size(format)) as i64;
  let bytes  = target.address_in(format) as i64 - next;

  let delta = match format {
    // Canonical addresses are always multiples of the record size.
    Format::Canonical  => bytes / CANONICAL_RECORD_SIZE as i64,
    Format::Compressed => bytes
  };

  if delta < i16::MIN as i64 || delta > i16::MAX as i64 {
    return Err(EncodeError::OffsetOutOfRange {offset: origin, delta});
  }
  Ok(delta as i16)
}

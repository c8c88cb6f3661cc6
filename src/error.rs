//! Errors produced while decoding, relocating, and encoding bytecode. Every byte offset
//! reported here is relative to the start of the image being processed, in the format of
//! that image.

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
  #[error("byte {offset}: unknown opcode {opcode:#04x}")]
  UnknownOpcode {
    opcode: u8,
    offset: usize
  },

  #[error("byte {offset}: truncated record, expected {expected} bytes but only {available} remain")]
  TruncatedRecord {
    expected: usize,
    available: usize,
    offset: usize
  },

  #[error("byte {offset}: no target found for branch instruction")]
  UnresolvedBranchTarget {
    offset: usize
  },

  /// A variant's decoder was handed a record for a different opcode.
  #[error("expected opcode {expected:#04x}, found {found:#04x}")]
  OpcodeMismatch {
    expected: u8,
    found: u8
  },
}

impl DecodeError {
  /// Rebases an error reported against a single record onto the record's position in a
  /// program. Errors that already carry a program offset are returned unchanged.
  pub(crate) fn at(self, record_offset: usize) -> DecodeError {
    match self {
      DecodeError::TruncatedRecord {expected, available, offset} => {
        DecodeError::TruncatedRecord {expected, available, offset: offset + record_offset}
      }
      DecodeError::UnknownOpcode {opcode, offset} => {
        DecodeError::UnknownOpcode {opcode, offset: offset + record_offset}
      }
      other => other
    }
  }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
  #[error("byte {offset}: branch instruction has no resolved target")]
  UnresolvedBranchTarget {
    offset: usize
  },

  #[error("byte {offset}: relative offset {delta} does not fit in 16 bits")]
  OffsetOutOfRange {
    offset: usize,
    delta: i64
  },

  #[error("instruction {index} is not a branch")]
  NotABranch {
    index: usize
  },

  #[error("instruction {index} does not exist in this program")]
  InvalidReference {
    index: usize
  },
}

/// Either half of a format conversion can fail.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
  #[error(transparent)]
  Decode(#[from] DecodeError),

  #[error(transparent)]
  Encode(#[from] EncodeError),
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn messages_name_the_byte_offset(){
    let error = DecodeError::UnknownOpcode {opcode: 0xFF, offset: 24};
    assert_eq!(error.to_string(), "byte 24: unknown opcode 0xff");

    let error = DecodeError::UnresolvedBranchTarget {offset: 8};
    assert_eq!(error.to_string(), "byte 8: no target found for branch instruction");
  }

  #[test]
  fn rebase_record_errors(){
    let error = DecodeError::TruncatedRecord {expected: 8, available: 3, offset: 0};
    assert_eq!(
      error.at(16),
      DecodeError::TruncatedRecord {expected: 8, available: 3, offset: 16}
    );

    let mismatch = DecodeError::OpcodeMismatch {expected: 0x95, found: 0x05};
    assert_eq!(mismatch.at(16), mismatch);
  }
}

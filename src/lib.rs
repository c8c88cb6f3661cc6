/*!
  Canonical and compressed encodings of an eBPF-derived bytecode.

  The pipeline is

  ```text
  bytes -> [`Program::decode`] -> `Instruction`s -> [`Program::link`] -> linked `Program` ->⋯

  ⋯-> [`Program::encode`] -> bytes in either format
   └-> [`disassembly::disassemble`] -> text
  ```

  `compress` and `decompress` run the whole pipeline on an image.
*/

#[macro_use] extern crate lazy_static;
#[macro_use] extern crate prettytable;

pub mod bytecode;
pub mod disassembly;
pub mod error;
pub mod format;
pub mod program;

pub use bytecode::{Family, Instruction, InstructionRef, Opcode};
pub use error::{CodecError, DecodeError, EncodeError};
pub use format::Format;
pub use program::{
  compress, convert, decode_canonical_program, decode_compressed_program, decompress, Program
};

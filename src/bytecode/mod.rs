/*!

  The VM uses the eBPF register machine: eleven 64 bit registers, r0 through r10, of which
  r10 is the read-only frame pointer. Register indices are stored as nibbles, so the encoding
  can name 16 registers; the codec does not reject r11 through r15, because it never executes
  anything.

  Instructions exist in two wire formats.

  The canonical format is the native eBPF one. Every instruction is one little-endian 8 byte
  record,

    [Opcode:8][Src:4][Dst:4][Offset:16][Immediate:32]

  except for the double-width loads, which are two such records. The second record has a
  zero opcode, register byte, and offset, and its immediate holds the high half of the 64 bit
  immediate.

  The compressed format keeps the opcode and register byte, then only those fields the
  instruction's family actually uses. See `Family` for the layouts. Branch offsets in the
  compressed format count bytes, not 8 byte words, so they are recomputed whenever a program
  changes format.

  As with the canonical encoding itself, an enum is only used for the opcode. Every instruction
  shares one record type holding the raw fields, which keeps fields that a family ignores (an
  immediate on a register ALU operation, say) intact across a canonical round trip.

*/

mod binary;
mod compressed;
mod instruction;
mod registry;

pub use binary::{EncodedInstruction, CANONICAL_RECORD_SIZE};
pub use instruction::{Instruction, InstructionRef};
pub use registry::{lookup, opcode_table, REGISTRY};

use strum_macros::{Display as StrumDisplay, EnumIter, EnumString, IntoStaticStr};
use num_enum::IntoPrimitive;

/**
  Opcodes of the virtual machine.

  The discriminants are the opcode bytes themselves. In eBPF the low three bits select the
  instruction class, bit 3 selects a register (set) or immediate (clear) source operand, and
  the high four bits select the operation. The two `lddw` variants at 0xB8 and 0xD8 are RIOT
  extensions that load the address of the `.data` or `.rodata` section plus the immediate.
*/
#[derive(
StrumDisplay, IntoStaticStr, EnumString, EnumIter, IntoPrimitive,
Clone,        Copy,          Eq, PartialEq, Ord, PartialOrd, Debug, Hash
)]
#[strum(serialize_all = "snake_case")]
#[repr(u8)]
pub enum Opcode {
  // ALU64, immediate / register source //
  AddImm  = 0x07,
  AddReg  = 0x0f,
  SubImm  = 0x17,
  SubReg  = 0x1f,
  MulImm  = 0x27,
  MulReg  = 0x2f,
  DivImm  = 0x37,
  DivReg  = 0x3f,
  OrImm   = 0x47,
  OrReg   = 0x4f,
  AndImm  = 0x57,
  AndReg  = 0x5f,
  LshImm  = 0x67,
  LshReg  = 0x6f,
  RshImm  = 0x77,
  RshReg  = 0x7f,
  Neg     = 0x87,
  ModImm  = 0x97,
  ModReg  = 0x9f,
  XorImm  = 0xa7,
  XorReg  = 0xaf,
  MovImm  = 0xb7,
  MovReg  = 0xbf,
  ArshImm = 0xc7,
  ArshReg = 0xcf,

  // Loads into a register //
  LdxW    = 0x61,
  LdxH    = 0x69,
  LdxB    = 0x71,
  LdxDw   = 0x79,

  // Stores of an immediate //
  StW     = 0x62,
  StH     = 0x6a,
  StB     = 0x72,
  StDw    = 0x7a,

  // Stores of a register //
  StxW    = 0x63,
  StxH    = 0x6b,
  StxB    = 0x73,
  StxDw   = 0x7b,

  // Double-width loads //
  Lddw       = 0x18,
  LddwData   = 0xb8,
  LddwRodata = 0xd8,

  // Branches //
  Ja      = 0x05,
  JeqImm  = 0x15,
  JeqReg  = 0x1d,
  JgtImm  = 0x25,
  JgtReg  = 0x2d,
  JgeImm  = 0x35,
  JgeReg  = 0x3d,
  JsetImm = 0x45,
  JsetReg = 0x4d,
  JneImm  = 0x55,
  JneReg  = 0x5d,
  JsgtImm = 0x65,
  JsgtReg = 0x6d,
  JsgeImm = 0x75,
  JsgeReg = 0x7d,
  JltImm  = 0xa5,
  JltReg  = 0xad,
  JleImm  = 0xb5,
  JleReg  = 0xbd,
  JsltImm = 0xc5,
  JsltReg = 0xcd,
  JsleImm = 0xd5,
  JsleReg = 0xdd,

  // Calls //
  Call    = 0x85,
  Exit    = 0x95,
}

/**
  Instruction families. All opcodes in a family share a compressed layout:

  ```text
  Alu        [Opcode:8][Registers:8]                                  2 bytes
  AluImm     [Opcode:8][Registers:8][Immediate:32]                    6 bytes
  Memory     [Opcode:8][Registers:8][Offset:16]                       4 bytes
  StoreImm   [Opcode:8][Registers:8][Offset:16][Immediate:32]         8 bytes
  Wide       [Opcode:8][Registers:8][Immediate:64]                   10 bytes
  Branch     [Opcode:8][Registers:8][Offset:16]                       4 bytes
  BranchImm  [Opcode:8][Registers:8][Offset:16][Immediate:32]         8 bytes
  Jump       [Opcode:8][Registers:8][Offset:16]                       4 bytes
  Call       [Opcode:8][Registers:8][Immediate:32]                    6 bytes
  Exit       [Opcode:8][Registers:8]                                  2 bytes
  ```
*/
#[derive(StrumDisplay, Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub enum Family {
  Alu,
  AluImm,
  Memory,
  StoreImm,
  Wide,
  Branch,
  BranchImm,
  Jump,
  Call,
  Exit,
}

impl Family {
  /// Size in bytes of a canonical record of this family.
  pub fn canonical_size(&self) -> usize {
    match self {
      Family::Wide => 2 * CANONICAL_RECORD_SIZE,
      _            => CANONICAL_RECORD_SIZE
    }
  }

  /// Size in bytes of a compressed record of this family.
  pub fn compressed_size(&self) -> usize {
    match self {
      | Family::Alu
      | Family::Exit      => 2,
      | Family::Memory
      | Family::Branch
      | Family::Jump      => 4,
      | Family::AluImm
      | Family::Call      => 6,
      | Family::StoreImm
      | Family::BranchImm => 8,
      | Family::Wide      => 10,
    }
  }

  pub fn has_offset(&self) -> bool {
    match self {
      | Family::Memory
      | Family::StoreImm
      | Family::Branch
      | Family::BranchImm
      | Family::Jump => true,
      _              => false
    }
  }

  /// Whether the compressed record carries a 32 bit immediate. `Wide` carries a 64 bit one
  /// instead and answers `false`.
  pub fn has_immediate(&self) -> bool {
    match self {
      | Family::AluImm
      | Family::StoreImm
      | Family::BranchImm
      | Family::Call => true,
      _              => false
    }
  }

  pub fn is_branch(&self) -> bool {
    match self {
      Family::Branch | Family::BranchImm | Family::Jump => true,
      _                                                 => false
    }
  }
}

impl Opcode {
  pub fn code(&self) -> u8 {
    Into::<u8>::into(*self)
  }

  pub fn mnemonic(&self) -> &'static str {
    self.into()
  }

  pub fn family(&self) -> Family {
    use Opcode::*;

    match self {
      | AddReg | SubReg | MulReg | DivReg | OrReg | AndReg | LshReg
      | RshReg | ModReg | XorReg | MovReg | ArshReg | Neg => Family::Alu,

      | AddImm | SubImm | MulImm | DivImm | OrImm | AndImm | LshImm
      | RshImm | ModImm | XorImm | MovImm | ArshImm => Family::AluImm,

      | LdxW | LdxH | LdxB | LdxDw
      | StxW | StxH | StxB | StxDw => Family::Memory,

      StW | StH | StB | StDw => Family::StoreImm,

      Lddw | LddwData | LddwRodata => Family::Wide,

      | JeqReg | JgtReg | JgeReg | JsetReg | JneReg | JsgtReg
      | JsgeReg | JltReg | JleReg | JsltReg | JsleReg => Family::Branch,

      | JeqImm | JgtImm | JgeImm | JsetImm | JneImm | JsgtImm
      | JsgeImm | JltImm | JleImm | JsltImm | JsleImm => Family::BranchImm,

      Ja   => Family::Jump,
      Call => Family::Call,
      Exit => Family::Exit,
    }
  }

  pub fn canonical_size(&self) -> usize {
    self.family().canonical_size()
  }

  pub fn compressed_size(&self) -> usize {
    self.family().compressed_size()
  }

  pub fn is_branch(&self) -> bool {
    self.family().is_branch()
  }

  /// Record size of this opcode in the given format.
  pub fn size(&self, format: crate::Format) -> usize {
    match format {
      crate::Format::Canonical  => self.canonical_size(),
      crate::Format::Compressed => self.compressed_size()
    }
  }
}

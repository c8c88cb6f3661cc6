use std::fmt::{Display, Formatter};

use super::{Family, Opcode};
use crate::format::Format;

/// Index of an instruction within its `Program`. Branches refer to their targets through
/// these, never through ownership, so a program is free of reference cycles.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct InstructionRef(pub(crate) usize);

impl InstructionRef {
  pub fn new(index: usize) -> InstructionRef {
    InstructionRef(index)
  }

  pub fn index(&self) -> usize {
    self.0
  }
}

impl Display for InstructionRef {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/**
  Holds the raw fields of one instruction, whatever its format of origin.

  `offset` is a byte displacement for loads and stores and a relative jump in 8 byte words
  for branches. Once a branch is part of a linked `Program`, its `offset` is derived from its
  `target` and is recomputed by `Program::set_target`; program level encoding recomputes it
  again for the format being written.

  `immediate_high` is only meaningful for the double-width loads, whose 64 bit immediate is
  `immediate_high:immediate`.
*/
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Instruction {
  pub opcode         : Opcode,
  pub registers      : u8,
  pub offset         : i16,
  pub immediate      : i32,
  pub immediate_high : i32,

  pub(crate) address            : usize,
  pub(crate) compressed_address : usize,
  pub(crate) target             : Option<InstructionRef>,
}

impl Instruction {

  /// Builds an instruction from its fields. Register indices are truncated to a nibble.
  pub fn new(opcode: Opcode, dst: u8, src: u8, offset: i16, immediate: i32) -> Instruction {
    Instruction {
      opcode,
      registers: pack_registers(dst, src),
      offset,
      immediate,
      immediate_high: 0,
      address: 0,
      compressed_address: 0,
      target: None,
    }
  }

  /// Builds a double-width load of `value` into `dst`.
  pub fn wide(opcode: Opcode, dst: u8, value: u64) -> Instruction {
    let mut instruction = Instruction::new(opcode, dst, 0, 0, 0);
    instruction.set_wide_immediate(value);
    instruction
  }

  // region Field accessors

  pub fn opcode(&self) -> u8 {
    self.opcode.code()
  }

  pub fn family(&self) -> Family {
    self.opcode.family()
  }

  pub fn src_register(&self) -> u8 {
    self.registers >> 4
  }

  pub fn dst_register(&self) -> u8 {
    self.registers & 0x0F
  }

  /// The 64 bit immediate of a double-width load.
  pub fn wide_immediate(&self) -> u64 {
    ((self.immediate_high as u32 as u64) << 32) | (self.immediate as u32 as u64)
  }

  pub fn set_wide_immediate(&mut self, value: u64) {
    self.immediate      = value as u32 as i32;
    self.immediate_high = (value >> 32) as u32 as i32;
  }

  /// Byte offset of this instruction within a canonical image.
  pub fn address(&self) -> usize {
    self.address
  }

  /// Byte offset of this instruction within a compressed image.
  pub fn compressed_address(&self) -> usize {
    self.compressed_address
  }

  pub fn set_compressed_address(&mut self, compressed_address: usize) {
    self.compressed_address = compressed_address;
  }

  pub fn address_in(&self, format: Format) -> usize {
    match format {
      Format::Canonical  => self.address,
      Format::Compressed => self.compressed_address
    }
  }

  pub fn target(&self) -> Option<InstructionRef> {
    self.target
  }

  pub fn is_branch(&self) -> bool {
    self.opcode.is_branch()
  }

  pub fn canonical_size(&self) -> usize {
    self.opcode.canonical_size()
  }

  pub fn compressed_size(&self) -> usize {
    self.opcode.compressed_size()
  }

  pub fn size(&self, format: Format) -> usize {
    self.opcode.size(format)
  }

  // endregion

  // region Disassembly

  /// Renders the instruction as assembly text. Branch offsets are rendered as stored; use
  /// `Program::disassemble_instruction` to render them from the resolved target.
  pub fn disassemble(&self) -> String {
    use Opcode::*;

    let dst = self.dst_register();
    let src = self.src_register();
    let imm = self.immediate;

    match self.opcode {
      AddImm  => format!("r{} += {}", dst, imm),
      AddReg  => format!("r{} += r{}", dst, src),
      SubImm  => format!("r{} -= {}", dst, imm),
      SubReg  => format!("r{} -= r{}", dst, src),
      MulImm  => format!("r{} *= {}", dst, imm),
      MulReg  => format!("r{} *= r{}", dst, src),
      DivImm  => format!("r{} /= {}", dst, imm),
      DivReg  => format!("r{} /= r{}", dst, src),
      OrImm   => format!("r{} |= {}", dst, imm),
      OrReg   => format!("r{} |= r{}", dst, src),
      AndImm  => format!("r{} &= {}", dst, imm),
      AndReg  => format!("r{} &= r{}", dst, src),
      LshImm  => format!("r{} <<= {}", dst, imm),
      LshReg  => format!("r{} <<= r{}", dst, src),
      RshImm  => format!("r{} >>= {}", dst, imm),
      RshReg  => format!("r{} >>= r{}", dst, src),
      Neg     => format!("r{} = -r{}", dst, dst),
      ModImm  => format!("r{} %= {}", dst, imm),
      ModReg  => format!("r{} %= r{}", dst, src),
      XorImm  => format!("r{} ^= {}", dst, imm),
      XorReg  => format!("r{} ^= r{}", dst, src),
      MovImm  => format!("r{} = {}", dst, imm),
      MovReg  => format!("r{} = r{}", dst, src),
      ArshImm => format!("r{} s>>= {}", dst, imm),
      ArshReg => format!("r{} s>>= r{}", dst, src),

      LdxW | LdxH | LdxB | LdxDw => {
        format!("r{} = *({}*){}", dst, self.width(), memory_operand(src, self.offset))
      }
      StW | StH | StB | StDw => {
        format!("*({}*){} = {}", self.width(), memory_operand(dst, self.offset), imm)
      }
      StxW | StxH | StxB | StxDw => {
        format!("*({}*){} = r{}", self.width(), memory_operand(dst, self.offset), src)
      }

      Lddw       => format!("r{} = {:#x}", dst, self.wide_immediate()),
      LddwData   => format!("r{} = .data + {:#x}", dst, self.wide_immediate()),
      LddwRodata => format!("r{} = .rodata + {:#x}", dst, self.wide_immediate()),

      Ja => format!("goto {:+}", self.offset),

      JeqImm  => self.branch_on_immediate("=="),
      JgtImm  => self.branch_on_immediate(">"),
      JgeImm  => self.branch_on_immediate(">="),
      JsetImm => self.branch_on_immediate("&"),
      JneImm  => self.branch_on_immediate("!="),
      JsgtImm => self.branch_on_immediate("s>"),
      JsgeImm => self.branch_on_immediate("s>="),
      JltImm  => self.branch_on_immediate("<"),
      JleImm  => self.branch_on_immediate("<="),
      JsltImm => self.branch_on_immediate("s<"),
      JsleImm => self.branch_on_immediate("s<="),

      JeqReg  => self.branch_on_register("=="),
      JgtReg  => self.branch_on_register(">"),
      JgeReg  => self.branch_on_register(">="),
      JsetReg => self.branch_on_register("&"),
      JneReg  => self.branch_on_register("!="),
      JsgtReg => self.branch_on_register("s>"),
      JsgeReg => self.branch_on_register("s>="),
      JltReg  => self.branch_on_register("<"),
      JleReg  => self.branch_on_register("<="),
      JsltReg => self.branch_on_register("s<"),
      JsleReg => self.branch_on_register("s<="),

      Call => format!("Call {}", imm),
      Exit => "Return r0".to_string(),
    }
  }

  fn width(&self) -> &'static str {
    use Opcode::*;

    match self.opcode {
      LdxB  | StB  | StxB  => "uint8_t",
      LdxH  | StH  | StxH  => "uint16_t",
      LdxW  | StW  | StxW  => "uint32_t",
      _                    => "uint64_t",
    }
  }

  fn branch_on_immediate(&self, comparison: &str) -> String {
    format!(
      "if r{} {} {} goto {:+}",
      self.dst_register(), comparison, self.immediate, self.offset
    )
  }

  fn branch_on_register(&self, comparison: &str) -> String {
    format!(
      "if r{} {} r{} goto {:+}",
      self.dst_register(), comparison, self.src_register(), self.offset
    )
  }

  // endregion
}

impl Display for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.disassemble())
  }
}

pub(crate) fn pack_registers(dst: u8, src: u8) -> u8 {
  ((src & 0x0F) << 4) | (dst & 0x0F)
}

/// `(r3 + 8)`, `(r10 - 8)`, or `(r1)`.
fn memory_operand(base: u8, offset: i16) -> String {
  match offset {
    0                => format!("(r{})", base),
    o if o < 0       => format!("(r{} - {})", base, -(o as i32)),
    o                => format!("(r{} + {})", base, o),
  }
}

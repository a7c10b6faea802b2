/*!

  The VM has four instructions. Each instruction begins with a byte whose top three bits
  hold the opcode; the remaining five bits are the high bits of the operand. Instructions
  are either 2 or 5 bytes wide and are packed back to back with no alignment. The
  layouts are as follows:

    LoadConst, ReadMem, WriteMem (2 bytes):
      [OpCode:3][Operand:13]

    Sqrt (5 bytes):
      [OpCode:3][Operand:29][Reserved:8]

  All operands are stored big-endian. The reserved byte of `Sqrt` is always zero and is
  skipped on decode.

  `ReadMem` and `WriteMem` share the 13 bit field of `LoadConst` on the wire, but the
  assembler only ever emits offsets that fit in 11 bits. The decoder does not enforce the
  narrower range, and it must not assume it: the field width is the same for all three.

  The `Sqrt` range check admits 30 bit addresses, but only the low 29 bits fit in the
  encoding. Bit 29 is masked off when the first byte is built, exactly as every other
  producer of this format does, so compatible binaries stay compatible. An address with
  bit 29 set therefore aliases its low 29 bits; the assembler warns when it emits one.

  An `Instruction` is a plain enum with the operand stored inline. The largest payload is
  a `u32`, so the in-memory form is no wider than the widest encoded instruction, and
  instructions only live between the decoder and the executor anyway.

*/

pub mod binary;
pub mod assembly;

pub use binary::{
  encode_instruction, try_decode_instruction, disassemble, Decoded
};

use std::convert::TryFrom;
use std::fmt::{Display, Formatter};
use std::ops::RangeInclusive;

use strum_macros::{Display as StrumDisplay, EnumIter, EnumString, IntoStaticStr};
use num_enum::{TryFromPrimitive, IntoPrimitive};

/// The raw integer type of an operand once it has been range checked.
pub type Operand = u32;

/// Number of bits the opcode occupies at the top of an instruction's first byte.
pub const OPCODE_BITS: u8 = 3;
/// The shift that moves an opcode into (or out of) the top of the first byte.
pub const OPCODE_SHIFT: u8 = 8 - OPCODE_BITS;
/// Mask for the operand bits that share the first byte with the opcode.
pub const FIRST_BYTE_OPERAND_MASK: u8 = 0x1F;

/**
  Opcodes of the virtual machine.

  The discriminants are the opcode IDs found in the top three bits of an instruction and
  are fixed by the binary format. They are not consecutive, so do not reorder or renumber
  them. The snake case names are canonical for assembly sources; the CamelCase names are
  accepted as aliases.
*/
#[derive(
  StrumDisplay, IntoStaticStr, EnumString, EnumIter, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq,         PartialEq, Debug,            Hash
)]
#[repr(u8)]
pub enum Operation {
  #[strum(to_string = "sqrt", serialize = "Sqrt")]
  Sqrt      = 1,  // sqrt( address )
  #[strum(to_string = "write_mem", serialize = "WriteMem")]
  WriteMem  = 2,  // write_mem( offset )
  #[strum(to_string = "load_const", serialize = "LoadConst")]
  LoadConst = 4,  // load_const( constant )
  #[strum(to_string = "read_mem", serialize = "ReadMem")]
  ReadMem   = 7,  // read_mem( offset )
}

impl Operation {
  pub fn code(&self) -> u8 {
    Into::<u8>::into(*self)
  }

  /// Recovers the operation from the opcode bits of an instruction's first byte.
  pub fn from_first_byte(byte: u8) -> Option<Operation> {
    Operation::try_from(byte >> OPCODE_SHIFT).ok()
  }

  /// The total encoded width of the instruction in bytes, including any padding.
  pub fn width(&self) -> usize {
    match self {
      Operation::Sqrt => 5,
      Operation::LoadConst
      | Operation::ReadMem
      | Operation::WriteMem => 2,
    }
  }

  /// The operands the assembler will accept for this operation.
  pub fn operand_range(&self) -> RangeInclusive<Operand> {
    match self {
      Operation::LoadConst => 0..=8191,
      Operation::ReadMem
      | Operation::WriteMem => 0..=2047,
      Operation::Sqrt => 0..=1_073_741_823,
    }
  }

  /// Whether `value` may legally be encoded as this operation's operand.
  pub fn accepts(&self, value: i64) -> bool {
    let range = self.operand_range();
    value >= i64::from(*range.start()) && value <= i64::from(*range.end())
  }

  /// Pairs the operation with an operand. The operand is not range checked.
  pub fn with_operand(&self, operand: Operand) -> Instruction {
    match self {
      Operation::LoadConst => Instruction::LoadConst(operand),
      Operation::ReadMem   => Instruction::ReadMem(operand),
      Operation::WriteMem  => Instruction::WriteMem(operand),
      Operation::Sqrt      => Instruction::Sqrt(operand),
    }
  }
}

/// A decoded (or about to be encoded) instruction together with its operand.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Instruction {
  /// [OpCode:3][Constant:13]
  LoadConst(Operand),
  /// [OpCode:3][Offset:13], offset limited to 11 bits by the assembler
  ReadMem(Operand),
  /// [OpCode:3][Offset:13], offset limited to 11 bits by the assembler
  WriteMem(Operand),
  /// [OpCode:3][Address:29][Reserved:8]
  Sqrt(Operand),
}

impl Instruction {
  pub fn operation(&self) -> Operation {
    match self {
      Instruction::LoadConst(_) => Operation::LoadConst,
      Instruction::ReadMem(_)   => Operation::ReadMem,
      Instruction::WriteMem(_)  => Operation::WriteMem,
      Instruction::Sqrt(_)      => Operation::Sqrt,
    }
  }

  pub fn operand(&self) -> Operand {
    match *self {
      | Instruction::LoadConst(operand)
      | Instruction::ReadMem(operand)
      | Instruction::WriteMem(operand)
      | Instruction::Sqrt(operand) => operand,
    }
  }

  pub fn width(&self) -> usize {
    self.operation().width()
  }
}

impl Display for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}({})", self.operation(), self.operand())
  }
}

/**
  An assembled program: the concatenated encodings of its instructions, in order. A
  `Program` is never modified once built. It may come from the assembler or from any
  byte source; nothing about the bytes is validated until they are decoded.
*/
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Program {
  bytes: Vec<u8>,
}

impl Program {
  pub fn from_bytes(bytes: Vec<u8>) -> Program {
    Program { bytes }
  }

  pub fn as_bytes(&self) -> &[u8] {
    &self.bytes
  }

  pub fn len(&self) -> usize {
    self.bytes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.bytes.is_empty()
  }

  /// Decodes the instruction starting at byte `offset`.
  pub fn decode_at(&self, offset: usize) -> Decoded {
    try_decode_instruction(&self.bytes, offset)
  }
}

impl From<Vec<u8>> for Program {
  fn from(bytes: Vec<u8>) -> Program {
    Program::from_bytes(bytes)
  }
}

impl AsRef<[u8]> for Program {
  fn as_ref(&self) -> &[u8] {
    &self.bytes
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use std::str::FromStr;
  use strum::IntoEnumIterator;

  #[test]
  fn opcode_ids_are_fixed(){
    assert_eq!(Operation::Sqrt.code(), 1);
    assert_eq!(Operation::WriteMem.code(), 2);
    assert_eq!(Operation::LoadConst.code(), 4);
    assert_eq!(Operation::ReadMem.code(), 7);
  }

  #[test]
  fn unused_opcode_ids_are_not_operations(){
    for id in [0u8, 3, 5, 6].iter() {
      assert_eq!(Operation::from_first_byte(id << OPCODE_SHIFT), None);
    }
  }

  #[test]
  fn mnemonics_parse_in_both_spellings(){
    for operation in Operation::iter() {
      let canonical = operation.to_string();
      assert_eq!(Operation::from_str(&canonical), Ok(operation));
    }
    assert_eq!(Operation::from_str("LoadConst"), Ok(Operation::LoadConst));
    assert_eq!(Operation::from_str("ReadMem"), Ok(Operation::ReadMem));
    assert_eq!(Operation::from_str("WriteMem"), Ok(Operation::WriteMem));
    assert_eq!(Operation::from_str("Sqrt"), Ok(Operation::Sqrt));
    assert!(Operation::from_str("jump").is_err());
  }

  #[test]
  fn widths(){
    assert_eq!(Instruction::LoadConst(1).width(), 2);
    assert_eq!(Instruction::ReadMem(1).width(), 2);
    assert_eq!(Instruction::WriteMem(1).width(), 2);
    assert_eq!(Instruction::Sqrt(1).width(), 5);
  }

  #[test]
  fn display(){
    assert_eq!(Instruction::LoadConst(100).to_string(), "load_const(100)");
    assert_eq!(Instruction::Sqrt(50).to_string(), "sqrt(50)");
  }

  #[test]
  fn accepts_checks_both_ends(){
    assert!(Operation::LoadConst.accepts(0));
    assert!(!Operation::LoadConst.accepts(-1));
    assert!(Operation::WriteMem.accepts(2047));
    assert!(!Operation::WriteMem.accepts(2048));
    assert!(Operation::Sqrt.accepts(1_073_741_823));
    assert!(!Operation::Sqrt.accepts(1_073_741_824));
  }
}

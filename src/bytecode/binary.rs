/*!
  This module is responsible for the encoding and decoding of binary instructions.

*/

use super::{Instruction, Operand, Operation, FIRST_BYTE_OPERAND_MASK, OPCODE_SHIFT};

/// Value of the reserved trailing byte of a `Sqrt` instruction.
pub const SQRT_PAD_BYTE: u8 = 0x00;

/// The outcome of decoding at a given offset. Only `Instruction` means there is more to run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Decoded {
  Instruction {
    instruction: Instruction,
    width: usize
  },
  /// The offset is at (or past) the end of the buffer.
  EndOfProgram,
  /// The opcode is valid but the buffer ends before the instruction does.
  Truncated {
    operation: Operation,
    width: usize,
    available: usize
  },
  /// The top three bits of the first byte name no operation.
  UnknownOpcode(u8),
}

fn first_byte(operation: Operation, operand: Operand) -> u8 {
  (operation.code() << OPCODE_SHIFT) | ((operand >> 8) as u8 & FIRST_BYTE_OPERAND_MASK)
}

/**
  Encodes the instruction into bytecode. Operand bits that do not fit the instruction's
  field are dropped, so it is the caller's responsibility to range check the operand
  first. The assembler does.
*/
pub fn encode_instruction(instruction: Instruction) -> Vec<u8> {
  let operation = instruction.operation();
  let operand   = instruction.operand();

  match instruction {

    | Instruction::LoadConst(_)
    | Instruction::ReadMem(_)
    | Instruction::WriteMem(_) => {
      // [OpCode:3][Operand:13]
      vec![
        first_byte(operation, operand),
        (operand & 0xFF) as u8
      ]
    }

    Instruction::Sqrt(_) => {
      // [OpCode:3][Operand:29][Reserved:8]
      vec![
        (operation.code() << OPCODE_SHIFT) | ((operand >> 24) as u8 & FIRST_BYTE_OPERAND_MASK),
        ((operand >> 16) & 0xFF) as u8,
        ((operand >> 8)  & 0xFF) as u8,
        (operand         & 0xFF) as u8,
        SQRT_PAD_BYTE
      ]
    }

  }
}

/**
  Decodes the instruction beginning at `offset`. This is a pure function of its inputs.

  The width is determined by the opcode alone. The operand field is always read at full
  width; in particular `ReadMem` and `WriteMem` are read exactly like `LoadConst`.
*/
pub fn try_decode_instruction(bytes: &[u8], offset: usize) -> Decoded {
  if offset >= bytes.len() {
    return Decoded::EndOfProgram;
  }

  let first     = bytes[offset];
  let operation = match Operation::from_first_byte(first) {
    Some(operation) => operation,
    None            => return Decoded::UnknownOpcode(first >> OPCODE_SHIFT)
  };

  let width     = operation.width();
  let available = bytes.len() - offset;
  if available < width {
    return Decoded::Truncated { operation, width, available };
  }

  let high = Operand::from(first & FIRST_BYTE_OPERAND_MASK);
  let operand =
    match operation {

      | Operation::LoadConst
      | Operation::ReadMem
      | Operation::WriteMem => {
        (high << 8) | Operand::from(bytes[offset + 1])
      }

      Operation::Sqrt => {
        // The fifth byte is padding.
        (high << 24)
          | (Operand::from(bytes[offset + 1]) << 16)
          | (Operand::from(bytes[offset + 2]) << 8)
          |  Operand::from(bytes[offset + 3])
      }

    };

  Decoded::Instruction { instruction: operation.with_operand(operand), width }
}

/**
  Walks `bytes` from the start, decoding instructions until something other than an
  instruction is found. Returns each instruction with its byte offset, along with the
  result that ended the walk.
*/
pub fn disassemble(bytes: &[u8]) -> (Vec<(usize, Instruction)>, Decoded) {
  let mut offset = 0usize;
  let mut instructions = Vec::new();

  loop {
    match try_decode_instruction(bytes, offset) {
      Decoded::Instruction { instruction, width } => {
        instructions.push((offset, instruction));
        offset += width;
      }
      end => return (instructions, end)
    }
  }
}

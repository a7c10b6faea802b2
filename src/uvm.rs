//! Structures and functions for the UVM, the stack machine that executes assembled programs.

use std::fmt::{Display, Formatter};

use prettytable::Table;
use tracing::{debug, info, warn};
#[cfg(feature = "trace_computation")]
use tracing::trace;

use crate::address::Address;
use crate::bytecode::{Decoded, Instruction, Operand, Operation, Program};
use crate::error::ExecutionError;
use crate::memory::{Memory, Word};
use crate::TABLE_DISPLAY_FORMAT;

/// Why the machine stopped. Everything except `Fault` is a normal end of program.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HaltReason {
  /// The program counter reached the end of the program.
  EndOfProgram,
  /// The program ends partway through the instruction at `pc`.
  Truncated {
    pc: usize,
    operation: Operation,
    width: usize,
    available: usize
  },
  /// The byte at `pc` does not begin an instruction.
  UnknownOpcode {
    pc: usize,
    opcode: u8
  },
  /// The instruction at `pc` failed. Memory holds the results of the instructions before it.
  Fault {
    pc: usize,
    error: ExecutionError
  },
}

impl HaltReason {
  pub fn is_clean(&self) -> bool {
    !matches!(self, HaltReason::Fault { .. })
  }

  pub fn error(&self) -> Option<ExecutionError> {
    match self {
      HaltReason::Fault { error, .. } => Some(*error),
      _ => None
    }
  }
}

impl Display for HaltReason {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      HaltReason::EndOfProgram => {
        write!(f, "end of program")
      }
      HaltReason::Truncated { pc, operation, width, available } => {
        write!(f, "truncated {} at {}: needs {} bytes, {} remain", operation, pc, width, available)
      }
      HaltReason::UnknownOpcode { pc, opcode } => {
        write!(f, "unknown opcode {} at {}", opcode, pc)
      }
      HaltReason::Fault { pc, error } => {
        write!(f, "execution error at {}: {}", pc, error)
      }
    }
  }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RunState {
  Running,
  Halted(HaltReason)
}

impl Display for RunState {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      RunState::Running => write!(f, "Running"),
      RunState::Halted(reason) => write!(f, "Halted ({})", reason)
    }
  }
}

/**
  The machine. Each instance owns its program, stack and memory outright; two instances
  never share state.

  There are no jumps, so the program counter only moves forward and every program halts
  after at most `program.len() / 2` steps.
*/
#[derive(Clone, Debug)]
pub struct UVM {
  // Code memory, read only
  program : Program,
  // Data memory
  memory  : Memory,
  // Operand stack
  stack   : Vec<Word>,
  // Program counter, a byte offset into `program`
  pc      : usize,
  state   : RunState,
}

impl UVM {

  // region Display methods

  fn make_register_table<I, T>(name: char, cells: I, highlight: Option<usize>) -> Table
    where I: IntoIterator<Item = (usize, T)>,
          T: Display
  {
    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Address", ubl->"Contents"]);

    for (i, cell) in cells {
      match Some(i) == highlight {

        true  => {
          table.add_row(row![r->format!("* --> {}[{}] =", name, i), format!("{}", cell)]);
        }

        false => {
          table.add_row(row![r->format!("{}[{}] =", name, i), format!("{}", cell)]);
        }

      } // end match on highlight
    } // end for
    table
  }

  // endregion

  // region Low-level utility methods

  pub fn new(program: Program) -> UVM {
    UVM {
      program,
      memory : Memory::new(),
      stack  : Vec::new(),
      pc     : 0,
      state  : RunState::Running,
    }
  }

  pub fn program(&self) -> &Program {
    &self.program
  }

  pub fn memory(&self) -> &Memory {
    &self.memory
  }

  pub fn into_memory(self) -> Memory {
    self.memory
  }

  /// The operand stack, bottom first.
  pub fn stack(&self) -> &[Word] {
    &self.stack
  }

  pub fn pc(&self) -> usize {
    self.pc
  }

  pub fn state(&self) -> RunState {
    self.state
  }

  pub fn halt_reason(&self) -> Option<HaltReason> {
    match self.state {
      RunState::Running => None,
      RunState::Halted(reason) => Some(reason)
    }
  }

  fn pop(&mut self) -> Result<Word, ExecutionError> {
    self.stack.pop().ok_or(ExecutionError::StackUnderflow)
  }

  // endregion

  // region Fetch/decode/execute

  /// Runs until the machine halts and returns the reason. Calling it on a halted machine
  /// just returns the reason again.
  pub fn run(&mut self) -> HaltReason {
    loop {
      if let RunState::Halted(reason) = self.step() {
        match reason {
          HaltReason::Fault { .. } => {
            warn!(%reason, "halted");
          }
          _ => {
            info!(%reason, stack_depth = self.stack.len(), "halted");
          }
        }
        return reason;
      }
    }
  }

  /**
    Fetches, decodes and executes one instruction, then returns the new state.

    The program counter advances only when the instruction succeeds. On failure the
    machine halts with the failing instruction's offset; anything the instruction had
    already popped stays popped, but memory is untouched.
  */
  pub fn step(&mut self) -> RunState {
    if let RunState::Halted(_) = self.state {
      return self.state;
    }

    let pc = self.pc;
    self.state =
      match self.program.decode_at(pc) {

        Decoded::Instruction { instruction, width } => {
          match self.execute(instruction) {
            Ok(()) => {
              debug!(pc, %instruction, "executed");
              self.pc += width;
              RunState::Running
            }
            Err(error) => {
              RunState::Halted(HaltReason::Fault { pc, error })
            }
          }
        }

        Decoded::EndOfProgram => RunState::Halted(HaltReason::EndOfProgram),

        Decoded::Truncated { operation, width, available } => {
          RunState::Halted(HaltReason::Truncated { pc, operation, width, available })
        }

        Decoded::UnknownOpcode(opcode) => {
          RunState::Halted(HaltReason::UnknownOpcode { pc, opcode })
        }

      };

    #[cfg(feature = "trace_computation")] trace!("\n{}", self);

    self.state
  }

  fn execute(&mut self, instruction: Instruction) -> Result<(), ExecutionError> {
    match instruction {
      Instruction::LoadConst(constant) => self.load_const(constant),
      Instruction::ReadMem(offset)     => self.read_mem(offset),
      Instruction::WriteMem(offset)    => self.write_mem(offset),
      Instruction::Sqrt(address)       => self.sqrt(address),
    }
  }

  // endregion

  // region VM instruction methods

  /// Push the constant.
  fn load_const(&mut self, constant: Operand) -> Result<(), ExecutionError> {
    // Constants are at most 13 bits wide on the wire.
    self.stack.push(constant as Word);
    Ok(())
  }

  /// Pop a base address and push the word at base + offset.
  fn read_mem(&mut self, offset: Operand) -> Result<(), ExecutionError> {
    let base    = self.pop()?;
    let address = Address::from_base_offset(base, offset)?;
    self.stack.push(self.memory.read(address));
    Ok(())
  }

  /// Pop a value, then a base address, and store the value at base + offset.
  fn write_mem(&mut self, offset: Operand) -> Result<(), ExecutionError> {
    let value   = self.pop()?;
    let base    = self.pop()?;
    let address = Address::from_base_offset(base, offset)?;
    self.memory.write(address, value);
    Ok(())
  }

  /// Pop a value and store the floor of its square root at the literal `address`.
  fn sqrt(&mut self, address: Operand) -> Result<(), ExecutionError> {
    let value = self.pop()?;
    if value < 0 {
      return Err(ExecutionError::NegativeRadicand(value));
    }
    let root    = integer_sqrt(value);
    let address = Address::new(i64::from(address))?;
    self.memory.write(address, root);
    Ok(())
  }

  // endregion

}

/// The floor of the square root of a non-negative word.
pub fn integer_sqrt(value: Word) -> Word {
  let value = i64::from(value);
  // The float estimate is within one of the answer for every `Word`; the loops settle it.
  let mut root = (value as f64).sqrt() as i64;
  while root * root > value {
    root -= 1;
  }
  while (root + 1) * (root + 1) <= value {
    root += 1;
  }
  root as Word
}

impl Display for UVM {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let top       = self.stack.len().checked_sub(1);
    let s_table   = UVM::make_register_table('S', self.stack.iter().copied().enumerate(), top);
    let m_table   = UVM::make_register_table('M', self.memory.nonzero(), None);

    let mut combined_table = table!([s_table, m_table]);

    combined_table.set_titles(row![ub->"Stack", ub->"Memory (nonzero)"]);
    combined_table.set_format(*TABLE_DISPLAY_FORMAT);

    write!(f, "PC: {}\t{}\n{}", self.pc, self.state, combined_table)
  }
}

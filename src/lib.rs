/*!
  An assembler and interpreter for the UVM, a stack machine with four instructions:
  `load_const`, `read_mem`, `write_mem` and `sqrt`.

  The pipeline is this:
  ```text
  source -> [`loader`] -> `AssemblyRequest`s -> [`assemble`] -> `Program` ->⋯

  ⋯-> [`UVM::run`] -> `Memory` + `HaltReason` -> [`Memory::dump`] -> `DumpRecord`s
  ```
  Programs have no control flow. Each runs once, front to back, and the machine halts
  at the end of the program, on bytes it cannot decode, or on the first failing
  instruction. Memory is left as it was after the last successful instruction either way.
*/

#[macro_use] extern crate prettytable;
#[macro_use] extern crate lazy_static;

pub mod address;
pub mod assembler;
pub mod bytecode;
pub mod error;
pub mod loader;
pub mod memory;
pub mod uvm;

pub use assembler::{assemble, Assembly, AssemblyRequest, ListingEntry, UnknownMnemonicPolicy};
pub use bytecode::{Instruction, Operation, Program};
pub use error::{AssemblyError, DumpError, ExecutionError, LoadError};
pub use memory::{DumpRange, DumpRecord, Memory, Word, MEMORY_SIZE};
pub use uvm::{HaltReason, RunState, UVM};

use prettytable::format as TableFormat;

lazy_static! {
  pub(crate) static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}

/// Runs `program` on a fresh machine, returning its final memory and why it stopped.
pub fn run(program: Program) -> (Memory, HaltReason) {
  let mut machine = UVM::new(program);
  let reason = machine.run();
  (machine.into_memory(), reason)
}


#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  fn assemble_text(text: &str) -> Result<Assembly, AssemblyError> {
    let requests = bytecode::assembly::parse_assembly(text).unwrap();
    assemble(&requests, UnknownMnemonicPolicy::Reject)
  }

  #[test]
  fn source_to_dump(){
    let assembly = assemble_text("
      load_const(100)
      load_const(3)
      write_mem(0)
      load_const(16)
      sqrt(101)
    ").unwrap();

    let (memory, reason) = run(assembly.program);
    assert_eq!(reason, HaltReason::EndOfProgram);
    assert_eq!(
      memory.dump(DumpRange::new(99, 102)),
      vec![
        DumpRecord { address: 99,  value: 0 },
        DumpRecord { address: 100, value: 3 },
        DumpRecord { address: 101, value: 4 },
        DumpRecord { address: 102, value: 0 },
      ]
    );
  }

  #[test]
  fn rejected_source_has_no_program(){
    assert!(matches!(
      assemble_text("load_const(8192)"),
      Err(AssemblyError::OperandOutOfRange { index: 0, value: 8192, .. })
    ));
  }

  #[test]
  fn faults_keep_memory(){
    let assembly = assemble_text("
      load_const(5)
      load_const(6)
      write_mem(0)
      read_mem(0)
    ").unwrap();

    let (memory, reason) = run(assembly.program);
    assert_eq!(reason, HaltReason::Fault { pc: 6, error: ExecutionError::StackUnderflow });
    assert_eq!(memory.dump(DumpRange::new(5, 5)), vec![DumpRecord { address: 5, value: 6 }]);
  }
}

//! Error types for assembling, loading, running and dumping programs.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::bytecode::Operation;

/// Failures that abort an assembly. No program is produced when one of these is returned.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum AssemblyError {
  #[error("instruction {index}: {operation} operand {value} is outside {min}..={max}")]
  OperandOutOfRange {
    index: usize,
    operation: Operation,
    value: i64,
    min: u32,
    max: u32,
  },

  #[error("instruction {index}: `{mnemonic}` is not an operation")]
  UnknownMnemonic {
    index: usize,
    mnemonic: String,
  },
}

/// Failures raised by an executing instruction. Each one halts the machine.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Error)]
pub enum ExecutionError {
  #[error("stack underflow")]
  StackUnderflow,

  #[error("memory address {0} is out of range")]
  MemoryRange(i64),

  #[error("square root of negative value {0}")]
  NegativeRadicand(i32),
}

/// Failures reading a program description.
#[derive(Debug, Error)]
pub enum LoadError {
  #[error("cannot read {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("invalid YAML program: {0}")]
  Yaml(#[from] serde_yaml::Error),

  #[error("entry {index} must have exactly one mnemonic, found {keys:?}")]
  MalformedEntry {
    index: usize,
    keys: Vec<String>,
  },

  #[error("line {line}: cannot parse `{text}`")]
  Syntax {
    line: usize,
    text: String,
  },
}

/// Failures writing a memory dump.
#[derive(Debug, Error)]
pub enum DumpError {
  #[error("cannot write dump: {0}")]
  Io(#[from] io::Error),

  #[error("cannot write dump as CSV: {0}")]
  Csv(String),

  #[error("invalid address range `{0}`, expected START-END")]
  Range(String),
}

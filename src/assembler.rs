/*!
  Turns an ordered list of `(mnemonic, operand)` requests into a `Program`.

  Assembly is all or nothing. Every request is range checked against its operation before
  its bytes are emitted, and the first failure abandons the whole run. Callers therefore
  never see, and can never persist, a partial binary.

  Alongside the program the assembler produces a listing with one entry per emitted
  instruction: its position in the source, opcode, operand and encoded bytes. It is what
  the `--test` mode of the command line prints.
*/

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use prettytable::Table;
use tracing::{debug, warn};

use crate::bytecode::{encode_instruction, Operand, Operation, Program};
use crate::error::AssemblyError;
use crate::TABLE_DISPLAY_FORMAT;

/// One instruction as it appears in a program source, before it is checked.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct AssemblyRequest {
  pub mnemonic: String,
  pub operand: i64,
}

impl AssemblyRequest {
  pub fn new<S: Into<String>>(mnemonic: S, operand: i64) -> AssemblyRequest {
    AssemblyRequest { mnemonic: mnemonic.into(), operand }
  }
}

impl Display for AssemblyRequest {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}({})", self.mnemonic, self.operand)
  }
}

/// What to do with a request whose mnemonic names no operation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum UnknownMnemonicPolicy {
  /// Fail the assembly with `AssemblyError::UnknownMnemonic`.
  Reject,
  /// Emit nothing for the request and carry on. Binaries produced by older tools were
  /// assembled this way.
  Skip,
}

impl Default for UnknownMnemonicPolicy {
  fn default() -> UnknownMnemonicPolicy {
    UnknownMnemonicPolicy::Reject
  }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ListingEntry {
  /// Position of the request in the source, counting skipped requests.
  pub index: usize,
  pub operation: Operation,
  pub operand: Operand,
  /// Lowercase hex, two digits per byte, no separators.
  pub bytes: String,
}

impl Display for ListingEntry {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(
      f,
      "#{}: opcode={}, operand={}, bytes={}",
      self.index, self.operation.code(), self.operand, self.bytes
    )
  }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Assembly {
  pub program: Program,
  pub listing: Vec<ListingEntry>,
}

impl Assembly {
  pub fn listing_table(&self) -> Table {
    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"#", ubl->"Mnemonic", ubr->"Opcode", ubr->"Operand", ubl->"Bytes"]);
    for entry in &self.listing {
      table.add_row(
        row![r->entry.index, entry.operation, r->entry.operation.code(), r->entry.operand, entry.bytes]
      );
    }
    table
  }
}

fn to_hex(bytes: &[u8]) -> String {
  bytes.iter().map(|byte| format!("{:02x}", byte)).collect()
}

/// Assembles `requests` in order. See the module documentation for the guarantees.
pub fn assemble(requests: &[AssemblyRequest], policy: UnknownMnemonicPolicy)
  -> Result<Assembly, AssemblyError>
{
  let mut code: Vec<u8> = Vec::new();
  let mut listing: Vec<ListingEntry> = Vec::with_capacity(requests.len());

  for (index, request) in requests.iter().enumerate() {
    let operation =
      match Operation::from_str(&request.mnemonic) {

        Ok(operation) => operation,

        Err(_e) => {
          match policy {
            UnknownMnemonicPolicy::Reject => {
              return Err(AssemblyError::UnknownMnemonic {
                index,
                mnemonic: request.mnemonic.clone()
              });
            }
            UnknownMnemonicPolicy::Skip => {
              warn!(index, mnemonic = %request.mnemonic, "skipping unknown mnemonic");
              continue;
            }
          }
        }

      };

    if !operation.accepts(request.operand) {
      let range = operation.operand_range();
      return Err(AssemblyError::OperandOutOfRange {
        index,
        operation,
        value: request.operand,
        min: *range.start(),
        max: *range.end(),
      });
    }

    // The range check above guarantees the operand fits.
    let operand = request.operand as Operand;
    if operation == Operation::Sqrt && operand >> 29 != 0 {
      // The first byte only has room for bits 24-28; the address aliases its low 29 bits.
      warn!(index, operand, "sqrt operand bit 29 is not representable");
    }
    let bytes   = encode_instruction(operation.with_operand(operand));
    debug!(index, %operation, operand, bytes = %to_hex(&bytes), "assembled");

    listing.push(ListingEntry { index, operation, operand, bytes: to_hex(&bytes) });
    code.extend_from_slice(&bytes);
  }

  Ok(Assembly { program: Program::from_bytes(code), listing })
}

//! A checked index into data memory, with the arithmetic the instructions need to form one.

use std::convert::TryFrom;
use std::fmt::{Display, Formatter};

use crate::error::ExecutionError;
use crate::memory::{Word, MEMORY_SIZE};

// `AddressNumberType` is `usize`, as it is naturally an index into a memory store.
pub type AddressNumberType = usize;

/// An address known to lie inside data memory. The only way to get one is through a range check.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub struct Address(AddressNumberType);

impl Address {
  /// Range checks a computed address. Out of range values are reported as they were computed.
  pub fn new(address: i64) -> Result<Address, ExecutionError> {
    match usize::try_from(address) {
      Ok(idx) if idx < MEMORY_SIZE => Ok(Address(idx)),
      _ => Err(ExecutionError::MemoryRange(address))
    }
  }

  /// The effective address of a `read_mem`/`write_mem`: a base popped off the stack plus
  /// the instruction's offset.
  pub fn from_base_offset(base: Word, offset: u32) -> Result<Address, ExecutionError> {
    Address::new(i64::from(base) + i64::from(offset))
  }

  /// Converts the address to an index into memory.
  pub fn idx(&self) -> AddressNumberType {
    self.0
  }
}

impl Display for Address {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "MEM[{}]", self.0)
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn bounds(){
    assert_eq!(Address::new(0).map(|a| a.idx()), Ok(0));
    assert_eq!(Address::new(65535).map(|a| a.idx()), Ok(65535));
    assert_eq!(Address::new(65536), Err(ExecutionError::MemoryRange(65536)));
    assert_eq!(Address::new(-1), Err(ExecutionError::MemoryRange(-1)));
  }

  #[test]
  fn base_plus_offset(){
    assert_eq!(Address::from_base_offset(100, 7).map(|a| a.idx()), Ok(107));
    assert_eq!(Address::from_base_offset(-5, 2), Err(ExecutionError::MemoryRange(-3)));
    assert_eq!(
      Address::from_base_offset(65000, 2047),
      Err(ExecutionError::MemoryRange(67047))
    );
  }

  #[test]
  fn display(){
    assert_eq!(Address::new(42).map(|a| a.to_string()), Ok("MEM[42]".to_string()));
  }
}

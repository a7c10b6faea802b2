/*!
  Data memory: a fixed array of 65536 zero initialized words, plus the pieces needed to
  dump a range of it. Addresses index words, not bytes.
*/

use std::fmt::{Debug, Display, Formatter};
use std::io::Write;
use std::str::FromStr;

use nom::{
  character::complete::{char as one_char, digit1, space0},
  combinator::{all_consuming, map_res},
  sequence::{delimited, separated_pair},
  IResult
};
use prettytable::Table;

use crate::address::Address;
use crate::error::DumpError;
use crate::TABLE_DISPLAY_FORMAT;

/// A memory and stack word. Constants are at most 13 bits and square roots fit easily.
pub type Word = i32;

pub const MEMORY_SIZE: usize = 65536;

#[derive(Clone, Eq, PartialEq)]
pub struct Memory {
  words: Box<[Word]>,
}

impl Memory {
  pub fn new() -> Memory {
    Memory {
      words: vec![0; MEMORY_SIZE].into_boxed_slice()
    }
  }

  pub fn read(&self, address: Address) -> Word {
    self.words[address.idx()]
  }

  pub fn write(&mut self, address: Address, value: Word) {
    self.words[address.idx()] = value;
  }

  pub fn as_slice(&self) -> &[Word] {
    &self.words
  }

  /// Iterates over `(address, value)` for every nonzero word in ascending address order.
  pub fn nonzero(&self) -> impl Iterator<Item = (usize, Word)> + '_ {
    self.words
        .iter()
        .enumerate()
        .filter(|(_, value)| **value != 0)
        .map(|(address, value)| (address, *value))
  }

  /// One record per address in `range`, ascending. The range is clamped to memory.
  pub fn dump(&self, range: DumpRange) -> Vec<DumpRecord> {
    range
      .clamped()
      .map(|address| DumpRecord { address, value: self.words[address] })
      .collect()
  }
}

impl Default for Memory {
  fn default() -> Memory {
    Memory::new()
  }
}

// Printing all 65536 words is never useful.
impl Debug for Memory {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_map().entries(self.nonzero()).finish()
  }
}

// region Dumping

/// An inclusive range of addresses as given on the command line, e.g. `0-100`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DumpRange {
  pub start: usize,
  pub end: usize,
}

impl DumpRange {
  pub fn new(start: usize, end: usize) -> DumpRange {
    DumpRange { start, end }
  }

  /// The addresses of the range that exist in memory. Empty if `start > end`.
  pub fn clamped(&self) -> std::ops::Range<usize> {
    let end = self.end.saturating_add(1).min(MEMORY_SIZE);
    let start = self.start.min(end);
    start..end
  }
}

impl Default for DumpRange {
  fn default() -> DumpRange {
    DumpRange::new(0, 255)
  }
}

fn number_p(input: &str) -> IResult<&str, usize> {
  map_res(digit1, |digits: &str| digits.parse::<usize>())(input)
}

fn dump_range_p(text: &str) -> IResult<&str, (usize, usize)> {
  all_consuming(
    delimited(
      space0,
      separated_pair(number_p, delimited(space0, one_char('-'), space0), number_p),
      space0
    )
  )(text)
}

impl FromStr for DumpRange {
  type Err = DumpError;

  fn from_str(text: &str) -> Result<DumpRange, DumpError> {
    match dump_range_p(text) {
      Ok((_rest, (start, end))) => Ok(DumpRange::new(start, end)),
      Err(_e) => Err(DumpError::Range(text.to_string()))
    }
  }
}

impl Display for DumpRange {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}-{}", self.start, self.end)
  }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DumpRecord {
  pub address: usize,
  pub value: Word,
}

/// Formats dump records as a two column table for the terminal.
pub fn dump_table(records: &[DumpRecord]) -> Table {
  let mut table = Table::new();

  table.set_format(*TABLE_DISPLAY_FORMAT);
  table.set_titles(row![ubr->"Address", ubl->"Value"]);
  for record in records {
    table.add_row(row![r->record.address, record.value]);
  }
  table
}

/// Writes dump records as CSV with an `address,value` header row.
pub fn write_csv<W: Write>(records: &[DumpRecord], writer: W) -> Result<(), DumpError> {
  let mut table = Table::new();

  // The header is an ordinary row so it is written regardless of how titles are treated.
  table.add_row(row!["address", "value"]);
  for record in records {
    table.add_row(row![record.address, record.value]);
  }

  let mut csv_writer = table.to_csv(writer).map_err(|e| DumpError::Csv(e.to_string()))?;
  csv_writer.flush()?;
  Ok(())
}

// endregion


#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn zero_initialized(){
    let memory = Memory::new();
    assert_eq!(memory.as_slice().len(), MEMORY_SIZE);
    assert_eq!(memory.nonzero().count(), 0);
  }

  #[test]
  fn read_back_what_was_written(){
    let mut memory = Memory::new();
    let address = Address::new(65535).unwrap();
    memory.write(address, 12);
    assert_eq!(memory.read(address), 12);
    assert_eq!(memory.nonzero().collect::<Vec<_>>(), vec![(65535, 12)]);
  }

  #[test]
  fn parse_ranges(){
    assert_eq!("0-100".parse::<DumpRange>().unwrap(), DumpRange::new(0, 100));
    assert_eq!(" 5 - 9 ".parse::<DumpRange>().unwrap(), DumpRange::new(5, 9));
    assert!("5".parse::<DumpRange>().is_err());
    assert!("-5-9".parse::<DumpRange>().is_err());
    assert!("1-2-3".parse::<DumpRange>().is_err());
  }

  #[test]
  fn dump_is_inclusive_ascending_and_clamped(){
    let mut memory = Memory::new();
    memory.write(Address::new(100).unwrap(), 3);
    memory.write(Address::new(65535).unwrap(), 7);

    assert_eq!(
      memory.dump(DumpRange::new(99, 101)),
      vec![
        DumpRecord { address: 99,  value: 0 },
        DumpRecord { address: 100, value: 3 },
        DumpRecord { address: 101, value: 0 },
      ]
    );

    let tail = memory.dump(DumpRange::new(65534, 70000));
    assert_eq!(tail.len(), 2);
    assert_eq!(tail[1], DumpRecord { address: 65535, value: 7 });

    assert!(memory.dump(DumpRange::new(70000, 80000)).is_empty());
    assert!(memory.dump(DumpRange::new(10, 5)).is_empty());
    assert_eq!(memory.dump(DumpRange::new(0, usize::MAX)).len(), MEMORY_SIZE);
  }

  #[test]
  fn csv_has_header_and_rows(){
    let records = vec![
      DumpRecord { address: 0, value: 0 },
      DumpRecord { address: 1, value: 42 },
    ];
    let mut out = Vec::new();
    write_csv(&records, &mut out).unwrap();

    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().map(|line| line.trim_end()).collect();
    assert_eq!(lines, vec!["address,value", "0,0", "1,42"]);
  }

  #[test]
  fn table_has_one_row_per_record(){
    let records = vec![DumpRecord { address: 3, value: 9 }];
    let table = dump_table(&records);
    assert_eq!(table.len(), 1);
  }
}

/*!
  The human readable textual form of a program is called assembly. One instruction per
  line, written either `load_const(100)`, `load_const 100` or `load_const: 100`. Text after
  a `#` is a comment, and blank lines are ignored.

  This module only splits the text into requests. Whether a mnemonic names an operation,
  and whether its operand is in range, is decided by the assembler.
*/

use nom::{
  branch::alt,
  bytes::complete::take_while1,
  character::complete::{char as one_char, digit1, space0, space1},
  combinator::{all_consuming, map_res, opt, recognize},
  sequence::{delimited, pair, preceded, tuple},
  IResult
};

use crate::assembler::AssemblyRequest;
use crate::error::LoadError;

const COMMENT_CHAR: char = '#';

fn mnemonic_p(input: &str) -> IResult<&str, &str> {
  take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(input)
}

fn value_p(input: &str) -> IResult<&str, i64> {
  map_res(
    recognize(pair(opt(one_char('-')), digit1)),
    |text: &str| text.parse::<i64>()
  )(input)
}

fn operand_p(input: &str) -> IResult<&str, i64> {
  alt((
    // mnemonic(value)
    delimited(
      pair(space0, one_char('(')),
      delimited(space0, value_p, space0),
      one_char(')')
    ),
    // mnemonic: value
    preceded(tuple((space0, one_char(':'), space0)), value_p),
    // mnemonic value
    preceded(space1, value_p),
  ))(input)
}

fn instruction_p(input: &str) -> IResult<&str, (&str, i64)> {
  all_consuming(delimited(space0, pair(mnemonic_p, operand_p), space0))(input)
}

/// Parses assembly text into requests, in source order. Line numbers in errors count from 1.
pub fn parse_assembly(text: &str) -> Result<Vec<AssemblyRequest>, LoadError> {
  let mut requests = Vec::new();

  for (line_idx, line) in text.lines().enumerate() {
    let code = match line.find(COMMENT_CHAR) {
      Some(position) => &line[..position],
      None           => line
    };
    if code.trim().is_empty() {
      continue;
    }

    match instruction_p(code) {
      Ok((_rest, (mnemonic, operand))) => {
        requests.push(AssemblyRequest::new(mnemonic, operand));
      }
      Err(_e) => {
        return Err(LoadError::Syntax { line: line_idx + 1, text: line.trim().to_string() });
      }
    }
  }

  Ok(requests)
}

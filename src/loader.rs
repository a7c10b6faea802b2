/*!
  Reading program sources and binaries from disk.

  A YAML source is a sequence of single-key maps from mnemonic to operand:

  ```yaml
  - load_const: 100
  - load_const: 3
  - write_mem: 0
  ```

  Any file without a `.yaml` or `.yml` extension is read as textual assembly (see
  `bytecode::assembly`).
*/

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::assembler::AssemblyRequest;
use crate::bytecode::assembly::parse_assembly;
use crate::bytecode::Program;
use crate::error::LoadError;

type YamlEntry = BTreeMap<String, i64>;

fn read_to_string(path: &Path) -> Result<String, LoadError> {
  fs::read_to_string(path).map_err(|source| LoadError::Io { path: path.to_path_buf(), source })
}

fn is_yaml(path: &Path) -> bool {
  match path.extension().and_then(|ext| ext.to_str()) {
    Some(ext) => ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"),
    None      => false
  }
}

/// Parses a YAML program source. Each entry must have exactly one key.
pub fn parse_yaml(text: &str) -> Result<Vec<AssemblyRequest>, LoadError> {
  if text.trim().is_empty() {
    return Ok(Vec::new());
  }

  let entries: Option<Vec<YamlEntry>> = serde_yaml::from_str(text)?;
  let entries = entries.unwrap_or_default();

  entries
    .into_iter()
    .enumerate()
    .map(|(index, entry)| {
      if entry.len() != 1 {
        return Err(LoadError::MalformedEntry { index, keys: entry.into_iter().map(|(k, _)| k).collect() });
      }
      match entry.into_iter().next() {
        Some((mnemonic, operand)) => Ok(AssemblyRequest::new(mnemonic, operand)),
        None => Err(LoadError::MalformedEntry { index, keys: Vec::new() })
      }
    })
    .collect()
}

/// Loads a program source from `path`, choosing the format by extension.
pub fn load_requests(path: &Path) -> Result<Vec<AssemblyRequest>, LoadError> {
  let text = read_to_string(path)?;
  let requests =
    match is_yaml(path) {
      true  => parse_yaml(&text)?,
      false => parse_assembly(&text)?
    };
  debug!(path = %path.display(), count = requests.len(), "loaded program source");
  Ok(requests)
}

/// Reads an assembled binary. No validation happens here; bad bytes halt the machine.
pub fn load_program(path: &Path) -> Result<Program, LoadError> {
  let bytes = fs::read(path).map_err(|source| LoadError::Io { path: path.to_path_buf(), source })?;
  debug!(path = %path.display(), bytes = bytes.len(), "loaded program");
  Ok(Program::from_bytes(bytes))
}


#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;
  use std::io::Write;

  #[test]
  fn yaml_keeps_source_order(){
    let text = "- load_const: 100\n- load_const: 3\n- write_mem: 0\n- jump: 1\n";
    assert_eq!(
      parse_yaml(text).unwrap(),
      vec![
        AssemblyRequest::new("load_const", 100),
        AssemblyRequest::new("load_const", 3),
        AssemblyRequest::new("write_mem", 0),
        AssemblyRequest::new("jump", 1),
      ]
    );
  }

  #[test]
  fn yaml_entries_need_exactly_one_key(){
    match parse_yaml("- load_const: 1\n- {load_const: 1, sqrt: 2}\n") {
      Err(LoadError::MalformedEntry { index, keys }) => {
        assert_eq!(index, 1);
        assert_eq!(keys, vec!["load_const".to_string(), "sqrt".to_string()]);
      }
      other => panic!("expected a malformed entry, got {:?}", other)
    }
    assert!(matches!(parse_yaml("- {}\n"), Err(LoadError::MalformedEntry { index: 0, .. })));
  }

  #[test]
  fn yaml_operands_must_be_integers(){
    assert!(matches!(parse_yaml("- load_const: ten\n"), Err(LoadError::Yaml(_))));
    assert!(matches!(parse_yaml("load_const: 1\n"), Err(LoadError::Yaml(_))));
  }

  #[test]
  fn empty_yaml_is_an_empty_program(){
    assert_eq!(parse_yaml("").unwrap(), vec![]);
    assert_eq!(parse_yaml("~\n").unwrap(), vec![]);
  }

  #[test]
  fn format_follows_extension(){
    let dir = tempfile::tempdir().unwrap();

    let yaml_path = dir.path().join("program.yml");
    fs::write(&yaml_path, "- sqrt: 50\n").unwrap();
    assert_eq!(load_requests(&yaml_path).unwrap(), vec![AssemblyRequest::new("sqrt", 50)]);

    let asm_path = dir.path().join("program.asm");
    fs::write(&asm_path, "sqrt(50)\n").unwrap();
    assert_eq!(load_requests(&asm_path).unwrap(), vec![AssemblyRequest::new("sqrt", 50)]);
  }

  #[test]
  fn binaries_are_read_verbatim(){
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&[0x80, 0x10, 0x20]).unwrap();
    let program = load_program(file.path()).unwrap();
    assert_eq!(program.as_bytes(), &[0x80, 0x10, 0x20][..]);
  }

  #[test]
  fn missing_files_are_io_errors(){
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.yaml");
    assert!(matches!(load_requests(&missing), Err(LoadError::Io { .. })));
    assert!(matches!(load_program(&missing), Err(LoadError::Io { .. })));
  }
}

//! Command line front end: assemble program sources, run binaries, dump memory.

#[macro_use] extern crate prettytable;

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use prettytable::Table;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use uvm::bytecode::{disassemble, Decoded};
use uvm::loader::{load_program, load_requests};
use uvm::memory::{dump_table, write_csv};
use uvm::{assemble, DumpRange, UnknownMnemonicPolicy, UVM};

#[derive(Parser, Debug)]
#[command(name = "uvm")]
#[command(about = "Assembler and interpreter for the UVM stack machine")]
struct Cli {
  /// Log every assembled and executed instruction
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Assemble a YAML or text program into a binary
  Assemble {
    /// Program source (.yaml/.yml, otherwise textual assembly)
    #[arg(long)]
    input: PathBuf,

    /// Where to write the binary
    #[arg(long)]
    output: PathBuf,

    /// Print the assembled listing
    #[arg(long)]
    test: bool,

    /// Drop unknown mnemonics instead of failing
    #[arg(long)]
    skip_unknown: bool,
  },

  /// Run a binary and dump a range of memory
  Run {
    /// Assembled binary
    #[arg(long)]
    input: PathBuf,

    /// CSV file for the memory dump
    #[arg(long)]
    dump: Option<PathBuf>,

    /// Inclusive address range to dump, e.g. 0-100
    #[arg(long, default_value_t = DumpRange::default())]
    range: DumpRange,

    /// Print the dumped range as a table
    #[arg(long)]
    print: bool,
  },

  /// List the instructions in a binary
  Disasm {
    /// Assembled binary
    #[arg(long)]
    input: PathBuf,
  },
}

fn init_logging(verbose: bool) {
  let default = if verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
  tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn assemble_file(input: &Path, output: &Path, test: bool, skip_unknown: bool) -> Result<(), String> {
  let policy = match skip_unknown {
    true  => UnknownMnemonicPolicy::Skip,
    false => UnknownMnemonicPolicy::Reject
  };

  let requests = load_requests(input).map_err(|e| e.to_string())?;
  // Nothing is written unless every instruction assembles.
  let assembly = assemble(&requests, policy).map_err(|e| e.to_string())?;

  fs::write(output, assembly.program.as_bytes())
    .map_err(|e| format!("cannot write {}: {}", output.display(), e))?;

  if test {
    println!("{}", assembly.listing_table());
  }
  info!(
    output = %output.display(),
    instructions = assembly.listing.len(),
    bytes = assembly.program.len(),
    "assembled"
  );
  Ok(())
}

fn run_file(input: &Path, dump: Option<&Path>, range: DumpRange, print: bool) -> Result<(), String> {
  let program = load_program(input).map_err(|e| e.to_string())?;
  info!(input = %input.display(), bytes = program.len(), "loaded");

  let mut machine = UVM::new(program);
  let reason = machine.run();

  // The dump is written even after a fault; it shows memory as the fault left it.
  let records = machine.memory().dump(range);
  if let Some(path) = dump {
    let file = File::create(path).map_err(|e| format!("cannot create {}: {}", path.display(), e))?;
    write_csv(&records, file).map_err(|e| e.to_string())?;
    info!(dump = %path.display(), %range, "memory dumped");
  }
  if print {
    println!("{}", dump_table(&records));
  }

  match reason.error() {
    Some(_) => Err(reason.to_string()),
    None    => Ok(())
  }
}

fn disasm_file(input: &Path) -> Result<(), String> {
  let program = load_program(input).map_err(|e| e.to_string())?;
  let (instructions, end) = disassemble(program.as_bytes());

  let mut table = Table::new();
  table.set_titles(row!["Offset", "Bytes", "Instruction"]);
  for (offset, instruction) in instructions {
    let bytes: Vec<String> =
      program.as_bytes()[offset..offset + instruction.width()]
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect();
    table.add_row(row![r->offset, bytes.join(" "), instruction]);
  }
  table.printstd();

  match end {
    Decoded::EndOfProgram => {}
    other => println!("stopped: {:?}", other)
  }
  Ok(())
}

fn main() {
  let cli = Cli::parse();
  init_logging(cli.verbose);

  let result =
    match cli.command {
      Command::Assemble { input, output, test, skip_unknown } => {
        assemble_file(&input, &output, test, skip_unknown)
      }
      Command::Run { input, dump, range, print } => {
        run_file(&input, dump.as_deref(), range, print)
      }
      Command::Disasm { input } => disasm_file(&input),
    };

  if let Err(message) = result {
    error!("{}", message);
    process::exit(1);
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;
  use tempfile::TempDir;

  fn write_source(dir: &TempDir, name: &str, text: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, text).unwrap();
    path
  }

  fn csv_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path).unwrap().lines().map(String::from).collect()
  }

  #[test]
  fn failed_assembly_writes_no_binary(){
    let dir    = TempDir::new().unwrap();
    let input  = write_source(&dir, "bad.yaml", "- load_const: 1\n- load_const: 8192\n");
    let output = dir.path().join("bad.bin");

    let result = assemble_file(&input, &output, false, false);
    assert!(result.is_err());
    assert!(!output.exists());
  }

  #[test]
  fn assembled_binary_runs_and_dumps_in_address_order(){
    let dir    = TempDir::new().unwrap();
    let input  = write_source(
      &dir,
      "prog.yaml",
      "- load_const: 100\n- load_const: 3\n- write_mem: 0\n- load_const: 16\n- sqrt: 101\n"
    );
    let binary = dir.path().join("prog.bin");
    let dump   = dir.path().join("dump.csv");

    assemble_file(&input, &binary, true, false).unwrap();
    assert_eq!(fs::read(&binary).unwrap().len(), 13);

    let range: DumpRange = "99-101".parse().unwrap();
    run_file(&binary, Some(&dump), range, true).unwrap();
    assert_eq!(csv_lines(&dump), vec!["address,value", "99,0", "100,3", "101,4"]);
  }

  #[test]
  fn faulting_run_still_dumps_and_fails(){
    let dir    = TempDir::new().unwrap();
    let input  = write_source(&dir, "underflow.yaml", "- read_mem: 0\n");
    let binary = dir.path().join("underflow.bin");
    let dump   = dir.path().join("dump.csv");

    assemble_file(&input, &binary, false, false).unwrap();

    let result = run_file(&binary, Some(&dump), DumpRange::new(0, 3), false);
    assert!(result.is_err());
    assert_eq!(csv_lines(&dump), vec!["address,value", "0,0", "1,0", "2,0", "3,0"]);
  }

  #[test]
  fn missing_binary_is_an_error(){
    let dir = TempDir::new().unwrap();
    let result = run_file(&dir.path().join("absent.bin"), None, DumpRange::default(), false);
    assert!(result.is_err());
  }
}

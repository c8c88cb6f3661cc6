use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use cbpf::bytecode::opcode_table;
use cbpf::disassembly::{disassemble, disassembly_table};
use cbpf::{Format, Program};

/// Disassemble and convert canonical and compressed bytecode images
#[derive(Parser, Debug)]
#[command(name = "cbpf")]
#[command(about = "Disassemble and convert bytecode images", long_about = None)]
struct Args {
  /// Format of the input image: canonical or compressed
  #[arg(long, default_value = "canonical")]
  format: Format,

  /// Write the image converted to the other format to this path
  #[arg(long, short)]
  output: Option<PathBuf>,

  /// Print the disassembly as a table
  #[arg(long)]
  table: bool,

  /// Print the opcode registry and exit
  #[arg(long)]
  opcodes: bool,

  /// The image to read
  input: Option<PathBuf>,
}

fn main() -> Result<()> {
  let args = Args::parse();

  // RUST_LOG controls the log level, WARN if unset.
  let filter = EnvFilter::try_from_default_env()
    .or_else(|_| EnvFilter::try_new("warn"))?;
  fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .init();

  if args.opcodes {
    opcode_table().printstd();
    return Ok(());
  }

  let format = args.format;
  let input  = args.input.context("no input image given")?;
  let bytes  = fs::read(&input).with_context(|| format!("reading {}", input.display()))?;
  let program = Program::decode(&bytes, format)
    .with_context(|| format!("decoding {} as {}", input.display(), format))?;

  if args.table {
    disassembly_table(&program, format)?.printstd();
  } else {
    for line in disassemble(&program, format)? {
      println!("{}", line);
    }
  }

  if let Some(output) = args.output {
    let target = format.other();
    let converted = program.encode(target)?;
    fs::write(&output, &converted).with_context(|| format!("writing {}", output.display()))?;
    info!(
      "wrote {} {} bytes to {} ({} bytes in)",
      converted.len(), target, output.display(), bytes.len()
    );
  }

  Ok(())
}

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bvm::bytecode::Word;
use bvm::compiler::parse_integer;
use bvm::slot::SLOT_COUNT;
use bvm::Driver;

/// One set of argument values, `A[0]` first.
#[derive(Clone, Debug)]
struct Tuple(Vec<Word>);

fn parse_tuple(text: &str) -> Result<Tuple, String> {
  let values = text
    .split(',')
    .map(|field| {
      let field = field.trim();
      parse_integer(field).ok_or_else(|| format!("`{}` is not an integer literal", field))
    })
    .collect::<Result<Vec<Word>, String>>()?;

  match values.len() > SLOT_COUNT {
    true  => Err(format!("{} values given, at most {} fit", values.len(), SLOT_COUNT)),
    false => Ok(Tuple(values))
  }
}

#[derive(Parser, Debug)]
#[command(name = "bvm")]
#[command(about = "Compile programs read from stdin and fingerprint their outputs")]
struct Cli {
  /// Input tuples; each is a comma-separated list of literals such as `0x10,7`
  #[arg(required = true, value_parser = parse_tuple)]
  inputs: Vec<Tuple>,

  /// Number of worker threads
  #[arg(long, default_value = "3")]
  threads: usize,

  /// Print each program's bytecode listing instead of evaluating it
  #[arg(long)]
  disassemble: bool,
}

fn main() -> ExitCode {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bvm=info".into()),
    )
    .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
    .init();

  let cli = Cli::parse();

  #[cfg(feature = "trace_computation")]
  info!("Computation tracing enabled");

  let inputs = cli.inputs.into_iter().map(|Tuple(values)| values).collect();
  let driver =
    match Driver::new(inputs) {
      Ok(driver) => driver.with_disassembly(cli.disassemble),
      Err(e)     => {
        error!("{}", e);
        return ExitCode::FAILURE;
      }
    };

  let reader = io::BufReader::new(io::stdin());
  let writer = io::BufWriter::new(io::stdout());
  match driver.run(reader, writer, cli.threads) {

    Ok(summary) => {
      info!(compiled = summary.compiled, rejected = summary.rejected, "done");
      ExitCode::SUCCESS
    }

    Err(e) => {
      error!("{}", e);
      ExitCode::FAILURE
    }

  }
}

/*!
  Batch evaluation of programs read one per line.

  Each program is compiled once and executed against every input tuple. The outputs are
  reduced to a single fingerprint and written as `<fingerprint>\t<program>`. Programs that do
  not compile and lines that are not UTF-8 are logged, counted as rejected, and skipped. Lines
  are pulled from the reader by a fixed pool of worker threads, so output lines appear in no
  particular order. Only a failing reader or writer ends a run early.
*/

use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use rayon::iter::{ParallelBridge, ParallelIterator};
use rayon::ThreadPoolBuilder;

use crate::bytecode::{listing, Word};
use crate::compiler::compile;
use crate::error::{Error, ExecuteError};
use crate::slot::SLOT_COUNT;

/// Seed increment of the classic `hash_combine`.
const GOLDEN_RATIO: Word = 0x9e3779b9;

/**
  Reduces the outputs of one program to a single word. A lone output is its own fingerprint;
  a sequence is combined in order, so permuting the outputs changes the result.
*/
pub fn fingerprint(outputs: &[Word]) -> Word {
  match outputs {
    [single] => *single,
    _        => {
      outputs.iter().fold(0, |seed: Word, value| {
        seed ^ value
          .wrapping_add(GOLDEN_RATIO)
          .wrapping_add(seed << 6)
          .wrapping_add(seed >> 2)
      })
    }
  }
}

/// The program on an input line: everything from the first `(`, less trailing whitespace.
pub fn program_text(line: &str) -> Option<&str> {
  let start   = line.find('(')?;
  let program = line[start..].trim_end();
  match program.is_empty() {
    true  => None,
    false => Some(program)
  }
}

/// Counts reported by `Driver::run`.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Summary {
  pub compiled : usize,
  pub rejected : usize
}

pub struct Driver {
  inputs      : Vec<Vec<Word>>,
  disassemble : bool
}

impl Driver {

  /// A driver that runs every program on each of `inputs`. Each tuple fills the argument slots.
  pub fn new(inputs: Vec<Vec<Word>>) -> Result<Driver, ExecuteError> {
    if let Some(tuple) = inputs.iter().find(|tuple| tuple.len() > SLOT_COUNT) {
      return Err(ExecuteError::TooManyInputs(tuple.len()));
    }
    Ok(Driver {
      inputs,
      disassemble: false
    })
  }

  /// Write each program followed by its bytecode listing instead of evaluating it.
  pub fn with_disassembly(mut self, disassemble: bool) -> Driver {
    self.disassemble = disassemble;
    self
  }

  /// Runs every program in `reader` on a pool of `threads` workers and writes one record each.
  pub fn run<R, W>(&self, reader: R, writer: W, threads: usize) -> Result<Summary, Error>
    where R: BufRead + Send,
          W: Write + Send
  {
    let pool     = ThreadPoolBuilder::new().num_threads(threads).build()?;
    let writer   = Mutex::new(writer);
    let compiled = AtomicUsize::new(0);
    let rejected = AtomicUsize::new(0);

    pool.install(|| {
      reader.split(b'\n').par_bridge().try_for_each(|bytes| -> Result<(), Error> {
        let line =
          match String::from_utf8(bytes?) {
            Ok(line)   => line,
            Err(error) => {
              rejected.fetch_add(1, Ordering::Relaxed);
              tracing::warn!(%error, "skipping a line that is not UTF-8");
              return Ok(());
            }
          };
        let program =
          match program_text(&line) {
            Some(program) => program,
            None          => return Ok(())
          };

        let record =
          match compile(program) {
            Ok(block) => {
              compiled.fetch_add(1, Ordering::Relaxed);
              match self.disassemble {
                true  => format!("{}\n{}", program, listing(block.code())),
                false => {
                  let outputs = self.inputs
                    .iter()
                    .map(|tuple| block.execute(tuple))
                    .collect::<Result<Vec<Word>, ExecuteError>>()?;
                  format!("{}\t{}\n", fingerprint(&outputs), program)
                }
              }
            }

            Err(error) => {
              rejected.fetch_add(1, Ordering::Relaxed);
              tracing::warn!(%error, "unable to compile: {}", program);
              return Ok(());
            }
          }; // end match compile

        let mut writer = writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_all(record.as_bytes())?;
        Ok(())
      })
    })?;

    let mut writer = writer.into_inner().unwrap_or_else(PoisonError::into_inner);
    writer.flush()?;

    Ok(Summary {
      compiled : compiled.into_inner(),
      rejected : rejected.into_inner()
    })
  }
}

//! Line-oriented console front end for a [`RunningPipeline`].
//!
//! Every input line is either `exit` (any case), a base-10 integer, or
//! rejected with a message. Flushed batches are printed by [`ConsoleObserver`].

use crate::error::{PipelineError, Result};
use crate::flusher::FlushObserver;
use crate::pipeline::RunningPipeline;
use std::io::{BufRead, Write};
use std::str::FromStr;
use thiserror::Error;
use tracing::{info, warn};

/// Message shown for lines that are neither a number nor `exit`
pub const REJECT_MESSAGE: &str = "input only digits or `exit`";

/// One interpreted input line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Exit,
    Value(i64),
}

/// A line that could not be interpreted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("input only digits or `exit`")]
pub struct ParseError {
    pub line: String,
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let line = line.trim();
        if line.eq_ignore_ascii_case("exit") {
            return Ok(Command::Exit);
        }
        line.parse::<i64>()
            .map(Command::Value)
            .map_err(|_| ParseError {
                line: line.to_string(),
            })
    }
}

/// Feed lines from `reader` into `pipeline` until `exit`, end of input or a read error.
///
/// The pipeline is shut down on every return path. User-facing messages
/// go to `out`. A read failure is returned as [`PipelineError::Input`],
/// a write failure on `out` as [`PipelineError::Output`].
pub fn run<R, W>(reader: R, mut out: W, pipeline: &RunningPipeline) -> Result<()>
where
    R: BufRead,
    W: Write,
{
    let result = feed(reader, &mut out, pipeline);
    pipeline.shutdown();
    result
}

fn feed<R, W>(reader: R, out: &mut W, pipeline: &RunningPipeline) -> Result<()>
where
    R: BufRead,
    W: Write,
{
    for line in reader.lines() {
        let line = line.inspect_err(|e| warn!(error = %e, "reading input failed"))?;

        match line.parse::<Command>() {
            Ok(Command::Exit) => {
                writeln!(out, "closing program").map_err(PipelineError::Output)?;
                return Ok(());
            }
            Ok(Command::Value(value)) => match pipeline.submit(value) {
                Err(PipelineError::ShutDown) => {
                    info!("pipeline shut down, ignoring further input");
                    return Ok(());
                }
                other => other?,
            },
            Err(e) => writeln!(out, "{e}").map_err(PipelineError::Output)?,
        }
    }

    info!("input closed");
    Ok(())
}

/// Observer that prints each flushed batch as `result data: [..]`
pub struct ConsoleObserver<W> {
    writer: W,
}

impl<W: Write> ConsoleObserver<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W> FlushObserver for ConsoleObserver<W>
where
    W: Write + Send + 'static,
{
    fn on_flush(&mut self, batch: &[i64]) {
        let printed = writeln!(self.writer, "result data: {batch:?}")
            .and_then(|_| self.writer.flush());
        if let Err(e) = printed {
            warn!(error = %e, "failed to print flushed batch");
        }
    }
}

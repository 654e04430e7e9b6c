//! Platform side of the `mypipe` binary
//!
//! The pipe returns short counts and `Retry`; the functions here turn that
//! into plain stream copies the way a process would see them.

use std::io::{self, Read, Write};

use mypipe::{PipeError, Reader, Writer};
use tracing::debug;

/// Chunk size used when copying between a stream and the pipe
pub const CHUNK_SIZE: usize = 4096;

/// Reader threads started when no count is given on the command line
pub const DEFAULT_READERS: usize = 1;

/// Parse the optional reader count argument
///
/// # Errors
/// Returns a message if the argument is not a positive integer.
pub fn parse_readers(arg: Option<&str>) -> Result<usize, String> {
    let Some(raw) = arg else {
        return Ok(DEFAULT_READERS);
    };
    match raw.trim().parse::<usize>() {
        Ok(0) => Err("reader count must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(format!("invalid reader count '{raw}': {e}")),
    }
}

fn interrupt_raised(interrupt: Option<&mypipe::Interrupt>) -> bool {
    interrupt.is_some_and(mypipe::Interrupt::is_raised)
}

/// Copy `source` into the pipe until end of input
///
/// Short writes are continued and `Retry` is re-issued with the same bytes.
/// Returns the number of bytes written.
///
/// # Errors
/// - Errors from `source` other than `Interrupted`
/// - `Interrupted` if the writer's interrupt stays raised, so the write cannot
///   be re-issued
/// - `InvalidInput` on a transfer fault
pub fn pump_in<R: Read>(mut source: R, writer: &Writer) -> io::Result<u64> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;

    loop {
        let n = match source.read(&mut buf) {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };

        let mut rest = &buf[..n];
        while !rest.is_empty() {
            match writer.write(rest) {
                Ok(written) => {
                    rest = &rest[written..];
                    total += written as u64;
                }
                Err(PipeError::Retry) if interrupt_raised(writer.interrupt()) => {
                    return Err(PipeError::Retry.into());
                }
                Err(PipeError::Retry) => debug!("write interrupted, re-issuing"),
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Copy bytes from the pipe into `sink`
///
/// Runs until a read is interrupted while the reader's interrupt is still
/// raised. A raised interrupt only stops the loop once the pipe is empty, so
/// raising it after the last write drains everything first. Returns the
/// number of bytes copied.
///
/// # Errors
/// - Errors from `sink`
/// - `InvalidInput` on a transfer fault
pub fn pump_out<W: Write>(reader: &Reader, mut sink: W) -> io::Result<u64> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;

    loop {
        match reader.read(&mut buf) {
            Ok(n) => {
                sink.write_all(&buf[..n])?;
                total += n as u64;
            }
            Err(PipeError::Retry) if interrupt_raised(reader.interrupt()) => break,
            Err(PipeError::Retry) => debug!("read interrupted, re-issuing"),
            Err(e) => return Err(e.into()),
        }
    }

    sink.flush()?;
    Ok(total)
}

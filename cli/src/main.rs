//! `mypipe [READERS]`: copy stdin to stdout through a fixed-size pipe
//!
//! Capacity and debug hint come from `MYPIPE_CAPACITY` and `MYPIPE_HINT`,
//! log filtering from `RUST_LOG`.

use std::io;
use std::process::ExitCode;
use std::thread;

use cli::{parse_readers, pump_in, pump_out};
use mypipe::{Interrupt, Pipe, PipeConfig};
use tracing::{error, info};

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let arg = std::env::args().nth(1);
    let readers = parse_readers(arg.as_deref())?;
    let pipe = Pipe::new(PipeConfig::from_env()?)?;
    info!("{pipe:?} with {readers} reader thread(s)");

    let shutdown = Interrupt::new();

    thread::scope(|scope| {
        let handles: Vec<_> = (0..readers)
            .map(|id| {
                let reader = pipe.reader().with_interrupt(shutdown.clone());
                scope.spawn(move || {
                    let copied = pump_out(&reader, io::stdout());
                    if let Ok(n) = &copied {
                        info!("reader {id} copied {n} bytes");
                    }
                    copied
                })
            })
            .collect();

        let written = pump_in(io::stdin().lock(), &pipe.writer());
        // Readers stop once the pipe is empty
        shutdown.raise();

        let mut read = 0u64;
        for handle in handles {
            read += handle
                .join()
                .map_err(|_| "reader thread panicked".to_string())??;
        }

        let written = written?;
        info!("wrote {written} bytes, read {read} bytes");
        Ok(())
    })
}

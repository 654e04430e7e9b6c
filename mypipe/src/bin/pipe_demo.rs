//! Pipe CLI Demo
//!
//! One task copies stdin lines into a small pipe, three tasks read it back
//! in 4-byte chunks. Set `RUST_LOG=trace` to watch the cursors move.

use embedded_io_async::Write;
use tokio::io::AsyncBufReadExt;
use tokio::sync::watch;

use mypipe::{Pipe, PipeConfig, PipeError, Reader, Writer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let pipe = Pipe::new(PipeConfig::new(16).with_debug_hint("demo"))?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let readers: Vec<_> = ["r1", "r2", "r3"]
        .into_iter()
        .map(|name| {
            let reader = pipe.reader();
            let shutdown = shutdown_rx.clone();
            tokio::spawn(async move { read_all(name, reader, shutdown).await })
        })
        .collect();

    let writer = pipe.writer();
    let writer_task = tokio::spawn(async move {
        write_all(writer).await;
        // Readers drain what is left, then stop
        let _ = shutdown_tx.send(true);
    });

    writer_task.await?;
    for result in futures::future::join_all(readers).await {
        result?;
    }

    println!("All tasks completed");
    Ok(())
}

async fn write_all(mut writer: Writer) {
    println!("Enter text (empty line to quit):");

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            break;
        }
        if let Err(err) = writer.write_all(trimmed.as_bytes()).await {
            eprintln!("Write error: {err} (errno={})", err.errno());
            break;
        }
    }

    println!("Writer done");
}

async fn read_all(name: &str, reader: Reader, mut shutdown: watch::Receiver<bool>) {
    let mut buf = [0u8; 4];

    loop {
        tokio::select! {
            biased;
            result = reader.read_async(&mut buf) => match result {
                Ok(n) => print_chunk(name, &buf[..n]),
                Err(err) => {
                    eprintln!("({name}) Error: {err} (errno={})", err.errno());
                    break;
                }
            },
            _ = shutdown.changed() => {
                drain(name, &reader, &mut buf);
                println!("({name}) EOF");
                break;
            }
        }
    }
}

/// Print whatever is still buffered without waiting for more
fn drain(name: &str, reader: &Reader, buf: &mut [u8]) {
    loop {
        match reader.try_read(buf) {
            Ok(n) => print_chunk(name, &buf[..n]),
            Err(PipeError::WouldBlock) => return,
            Err(err) => {
                eprintln!("({name}) Error: {err} (errno={})", err.errno());
                return;
            }
        }
    }
}

fn print_chunk(name: &str, chunk: &[u8]) {
    let data = String::from_utf8_lossy(chunk);
    println!("({name}): {data}");
}

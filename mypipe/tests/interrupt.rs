use mypipe::{Interrupt, Pipe, PipeConfig, PipeError};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

fn pipe_of(capacity: usize) -> Pipe {
    Pipe::new(PipeConfig::new(capacity).with_debug_hint("interrupt")).unwrap()
}

const SHORT_WAIT: Duration = Duration::from_millis(100);
const LONG_WAIT: Duration = Duration::from_secs(5);

#[test]
fn test_interrupt_blocked_write() {
    let pipe = pipe_of(4);
    let interrupt = Interrupt::new();
    let writer = pipe.writer().with_interrupt(interrupt.clone());

    assert_eq!(writer.write(b"abcd"), Ok(4));

    let (tx, rx) = mpsc::channel();
    let blocked = thread::spawn(move || {
        tx.send(writer.write(b"efgh")).unwrap();
    });
    assert!(rx.recv_timeout(SHORT_WAIT).is_err(), "write should block");

    interrupt.raise();

    let result = rx.recv_timeout(LONG_WAIT).unwrap();
    assert_eq!(result, Err(PipeError::Retry));
    assert_eq!(result.unwrap_err().errno(), 512);
    blocked.join().unwrap();

    // Contents and cursors are untouched
    assert!(pipe.is_full());
    let mut buf = [0u8; 4];
    assert_eq!(pipe.reader().read(&mut buf), Ok(4));
    assert_eq!(&buf, b"abcd");
}

#[test]
fn test_interrupt_blocked_read() {
    let pipe = pipe_of(4);
    let interrupt = Interrupt::new();
    let reader = pipe.reader().with_interrupt(interrupt.clone());

    let (tx, rx) = mpsc::channel();
    let blocked = thread::spawn(move || {
        let mut buf = [0u8; 4];
        tx.send(reader.read(&mut buf)).unwrap();
    });
    assert!(rx.recv_timeout(SHORT_WAIT).is_err(), "read should block");

    interrupt.raise();

    assert_eq!(rx.recv_timeout(LONG_WAIT).unwrap(), Err(PipeError::Retry));
    blocked.join().unwrap();
    assert!(pipe.is_empty());
}

#[test]
fn test_raised_interrupt_does_not_stop_ready_transfer() {
    let pipe = pipe_of(4);
    let interrupt = Interrupt::new();
    let writer = pipe.writer().with_interrupt(interrupt.clone());
    let reader = pipe.reader().with_interrupt(interrupt.clone());

    interrupt.raise();

    // Space and data are available, so nothing has to wait
    assert_eq!(writer.write(b"ab"), Ok(2));
    let mut buf = [0u8; 4];
    assert_eq!(reader.read(&mut buf), Ok(2));

    // Now the pipe is empty: the read would wait, so it is refused
    assert_eq!(reader.read(&mut buf), Err(PipeError::Retry));
}

#[test]
fn test_retry_after_clear() {
    let pipe = pipe_of(2);
    let interrupt = Interrupt::new();
    let reader = pipe.reader().with_interrupt(interrupt.clone());

    interrupt.raise();
    let mut buf = [0u8; 2];
    assert_eq!(reader.read(&mut buf), Err(PipeError::Retry));

    interrupt.clear();
    assert!(!interrupt.is_raised());

    // Re-issued call with the same arguments blocks again until data arrives
    let writer = pipe.writer();
    let (tx, rx) = mpsc::channel();
    let blocked = thread::spawn(move || {
        let mut buf = [0u8; 2];
        let result = reader.read(&mut buf).map(|n| buf[..n].to_vec());
        tx.send(result).unwrap();
    });
    assert!(rx.recv_timeout(SHORT_WAIT).is_err(), "read should block");

    assert_eq!(writer.write(b"z"), Ok(1));
    assert_eq!(rx.recv_timeout(LONG_WAIT).unwrap(), Ok(b"z".to_vec()));
    blocked.join().unwrap();
}

#[test]
fn test_interrupt_wakes_all_waiters() {
    let pipe = pipe_of(1);
    let interrupt = Interrupt::new();
    let (tx, rx) = mpsc::channel();

    let mut handles = Vec::new();
    for _ in 0..3 {
        let reader = pipe.reader().with_interrupt(interrupt.clone());
        let tx = tx.clone();
        handles.push(thread::spawn(move || {
            let mut buf = [0u8; 1];
            tx.send(reader.read(&mut buf)).unwrap();
        }));
    }
    assert!(rx.recv_timeout(SHORT_WAIT).is_err());

    interrupt.raise();
    for _ in 0..3 {
        assert_eq!(rx.recv_timeout(LONG_WAIT).unwrap(), Err(PipeError::Retry));
    }
    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_interrupt_wakes_waiters_on_several_pipes() {
    let empty = pipe_of(4);
    let full = pipe_of(4);
    let interrupt = Interrupt::new();
    let reader = empty.reader().with_interrupt(interrupt.clone());
    let writer = full.writer().with_interrupt(interrupt.clone());
    assert_eq!(writer.write(b"full"), Ok(4));

    let (tx, rx) = mpsc::channel();
    let tx_reader = tx.clone();
    let blocked_reader = thread::spawn(move || {
        let mut buf = [0u8; 4];
        tx_reader.send(("read", reader.read(&mut buf))).unwrap();
    });
    let blocked_writer = thread::spawn(move || {
        tx.send(("write", writer.write(b"more"))).unwrap();
    });
    assert!(rx.recv_timeout(SHORT_WAIT).is_err(), "both calls should block");

    interrupt.raise();

    let mut results: Vec<_> = (0..2)
        .map(|_| rx.recv_timeout(LONG_WAIT).unwrap())
        .collect();
    results.sort_by_key(|(name, _)| *name);
    assert_eq!(
        results,
        vec![("read", Err(PipeError::Retry)), ("write", Err(PipeError::Retry))]
    );
    blocked_reader.join().unwrap();
    blocked_writer.join().unwrap();

    assert!(empty.is_empty());
    assert!(full.is_full());
    let mut buf = [0u8; 4];
    assert_eq!(full.reader().read(&mut buf), Ok(4));
    assert_eq!(&buf, b"full");
}

#[test]
fn test_uninterruptible_endpoint_ignores_interrupt() {
    let pipe = pipe_of(1);
    let interrupt = Interrupt::new();
    let interruptible = pipe.reader().with_interrupt(interrupt.clone());
    let plain = pipe.reader();

    // The interruptible reader registers the pipe with the interrupt
    interrupt.raise();
    let mut buf = [0u8; 1];
    assert_eq!(interruptible.read(&mut buf), Err(PipeError::Retry));

    let (tx, rx) = mpsc::channel();
    let blocked = thread::spawn(move || {
        let mut buf = [0u8; 1];
        tx.send(plain.read(&mut buf)).unwrap();
    });

    interrupt.raise();
    assert!(rx.recv_timeout(SHORT_WAIT).is_err(), "plain reader keeps waiting");

    assert_eq!(pipe.writer().write(b"!"), Ok(1));
    assert_eq!(rx.recv_timeout(LONG_WAIT).unwrap(), Ok(1));
    blocked.join().unwrap();
}

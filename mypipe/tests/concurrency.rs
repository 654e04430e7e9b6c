//! Many writers and readers hammering one small pipe

use mypipe::{Pipe, PipeConfig};
use std::thread;

const WRITERS: u8 = 4;
const BYTES_PER_WRITER: usize = 20_000;

fn pipe_of(capacity: usize) -> Pipe {
    Pipe::new(PipeConfig::new(capacity).with_debug_hint("stress")).unwrap()
}

// Byte layout: top two bits name the writer, low six bits count 0..64 cyclically
fn tagged(writer: u8, seq: usize) -> u8 {
    (writer << 6) | (seq % 64) as u8
}

fn write_all(writer: &mypipe::Writer, mut data: &[u8]) {
    while !data.is_empty() {
        let n = writer.write(data).unwrap();
        data = &data[n..];
    }
}

#[test]
fn test_concurrent_writers_keep_their_order() {
    let pipe = pipe_of(61);

    let producers: Vec<_> = (0..WRITERS)
        .map(|id| {
            let writer = pipe.writer();
            thread::spawn(move || {
                let data: Vec<u8> = (0..BYTES_PER_WRITER).map(|i| tagged(id, i)).collect();
                for chunk in data.chunks(37) {
                    write_all(&writer, chunk);
                }
            })
        })
        .collect();

    let reader = pipe.reader();
    let total = WRITERS as usize * BYTES_PER_WRITER;
    let mut received = Vec::with_capacity(total);
    let mut buf = [0u8; 29];
    while received.len() < total {
        let n = reader.read(&mut buf).unwrap();
        received.extend_from_slice(&buf[..n]);
    }

    for producer in producers {
        producer.join().unwrap();
    }
    assert!(pipe.is_empty());

    let mut next_seq = [0usize; WRITERS as usize];
    for byte in received {
        let id = byte >> 6;
        let seq = &mut next_seq[id as usize];
        assert_eq!(byte, tagged(id, *seq), "writer {id} out of order");
        *seq += 1;
    }
    assert!(next_seq.iter().all(|&n| n == BYTES_PER_WRITER));
}

#[test]
fn test_concurrent_readers_split_stream_without_loss() {
    const READERS: usize = 3;
    let pipe = pipe_of(17);
    let total: usize = 30_000;

    let consumers: Vec<_> = (0..READERS)
        .map(|_| {
            let reader = pipe.reader();
            thread::spawn(move || {
                let mut counts = [0usize; 256];
                let mut buf = [0u8; 7];
                loop {
                    let n = reader.read(&mut buf).unwrap();
                    for &byte in &buf[..n] {
                        counts[byte as usize] += 1;
                    }
                    // 0xFF only appears in the end marker
                    if buf[..n].contains(&0xFF) {
                        return counts;
                    }
                }
            })
        })
        .collect();

    let writer = pipe.writer();
    let data: Vec<u8> = (0..total).map(|i| (i % 255) as u8).collect();
    for chunk in data.chunks(11) {
        write_all(&writer, chunk);
    }
    // One end marker per reader; each reader stops at the first it sees
    for _ in 0..READERS {
        write_all(&writer, &[0xFF]);
        // Wait for a reader to take the marker before sending the next one,
        // so one reader cannot swallow two markers in a single read
        while !pipe.is_empty() {
            thread::yield_now();
        }
    }

    let mut totals = [0usize; 256];
    for consumer in consumers {
        let counts = consumer.join().unwrap();
        for (total, count) in totals.iter_mut().zip(counts) {
            *total += count;
        }
    }

    let mut expected = [0usize; 256];
    for &byte in &data {
        expected[byte as usize] += 1;
    }
    expected[0xFF] = READERS;
    assert_eq!(totals, expected);
}

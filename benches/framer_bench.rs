//! Throughput of status line framing.
//!
//! Run with:
//! ```sh
//! cargo bench --bench framer_bench
//! ```

use bytes::BytesMut;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use latchkey_core::DeviceState;
use latchkey_protocol::{LineFramer, StatusCodec};
use std::hint::black_box;
use tokio_util::codec::{Decoder, Encoder};

/// A realistic open cycle as the firmware sends it.
fn open_cycle() -> Vec<u8> {
    let mut codec = StatusCodec::new();
    let mut buffer = BytesMut::new();
    for state in [DeviceState::Busy, DeviceState::Open, DeviceState::Unlocked] {
        codec.encode(state, &mut buffer).unwrap();
    }
    buffer.to_vec()
}

/// Feed a stream of cycles in chunks of varying size, as a serial driver
/// would deliver it.
fn bench_feed_chunked(c: &mut Criterion) {
    let mut group = c.benchmark_group("feed_chunked");
    let stream: Vec<u8> = (0..100).flat_map(|_| open_cycle()).collect();
    group.throughput(Throughput::Bytes(stream.len() as u64));

    for chunk in [1usize, 8, 128] {
        group.bench_with_input(BenchmarkId::from_parameter(chunk), &chunk, |b, &chunk| {
            b.iter(|| {
                let mut framer = LineFramer::new();
                for piece in stream.chunks(chunk) {
                    framer.feed(black_box(piece));
                    for line in framer.drain_lines() {
                        black_box(line);
                    }
                }
            });
        });
    }

    group.finish();
}

/// Decode a batch of lines through the codec.
fn bench_decode_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_batch");

    for cycles in [10usize, 100, 1000] {
        group.throughput(Throughput::Elements((cycles * 3) as u64));
        let encoded: Vec<u8> = (0..cycles).flat_map(|_| open_cycle()).collect();

        group.bench_with_input(BenchmarkId::from_parameter(cycles), &encoded, |b, encoded| {
            b.iter(|| {
                let mut codec = StatusCodec::new();
                let mut buffer = BytesMut::from(&encoded[..]);
                while let Some(line) = codec.decode(&mut buffer).unwrap() {
                    black_box(line);
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_feed_chunked, bench_decode_batch);
criterion_main!(benches);

//! Channel throughput benchmarks

use criterion::{Criterion, criterion_group, criterion_main};
use fifodev::config::DeviceConfig;
use fifodev_channel::{CancelToken, FifoDevice};
use std::hint::black_box;
use std::sync::Arc;
use std::thread;

/// Benchmark uncontended write+read cycles for different payload sizes
fn bench_roundtrip(c: &mut Criterion) {
    let dev = FifoDevice::new(&DeviceConfig::with_sizing(16, 4096)).unwrap();
    let cancel = CancelToken::new();

    let data_64 = vec![0xAAu8; 64];
    let data_1k = vec![0xAAu8; 1024];
    let data_4k = vec![0xAAu8; 4096];
    let mut out = vec![0u8; 4096];

    c.bench_function("roundtrip_64_bytes", |b| {
        b.iter(|| {
            black_box(dev.write(&data_64, &cancel).unwrap());
            black_box(dev.read(&mut out, &cancel).unwrap());
        });
    });

    c.bench_function("roundtrip_1k_bytes", |b| {
        b.iter(|| {
            black_box(dev.write(&data_1k, &cancel).unwrap());
            black_box(dev.read(&mut out, &cancel).unwrap());
        });
    });

    c.bench_function("roundtrip_4k_bytes", |b| {
        b.iter(|| {
            black_box(dev.write(&data_4k, &cancel).unwrap());
            black_box(dev.read(&mut out, &cancel).unwrap());
        });
    });
}

/// Benchmark a pipelined producer thread feeding the benchmarked reader
fn bench_cross_thread_stream(c: &mut Criterion) {
    c.bench_function("stream_1k_across_threads", |b| {
        b.iter_custom(|iters| {
            let dev = Arc::new(FifoDevice::new(&DeviceConfig::with_sizing(64, 1024)).unwrap());
            let cancel = CancelToken::new();
            let data = vec![0xAAu8; 1024];

            let producer = {
                let dev = Arc::clone(&dev);
                let cancel = cancel.clone();
                thread::spawn(move || {
                    for _ in 0..iters {
                        dev.write(&data, &cancel).unwrap();
                    }
                })
            };

            let mut out = vec![0u8; 1024];
            let start = std::time::Instant::now();
            for _ in 0..iters {
                black_box(dev.read(&mut out, &cancel).unwrap());
            }
            let elapsed = start.elapsed();

            producer.join().unwrap();
            elapsed
        });
    });
}

criterion_group!(benches, bench_roundtrip, bench_cross_thread_stream);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pms_telemetry::{
    drivers::decode_frame, status_lines, SensorSample, SmoothedRecord, SmoothingWindow,
};

fn sample(i: usize) -> SensorSample {
    let x = i as f64;
    SensorSample::new(x, 2.0 * x, 3.0 * x)
}

/// Benchmark filling a window and collapsing it into a record
fn bench_window_fill_and_flush(c: &mut Criterion) {
    let mut group = c.benchmark_group("window_fill_and_flush");

    for size in [10usize, 60, 600] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let mut window = SmoothingWindow::new(size);
            b.iter(|| {
                for i in 0..size {
                    window.observe(sample(i)).expect("Window should have room");
                }
                black_box(window.flush().expect("Window should be full"))
            })
        });
    }

    group.finish();
}

/// Benchmark JSON serialization of smoothed records
fn bench_payload_serialization(c: &mut Criterion) {
    let record = SmoothedRecord {
        pm1_0: 3.4666666666666668,
        pm2_5: 5.05,
        pm10: 8.316666666666666,
    };

    c.bench_function("payload_serialization", |b| {
        b.iter(|| black_box(&record).to_payload().expect("Should serialize"))
    });
}

/// Benchmark building the status display lines
fn bench_status_lines(c: &mut Criterion) {
    let record = SmoothedRecord {
        pm1_0: 3.5,
        pm2_5: 5.0,
        pm10: 8.3,
    };

    c.bench_function("status_lines", |b| {
        b.iter(|| status_lines(black_box(Some(&record)), black_box(42)))
    });
}

/// Benchmark decoding a raw sensor frame
fn bench_frame_decode(c: &mut Criterion) {
    let mut frame = [0u8; 32];
    frame[..4].copy_from_slice(&[0x42, 0x4D, 0x00, 0x1C]);
    frame[4..10].copy_from_slice(&[0x00, 0x03, 0x00, 0x07, 0x00, 0x0C]);
    let sum: u16 = frame[..30].iter().map(|&b| u16::from(b)).sum();
    frame[30..].copy_from_slice(&sum.to_be_bytes());

    c.bench_function("frame_decode", |b| {
        b.iter(|| decode_frame(black_box(&frame)).expect("Frame should decode"))
    });
}

criterion_group!(
    benches,
    bench_window_fill_and_flush,
    bench_payload_serialization,
    bench_status_lines,
    bench_frame_decode
);

criterion_main!(benches);

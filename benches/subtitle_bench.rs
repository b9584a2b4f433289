use criterion::{black_box, criterion_group, criterion_main, Criterion};

use caption_relay::subtitle::{format_timestamp, parse_timestamp, render_segments};
use caption_relay::TranscriptSegment;

fn bench_timestamps(c: &mut Criterion) {
    c.bench_function("format_timestamp", |b| {
        b.iter(|| {
            black_box(format_timestamp(black_box(3661.5)).unwrap());
            black_box(format_timestamp(black_box(90000.0)).unwrap());
        })
    });

    c.bench_function("parse_timestamp", |b| {
        b.iter(|| black_box(parse_timestamp(black_box("01:01:01,500")).unwrap()))
    });
}

fn segments(count: usize) -> Vec<TranscriptSegment> {
    (0..count)
        .map(|i| TranscriptSegment {
            start: i as f64 * 3.0,
            end: (i + 1) as f64 * 3.0,
            text: format!(
                "spoken segment {} with a realistic amount of caption text",
                i + 1
            ),
        })
        .collect()
}

fn bench_rendering(c: &mut Criterion) {
    let small = segments(10);
    c.bench_function("render_small_transcript", |b| {
        b.iter(|| black_box(render_segments(black_box(&small)).unwrap()))
    });

    // 1000 cues is a typical hour-long recording
    let large = segments(1000);
    c.bench_function("render_large_transcript", |b| {
        b.iter(|| black_box(render_segments(black_box(&large)).unwrap()))
    });
}

criterion_group!(benches, bench_timestamps, bench_rendering);
criterion_main!(benches);

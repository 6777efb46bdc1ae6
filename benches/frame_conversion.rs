use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use imgviz::core::fit_centered;
use imgviz::{Bitmap, Frame};

const SIZES: [(u32, u32); 3] = [(320, 240), (1280, 720), (1920, 1080)];

fn frame(width: u32, height: u32, channels: u8) -> Frame {
    let len = width as usize * height as usize * channels as usize;
    let data = (0..len).map(|i| (i % 251) as u8).collect();
    Frame::new(width, height, channels, data)
}

/// Benchmark: Frame -> RGBA bitmap for each accepted channel count
fn bench_frame_to_bitmap(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_to_bitmap");

    for (width, height) in SIZES {
        group.throughput(Throughput::Elements(width as u64 * height as u64));
        for channels in [1u8, 3, 4] {
            let source = frame(width, height, channels);
            let id = BenchmarkId::new(format!("{channels}ch"), format!("{width}x{height}"));
            group.bench_with_input(id, &source, |b, source| {
                b.iter(|| Bitmap::try_from(black_box(source)))
            });
        }
    }

    group.finish();
}

/// Benchmark: Letterbox placement computed every paint
fn bench_fit_centered(c: &mut Criterion) {
    c.bench_function("fit_centered", |b| {
        b.iter(|| fit_centered(black_box((1920, 1080)), black_box((800, 600)), black_box(0.95)))
    });
}

criterion_group!(benches, bench_frame_to_bitmap, bench_fit_centered);
criterion_main!(benches);

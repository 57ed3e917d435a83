//! Screen model benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use shoji_core::{Screen, ScreenConfig};

fn bench_plain_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("screen");
    let input = "the quick brown fox jumps over the lazy dog\r\n".repeat(500);
    group.throughput(Throughput::Bytes(input.len() as u64));
    group.bench_function("plain_fill", |b| {
        b.iter(|| {
            let mut screen = Screen::new(ScreenConfig::standard()).unwrap();
            screen.process_bytes(black_box(input.as_bytes())).unwrap();
            black_box(screen.scrollback_rows())
        })
    });
    group.finish();
}

fn bench_styled_output(c: &mut Criterion) {
    let mut group = c.benchmark_group("screen");
    let input = "\x1b[1;32mok\x1b[0m \x1b[31mfail\x1b[0m \x1b[38;5;208mwarn\x1b[0m\r\n".repeat(300);
    group.throughput(Throughput::Bytes(input.len() as u64));
    group.bench_function("styled_output", |b| {
        b.iter(|| {
            let mut screen = Screen::new(ScreenConfig::standard()).unwrap();
            screen.process_bytes(black_box(input.as_bytes())).unwrap();
            black_box(screen.cursor_location())
        })
    });
    group.finish();
}

fn bench_region_scroll(c: &mut Criterion) {
    let mut group = c.benchmark_group("screen");
    let mut input = b"\x1b[5;20r\x1b[20;1H".to_vec();
    input.extend(b"scrolling line\n".repeat(500));
    group.throughput(Throughput::Bytes(input.len() as u64));
    group.bench_function("region_scroll", |b| {
        b.iter(|| {
            let mut screen = Screen::new(ScreenConfig::standard()).unwrap();
            screen.process_bytes(black_box(&input)).unwrap();
            black_box(screen.cursor_location())
        })
    });
    group.finish();
}

criterion_group!(benches, bench_plain_fill, bench_styled_output, bench_region_scroll);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ring_pipeline::{PipelineBuilder, RingBuffer};
use std::time::Duration;

fn benchmark_buffer_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer_push");
    for capacity in [5usize, 64, 1024] {
        group.throughput(Throughput::Elements(10_000));
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &capacity, |b, &capacity| {
            let buffer = RingBuffer::new(capacity).expect("Build failed");
            b.iter(|| {
                for i in 0..10_000i64 {
                    black_box(buffer.push(black_box(i)));
                }
            });
        });
    }
    group.finish();
}

fn benchmark_buffer_drain(c: &mut Criterion) {
    c.bench_function("buffer_fill_and_drain_1024", |b| {
        let buffer = RingBuffer::new(1024).expect("Build failed");
        b.iter(|| {
            for i in 0..1024i64 {
                buffer.push(i);
            }
            black_box(buffer.drain());
        });
    });
}

fn benchmark_end_to_end_submit(c: &mut Criterion) {
    let mut group = c.benchmark_group("submit");
    group.throughput(Throughput::Elements(1000));
    group.bench_function("three_stage_1000_values", |b| {
        b.iter(|| {
            let running = PipelineBuilder::new()
                .buffer_capacity(1000)
                .flush_interval(Duration::from_secs(3600))
                .build()
                .expect("Build failed")
                .start(|_: &[i64]| {})
                .expect("Start failed");

            for i in 0..1000i64 {
                running.submit(black_box(i)).expect("Submit failed");
            }

            running.wait().expect("Wait failed");
        });
    });
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default().measurement_time(Duration::from_secs(10));
    targets = benchmark_buffer_push, benchmark_buffer_drain, benchmark_end_to_end_submit
);
criterion_main!(benches);

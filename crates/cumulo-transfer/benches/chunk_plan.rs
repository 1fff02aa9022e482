use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use cumulo_transfer::{plan_chunks, plan_page_chunks};

const MB: u64 = 1024 * 1024;

fn bench_plan_chunks(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_chunks");

    for total in [10 * MB, 1024 * MB, 64 * 1024 * MB] {
        group.throughput(Throughput::Bytes(total));
        group.bench_with_input(BenchmarkId::new("4MiB", total), &total, |b, &total| {
            b.iter(|| plan_chunks(0, black_box(total), black_box(4 * MB)));
        });
    }

    group.finish();
}

fn bench_plan_page_chunks(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_page_chunks");

    for chunk_size in [512, 64 * 1024, 4 * MB] {
        group.bench_with_input(BenchmarkId::new("1GiB", chunk_size), &chunk_size, |b, &chunk_size| {
            b.iter(|| plan_page_chunks(black_box(512), black_box(1024 * MB), chunk_size));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_plan_chunks, bench_plan_page_chunks);
criterion_main!(benches);

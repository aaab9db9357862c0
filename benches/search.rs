use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kolosal_bench::backend::CpuBackend;
use kolosal_bench::data::{make_classification, train_test_split, SyntheticConfig};
use kolosal_bench::search::{EvolutionarySearch, PipelineSearch, SearchConfig};

fn bench_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("split");

    for n_rows in [10_000, 100_000].iter() {
        let dataset = make_classification(&SyntheticConfig::new(*n_rows, 28, 12)).unwrap();

        group.bench_with_input(BenchmarkId::new("stratified", n_rows), &dataset, |b, dataset| {
            b.iter(|| train_test_split(black_box(dataset), 12, 0.2).unwrap())
        });
    }

    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    group.sample_size(10); // Fewer samples for search benchmarks

    let dataset = make_classification(&SyntheticConfig::new(2_000, 10, 12)).unwrap();
    let backend = CpuBackend::new();

    for n_jobs in [1, -1].iter() {
        let config = SearchConfig::default()
            .with_generations(1)
            .with_population_size(6)
            .with_cv_folds(3)
            .with_n_jobs(*n_jobs)
            .with_verbosity(0);

        group.bench_with_input(BenchmarkId::new("one_generation", n_jobs), &config, |b, config| {
            b.iter(|| EvolutionarySearch::new().search(black_box(&dataset), config, &backend).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_split, bench_search);
criterion_main!(benches);

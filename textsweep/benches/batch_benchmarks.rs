#![allow(unused_must_use)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::{fs::File, io::Write};
use tempfile::tempdir;
use textsweep::{BatchRunner, SearchMethod, SearchParams};

fn create_test_files(
    dir: &tempfile::TempDir,
    file_count: usize,
    lines_per_file: usize,
) -> std::io::Result<()> {
    for i in 0..file_count {
        let file_path = dir.path().join(format!("test_{}.txt", i));
        let mut file = File::create(file_path)?;
        for j in 0..lines_per_file {
            writeln!(
                file,
                "Line {} TODO: fix bug {} FIXME: optimize line {} NOTE: important task {}",
                j, j, j, j
            )?;
        }
    }
    Ok(())
}

fn bench_search_methods(c: &mut Criterion) -> std::io::Result<()> {
    let dir = tempdir()?;
    create_test_files(&dir, 20, 50)?;
    let runner = BatchRunner::default();

    let methods = [
        ("exact", SearchMethod::Exact),
        ("fuzzy", SearchMethod::fuzzy()),
    ];

    let mut group = c.benchmark_group("Search Method");
    for (name, method) in methods {
        let params = SearchParams::new("important", method);
        group.bench_function(name, |b| {
            b.iter(|| {
                black_box(
                    runner
                        .search(dir.path(), 2, &params, &mut std::io::sink())
                        .unwrap(),
                )
            });
        });
    }
    group.finish();
    Ok(())
}

fn bench_file_scaling(c: &mut Criterion) -> std::io::Result<()> {
    let dir = tempdir()?;
    let file_counts = vec![1, 10, 100, 1000];
    let runner = BatchRunner::default();
    let params = SearchParams::new("TODO", SearchMethod::Exact);

    let mut group = c.benchmark_group("File Scaling");
    for &count in &file_counts {
        create_test_files(&dir, count, 10)?;

        group.bench_function(format!("files_{}", count), |b| {
            b.iter(|| {
                black_box(
                    runner
                        .search(dir.path(), 4, &params, &mut std::io::sink())
                        .unwrap(),
                )
            });
        });
    }
    group.finish();
    Ok(())
}

fn bench_worker_scaling(c: &mut Criterion) -> std::io::Result<()> {
    let dir = tempdir()?;
    create_test_files(&dir, 200, 20)?;
    let runner = BatchRunner::default();
    let params = SearchParams::new("FIXME", SearchMethod::Exact);

    let mut group = c.benchmark_group("Worker Scaling");
    for workers in [1, 2, 4, num_cpus::get().max(1)] {
        group.bench_with_input(BenchmarkId::from_parameter(workers), &workers, |b, &w| {
            b.iter(|| {
                black_box(
                    runner
                        .search(dir.path(), w, &params, &mut std::io::sink())
                        .unwrap(),
                )
            });
        });
    }
    group.finish();
    Ok(())
}

criterion_group! {
    name = benches;
    config = Criterion::default();
    targets = bench_search_methods, bench_file_scaling, bench_worker_scaling
}

#[test]
fn ensure_benchmarks_valid() {
    benches();
}

criterion_main!(benches);

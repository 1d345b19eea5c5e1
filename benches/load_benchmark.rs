use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use expstore::core::types::{Fingerprint, Move};
use expstore::index::position_index::PositionIndex;
use expstore::storage::experience_file::{load, save};
use expstore::storage::record::Record;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;

// packed from/to squares of common opening moves
const MOVES: [u16; 8] = [796, 731, 398, 666, 145, 861, 1020, 1227];

// Helper to write an experience file with `records` random facts
fn create_experience_file(path: &Path, records: usize, positions: u64) {
    let mut rng = StdRng::seed_from_u64(records as u64);
    let index: PositionIndex = (0..records)
        .map(|_| {
            Record::new(
                Fingerprint(rng.gen_range(1..=positions)),
                Move(MOVES[rng.gen_range(0..MOVES.len())]),
                rng.gen_range(-400..400),
                rng.gen_range(0..40),
                1,
            )
        })
        .collect();
    save(path, &index).unwrap();
}

fn bench_load(c: &mut Criterion) {
    let temp_dir = tempfile::tempdir().unwrap();
    let small = temp_dir.path().join("small.exp");
    let large = temp_dir.path().join("large.exp");
    create_experience_file(&small, 10_000, 2_000);
    create_experience_file(&large, 200_000, 40_000);

    let mut group = c.benchmark_group("experience_load");
    group.sample_size(20);

    for (name, path) in [("10k_records", &small), ("200k_records", &large)] {
        group.bench_with_input(BenchmarkId::new("load", name), path, |b, path| {
            b.iter(|| {
                let loaded = load(path).unwrap();
                black_box(loaded);
            });
        });
    }

    group.finish();
}

fn bench_defrag_save(c: &mut Criterion) {
    let temp_dir = tempfile::tempdir().unwrap();
    let source = temp_dir.path().join("source.exp");
    let target = temp_dir.path().join("target.exp");
    create_experience_file(&source, 50_000, 10_000);
    let (index, _) = load(&source).unwrap();

    c.bench_function("save_50k_records", |b| {
        b.iter(|| {
            let report = save(&target, &index).unwrap();
            black_box(report);
        });
    });
}

criterion_group!(benches, bench_load, bench_defrag_save);
criterion_main!(benches);

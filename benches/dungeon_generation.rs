//! Criterion benchmarks for the flood-growth dungeon generator.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use delve::generation::utils;
use delve::{FloodGrowthGenerator, GenerationConfig, Generator, Position};

fn bench_generation(c: &mut Criterion) {
    let generator = FloodGrowthGenerator::new();

    let mut group = c.benchmark_group("flood_growth");
    for (columns, rows) in [(32u32, 18u32), (80, 40), (160, 90)] {
        let mut config = GenerationConfig::new(0xDE17E);
        config.columns = columns;
        config.rows = rows;
        let start = Position::new(columns as i32 / 2, rows as i32 / 2);

        group.bench_function(format!("{}x{}", columns, rows), |b| {
            b.iter(|| {
                let mut rng = utils::create_rng(&config);
                let dungeon = generator
                    .generate(black_box(&config), black_box(start), &mut rng)
                    .expect("generation failed");
                black_box(dungeon.floor_cells().len())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_generation);
criterion_main!(benches);

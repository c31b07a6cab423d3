//! Scroll performance benchmarks.
//!
//! Measures a full engine round (cycle, render, commit) per scroll step at
//! different depths into a long feed, and the cost of a column change.
//!
//! Run with: cargo bench --bench scroll_benchmark

#![allow(missing_docs)] // criterion macros generate undocumented items

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use infiniscroll::config::{EngineConfig, MediaQuery};
use infiniscroll::engine::Viewport;
use infiniscroll::sim::{feed, Simulation};

const FEED_LEN: u64 = 5_000;
const STEP: i64 = 400;

/// How far into the feed the benchmark starts.
#[derive(Debug, Clone, Copy)]
enum Depth {
    Top,
    Shallow,
    Deep,
}

impl Depth {
    fn name(&self) -> &'static str {
        match self {
            Depth::Top => "top",
            Depth::Shallow => "shallow",
            Depth::Deep => "deep",
        }
    }

    fn steps(&self) -> usize {
        match self {
            Depth::Top => 0,
            Depth::Shallow => 20,
            Depth::Deep => 400,
        }
    }
}

fn config() -> EngineConfig {
    EngineConfig {
        page_size: 20,
        max_items_per_row: Some(3),
        media_queries: vec![MediaQuery {
            max_width: 600,
            items_per_row: 1,
        }],
        ..EngineConfig::default()
    }
}

/// A mounted simulation scrolled `depth` steps down.
fn scrolled(depth: Depth) -> Simulation {
    let mut sim = Simulation::new(config(), Viewport::new(400, 800), feed(0..FEED_LEN, 11));
    sim.mount().expect("mount");
    for _ in 0..depth.steps() {
        sim.scroll_by(STEP).expect("scroll");
    }
    sim
}

fn bench_scroll_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("scroll_step");

    for depth in [Depth::Top, Depth::Shallow, Depth::Deep] {
        for (direction, dy) in [("down", STEP), ("up", -STEP)] {
            group.bench_with_input(
                BenchmarkId::new(direction, depth.name()),
                &dy,
                |b, &dy| {
                    b.iter_batched(
                        || scrolled(depth),
                        |mut sim| {
                            sim.scroll_by(black_box(dy)).expect("scroll");
                            black_box(sim.snapshot())
                        },
                        BatchSize::LargeInput,
                    );
                },
            );
        }
    }

    group.finish();
}

fn bench_resize(c: &mut Criterion) {
    let mut group = c.benchmark_group("resize");

    for depth in [Depth::Shallow, Depth::Deep] {
        group.bench_function(BenchmarkId::new("one_to_three_columns", depth.name()), |b| {
            b.iter_batched(
                || scrolled(depth),
                |mut sim| {
                    sim.resize(black_box(Viewport::new(1200, 800)))
                        .expect("resize");
                    black_box(sim.snapshot())
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_scroll_step, bench_resize);
criterion_main!(benches);

use bracket_engine::bracket::{
    BracketFormat, BracketState, GenerateBracket, GenerationInput, Generator, ResultReport,
    SeedingMethod,
};
use bracket_engine::groups::GroupConfig;
use bracket_engine::{Actor, MatchTarget, ParticipantId};
use chrono::Utc;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn generate(format: BracketFormat, n: usize, config: Option<GroupConfig>) -> BracketState {
    let seeds: Vec<ParticipantId> = (1..=n as ParticipantId).collect();
    Generator::for_format(format, config)
        .generate(&GenerationInput {
            stage_id: 1,
            seeding_method: SeedingMethod::Manual,
            seeds: &seeds,
            now: Utc::now(),
        })
        .unwrap()
}

/// Record a result for every open match, favourite always winning
fn play_out(state: &mut BracketState) {
    loop {
        let next = state
            .matches
            .iter()
            .find(|m| !m.state.is_settled())
            .map(|m| m.id);
        let Some(match_id) = next else {
            break;
        };
        state
            .record_result(
                &Actor::Operator,
                MatchTarget::Match(match_id),
                ResultReport::new(2, 1),
                Utc::now(),
            )
            .unwrap();
    }
}

/// Benchmark generation for each format at growing field sizes
fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");

    for n in [8usize, 64, 256, 1000] {
        group.bench_with_input(BenchmarkId::new("single_elimination", n), &n, |b, &n| {
            b.iter(|| generate(BracketFormat::SingleElimination, black_box(n), None));
        });
        group.bench_with_input(BenchmarkId::new("double_elimination", n), &n, |b, &n| {
            b.iter(|| generate(BracketFormat::DoubleElimination, black_box(n), None));
        });
    }

    for n in [16usize, 64] {
        let config = GroupConfig {
            group_count: (n / 4) as u32,
            ..GroupConfig::default()
        };
        group.bench_with_input(BenchmarkId::new("round_robin", n), &n, |b, &n| {
            b.iter(|| generate(BracketFormat::RoundRobin, black_box(n), Some(config.clone())));
        });
    }

    group.finish();
}

/// Benchmark propagation: playing a whole bracket result by result
fn bench_play_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("play_out");

    for n in [16usize, 128] {
        let fresh = generate(BracketFormat::DoubleElimination, n, None);
        group.bench_with_input(BenchmarkId::new("double_elimination", n), &fresh, |b, fresh| {
            b.iter(|| {
                let mut state = fresh.clone();
                play_out(&mut state);
                black_box(state.champion())
            });
        });
    }

    let groups = generate(
        BracketFormat::RoundRobin,
        32,
        Some(GroupConfig {
            group_count: 4,
            ..GroupConfig::default()
        }),
    );
    group.bench_function("round_robin_32", |b| {
        b.iter(|| {
            let mut state = groups.clone();
            play_out(&mut state);
            black_box(state.groups.len())
        });
    });

    group.finish();
}

/// Benchmark placements on a finished bracket
fn bench_placements(c: &mut Criterion) {
    let mut state = generate(BracketFormat::DoubleElimination, 256, None);
    play_out(&mut state);
    let seeds = state.seed_numbers();

    c.bench_function("placements_double_elimination_256", |b| {
        b.iter(|| black_box(state.placements(black_box(&seeds))));
    });
}

criterion_group!(benches, bench_generate, bench_play_out, bench_placements);
criterion_main!(benches);

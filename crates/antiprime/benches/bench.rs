use antiprime::{
    Coordinator, DivisorCounter, Engine, EngineConfig, MAX_WORKERS, NaiveTrialDivision,
    ScoredNumber, SequenceStore, Submission, TrialDivision,
};
use core::hint::black_box;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use std::{sync::Arc, time::Instant};

// Terms appended per benchmark iteration, ending at 5040 (60 divisors).
const TERMS: usize = 18;

fn worker_counts() -> Vec<usize> {
    let max = num_cpus::get().clamp(1, MAX_WORKERS);
    let mut counts = vec![1];
    while counts.last().is_some_and(|&n| n * 2 <= max) {
        counts.push(counts[counts.len() - 1] * 2);
    }
    if counts.last() != Some(&max) {
        counts.push(max);
    }
    counts
}

/// Divisor counting on a single thread, one candidate at a time.
fn bench_counters(c: &mut Criterion) {
    const UPTO: u64 = 5040;
    let mut group = c.benchmark_group("divisors");
    group.throughput(Throughput::Elements(UPTO));

    group.bench_function(format!("trial_division/{UPTO}"), |b| {
        b.iter(|| {
            for n in 1..=UPTO {
                black_box(TrialDivision.count_divisors(black_box(n)));
            }
        });
    });
    group.bench_function(format!("naive/{UPTO}"), |b| {
        b.iter(|| {
            for n in 1..=UPTO {
                black_box(NaiveTrialDivision.count_divisors(black_box(n)));
            }
        });
    });

    group.finish();
}

/// Drives the dispatch and commit protocol from one thread with no workers,
/// measuring coordination overhead per candidate.
fn bench_protocol(c: &mut Criterion) {
    let mut group = c.benchmark_group("protocol");
    group.throughput(Throughput::Elements(TERMS as u64));

    group.bench_function(format!("terms/{TERMS}"), |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();
            for _ in 0..iters {
                let coordinator = Arc::new(Coordinator::new(Arc::new(SequenceStore::new())));
                for _ in 0..TERMS {
                    let handle = coordinator.extend().unwrap();
                    loop {
                        let candidate = coordinator.next_candidate().unwrap();
                        let divisors = TrialDivision.count_divisors(candidate.value());
                        if let Submission::Retired(_) =
                            coordinator.submit_result(candidate, divisors).unwrap()
                        {
                            break;
                        }
                    }
                    black_box(handle.wait().unwrap());
                }
            }
            start.elapsed()
        });
    });

    group.finish();
}

/// Full engine: computes the first terms with pools of increasing size.
fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine");
    group.sample_size(10);
    group.sampling_mode(criterion::SamplingMode::Flat);
    group.throughput(Throughput::Elements(TERMS as u64));

    for num_workers in worker_counts() {
        group.bench_function(format!("terms/{TERMS}/workers/{num_workers}"), |b| {
            b.iter_custom(|iters| {
                let engine =
                    Engine::new(EngineConfig::default().with_num_workers(num_workers)).unwrap();
                let start = Instant::now();
                for _ in 0..iters {
                    engine.reset_sequence();
                    for _ in 0..TERMS {
                        black_box(engine.extend_and_wait().unwrap());
                    }
                }
                let elapsed = start.elapsed();
                if iters > 0 {
                    assert_eq!(engine.last(), ScoredNumber::new(5040, 60));
                }
                engine.stop();
                elapsed
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_counters, bench_protocol, bench_engine);
criterion_main!(benches);

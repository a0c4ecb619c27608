//! Ranking throughput over a large rule base

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use diagnosis_engine::{rank, EngineConfig};
use rule_store::{Rule, RuleCollection, RuleId};

fn rule_base(size: usize) -> RuleCollection {
    (0..size)
        .map(|i| {
            let conditions = (0..4).map(|j| format!("symptom_{}", (i + j * 7) % 97)).collect();
            let rule = Rule::new(conditions, format!("Pest {}", i))
                .with_certainty(0.5 + (i % 50) as f64 / 100.0)
                .with_source("Generated");
            (RuleId::from_number(i as u64 + 1), rule)
        })
        .collect()
}

fn bench_rank(c: &mut Criterion) {
    let rules = rule_base(5_000);
    let symptoms: Vec<String> = (0..6).map(|i| format!("symptom_{}", i * 11)).collect();
    let config = EngineConfig::default();

    c.bench_function("rank_5000_rules", |b| {
        b.iter(|| rank(black_box(&rules), black_box(&symptoms), &config))
    });
}

criterion_group!(benches, bench_rank);
criterion_main!(benches);

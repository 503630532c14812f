use council_core::models::{ExecutionMode, RequestId, Subtask, SubtaskId, TaskKind};
use council_core::registry::ModelRegistry;
use council_core::router::Router;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::collections::HashSet;

fn bench_router_rank(c: &mut Criterion) {
    let registry = ModelRegistry::new();
    let router = Router::new(registry);
    let available: HashSet<String> = ["groq", "together", "openrouter", "ollama"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let subtask = Subtask {
        id: SubtaskId::nil(),
        parent_id: RequestId::nil(),
        content: "Summarize the causes of the French Revolution.".to_string(),
        kind: TaskKind::Reasoning,
        priority: 0,
        risk: 0.2,
        accuracy_requirement: 0.8,
    };

    c.bench_function("router_rank_balanced", |b| {
        b.iter(|| {
            let _ranking =
                router.rank(black_box(&subtask), ExecutionMode::Balanced, black_box(&available));
        });
    });

    c.bench_function("router_rank_best_quality", |b| {
        b.iter(|| {
            let _ranking = router.rank(
                black_box(&subtask),
                ExecutionMode::BestQuality,
                black_box(&available),
            );
        });
    });
}

fn bench_registry_lookup(c: &mut Criterion) {
    let registry = ModelRegistry::new();
    c.bench_function("registry_models_for_kind", |b| {
        b.iter(|| {
            let _ids = registry.models_for_kind(black_box(TaskKind::Reasoning));
        });
    });
}

fn bench_model_registry_construction(c: &mut Criterion) {
    c.bench_function("model_registry_new", |b| {
        b.iter(ModelRegistry::new);
    });
}

criterion_group!(
    benches,
    bench_router_rank,
    bench_registry_lookup,
    bench_model_registry_construction
);
criterion_main!(benches);

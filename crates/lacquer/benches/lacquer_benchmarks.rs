use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use lacquer::{
    Block, Engine, Props, RuleSet, SharedManager, SheetOptions, SheetRegistry, StyleBinding,
    StyleEngine, compose, split_dynamic,
};
use std::sync::Arc;

fn static_rules(n: usize) -> RuleSet {
    let mut rules = RuleSet::new();
    for i in 0..n {
        rules.set(
            format!("rule-{i}"),
            Block::new()
                .set("color", "#336699")
                .set("margin", "4px 8px")
                .set("line-height", 1.4),
        );
    }
    rules
}

fn mixed_rules(n: usize) -> RuleSet {
    let mut rules = RuleSet::new();
    for i in 0..n {
        let block = if i % 2 == 0 {
            Block::new()
                .set("color", "#336699")
                .computed("width", |p: &Props| p.get("width").cloned())
        } else {
            Block::new().set("color", "#336699")
        };
        rules.set(format!("rule-{i}"), block);
    }
    rules
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("lacquer/compile");

    let engine = Engine::new();
    let small = static_rules(3);
    let large = static_rules(50);

    group.bench_function("compile/3_rules", |b| {
        b.iter(|| black_box(engine.compile(small.clone(), SheetOptions::new().meta("Bench"))));
    });

    group.bench_function("compile/50_rules", |b| {
        b.iter(|| black_box(engine.compile(large.clone(), SheetOptions::new().meta("Bench"))));
    });

    group.finish();
}

fn bench_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("lacquer/cache");

    let engine = Engine::new();
    let manager: SharedManager<&'static str> = SharedManager::new();
    let sheet = engine.compile(static_rules(10), SheetOptions::new());
    manager.put("bench", sheet).unwrap();

    group.bench_function("acquire_release", |b| {
        b.iter(|| {
            let sheet = manager.acquire(&"bench").unwrap();
            black_box(&sheet);
            manager.release(&"bench").unwrap();
        });
    });

    group.bench_function("lease_round_trip", |b| {
        b.iter(|| {
            let lease = manager.lease(&"bench").unwrap();
            black_box(lease.artifact());
        });
    });

    group.bench_function("get", |b| {
        b.iter(|| black_box(manager.get(&"bench")));
    });

    group.finish();
}

fn bench_compose(c: &mut Criterion) {
    let mut group = c.benchmark_group("lacquer/compose");

    let engine = Engine::new();
    let sheet = engine.compile(mixed_rules(20), SheetOptions::new().meta("Bench"));

    group.bench_function("split_dynamic/20_rules", |b| {
        b.iter(|| black_box(split_dynamic(sheet.rules())));
    });

    group.bench_function("split_and_compose/20_rules", |b| {
        b.iter(|| black_box(compose(sheet.classes(), split_dynamic(sheet.rules()))));
    });

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("lacquer/render");

    let engine = Engine::new();
    let sheet = engine.compile(static_rules(50), SheetOptions::new().meta("Bench"));
    group.throughput(Throughput::Bytes(sheet.to_css().len() as u64));
    group.bench_function("sheet_to_css/50_rules", |b| {
        b.iter(|| black_box(sheet.to_css()));
    });

    let mut registry = SheetRegistry::new();
    for i in 0..10 {
        let sheet = engine.compile(
            static_rules(10),
            SheetOptions::new().meta("Bench").index(i),
        );
        sheet.attach();
        registry.add(sheet);
    }
    group.bench_function("registry_to_css/10_sheets", |b| {
        b.iter(|| black_box(registry.to_css()));
    });

    group.finish();
}

fn bench_binding(c: &mut Criterion) {
    let mut group = c.benchmark_group("lacquer/binding");

    let static_binding = StyleBinding::with_engine(static_rules(5), Arc::new(Engine::new()))
        .with_manager(SharedManager::new())
        .meta("Bench");
    group.bench_function("attach_drop/static", |b| {
        b.iter(|| {
            let styles = static_binding.attach(None, &Props::new()).unwrap();
            black_box(styles.classes());
        });
    });

    let dynamic_binding = StyleBinding::with_engine(mixed_rules(5), Arc::new(Engine::new()))
        .with_manager(SharedManager::new())
        .meta("Bench");
    let props = Props::new().set("width", "10px");
    group.bench_function("attach_drop/dynamic", |b| {
        b.iter(|| {
            let styles = dynamic_binding.attach(None, &props).unwrap();
            black_box(styles.classes());
        });
    });

    group.bench_function("update/dynamic", |b| {
        let styles = dynamic_binding.attach(None, &props).unwrap();
        let next = Props::new().set("width", "20px");
        b.iter(|| styles.update(black_box(&next)));
    });

    group.finish();
}

criterion_group!(
    lacquer_benches,
    bench_compile,
    bench_cache,
    bench_compose,
    bench_render,
    bench_binding
);
criterion_main!(lacquer_benches);

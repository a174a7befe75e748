use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ferrous_plan::provider::{CandidateProvider, SymbolTableProvider};
use ferrous_plan::*;

/// A layered application: each layer depends on the previous one, half
/// through interfaces, with a decorator and a plugin per layer.
fn layered(layers: usize, width: usize) -> CandidateSet {
    let mut types = Vec::new();
    for layer in 0..layers {
        for i in 0..width {
            let name = format!("App.L{}.S{}", layer, i);
            let iface = format!("App.L{}.IS{}", layer, i);
            types.push(CandidateType::interface(iface.as_str()));
            let mut ty = CandidateType::class(name.as_str()).implements(iface.as_str());
            if layer > 0 {
                let dep = if i % 2 == 0 {
                    format!("App.L{}.S{}", layer - 1, i)
                } else {
                    format!("App.L{}.IS{}", layer - 1, i)
                };
                ty = ty.ctor([dep]);
            }
            if i % 3 == 0 {
                ty = ty.lifetime(Lifetime::Scoped);
            }
            types.push(ty);
        }
        let decorated = format!("App.L{}.IS0", layer);
        types.push(
            CandidateType::class(format!("App.L{}.Logged", layer).as_str())
                .implements(decorated.as_str())
                .ctor([decorated.as_str()])
                .marker(Marker::DecoratorFor { service: decorated.as_str().into(), order: 0 }),
        );
        types.push(CandidateType::class(format!("App.L{}.Setup", layer).as_str()).marker(Marker::PluginRole));
    }
    types.into_iter().collect()
}

fn symbol_table(types: usize) -> String {
    let mut table = String::from("unit App\n");
    for i in 0..types {
        table.push_str(&format!("interface App.IS{}\nclass App.S{} : App.IS{}\n", i, i, i));
        if i > 0 {
            table.push_str(&format!("  ctor(App.IS{}, int)\n  @DependsOn(App.IS{})\n  @Scoped\n", i - 1, i - 1));
        }
    }
    table
}

fn bench_full_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan");
    for layers in [4usize, 16, 64] {
        let candidates = layered(layers, 8);
        let planner = Planner::default();
        group.bench_with_input(BenchmarkId::new("layers", layers), &candidates, |b, candidates| {
            b.iter(|| {
                let report = planner.plan(black_box(candidates)).unwrap();
                black_box(report.plan.len());
            })
        });
    }
    group.finish();
}

fn bench_cycle_detection(c: &mut Criterion) {
    let mut group = c.benchmark_group("cycles");
    for depth in [10usize, 100, 1000] {
        let candidates: CandidateSet = (0..depth)
            .map(|i| CandidateType::class(format!("App.N{}", i).as_str()).ctor([format!("App.N{}", (i + 1) % depth)]))
            .collect();
        let framework = FrameworkTypes::default();
        let mut diagnostics = Vec::new();
        let classes = Classifications::compute(&candidates, &TypeClassifier::new(&framework), &mut diagnostics);
        let graph = DependencyGraphBuilder::new(&candidates, &classes, &framework).build(&mut diagnostics);

        group.bench_with_input(BenchmarkId::new("ring", depth), &graph, |b, graph| {
            b.iter(|| black_box(CycleDetector::new(graph).detect().len()))
        });
    }
    group.finish();
}

fn bench_symbol_table(c: &mut Criterion) {
    let table = symbol_table(500);
    c.bench_function("symbol_table_500", |b| {
        b.iter(|| {
            let candidates = SymbolTableProvider::new(black_box(table.as_str())).provide().unwrap();
            black_box(candidates.len());
        })
    });
}

criterion_group!(benches, bench_full_pass, bench_cycle_detection, bench_symbol_table);
criterion_main!(benches);

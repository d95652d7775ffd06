use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use neatc::eligibility::PlanCache;
use neatc::graph::{Graph, GraphKind, NodeKind};
use neatc::lower::{lower_graph, LowerOptions};
use neatc::registry::{FunctionRef, Registry};
use neatc::synth::Synthesizer;
use std::path::Path;

// Throughput scenarios for synthesis and lowering.
// All scenarios use samples/spawning.nrl.

fn registry() -> Registry {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).parent().unwrap();
    let mut registry = Registry::with_prelude();
    registry
        .load_library(&root.join("samples/spawning.nrl"))
        .expect("sample library loads");
    registry.link().expect("sample library links");
    registry
}

/// `n` intent nodes alternating delegate calls and validated constructs,
/// each chained after the previous one.
fn generate_graph(registry: &Registry, n: usize) -> Graph {
    let mut g = Graph::new("bench", GraphKind::EventGraph);
    g.host_class = Some("ArenaScript".to_string());
    let synth = Synthesizer::new(registry, true);
    let mut last = None;
    for i in 0..n {
        let node = if i % 2 == 0 {
            g.add_node(NodeKind::IntentCall {
                function: FunctionRef::new("Assets", "LoadAsync"),
            })
        } else {
            g.add_node(NodeKind::IntentConstruct {
                function: FunctionRef::new("Spawning", "SpawnPickup"),
            })
        };
        synth.synthesize(&mut g, node).unwrap();
        if i % 2 == 1 {
            let class = g.find_pin(node, "Class").unwrap();
            g.set_default(class, Some("Pickup".to_string()));
            synth.synthesize(&mut g, node).unwrap();
            let amount = g.find_pin(node, "Amount").unwrap();
            g.set_default(amount, Some(format!("{i}")));
        }
        if let Some(prev) = last {
            let then = g.find_pin(prev, "then").unwrap();
            let exec = g.find_pin(node, "execute").unwrap();
            g.connect(registry, then, exec).unwrap();
        }
        last = Some(node);
    }
    g
}

fn bench_synthesis(c: &mut Criterion) {
    let registry = registry();
    let mut group = c.benchmark_group("synth/resynthesize");
    for n in [10_usize, 100, 500] {
        let graph = generate_graph(&registry, n);
        group.bench_with_input(BenchmarkId::from_parameter(format!("{n}nodes")), &graph, |b, graph| {
            b.iter_batched(
                || graph.clone(),
                |mut g| {
                    let synth = Synthesizer::new(&registry, true);
                    for id in g.node_ids() {
                        black_box(synth.synthesize(&mut g, id).unwrap());
                    }
                    g
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_lowering(c: &mut Criterion) {
    let registry = registry();
    let mut group = c.benchmark_group("lower/graph");
    for n in [10_usize, 100, 500] {
        let graph = generate_graph(&registry, n);
        group.bench_with_input(BenchmarkId::from_parameter(format!("{n}nodes")), &graph, |b, graph| {
            b.iter_batched(
                || graph.clone(),
                |mut g| {
                    let mut cache = PlanCache::new(true);
                    let result = lower_graph(&mut g, &registry, &mut cache, &LowerOptions::default());
                    black_box(result.created);
                    g
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_synthesis, bench_lowering);
criterion_main!(benches);

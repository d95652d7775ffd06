// End-to-end lowering of the sample documents, plus the observable
// properties of synthesis, expansion and the auto-wire correction.
//
// Uses the library API (registry → document → pipeline) and snapshots a
// sorted textual rendering of the lowered graph with `insta`.

use std::path::{Path, PathBuf};

use neatc::diag::{codes, has_errors};
use neatc::document;
use neatc::eligibility::PlanCache;
use neatc::graph::{Category, Direction, Graph, GraphKind, NodeKind};
use neatc::id::NodeId;
use neatc::lower::{lower_graph, verify, LowerOptions};
use neatc::pass::PassId;
use neatc::pipeline::{run_pipeline, CompilationState};
use neatc::registry::{FunctionRef, Registry};
use neatc::session::{EditSession, SessionOptions};
use neatc::synth::Synthesizer;

// ── Helpers ─────────────────────────────────────────────────────────────────

fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .to_path_buf()
}

fn sample_registry() -> Registry {
    let mut registry = Registry::with_prelude();
    registry
        .load_library(&project_root().join("samples/spawning.nrl"))
        .unwrap();
    registry.link().unwrap();
    registry
}

fn lower_sample(name: &str) -> CompilationState {
    let text = std::fs::read_to_string(project_root().join("samples").join(name)).unwrap();
    let doc = document::parse(&text).unwrap();
    let mut state = CompilationState::new(doc, sample_registry(), LowerOptions::default());
    run_pipeline(&mut state, PassId::Lower, |_, _| {}).unwrap();
    state
}

fn render_nodes(g: &Graph) -> String {
    g.nodes()
        .map(|n| format!("{} {}", n.id, n.kind))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_links(g: &Graph) -> String {
    let mut lines: Vec<String> = g
        .links()
        .into_iter()
        .map(|(o, i)| {
            let (o, i) = (g.pin(o).unwrap(), g.pin(i).unwrap());
            format!("{}.{} -> {}.{}", o.owner, o.name, i.owner, i.name)
        })
        .collect();
    lines.sort();
    lines.join("\n")
}

fn literal(g: &Graph, node: u32, pin: &str) -> Option<String> {
    let p = g.find_pin_dir(NodeId(node), pin, Direction::Input)?;
    g.pin(p)?.literal().map(str::to_string)
}

// ── Sample documents ────────────────────────────────────────────────────────

#[test]
fn load_asset_lowers_to_call_and_event_sinks() {
    let state = lower_sample("load_asset.json");
    assert!(state.diagnostics.is_empty(), "{:?}", state.diagnostics);
    let g = state.graph.unwrap();

    insta::assert_snapshot!(render_nodes(&g), @r"
    n2 Primitive.Call Assets.PrintText
    n3 Primitive.Call Assets.UseHandle
    n4 Primitive.Call Assets.LoadAsync
    n5 Primitive.EventSink OnDone_1
    n6 Primitive.EventSink OnTick_1
    ");
    insta::assert_snapshot!(render_links(&g), @r"
    n4.Handle -> n3.Handle
    n4.then -> n3.execute
    n5.Path -> n2.Text
    n5.self -> n4.OnDone
    n5.then -> n2.execute
    n6.self -> n4.OnTick
    ");
    assert_eq!(literal(&g, 4, "Path").as_deref(), Some("/Game/Hero"));
}

#[test]
fn spawn_pickup_lowers_to_validated_chain() {
    let state = lower_sample("spawn_pickup.json");
    assert!(state.diagnostics.is_empty(), "{:?}", state.diagnostics);
    assert!(state.cert.as_ref().unwrap().all_pass());
    let g = state.graph.unwrap();

    insta::assert_snapshot!(render_nodes(&g), @r"
    n2 Primitive.Call Assets.PrintText
    n3 Primitive.Call Assets.PrintText
    n4 Primitive.Call Spawning.SpawnPickup
    n5 Primitive.Call SystemLibrary.IsValid
    n6 Primitive.Branch
    n7 Primitive.Call SystemLibrary.SetIntPropertyByName
    n8 Primitive.Call Pickup.SetTint
    n9 Primitive.Call Spawning.FinishSpawn
    ");
    insta::assert_snapshot!(render_links(&g), @r"
    n4.ReturnValue -> n5.Object
    n4.ReturnValue -> n7.Object
    n4.ReturnValue -> n8.self
    n4.ReturnValue -> n9.Thing
    n4.then -> n6.execute
    n5.ReturnValue -> n6.Condition
    n6.else -> n3.execute
    n6.then -> n7.execute
    n7.then -> n8.execute
    n8.then -> n9.execute
    n9.then -> n2.execute
    ");

    assert_eq!(literal(&g, 4, "Class").as_deref(), Some("Pickup"));
    assert_eq!(literal(&g, 7, "PropertyName").as_deref(), Some("Amount"));
    assert_eq!(literal(&g, 7, "Value").as_deref(), Some("25"));
    assert_eq!(literal(&g, 8, "NewTint").as_deref(), Some("Blue"));
    assert_eq!(literal(&g, 9, "Delay").as_deref(), Some("0.5"));
}

#[test]
fn hidden_spawn_parameters_never_become_pins() {
    let text = std::fs::read_to_string(project_root().join("samples/spawn_pickup.json")).unwrap();
    let loaded = document::load(&text, &sample_registry(), true).unwrap();
    let g = &loaded.graph;
    let names: Vec<_> = g.pins_of(NodeId(1)).iter().map(|p| p.name.clone()).collect();
    assert!(names.contains(&"Tags".to_string()));
    assert!(!names.contains(&"Secret".to_string()));
    assert!(!names.contains(&"Internal".to_string()));
    assert!(!names.contains(&"Thing".to_string()));
    // The host class asks to show the world-context pin of static functions.
    let ctx = g.find_pin(NodeId(1), "WorldContextObject").unwrap();
    assert!(!g.pin(ctx).unwrap().hidden);
}

// ── Properties ──────────────────────────────────────────────────────────────

const LIB: &str = r#"
    delegate OnDone(A: int, B: string);
    delegate OnAsk(Key: string) -> bool;
    delegate OnFill(out Result: int);
    delegate OnEdit(ref Value: int);
    class Thing : Object {
        #[ExposeOnSpawn] prop P1: int;
        #[ExposeOnSpawn] prop P2: string;
        #[ExposeOnSpawn] prop Level: int = 3;
    }
    library Lib {
        #[NeatDelegateFunction]
        fn Load(Cb: delegate<OnDone>, Ask: delegate<OnAsk>, Fill: delegate<OnFill>, Edit: delegate<OnEdit>);
        #[NeatConstructor]
        fn Make(Class: class<Thing>) -> object<Thing>;
        #[NeatConstructor, RequiresValidation]
        fn MakeChecked(Class: class<Thing>) -> object<Thing>;
        fn GetInt() -> int;
        fn GetString() -> string;
        fn UseInt(X: int);
        fn UseString(S: string);
        fn Start();
        fn End();
    }
"#;

fn registry() -> Registry {
    Registry::from_source(LIB).unwrap()
}

fn add(g: &mut Graph, reg: &Registry, kind: NodeKind) -> NodeId {
    let n = g.add_node(kind);
    Synthesizer::new(reg, true).synthesize(g, n).unwrap();
    n
}

fn call(name: &str) -> NodeKind {
    NodeKind::Call {
        function: FunctionRef::new("Lib", name),
    }
}

fn pin(g: &Graph, node: NodeId, name: &str) -> neatc::id::PinId {
    g.find_pin(node, name)
        .unwrap_or_else(|| panic!("{node} has no pin '{name}'"))
}

#[test]
fn control_outputs_match_eligible_callbacks() {
    let reg = registry();
    let mut g = Graph::new("g", GraphKind::EventGraph);
    let n = add(
        &mut g,
        &reg,
        NodeKind::IntentCall {
            function: FunctionRef::new("Lib", "Load"),
        },
    );
    let control_outs: Vec<_> = g
        .pins_of(n)
        .iter()
        .filter(|p| p.category == Category::Control && p.direction == Direction::Output)
        .map(|p| p.name.clone())
        .collect();
    // `then` plus the two eligible callbacks; OnAsk returns and OnFill has an output.
    assert_eq!(control_outs, vec!["then", "Cb", "Edit"]);
    assert!(g.find_pin(n, "Ask").is_some());
    assert!(g.find_pin(n, "Fill").is_some());
}

#[test]
fn resynthesis_is_idempotent() {
    let reg = registry();
    let mut g = Graph::new("g", GraphKind::EventGraph);
    let n = add(
        &mut g,
        &reg,
        NodeKind::IntentCall {
            function: FunctionRef::new("Lib", "Load"),
        },
    );
    let before: Vec<_> = g.node(n).unwrap().pins.clone();
    let report = Synthesizer::new(&reg, true).synthesize(&mut g, n).unwrap();
    assert!(!report.changed());
    assert_eq!(g.node(n).unwrap().pins, before);
}

#[test]
fn delegate_expansion_moves_scoped_links() {
    let reg = registry();
    let mut g = Graph::new("g", GraphKind::EventGraph);
    let n = add(
        &mut g,
        &reg,
        NodeKind::IntentCall {
            function: FunctionRef::new("Lib", "Load"),
        },
    );
    let ui = add(&mut g, &reg, call("UseInt"));
    let us = add(&mut g, &reg, call("UseString"));
    g.connect(&reg, pin(&g, n, "Cb_A"), pin(&g, ui, "X")).unwrap();
    g.connect(&reg, pin(&g, n, "Cb_B"), pin(&g, us, "S")).unwrap();

    let mut cache = PlanCache::new(true);
    let result = lower_graph(&mut g, &reg, &mut cache, &LowerOptions::default());
    assert!(!has_errors(&result.diagnostics));

    let sinks: Vec<_> = g
        .nodes()
        .filter(|n| matches!(&n.kind, NodeKind::EventSink { delegate, .. } if delegate == "OnDone"))
        .map(|n| n.id)
        .collect();
    assert_eq!(sinks.len(), 1);
    let a = pin(&g, sinks[0], "A");
    let b = pin(&g, sinks[0], "B");
    assert_eq!(g.pin(a).unwrap().links, vec![pin(&g, ui, "X")]);
    assert_eq!(g.pin(b).unwrap().links, vec![pin(&g, us, "S")]);
    // Moved, not duplicated.
    assert_eq!(g.pin(pin(&g, ui, "X")).unwrap().links.len(), 1);
    assert_eq!(g.link_count(), 4);
}

#[test]
fn construct_chain_follows_pin_order() {
    let reg = registry();
    let mut g = Graph::new("g", GraphKind::EventGraph);
    let n = add(
        &mut g,
        &reg,
        NodeKind::IntentConstruct {
            function: FunctionRef::new("Lib", "Make"),
        },
    );
    g.set_default(pin(&g, n, "Class"), Some("Thing".into()));
    Synthesizer::new(&reg, true).synthesize(&mut g, n).unwrap();
    let gi = add(&mut g, &reg, call("GetInt"));
    let gs = add(&mut g, &reg, call("GetString"));
    let end = add(&mut g, &reg, call("End"));
    g.connect(&reg, pin(&g, gi, "ReturnValue"), pin(&g, n, "P1")).unwrap();
    g.connect(&reg, pin(&g, gs, "ReturnValue"), pin(&g, n, "P2")).unwrap();
    g.connect(&reg, pin(&g, n, "then"), pin(&g, end, "execute")).unwrap();

    let mut cache = PlanCache::new(true);
    let result = lower_graph(&mut g, &reg, &mut cache, &LowerOptions::default());
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    assert_eq!(result.created, 3);

    // Walk the chain from the construct call.
    let construct = g
        .nodes()
        .find(|n| n.kind.function().is_some_and(|f| f.name == "Make"))
        .unwrap()
        .id;
    let mut chain = Vec::new();
    let mut at = construct;
    loop {
        let then = g.find_pin_dir(at, "then", Direction::Output).unwrap();
        let Some(&next) = g.pin(then).unwrap().links.first() else {
            break;
        };
        at = g.pin(next).unwrap().owner;
        chain.push(at);
    }
    let assigned: Vec<_> = chain[..2]
        .iter()
        .map(|n| literal(&g, n.0, "PropertyName").unwrap())
        .collect();
    assert_eq!(assigned, vec!["P1", "P2"]);
    assert_eq!(chain[2], end);
}

#[test]
fn unset_class_on_validated_construct_is_one_error_and_no_primitives() {
    let reg = registry();
    let mut g = Graph::new("g", GraphKind::EventGraph);
    let n = add(
        &mut g,
        &reg,
        NodeKind::IntentConstruct {
            function: FunctionRef::new("Lib", "MakeChecked"),
        },
    );
    let start = add(&mut g, &reg, call("Start"));
    g.connect(&reg, pin(&g, start, "then"), pin(&g, n, "execute")).unwrap();

    let mut cache = PlanCache::new(true);
    let result = lower_graph(&mut g, &reg, &mut cache, &LowerOptions::default());
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].code, Some(codes::E0101));
    assert_eq!(result.diagnostics[0].node, Some(n));
    assert_eq!(result.created, 0);
    assert_eq!(g.node_ids(), vec![start]);
    assert_eq!(g.link_count(), 0);
    assert!(verify(&g).all_pass());
}

#[test]
fn default_literal_produces_no_assignment() {
    let reg = registry();
    let mut g = Graph::new("g", GraphKind::EventGraph);
    let n = add(
        &mut g,
        &reg,
        NodeKind::IntentConstruct {
            function: FunctionRef::new("Lib", "Make"),
        },
    );
    g.set_default(pin(&g, n, "Class"), Some("Thing".into()));
    Synthesizer::new(&reg, true).synthesize(&mut g, n).unwrap();
    g.set_default(pin(&g, n, "Level"), Some("3".into()));

    let mut cache = PlanCache::new(true);
    let result = lower_graph(&mut g, &reg, &mut cache, &LowerOptions::default());
    assert!(result.diagnostics.is_empty());
    assert_eq!(result.created, 1);
}

#[test]
fn auto_wire_links_callback_control_once() {
    let reg = registry();
    let mut g = Graph::new("g", GraphKind::EventGraph);
    let n = add(
        &mut g,
        &reg,
        NodeKind::IntentCall {
            function: FunctionRef::new("Lib", "Load"),
        },
    );
    let first = add(&mut g, &reg, call("UseInt"));
    let second = add(&mut g, &reg, call("UseString"));
    let options = SessionOptions {
        auto_wire_control: false,
        ..SessionOptions::default()
    };
    let mut s = EditSession::new(g, &reg, options);

    let cb = pin(s.graph(), n, "Cb");
    s.connect(pin(s.graph(), n, "Cb_A"), pin(s.graph(), first, "X")).unwrap();
    assert_eq!(s.graph().pin(cb).unwrap().links, vec![pin(s.graph(), first, "execute")]);

    s.connect(pin(s.graph(), n, "Cb_B"), pin(s.graph(), second, "S")).unwrap();
    assert_eq!(s.graph().pin(cb).unwrap().links, vec![pin(s.graph(), first, "execute")]);
    s.run_idle();
    assert_eq!(s.graph().pin(cb).unwrap().links, vec![pin(s.graph(), first, "execute")]);
}

#[test]
fn function_graphs_keep_callbacks_as_inputs() {
    let reg = registry();
    let mut g = Graph::new("f", GraphKind::Function);
    let n = add(
        &mut g,
        &reg,
        NodeKind::IntentCall {
            function: FunctionRef::new("Lib", "Load"),
        },
    );
    assert!(g.find_pin(n, "Cb_A").is_none());
    let cb = g.find_pin(n, "Cb").unwrap();
    assert_eq!(g.pin(cb).unwrap().direction, Direction::Input);

    let mut cache = PlanCache::new(true);
    let result = lower_graph(&mut g, &reg, &mut cache, &LowerOptions::default());
    assert_eq!(result.created, 1);
    assert!(g.nodes().all(|n| matches!(n.kind, NodeKind::Call { .. })));
}

// dot.rs — Graphviz DOT output for node graphs
//
// Renders a graph (before or after lowering) in DOT format. Primitives
// expanded from the same intent node share a cluster labelled with that
// node's id, so a lowered chain can be traced back to what the user placed.
//
// Preconditions: none.
// Postconditions: returns a valid DOT string; output is deterministic.
// Failure modes: none (pure string formatting).
// Side effects: none.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::graph::{Graph, Node, NodeKind};
use crate::id::NodeId;

/// Emit `graph` as a Graphviz DOT string.
pub fn emit_dot(graph: &Graph) -> String {
    let mut buf = String::new();
    writeln!(buf, "digraph {} {{", sanitize(&graph.name)).unwrap();
    writeln!(buf, "    rankdir=LR;").unwrap();
    writeln!(buf, "    node [fontname=\"Helvetica\", fontsize=10];").unwrap();
    writeln!(buf, "    edge [fontname=\"Helvetica\", fontsize=9];").unwrap();

    let mut clusters: BTreeMap<NodeId, Vec<&Node>> = BTreeMap::new();
    let mut loose = Vec::new();
    for node in graph.nodes() {
        match node.origin {
            Some(origin) => clusters.entry(origin).or_default().push(node),
            None => loose.push(node),
        }
    }

    if !loose.is_empty() {
        writeln!(buf).unwrap();
    }
    for node in loose {
        write_node(&mut buf, node, "    ");
    }
    for (origin, nodes) in &clusters {
        writeln!(buf).unwrap();
        writeln!(buf, "    subgraph cluster_n{} {{", origin.0).unwrap();
        writeln!(buf, "        label=\"expanded from {origin}\";").unwrap();
        writeln!(buf, "        style=rounded;").unwrap();
        writeln!(buf, "        color=gray50;").unwrap();
        for node in nodes {
            write_node(&mut buf, node, "        ");
        }
        writeln!(buf, "    }}").unwrap();
    }

    let links = graph.links();
    if !links.is_empty() {
        writeln!(buf).unwrap();
    }
    for (out, inp) in links {
        let (Some(o), Some(i)) = (graph.pin(out), graph.pin(inp)) else {
            continue;
        };
        if o.is_control() {
            writeln!(
                buf,
                "    n{} -> n{} [taillabel=\"{}\", style=bold];",
                o.owner.0,
                i.owner.0,
                escape(&o.name)
            )
            .unwrap();
        } else {
            writeln!(
                buf,
                "    n{} -> n{} [label=\"{} → {}\", color=blue];",
                o.owner.0,
                i.owner.0,
                escape(&o.name),
                escape(&i.name)
            )
            .unwrap();
        }
    }

    writeln!(buf, "}}").unwrap();
    buf
}

// ── Helpers ─────────────────────────────────────────────────────────────────

/// Sanitize a name to valid DOT identifier characters.
fn sanitize(name: &str) -> String {
    let s: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if s.is_empty() || s.starts_with(|c: char| c.is_ascii_digit()) {
        format!("g_{s}")
    } else {
        s
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn node_label(kind: &NodeKind) -> String {
    match kind {
        NodeKind::IntentCall { function } | NodeKind::IntentConstruct { function } => {
            format!("«{}»", function)
        }
        NodeKind::Call { function } => function.to_string(),
        NodeKind::EventSink { event_name, .. } => format!("on {event_name}"),
        NodeKind::Branch => "Branch".to_string(),
        NodeKind::EnumLiteral { enum_name } => format!("{enum_name} literal"),
    }
}

fn node_attrs(kind: &NodeKind) -> String {
    let (shape, color, style) = match kind {
        NodeKind::IntentCall { .. } | NodeKind::IntentConstruct { .. } => ("box", "white", "dashed"),
        NodeKind::Call { .. } => ("box", "lightblue", "filled"),
        NodeKind::EventSink { .. } => ("cds", "lightyellow", "filled"),
        NodeKind::Branch => ("diamond", "lightgreen", "filled"),
        NodeKind::EnumLiteral { .. } => ("ellipse", "lightsalmon", "filled"),
    };
    let label = escape(&node_label(kind));
    format!("shape={shape}, style={style}, fillcolor={color}, label=\"{label}\"")
}

fn write_node(buf: &mut String, node: &Node, indent: &str) {
    writeln!(buf, "{indent}n{} [{}];", node.id.0, node_attrs(&node.kind)).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphKind;
    use crate::registry::{FunctionRef, Registry};
    use crate::synth::{spawn_primitive, Synthesizer};

    fn registry() -> Registry {
        Registry::from_source("library Lib { fn A(); fn B(X: int); fn C() -> int; }").unwrap()
    }

    fn call(name: &str) -> NodeKind {
        NodeKind::Call {
            function: FunctionRef::new("Lib", name),
        }
    }

    #[test]
    fn valid_dot_structure() {
        let g = Graph::new("My Graph", GraphKind::EventGraph);
        let dot = emit_dot(&g);
        assert!(dot.starts_with("digraph My_Graph {"));
        assert!(dot.trim_end().ends_with('}'));
    }

    #[test]
    fn links_are_styled_by_category() {
        let reg = registry();
        let mut g = Graph::new("g", GraphKind::EventGraph);
        let synth = Synthesizer::new(&reg, true);
        let a = g.add_node(call("A"));
        let b = g.add_node(call("B"));
        let c = g.add_node(call("C"));
        for n in [a, b, c] {
            synth.synthesize(&mut g, n).unwrap();
        }
        let then = g.find_pin(a, "then").unwrap();
        let exec = g.find_pin(b, "execute").unwrap();
        g.connect(&reg, then, exec).unwrap();
        let ret = g.find_pin(c, "ReturnValue").unwrap();
        let x = g.find_pin(b, "X").unwrap();
        g.connect(&reg, ret, x).unwrap();

        let dot = emit_dot(&g);
        assert!(dot.contains("n0 -> n1 [taillabel=\"then\", style=bold];"));
        assert!(dot.contains("n2 -> n1 [label=\"ReturnValue → X\", color=blue];"));
    }

    #[test]
    fn expanded_nodes_are_clustered_by_origin() {
        let reg = registry();
        let mut g = Graph::new("g", GraphKind::EventGraph);
        let first = spawn_primitive(&mut g, &reg, call("A"), NodeId(42)).unwrap();
        spawn_primitive(&mut g, &reg, NodeKind::Branch, NodeId(42)).unwrap();
        let dot = emit_dot(&g);
        assert!(dot.contains("subgraph cluster_n42 {"));
        assert!(dot.contains("label=\"expanded from n42\";"));
        assert!(dot.contains(&format!("n{} [shape=box, style=filled", first.0)));
        assert!(dot.contains("shape=diamond"));
    }
}

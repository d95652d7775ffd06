// document.rs — JSON graph documents
//
// A document persists what a user authored: nodes with their bindings and
// literal pin values, and links addressed by (node, pin name). Pins are not
// trusted from the file; loading re-synthesizes them from the registry so a
// changed signature refreshes the node instead of corrupting it.
//
// Preconditions: the registry is linked.
// Postconditions: every node's pins match the registry; links obey the
//                 connection rules.
// Failure modes: malformed JSON, duplicate/unknown node ids, rejected links
//                → `DocumentError`; stale pin names → W0200 warnings.
// Side effects: none (pure transformation).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::diag::{codes, Diagnostic};
use crate::graph::{Category, ConnectError, Direction, Graph, GraphKind, NodeKind};
use crate::id::NodeId;
use crate::registry::Registry;
use crate::synth::{literal_class, Synthesizer};
use crate::types::PinType;

// ── Document model ──────────────────────────────────────────────────────────

/// `[node, pin name]`.
pub type LinkEnd = (NodeId, String);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    pub name: String,
    #[serde(default)]
    pub kind: GraphKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_class: Option<String>,
    pub nodes: Vec<NodeDoc>,
    /// Each link is written output end first.
    #[serde(default)]
    pub links: Vec<(LinkEnd, LinkEnd)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDoc {
    pub id: NodeId,
    #[serde(flatten)]
    pub kind: NodeKind,
    /// Literal values of input pins, by pin name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub defaults: BTreeMap<String, String>,
    /// Informational on load; pins are always re-synthesized.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pins: Vec<PinDoc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinDoc {
    pub name: String,
    pub direction: Direction,
    pub category: Category,
    #[serde(rename = "type")]
    pub ty: PinType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_index: Option<usize>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub hidden: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("malformed graph document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("node id {0} appears more than once")]
    DuplicateNode(NodeId),
    #[error("link references unknown node {0}")]
    UnknownNode(NodeId),
    #[error("link {from} -> {to}: {source}")]
    Connect {
        from: String,
        to: String,
        source: ConnectError,
    },
}

/// A materialized graph plus what loading had to say about it.
#[derive(Debug)]
pub struct Loaded {
    pub graph: Graph,
    pub diagnostics: Vec<Diagnostic>,
}

// ── Load ────────────────────────────────────────────────────────────────────

pub fn parse(text: &str) -> Result<GraphDocument, DocumentError> {
    Ok(serde_json::from_str(text)?)
}

pub fn load(text: &str, registry: &Registry, default_finish: bool) -> Result<Loaded, DocumentError> {
    materialize(&parse(text)?, registry, default_finish)
}

/// Build a graph from a parsed document.
pub fn materialize(
    doc: &GraphDocument,
    registry: &Registry,
    default_finish: bool,
) -> Result<Loaded, DocumentError> {
    let mut graph = Graph::new(&doc.name, doc.kind);
    graph.host_class = doc.host_class.clone();
    let mut diagnostics = Vec::new();

    for nd in &doc.nodes {
        if !graph.add_node_with_id(nd.id, nd.kind.clone()) {
            return Err(DocumentError::DuplicateNode(nd.id));
        }
    }

    let synth = Synthesizer::new(registry, default_finish);
    for nd in &doc.nodes {
        if let Err(e) = synth.synthesize(&mut graph, nd.id) {
            // Intent bindings are reported by validation.
            if !nd.kind.is_intent() {
                diagnostics.push(e.to_diagnostic(nd.id));
            }
            continue;
        }
        let mut pending = apply_defaults(&mut graph, nd.id, &nd.defaults);
        // A literal class adds spawn-property pins. Links and the remaining
        // defaults may target them, so they must exist before either.
        if matches!(nd.kind, NodeKind::IntentConstruct { .. }) && literal_class(&graph, nd.id).is_some() {
            if let Err(e) = synth.synthesize(&mut graph, nd.id) {
                diagnostics.push(e.to_diagnostic(nd.id));
            }
            let rest: BTreeMap<String, String> = pending
                .into_iter()
                .filter_map(|name| nd.defaults.get(&name).map(|v| (name, v.clone())))
                .collect();
            pending = apply_defaults(&mut graph, nd.id, &rest);
        }
        for name in pending {
            tracing::warn!("{}: persisted value for unknown pin '{}'", nd.id, name);
            diagnostics.push(
                Diagnostic::warning(nd.id, format!("pin '{name}' no longer exists; its value was dropped"))
                    .with_code(codes::W0200),
            );
        }
    }

    for ((out_node, out_pin), (in_node, in_pin)) in &doc.links {
        for node in [out_node, in_node] {
            if !graph.contains_node(*node) {
                return Err(DocumentError::UnknownNode(*node));
            }
        }
        let out = graph.find_pin_dir(*out_node, out_pin, Direction::Output);
        let inp = graph.find_pin_dir(*in_node, in_pin, Direction::Input);
        let (Some(out), Some(inp)) = (out, inp) else {
            let missing = if out.is_none() { (out_node, out_pin) } else { (in_node, in_pin) };
            diagnostics.push(
                Diagnostic::warning(
                    *missing.0,
                    format!("link to pin '{}' dropped: pin no longer exists", missing.1),
                )
                .with_code(codes::W0200),
            );
            continue;
        };
        graph
            .connect(registry, out, inp)
            .map_err(|source| DocumentError::Connect {
                from: format!("{out_node}.{out_pin}"),
                to: format!("{in_node}.{in_pin}"),
                source,
            })?;
    }

    tracing::debug!(
        "materialized '{}': {} node(s), {} link(s)",
        graph.name,
        graph.node_count(),
        graph.link_count()
    );
    Ok(Loaded { graph, diagnostics })
}

/// Set literal values on input pins. Returns names with no matching pin.
fn apply_defaults(graph: &mut Graph, node: NodeId, defaults: &BTreeMap<String, String>) -> Vec<String> {
    let mut pending = Vec::new();
    for (name, value) in defaults {
        match graph.find_pin_dir(node, name, Direction::Input) {
            Some(pin) => {
                graph.set_default(pin, Some(value.clone()));
            }
            None => pending.push(name.clone()),
        }
    }
    pending
}

// ── Save ────────────────────────────────────────────────────────────────────

/// Snapshot `graph` as a document, pins included.
pub fn save(graph: &Graph) -> GraphDocument {
    let nodes = graph
        .nodes()
        .map(|n| {
            let pins = graph.pins_of(n.id);
            let defaults = pins
                .iter()
                .filter(|p| p.is_input() && p.is_data())
                .filter_map(|p| p.literal().map(|v| (p.name.clone(), v.to_string())))
                .collect();
            NodeDoc {
                id: n.id,
                kind: n.kind.clone(),
                defaults,
                pins: pins
                    .iter()
                    .map(|p| PinDoc {
                        name: p.name.clone(),
                        direction: p.direction,
                        category: p.category,
                        ty: p.ty.clone(),
                        default: p.default_value.clone(),
                        source_index: p.source_index,
                        hidden: p.hidden,
                    })
                    .collect(),
            }
        })
        .collect();

    let mut links = Vec::new();
    for (out, inp) in graph.links() {
        if let (Some(o), Some(i)) = (graph.pin(out), graph.pin(inp)) {
            links.push(((o.owner, o.name.clone()), (i.owner, i.name.clone())));
        }
    }
    GraphDocument {
        name: graph.name.clone(),
        kind: graph.kind,
        host_class: graph.host_class.clone(),
        nodes,
        links,
    }
}

pub fn to_json(graph: &Graph) -> Result<String, DocumentError> {
    Ok(serde_json::to_string_pretty(&save(graph))?)
}

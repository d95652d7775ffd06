// lower.rs — Batch lowering driver
//
// Visits every intent node of a graph exactly once, dispatching to the
// matching expander, then checks the lowering certificate: a primitive-only
// graph whose links are symmetric, live and within multiplicity.
//
// Preconditions: pins are synthesized (`Materialize` ran).
// Postconditions: no intent node remains; every failure is a diagnostic
//                 attached to the originating node id.
// Failure modes: unknown/ineligible bindings (E0100/E0104, node detached),
//                expander diagnostics (E0101/E0102/E0103), certificate (E0600).
// Side effects: mutates the graph.

use std::collections::HashSet;

use serde::Serialize;

use crate::construct;
use crate::delegate;
use crate::diag::{codes, DiagLevel, Diagnostic};
use crate::eligibility::{ExpandError, PlanCache};
use crate::graph::{Graph, NodeKind};
use crate::id::NodeId;
use crate::registry::Registry;

#[derive(Debug, Clone, Copy)]
pub struct LowerOptions {
    /// Check the certificate after lowering.
    pub verify: bool,
    /// Use the prelude finish step for Actor-derived targets with none declared.
    /// Applies to synthesis and to the plan cache, so both agree.
    pub default_finish: bool,
}

impl Default for LowerOptions {
    fn default() -> Self {
        LowerOptions {
            verify: true,
            default_finish: true,
        }
    }
}

/// Post-lowering structural check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LowerCert {
    pub intent_nodes: usize,
    pub asymmetric_links: usize,
    pub dangling_links: usize,
    pub overfull_pins: usize,
}

impl LowerCert {
    pub fn all_pass(&self) -> bool {
        *self == LowerCert::default()
    }

    fn failures(&self) -> Vec<String> {
        let mut out = Vec::new();
        let checks = [
            (self.intent_nodes, "intent node(s) remain"),
            (self.asymmetric_links, "link(s) are not mirrored"),
            (self.dangling_links, "link(s) reference removed pins"),
            (self.overfull_pins, "single-link pin(s) hold several links"),
        ];
        for (count, what) in checks {
            if count > 0 {
                out.push(format!("{count} {what}"));
            }
        }
        out
    }
}

#[derive(Debug, Default)]
pub struct LowerResult {
    pub expanded: usize,
    pub created: usize,
    pub diagnostics: Vec<Diagnostic>,
    pub cert: Option<LowerCert>,
}

/// Resolve every intent node's plan into `cache` without mutating the graph.
pub fn validate_graph(graph: &Graph, registry: &Registry, cache: &mut PlanCache) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for node in graph.nodes() {
        let result = match &node.kind {
            NodeKind::IntentCall { function } => cache.delegate(registry, function).map(|_| ()),
            NodeKind::IntentConstruct { function } => cache.construct(registry, function).map(|_| ()),
            _ => Ok(()),
        };
        if let Err(e) = result {
            diagnostics.push(e.to_diagnostic(node.id));
        }
    }
    diagnostics
}

/// Expand every intent node of `graph`.
pub fn lower_graph(
    graph: &mut Graph,
    registry: &Registry,
    cache: &mut PlanCache,
    options: &LowerOptions,
) -> LowerResult {
    let mut result = LowerResult::default();
    let intents: Vec<NodeId> = graph
        .nodes()
        .filter(|n| n.kind.is_intent())
        .map(|n| n.id)
        .collect();

    let mut visited = HashSet::new();
    for node in intents {
        if !visited.insert(node) {
            continue;
        }
        let Some(kind) = graph.node(node).map(|n| n.kind.clone()) else {
            continue;
        };
        let outcome = match &kind {
            NodeKind::IntentCall { function } => cache
                .delegate(registry, function)
                .and_then(|plan| delegate::expand(graph, registry, node, &plan)),
            NodeKind::IntentConstruct { function } => cache
                .construct(registry, function)
                .and_then(|plan| construct::expand(graph, registry, node, &plan)),
            _ => continue,
        };
        match outcome {
            Ok(expansion) => {
                result.expanded += 1;
                result.created += expansion.created.len();
                tracing::debug!("{}: {} → {} primitive(s)", node, kind.tag(), expansion.created.len());
                result.diagnostics.extend(expansion.diagnostic);
            }
            Err(e) => {
                result.diagnostics.push(e.to_diagnostic(node));
                detach_failed(graph, node, &e);
            }
        }
    }

    if options.verify {
        let cert = verify(graph);
        if !cert.all_pass() {
            let mut d = Diagnostic::new(DiagLevel::Error, None, "lowering certificate failed")
                .with_code(codes::E0600);
            for failure in cert.failures() {
                d = d.with_cause(failure, None);
            }
            result.diagnostics.push(d);
        }
        result.cert = Some(cert);
    }
    result
}

/// A node that cannot be lowered is left detached, never half-wired:
/// primitives already expanded from it are removed along with it.
fn detach_failed(graph: &mut Graph, node: NodeId, error: &ExpandError) {
    let partial: Vec<NodeId> = graph
        .nodes()
        .filter(|n| n.origin == Some(node))
        .map(|n| n.id)
        .collect();
    tracing::debug!("{}: not lowered ({} partial primitive(s) dropped): {}", node, partial.len(), error);
    for id in partial {
        graph.remove_node(id);
    }
    graph.remove_node(node);
}

/// Check the lowered graph's structural invariants.
pub fn verify(graph: &Graph) -> LowerCert {
    let mut cert = LowerCert {
        intent_nodes: graph.nodes().filter(|n| n.kind.is_intent()).count(),
        ..LowerCert::default()
    };
    for pin in graph.pins() {
        for other in &pin.links {
            match graph.pin(*other) {
                None => cert.dangling_links += 1,
                Some(o) if !o.links.contains(&pin.id) => cert.asymmetric_links += 1,
                Some(_) => {}
            }
        }
        if pin.is_single_link() && pin.links.len() > 1 {
            cert.overfull_pins += 1;
        }
    }
    cert
}

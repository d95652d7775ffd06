// pass.rs — Pass descriptor module: metadata, dependency resolution, artifact IDs
//
// Declares the lowering passes (registry and document parsing happen before
// the runner), their dependency edges, and the artifacts they produce. Used
// by the pipeline runner to compute the minimal pass subset for each --emit
// target.

use std::collections::HashSet;

// ── Pass and Artifact identifiers ──────────────────────────────────────────

/// Identifies each pass (parsing excluded, handled before the runner).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassId {
    Materialize,
    Validate,
    Lower,
    Catalog,
}

/// Machine-readable artifact identifiers. Each maps to a concrete value
/// in the pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactId {
    Graph,   // Graph with synthesized pins
    Plans,   // PlanCache
    Lowered, // Graph without intent nodes
    Cert,    // LowerCert
    Catalog, // Vec<CatalogEntry>
}

// ── Pass descriptor ────────────────────────────────────────────────────────

/// Static metadata about a pass.
pub struct PassDescriptor {
    /// Human-readable name for diagnostics/verbose output.
    pub name: &'static str,
    /// Passes whose outputs this pass consumes.
    pub inputs: &'static [PassId],
    /// Artifacts this pass produces.
    pub outputs: &'static [ArtifactId],
    /// What invalidates this pass's output.
    pub invalidation_key: &'static str,
    /// Pre/post conditions (documentation only).
    pub invariants: &'static str,
}

/// Return the static descriptor for a given pass.
pub fn descriptor(id: PassId) -> PassDescriptor {
    match id {
        PassId::Materialize => PassDescriptor {
            name: "materialize",
            inputs: &[],
            outputs: &[ArtifactId::Graph],
            invalidation_key: "document + registry",
            invariants: "every node's pins match its expected pin set",
        },
        PassId::Validate => PassDescriptor {
            name: "validate",
            inputs: &[PassId::Materialize],
            outputs: &[ArtifactId::Plans],
            invalidation_key: "graph + registry",
            invariants: "every intent binding resolved to a plan or a diagnostic",
        },
        PassId::Lower => PassDescriptor {
            name: "lower",
            inputs: &[PassId::Validate],
            outputs: &[ArtifactId::Lowered, ArtifactId::Cert],
            invalidation_key: "graph + plans",
            invariants: "no intent node remains, links symmetric",
        },
        PassId::Catalog => PassDescriptor {
            name: "catalog",
            inputs: &[],
            outputs: &[ArtifactId::Catalog],
            invalidation_key: "registry",
            invariants: "one entry per tagged function",
        },
    }
}

// ── Dependency resolution ──────────────────────────────────────────────────

/// All pass IDs in declaration order.
pub const ALL_PASSES: [PassId; 4] = [
    PassId::Materialize,
    PassId::Validate,
    PassId::Lower,
    PassId::Catalog,
];

/// Compute the minimal ordered set of passes needed to produce `terminal`.
/// Returns passes in topological (execution) order.
pub fn required_passes(terminal: PassId) -> Vec<PassId> {
    let mut visited = HashSet::new();
    let mut order = Vec::new();
    visit(terminal, &mut visited, &mut order);
    order
}

fn visit(id: PassId, visited: &mut HashSet<PassId>, order: &mut Vec<PassId>) {
    if !visited.insert(id) {
        return;
    }
    for &dep in descriptor(id).inputs {
        visit(dep, visited, order);
    }
    order.push(id);
}

// ── Tests ──────────────────────────────────────────────────────────────────

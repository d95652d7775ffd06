// pipeline.rs — Compilation state and pass orchestration
//
// Holds all pass artifacts and runs the minimal set of passes for a given
// terminal PassId.
//
// Preconditions: the document is parsed and the registry linked before
//                calling run_pipeline.
// Postconditions: all artifacts for required passes are populated, or has_error is set.
// Failure modes: any pass emitting error-level diagnostics.
// Side effects: calls on_pass_complete callback after each pass for immediate display.

use std::time::Instant;

use crate::diag::{has_errors, Diagnostic};
use crate::document::{self, GraphDocument};
use crate::eligibility::{enumerate, CatalogEntry, NodeFamily, PlanCache};
use crate::graph::Graph;
use crate::lower::{LowerCert, LowerOptions};
use crate::pass::{descriptor, required_passes, PassId};
use crate::registry::Registry;

// ── Provenance ─────────────────────────────────────────────────────────────

/// Provenance metadata for reproducible output and cache keys.
///
/// `document_hash`: SHA-256 of the raw graph document text.
/// `registry_fingerprint`: SHA-256 of `Registry::canonical_json()`.
/// `compiler_version`: crate version from `Cargo.toml`.
#[derive(Debug, Clone)]
pub struct Provenance {
    pub document_hash: [u8; 32],
    pub registry_fingerprint: [u8; 32],
    pub compiler_version: &'static str,
}

impl Provenance {
    /// Hex string of the document hash (64 characters).
    pub fn document_hash_hex(&self) -> String {
        bytes_to_hex(&self.document_hash)
    }

    /// Hex string of the registry fingerprint (64 characters).
    pub fn registry_fingerprint_hex(&self) -> String {
        bytes_to_hex(&self.registry_fingerprint)
    }

    /// Serialize provenance as a JSON string for `--emit build-info`.
    pub fn to_json(&self) -> String {
        format!(
            "{{\n  \"document_hash\": \"{}\",\n  \"registry_fingerprint\": \"{}\",\n  \"compiler_version\": \"{}\"\n}}\n",
            self.document_hash_hex(),
            self.registry_fingerprint_hex(),
            self.compiler_version,
        )
    }
}

fn bytes_to_hex(bytes: &[u8; 32]) -> String {
    let mut s = String::with_capacity(64);
    for b in bytes {
        use std::fmt::Write;
        let _ = write!(s, "{:02x}", b);
    }
    s
}

fn sha256(data: &[u8]) -> [u8; 32] {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(data);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&hasher.finalize());
    hash
}

/// Compute provenance from the document text and registry.
pub fn compute_provenance(document: &str, registry: &Registry) -> Provenance {
    Provenance {
        document_hash: sha256(document.as_bytes()),
        registry_fingerprint: sha256(registry.canonical_json().as_bytes()),
        compiler_version: env!("CARGO_PKG_VERSION"),
    }
}

// ── Artifact storage ───────────────────────────────────────────────────────

/// Holds all artifacts and accumulated diagnostics.
pub struct CompilationState {
    pub registry: Registry,
    pub document: GraphDocument,
    pub options: LowerOptions,
    /// Materialized graph; lowered in place by the Lower pass.
    pub graph: Option<Graph>,
    pub plans: Option<PlanCache>,
    pub cert: Option<LowerCert>,
    pub catalog: Option<Vec<CatalogEntry>>,
    pub diagnostics: Vec<Diagnostic>,
    pub has_error: bool,
    pub provenance: Option<Provenance>,
}

impl CompilationState {
    pub fn new(document: GraphDocument, registry: Registry, options: LowerOptions) -> Self {
        Self {
            registry,
            document,
            options,
            graph: None,
            plans: None,
            cert: None,
            catalog: None,
            diagnostics: Vec::new(),
            has_error: false,
            provenance: None,
        }
    }
}

// ── Error type ─────────────────────────────────────────────────────────────

/// Pipeline execution stopped. The specific diagnostics are available in
/// `CompilationState.diagnostics`.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("pass {failing_pass:?} failed")]
    PassFailed { failing_pass: PassId },
    #[error("pass {failing_pass:?}: {source}")]
    Document {
        failing_pass: PassId,
        source: document::DocumentError,
    },
}

impl PipelineError {
    pub fn failing_pass(&self) -> PassId {
        match self {
            PipelineError::PassFailed { failing_pass } | PipelineError::Document { failing_pass, .. } => {
                *failing_pass
            }
        }
    }
}

/// Per-pass post-processing: callback, accumulate, timing log, error check.
fn finish_pass(
    state: &mut CompilationState,
    pass_id: PassId,
    diags: Vec<Diagnostic>,
    elapsed: std::time::Duration,
    on_pass_complete: &mut impl FnMut(PassId, &[Diagnostic]),
) -> Result<(), PipelineError> {
    on_pass_complete(pass_id, &diags);
    let is_err = has_errors(&diags);
    state.diagnostics.extend(diags);
    tracing::info!(
        "{} complete, {:.1}ms",
        descriptor(pass_id).name,
        elapsed.as_secs_f64() * 1000.0
    );
    if is_err {
        state.has_error = true;
        return Err(PipelineError::PassFailed {
            failing_pass: pass_id,
        });
    }
    Ok(())
}

// ── Pipeline runner ────────────────────────────────────────────────────────

/// Run the minimal set of passes to produce `terminal`.
///
/// Per-pass sequence: execute → on_pass_complete(callback) → timing log → error check.
pub fn run_pipeline(
    state: &mut CompilationState,
    terminal: PassId,
    mut on_pass_complete: impl FnMut(PassId, &[Diagnostic]),
) -> Result<(), PipelineError> {
    for pass_id in required_passes(terminal) {
        let t = Instant::now();
        let diags = match pass_id {
            PassId::Materialize => {
                let loaded = document::materialize(&state.document, &state.registry, state.options.default_finish)
                    .map_err(|source| {
                        state.has_error = true;
                        PipelineError::Document {
                            failing_pass: pass_id,
                            source,
                        }
                    })?;
                state.graph = Some(loaded.graph);
                loaded.diagnostics
            }
            PassId::Validate => {
                let mut cache = PlanCache::new(state.options.default_finish);
                let diags = match &state.graph {
                    Some(graph) => crate::lower::validate_graph(graph, &state.registry, &mut cache),
                    None => Vec::new(),
                };
                state.plans = Some(cache);
                diags
            }
            PassId::Lower => match (state.graph.as_mut(), state.plans.as_mut()) {
                (Some(graph), Some(plans)) => {
                    let result = crate::lower::lower_graph(graph, &state.registry, plans, &state.options);
                    tracing::debug!(
                        "lowered {} intent node(s) into {} primitive(s)",
                        result.expanded,
                        result.created
                    );
                    state.cert = result.cert;
                    result.diagnostics
                }
                _ => Vec::new(),
            },
            PassId::Catalog => {
                let default_finish = state.options.default_finish;
                let mut entries = enumerate(&state.registry, NodeFamily::DelegateCall, default_finish);
                entries.extend(enumerate(&state.registry, NodeFamily::Construct, default_finish));
                state.catalog = Some(entries);
                Vec::new()
            }
        };
        finish_pass(state, pass_id, diags, t.elapsed(), &mut on_pass_complete)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::codes;
    use crate::graph::NodeKind;

    const LIB: &str = r#"
        delegate OnDone(A: int);
        library Lib {
            #[NeatDelegateFunction]
            fn Load(Cb: delegate<OnDone>);
            fn Plain();
        }
    "#;

    fn state(doc: &str) -> CompilationState {
        let registry = Registry::from_source(LIB).unwrap();
        let document = document::parse(doc).unwrap();
        CompilationState::new(document, registry, LowerOptions::default())
    }

    #[test]
    fn lower_runs_every_pass_in_order() {
        let mut s = state(r#"{ "name": "g", "nodes": [ { "id": 0, "kind": "Intent.Call", "function": "Lib.Load" } ] }"#);
        let mut seen = Vec::new();
        run_pipeline(&mut s, PassId::Lower, |p, _| seen.push(p)).unwrap();
        assert_eq!(seen, vec![PassId::Materialize, PassId::Validate, PassId::Lower]);
        assert!(s.cert.unwrap().all_pass());
        let graph = s.graph.unwrap();
        assert!(graph.nodes().all(|n| !n.kind.is_intent()));
        assert!(graph
            .nodes()
            .any(|n| matches!(n.kind, NodeKind::EventSink { .. })));
    }

    #[test]
    fn validation_errors_stop_before_lowering() {
        let mut s = state(r#"{ "name": "g", "nodes": [ { "id": 0, "kind": "Intent.Call", "function": "Lib.Plain" } ] }"#);
        let err = run_pipeline(&mut s, PassId::Lower, |_, _| {}).unwrap_err();
        assert_eq!(err.failing_pass(), PassId::Validate);
        assert!(s.has_error);
        assert_eq!(s.diagnostics[0].code, Some(codes::E0104));
        assert!(s.cert.is_none());
    }

    #[test]
    fn catalog_lists_tagged_functions() {
        let mut s = state(r#"{ "name": "g", "nodes": [] }"#);
        run_pipeline(&mut s, PassId::Catalog, |_, _| {}).unwrap();
        let catalog = s.catalog.unwrap();
        assert!(catalog.iter().any(|e| e.function.to_string() == "Lib.Load" && e.eligible));
        assert!(s.graph.is_none());
    }

    #[test]
    fn provenance_is_stable() {
        let registry = Registry::from_source(LIB).unwrap();
        let a = compute_provenance("{}", &registry);
        let b = compute_provenance("{}", &registry);
        assert_eq!(a.document_hash, b.document_hash);
        assert_eq!(a.registry_fingerprint, b.registry_fingerprint);
        assert_eq!(a.document_hash_hex().len(), 64);
        assert_ne!(compute_provenance("{ }", &registry).document_hash, a.document_hash);
    }
}

// delegate.rs — Delegate Inline Expander
//
// Lowers an intent call into one primitive call plus one event sink per
// inlined callback, and implements the auto-wire correction that runs when a
// user links a scoped callback pin.
//
// Preconditions: the intent node's pins were synthesized against `plan`.
// Postconditions: the intent node is gone; its links live on the primitives.
// Failure modes: individual link moves may fail; they are collected and
//                reported as one E0102 diagnostic, never abort the expansion.
// Side effects: mutates the graph; `on_pin_linked` schedules an idle task.

use crate::diag::{codes, Diagnostic};
use crate::eligibility::{DelegatePlan, ExpandError};
use crate::graph::{Category, Direction, Graph, MoveLog, NodeKind};
use crate::id::{NodeId, PinId};
use crate::registry::Registry;
use crate::schema::{self, names};
use crate::session::IdleQueue;
use crate::synth::spawn_primitive;

/// Primitives created by one expansion, plus a diagnostic if any link move failed.
#[derive(Debug, Default)]
pub struct Expansion {
    pub created: Vec<NodeId>,
    pub diagnostic: Option<Diagnostic>,
}

impl Expansion {
    pub(crate) fn finish(node: NodeId, created: Vec<NodeId>, log: &MoveLog) -> Expansion {
        let diagnostic = if log.ok() {
            None
        } else {
            let mut d = Diagnostic::error(node, format!("{} link(s) could not be moved", log.failures().len()))
                .with_code(codes::E0102)
                .with_hint("reconnect the listed pins by hand after refreshing the node");
            for failure in log.failures() {
                d = d.with_cause(failure.clone(), Some(node));
            }
            Some(d)
        };
        Expansion { created, diagnostic }
    }

    pub fn ok(&self) -> bool {
        self.diagnostic.is_none()
    }
}

/// Replace intent call `node` with its primitive subgraph.
pub fn expand(
    graph: &mut Graph,
    registry: &Registry,
    node: NodeId,
    plan: &DelegatePlan,
) -> Result<Expansion, ExpandError> {
    let inline = graph.kind.supports_event_sinks();
    let intent_pins: Vec<PinId> = graph
        .node(node)
        .ok_or(ExpandError::MissingNode(node))?
        .pins
        .clone();

    let call = spawn_primitive(
        graph,
        registry,
        NodeKind::Call {
            function: plan.function.clone(),
        },
        node,
    )?;
    let mut created = vec![call];
    let mut log = MoveLog::default();

    // Step 1: everything except callback continuations moves by name.
    for pid in &intent_pins {
        let Some(pin) = graph.pin(*pid) else { continue };
        let is_continuation = inline
            && (pin.source_index.is_some()
                || (pin.is_control() && pin.is_output() && plan.callback(&pin.name).is_some()));
        if is_continuation {
            continue;
        }
        let name = pin.name.clone();
        let linked = pin.has_links();
        match graph.find_pin_dir(call, &name, pin.direction) {
            Some(target) => log.record(&name, graph.move_links(registry, *pid, target)),
            None if linked => log.fail(format!("'{name}': no matching pin on {}", plan.function)),
            None => {}
        }
    }

    // Step 2: one event sink per inlined callback.
    if inline {
        for cb in &plan.callbacks {
            let sink = spawn_primitive(
                graph,
                registry,
                NodeKind::EventSink {
                    delegate: cb.delegate.clone(),
                    event_name: format!("{}_{}", cb.param, node.0),
                },
                node,
            )?;
            created.push(sink);
            tracing::debug!("{}: inlined callback '{}' as {}", node, cb.param, sink);

            let handle = graph.find_pin_dir(sink, names::SELF, Direction::Output);
            let slot = graph.find_pin_dir(call, &cb.param, Direction::Input);
            match (handle, slot) {
                (Some(h), Some(s)) => log.record(&cb.param, graph.connect(registry, h, s)),
                _ => log.fail(format!("'{}': callback input missing on {}", cb.param, plan.function)),
            }

            let control = graph.find_pin_dir(node, &cb.param, Direction::Output);
            let then = graph.find_pin_dir(sink, names::THEN, Direction::Output);
            if let (Some(c), Some(t)) = (control, then) {
                log.record(&cb.param, graph.move_links(registry, c, t));
            }

            for input in &cb.inputs {
                let scoped = schema::scoped_pin_name(&cb.param, input);
                let from = graph.find_pin_dir(node, &scoped, Direction::Output);
                let to = graph.find_pin_dir(sink, input, Direction::Output);
                match (from, to) {
                    (Some(f), Some(t)) => log.record(&scoped, graph.move_links(registry, f, t)),
                    (Some(f), None) if graph.pin(f).is_some_and(|p| p.has_links()) => {
                        log.fail(format!("'{scoped}': no parameter '{input}' on {}", cb.delegate))
                    }
                    _ => {}
                }
            }
        }
    }

    // Step 3: discard the intent node.
    graph.remove_node(node);
    Ok(Expansion::finish(node, created, &log))
}

// ── Auto-wire correction ────────────────────────────────────────────────────

/// React to a new link on `pin`. When a scoped callback pin gets its first
/// link, drive the other node's entry from the callback's control pin, then
/// schedule removal of any generic `then → execute` link the host may have
/// added alongside it.
///
/// Returns `true` if a control link was created.
pub fn on_pin_linked(graph: &mut Graph, registry: &Registry, pin: PinId, idle: &mut IdleQueue) -> bool {
    let Some(p) = graph.pin(pin) else { return false };
    let (Some(index), true, 1) = (p.source_index, p.category == Category::Data, p.links.len()) else {
        return false;
    };
    let this_node = p.owner;
    let Some(other_node) = graph.pin(p.links[0]).map(|o| o.owner) else {
        return false;
    };
    let Some(entry) = graph.find_pin_dir(other_node, names::EXECUTE, Direction::Input) else {
        return false;
    };

    let mut wired = false;
    if let Some(control) = graph.pin_at(this_node, index) {
        let free = graph
            .pin(control)
            .is_some_and(|c| c.is_control() && c.is_output() && !c.has_links());
        if free {
            wired = graph.connect(registry, control, entry).is_ok();
            if wired {
                tracing::debug!("{}: auto-wired callback control pin to {}", this_node, other_node);
            }
        }
    }

    // Ids are never reused, so holding them is a weak reference: a removed
    // node resolves to nothing and the task does nothing.
    idle.schedule(move |graph: &mut Graph| {
        let then = graph.find_pin_dir(this_node, names::THEN, Direction::Output);
        let entry = graph.find_pin_dir(other_node, names::EXECUTE, Direction::Input);
        if let (Some(then), Some(entry)) = (then, entry) {
            if graph.break_link(then, entry) {
                tracing::debug!("{}: removed duplicate drive of {}", this_node, other_node);
            }
        }
    });
    wired
}

// synth.rs — Pin Synthesizer
//
// Computes the expected pin set of a node from its bound signature and
// reconciles the node's actual pins against it. Reconciliation keeps every
// pin whose name, direction, category and type still match, so links and
// user defaults survive a refresh; only mismatched pins are removed.
//
// Preconditions: the registry is linked; `node` is live.
// Postconditions: the node's pins equal the expected set, in expected order;
//                 a second run on an unchanged signature changes nothing.
// Failure modes: unknown or ineligible signature → `ExpandError` (pins untouched).
// Side effects: mutates the graph.

use crate::eligibility::{self, ExpandError};
use crate::graph::{Category, Direction, Graph, NodeKind, Pin};
use crate::id::{NodeId, PinId};
use crate::registry::{tags, Param, Registry, Signature};
use crate::schema::{self, names};
use crate::types::{PinType, TypeKind};

/// One pin the node should have.
#[derive(Debug, Clone, PartialEq)]
pub struct PinSpec {
    pub name: String,
    pub direction: Direction,
    pub category: Category,
    pub ty: PinType,
    pub default: Option<String>,
    pub hidden: bool,
    pub is_reference: bool,
    /// Index (in the expected list) of the owning callback's control pin.
    pub source: Option<usize>,
}

impl PinSpec {
    fn new(name: &str, direction: Direction, category: Category, ty: PinType) -> Self {
        PinSpec {
            name: name.to_string(),
            direction,
            category,
            ty,
            default: None,
            hidden: false,
            is_reference: false,
            source: None,
        }
    }

    pub fn exec_in(name: &str) -> Self {
        Self::new(name, Direction::Input, Category::Control, PinType::exec())
    }

    pub fn exec_out(name: &str) -> Self {
        Self::new(name, Direction::Output, Category::Control, PinType::exec())
    }

    pub fn data_in(name: &str, ty: PinType) -> Self {
        Self::new(name, Direction::Input, Category::Data, ty)
    }

    pub fn data_out(name: &str, ty: PinType) -> Self {
        Self::new(name, Direction::Output, Category::Data, ty)
    }

    fn with_default(mut self, default: Option<String>) -> Self {
        self.default = default;
        self
    }

    fn matches(&self, pin: &Pin) -> bool {
        pin.name == self.name
            && pin.direction == self.direction
            && pin.category == self.category
            && pin.ty == self.ty
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SynthReport {
    pub created: usize,
    pub removed: usize,
    pub kept: usize,
}

impl SynthReport {
    pub fn changed(&self) -> bool {
        self.created + self.removed > 0
    }
}

pub struct Synthesizer<'r> {
    registry: &'r Registry,
    default_finish: bool,
}

impl<'r> Synthesizer<'r> {
    pub fn new(registry: &'r Registry, default_finish: bool) -> Self {
        Synthesizer {
            registry,
            default_finish,
        }
    }

    /// Bring `node`'s pins in line with its signature.
    pub fn synthesize(&self, graph: &mut Graph, node: NodeId) -> Result<SynthReport, ExpandError> {
        let kind = graph
            .node(node)
            .ok_or(ExpandError::MissingNode(node))?
            .kind
            .clone();
        let specs = self.expected_pins(graph, node, &kind)?;
        let report = reconcile(graph, node, &specs);
        tracing::debug!(
            "synthesized {} {}: {} created, {} removed, {} kept",
            node,
            kind.tag(),
            report.created,
            report.removed,
            report.kept
        );
        Ok(report)
    }

    pub fn expected_pins(
        &self,
        graph: &Graph,
        node: NodeId,
        kind: &NodeKind,
    ) -> Result<Vec<PinSpec>, ExpandError> {
        match kind {
            NodeKind::IntentCall { function } => {
                let sig = self.signature(function)?;
                self.intent_call_pins(graph, sig)
            }
            NodeKind::IntentConstruct { function } => {
                let sig = self.signature(function)?;
                self.intent_construct_pins(graph, node, sig)
            }
            NodeKind::Call { function } => {
                let sig = self.signature(function)?;
                let mut specs = control_pins(sig);
                self.param_pins(graph, sig, false, &mut specs, |_| false);
                Ok(specs)
            }
            NodeKind::EventSink { delegate, .. } => {
                let sig = self
                    .registry
                    .delegate(delegate)
                    .ok_or_else(|| ExpandError::UnknownDelegate(delegate.clone()))?;
                let mut specs = vec![
                    PinSpec::data_out(names::SELF, PinType::new(TypeKind::Delegate(delegate.clone()))),
                    PinSpec::exec_out(names::THEN),
                ];
                for p in sig.inputs() {
                    let mut spec = PinSpec::data_out(&p.name, p.ty.clone());
                    spec.is_reference = p.flags.is_reference;
                    specs.push(spec);
                }
                Ok(specs)
            }
            NodeKind::Branch => Ok(vec![
                PinSpec::exec_in(names::EXECUTE),
                PinSpec::data_in(names::CONDITION, PinType::new(TypeKind::Bool))
                    .with_default(Some("false".to_string())),
                PinSpec::exec_out(names::THEN),
                PinSpec::exec_out(names::ELSE),
            ]),
            NodeKind::EnumLiteral { enum_name } => {
                let info = self
                    .registry
                    .enum_info(enum_name)
                    .ok_or_else(|| ExpandError::UnknownEnum(enum_name.clone()))?;
                Ok(vec![
                    PinSpec::data_in(names::ENUM, PinType::new(TypeKind::Enum(enum_name.clone())))
                        .with_default(info.variants.first().cloned()),
                    PinSpec::data_out(names::RETURN_VALUE, PinType::new(TypeKind::Byte)),
                ])
            }
        }
    }

    fn signature(&self, function: &crate::registry::FunctionRef) -> Result<&'r Signature, ExpandError> {
        self.registry
            .function(function)
            .ok_or_else(|| ExpandError::UnknownFunction(function.clone()))
    }

    /// Intent call: the plain call's pins, with each eligible callback turned
    /// into a control output followed by its scoped data outputs. Graphs
    /// that cannot host event sinks keep callbacks as plain delegate inputs.
    fn intent_call_pins(&self, graph: &Graph, sig: &Signature) -> Result<Vec<PinSpec>, ExpandError> {
        let plan = eligibility::delegate_plan(sig).map_err(|e| ExpandError::Ineligible {
            function: sig.key(),
            reason: e.reason,
        })?;
        let callbacks = if graph.kind.supports_event_sinks() {
            plan.callbacks
        } else {
            Vec::new()
        };

        let mut specs = control_pins(sig);
        self.param_pins(graph, sig, true, &mut specs, |p| {
            callbacks.iter().any(|c| c.param == p.name)
        });

        for cb in &callbacks {
            let Some(cb_sig) = sig.find_param(&cb.param).and_then(|p| p.callback.as_deref()) else {
                continue;
            };
            let control = specs.len();
            specs.push(PinSpec::exec_out(&cb.param));
            for p in cb_sig.inputs() {
                let mut spec = PinSpec::data_out(&schema::scoped_pin_name(&cb.param, &p.name), p.ty.clone());
                spec.source = Some(control);
                specs.push(spec);
            }
        }
        Ok(specs)
    }

    /// Intent construct: control pins, the failure branch when validated,
    /// construct parameters, finish parameters (minus the object input and
    /// shared names), then configuration pins for the literal class.
    fn intent_construct_pins(
        &self,
        graph: &Graph,
        node: NodeId,
        sig: &Signature,
    ) -> Result<Vec<PinSpec>, ExpandError> {
        let plan = eligibility::construct_plan(self.registry, sig, self.default_finish).map_err(|e| {
            ExpandError::Ineligible {
                function: sig.key(),
                reason: e.reason,
            }
        })?;

        let mut specs = vec![PinSpec::exec_in(names::EXECUTE), PinSpec::exec_out(names::THEN)];
        if plan.requires_validation {
            specs.push(PinSpec::exec_out(names::FAILED));
        }
        self.param_pins(graph, sig, true, &mut specs, |_| false);

        if let Some(finish) = &plan.finish {
            let finish_sig = self.signature(&finish.function)?;
            let taken: Vec<String> = specs.iter().map(|s| s.name.clone()).collect();
            self.param_pins(graph, finish_sig, true, &mut specs, |p| {
                p.flags.is_return || p.name == finish.object_input || taken.contains(&p.name)
            });
        }

        if let Some(class) = literal_class(graph, node) {
            if self.registry.is_child_of(&class, &plan.meta_class) {
                for prop in self.registry.spawn_properties(&class) {
                    if plan.hidden_properties.contains(&prop.name)
                        || specs.iter().any(|s| s.name == prop.name)
                    {
                        continue;
                    }
                    specs.push(PinSpec::data_in(&prop.name, prop.ty.clone()).with_default(prop.default.clone()));
                }
            } else {
                tracing::warn!(
                    "{}: class '{}' is not a {}; no configuration pins",
                    node,
                    class,
                    plan.meta_class
                );
            }
        }
        Ok(specs)
    }

    fn param_pins(
        &self,
        graph: &Graph,
        sig: &Signature,
        apply_hiding: bool,
        specs: &mut Vec<PinSpec>,
        skip: impl Fn(&Param) -> bool,
    ) {
        if !sig.is_static && !skip_self(specs) {
            specs.push(PinSpec::data_in(names::SELF, PinType::object(&sig.owner)));
        }
        for p in sig.params.iter().filter(|p| !skip(p)) {
            let spec = if p.is_input() {
                let mut spec = PinSpec::data_in(&p.name, p.ty.clone()).with_default(p.default.clone());
                spec.is_reference = p.flags.is_reference;
                spec.hidden = apply_hiding && self.is_hidden(graph, sig, p);
                spec
            } else {
                PinSpec::data_out(&p.name, p.ty.clone())
            };
            specs.push(spec);
        }
    }

    /// Auto-supplied parameters are hidden, except a world-context parameter
    /// of a static function in a class that asks to show it.
    fn is_hidden(&self, graph: &Graph, sig: &Signature, p: &Param) -> bool {
        let world_context = sig.metadata.get(tags::WORLD_CONTEXT) == Some(p.name.as_str());
        let tagged = world_context
            || sig.metadata.list(tags::HIDE_PIN).contains(&p.name)
            || sig.metadata.list(tags::INTERNAL_USE_PARAM).contains(&p.name);
        if !tagged {
            return false;
        }
        let show = world_context
            && sig.is_static
            && graph
                .host_class
                .as_deref()
                .is_some_and(|c| self.registry.class_has_tag(c, tags::SHOW_WORLD_CONTEXT_PIN));
        !show
    }
}

fn control_pins(sig: &Signature) -> Vec<PinSpec> {
    if sig.is_pure {
        Vec::new()
    } else {
        vec![PinSpec::exec_in(names::EXECUTE), PinSpec::exec_out(names::THEN)]
    }
}

fn skip_self(specs: &[PinSpec]) -> bool {
    specs.iter().any(|s| s.name == names::SELF)
}

/// Literal class on a construct node's type pin, if it is not driven by a link.
pub fn literal_class(graph: &Graph, node: NodeId) -> Option<String> {
    let pin = graph.pin(graph.find_pin_dir(node, names::CLASS, Direction::Input)?)?;
    if pin.has_links() {
        return None;
    }
    pin.literal().map(str::to_string)
}

/// Match existing pins to `specs`, removing the rest, creating what is
/// missing, and reordering to the expected order.
fn reconcile(graph: &mut Graph, node: NodeId, specs: &[PinSpec]) -> SynthReport {
    let mut report = SynthReport::default();
    let existing = match graph.node(node) {
        Some(n) => n.pins.clone(),
        None => return report,
    };

    // Removal first, so matching below only sees survivors.
    let mut matched: Vec<Option<PinId>> = vec![None; specs.len()];
    for pid in existing {
        let slot = graph.pin(pid).and_then(|pin| {
            specs
                .iter()
                .enumerate()
                .position(|(i, s)| matched[i].is_none() && s.matches(pin))
        });
        match slot {
            Some(i) => matched[i] = Some(pid),
            None => {
                graph.remove_pin(pid);
                report.removed += 1;
            }
        }
    }

    let mut order = Vec::with_capacity(specs.len());
    for (spec, slot) in specs.iter().zip(matched) {
        let pid = match slot {
            Some(pid) => {
                report.kept += 1;
                pid
            }
            None => {
                let Some(pid) = graph.create_pin(node, &spec.name, spec.direction, spec.category, spec.ty.clone())
                else {
                    continue;
                };
                graph.set_default(pid, spec.default.clone());
                report.created += 1;
                pid
            }
        };
        if spec.hidden {
            graph.break_pin_links(pid);
        }
        if let Some(pin) = graph.pin_mut(pid) {
            pin.hidden = spec.hidden;
            pin.connectable = !spec.hidden;
            pin.is_reference = spec.is_reference;
            pin.source_index = spec.source;
        }
        order.push(pid);
    }
    if let Some(n) = graph.node_mut(node) {
        n.pins = order;
    }
    report
}

/// Add a primitive node expanded from `origin` and give it its pins.
pub fn spawn_primitive(
    graph: &mut Graph,
    registry: &Registry,
    kind: NodeKind,
    origin: NodeId,
) -> Result<NodeId, ExpandError> {
    let id = graph.add_node(kind);
    if let Some(n) = graph.node_mut(id) {
        n.origin = Some(origin);
    }
    match Synthesizer::new(registry, false).synthesize(graph, id) {
        Ok(_) => Ok(id),
        Err(e) => {
            graph.remove_node(id);
            Err(e)
        }
    }
}

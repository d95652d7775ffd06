// construct.rs — Construct-Configure-Finish Expander
//
// Lowers an intent construct node into a linear primitive chain:
//
//   Construct → [IsValid + Branch] → Assign(P1) → … → Assign(Pn) → [Finish]
//
// The validity branch directly follows the construct call so that the
// assignments and the finish step only run on a valid object; its false arm
// takes over the intent node's failure continuation.
//
// Preconditions: pins were synthesized against `plan`.
// Postconditions: the intent node is gone; on a failed precondition it is
//                 detached and removed and no primitives are created.
// Failure modes: missing class input → E0101; finish lost its object input
//                → E0103; failed link moves → E0102 (best effort).
// Side effects: mutates the graph.

use crate::delegate::Expansion;
use crate::diag::{codes, Diagnostic};
use crate::eligibility::{ConstructPlan, ExpandError};
use crate::graph::{Direction, Graph, MoveLog, NodeKind};
use crate::id::{NodeId, PinId};
use crate::registry::{prelude, tags, Param, Property, Registry};
use crate::schema::{self, names};
use crate::synth::{literal_class, spawn_primitive};
use crate::types::{PinType, TypeKind};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Carry {
    Move,
    Copy,
}

/// One link in the chain: where control enters and where it continues.
struct Step {
    entry: Option<PinId>,
    then: Option<PinId>,
}

struct Chain<'g, 'r> {
    graph: &'g mut Graph,
    registry: &'r Registry,
    node: NodeId,
    log: MoveLog,
    created: Vec<NodeId>,
}

impl Chain<'_, '_> {
    fn spawn(&mut self, kind: NodeKind) -> Result<NodeId, ExpandError> {
        let id = spawn_primitive(self.graph, self.registry, kind, self.node)?;
        self.created.push(id);
        Ok(id)
    }

    fn pin(&self, node: NodeId, name: &str, direction: Direction) -> Option<PinId> {
        self.graph.find_pin_dir(node, name, direction)
    }

    fn wire(&mut self, what: &str, a: Option<PinId>, b: Option<PinId>) {
        match (a, b) {
            (Some(a), Some(b)) => self.log.record(what, self.graph.connect(self.registry, a, b)),
            _ => self.log.fail(format!("'{what}': pin missing")),
        }
    }

    /// Move or copy the intent pin `from_name` onto `to`.
    fn carry_to(&mut self, from_name: &str, direction: Direction, to: Option<PinId>, mode: Carry) {
        let Some(from) = self.pin(self.node, from_name, direction) else {
            return;
        };
        let Some(to) = to else {
            if self.graph.pin(from).is_some_and(|p| p.has_links()) {
                self.log.fail(format!("'{from_name}': no destination pin"));
            }
            return;
        };
        let result = match mode {
            Carry::Move => self.graph.move_links(self.registry, from, to),
            Carry::Copy => self.graph.copy_links(self.registry, from, to),
        };
        self.log.record(from_name, result);
    }

    /// Carry every same-named data pin of `target` from the intent node:
    /// inputs are copied (another step may need them), outputs are moved.
    fn carry_params(&mut self, target: NodeId, skip: &[&str]) {
        let pins: Vec<(String, Direction)> = self
            .graph
            .pins_of(target)
            .into_iter()
            .filter(|p| p.is_data() && !skip.contains(&p.name.as_str()))
            .map(|p| (p.name.clone(), p.direction))
            .collect();
        for (name, direction) in pins {
            let mode = match direction {
                Direction::Input => Carry::Copy,
                Direction::Output => Carry::Move,
            };
            let to = self.pin(target, &name, direction);
            self.carry_to(&name, direction, to, mode);
        }
    }

    fn step(&self, node: NodeId) -> Step {
        Step {
            entry: self.pin(node, names::EXECUTE, Direction::Input),
            then: self.pin(node, names::THEN, Direction::Output),
        }
    }

    /// Append `step` after `last`, returning the new chain end.
    fn chain(&mut self, what: &str, last: Option<PinId>, step: Step) -> Option<PinId> {
        match step.entry {
            Some(entry) => {
                self.wire(what, last, Some(entry));
                step.then
            }
            None => last,
        }
    }
}

fn detach(graph: &mut Graph, node: NodeId, diagnostic: Diagnostic) -> Expansion {
    tracing::debug!("{}: detached: {}", node, diagnostic.message);
    graph.remove_node(node);
    Expansion {
        created: Vec::new(),
        diagnostic: Some(diagnostic),
    }
}

/// Replace intent construct `node` with its primitive chain.
pub fn expand(
    graph: &mut Graph,
    registry: &Registry,
    node: NodeId,
    plan: &ConstructPlan,
) -> Result<Expansion, ExpandError> {
    if !graph.contains_node(node) {
        return Err(ExpandError::MissingNode(node));
    }

    // Preconditions, all checked before the first mutation.
    let has_class = graph
        .find_pin_dir(node, names::CLASS, Direction::Input)
        .and_then(|p| graph.pin(p))
        .is_some_and(|p| p.has_links() || p.literal().is_some());
    if !has_class {
        let d = Diagnostic::error(node, format!("'{}' needs a class to create", plan.function))
            .with_code(codes::E0101)
            .with_hint("set the 'Class' pin or link a class into it");
        return Ok(detach(graph, node, d));
    }
    if let Some(finish) = &plan.finish {
        let intact = registry
            .function(&finish.function)
            .and_then(|sig| sig.find_param(&finish.object_input))
            .is_some_and(Param::is_input);
        if !intact {
            let d = Diagnostic::error(
                node,
                format!(
                    "finish function '{}' no longer takes the constructed object as '{}'",
                    finish.function, finish.object_input
                ),
            )
            .with_code(codes::E0103);
            return Ok(detach(graph, node, d));
        }
    }

    let literal = literal_class(graph, node);
    let target_class = literal
        .filter(|c| registry.is_child_of(c, &plan.meta_class))
        .unwrap_or_else(|| plan.meta_class.clone());
    let excluded: Vec<String> = plan
        .call_params(registry)
        .into_iter()
        .map(str::to_string)
        .collect();
    let intent_pins: Vec<PinId> = graph.node(node).map(|n| n.pins.clone()).unwrap_or_default();

    let mut cx = Chain {
        graph,
        registry,
        node,
        log: MoveLog::default(),
        created: Vec::new(),
    };

    // 1. Construct.
    let construct = cx.spawn(NodeKind::Call {
        function: plan.function.clone(),
    })?;
    let entry = cx.pin(construct, names::EXECUTE, Direction::Input);
    cx.carry_to(names::EXECUTE, Direction::Input, entry, Carry::Move);
    let result_pin = cx.pin(construct, names::RETURN_VALUE, Direction::Output);
    cx.carry_to(names::RETURN_VALUE, Direction::Output, result_pin, Carry::Move);
    let class_pin = cx.pin(construct, names::CLASS, Direction::Input);
    cx.carry_to(names::CLASS, Direction::Input, class_pin, Carry::Move);
    cx.carry_params(construct, &[names::CLASS, names::RETURN_VALUE]);
    let mut last = cx.pin(construct, names::THEN, Direction::Output);
    tracing::debug!("{}: construct {} as {}", node, target_class, construct);

    // 2. Validity branch.
    if plan.requires_validation {
        let check = cx.spawn(NodeKind::Call {
            function: prelude::is_valid(),
        })?;
        let branch = cx.spawn(NodeKind::Branch)?;
        let object = cx.pin(check, names::OBJECT, Direction::Input);
        cx.wire("IsValid.Object", result_pin, object);
        let verdict = cx.pin(check, names::RETURN_VALUE, Direction::Output);
        let condition = cx.pin(branch, names::CONDITION, Direction::Input);
        cx.wire("Branch.Condition", verdict, condition);
        let step = cx.step(branch);
        last = cx.chain("Branch.execute", last, step);
        let otherwise = cx.pin(branch, names::ELSE, Direction::Output);
        cx.carry_to(names::FAILED, Direction::Output, otherwise, Carry::Move);
    }

    // 3. Assignment chain, in the intent node's pin order.
    for pid in intent_pins {
        let Some(pin) = cx.graph.pin(pid) else { continue };
        if !(pin.is_data() && pin.is_input()) || excluded.iter().any(|e| *e == pin.name) {
            continue;
        }
        let linked = pin.has_links();
        let value = pin.literal().map(str::to_string);
        if !linked && value.is_none() {
            continue;
        }
        let (name, ty) = (pin.name.clone(), pin.ty.clone());
        let Some((_, prop)) = registry.find_property(&target_class, &name) else {
            tracing::debug!("{}: '{}' is not a property of {}; skipped", node, name, target_class);
            continue;
        };
        if !linked {
            let default = schema::property_default(registry, &target_class, &name);
            if let (Some(v), Some(d)) = (&value, &default) {
                if schema::defaults_equal(&prop.ty, v, d) {
                    tracing::debug!("{}: '{}' keeps its default; skipped", node, name);
                    continue;
                }
            }
        }
        let Some(step) = assign(&mut cx, &target_class, prop, &name, &ty, linked, value, result_pin)? else {
            continue;
        };
        last = cx.chain(&name, last, step);
    }

    // 4. Finish.
    if let Some(finish) = &plan.finish {
        let call = cx.spawn(NodeKind::Call {
            function: finish.function.clone(),
        })?;
        let object = cx.pin(call, &finish.object_input, Direction::Input);
        cx.wire(&finish.object_input, result_pin, object);
        cx.carry_params(call, &[finish.object_input.as_str(), names::RETURN_VALUE]);
        let step = cx.step(call);
        last = cx.chain(&finish.function.name, last, step);
    }

    // 5. Success continuation lands on the end of the chain.
    cx.carry_to(names::THEN, Direction::Output, last, Carry::Move);

    // 6. Discard the intent node.
    let Chain {
        graph, log, created, ..
    } = cx;
    graph.remove_node(node);
    tracing::debug!("{}: lowered to {} primitive(s)", node, created.len());
    Ok(Expansion::finish(node, created, &log))
}

/// Emit the primitives assigning one configuration pin.
#[allow(clippy::too_many_arguments)]
fn assign(
    cx: &mut Chain<'_, '_>,
    target_class: &str,
    prop: &Property,
    pin_name: &str,
    ty: &PinType,
    linked: bool,
    value: Option<String>,
    result_pin: Option<PinId>,
) -> Result<Option<Step>, ExpandError> {
    // Dedicated setter.
    if let Some(setter_name) = prop.metadata.get(tags::SETTER) {
        match cx.registry.find_function(target_class, setter_name) {
            Some(setter) => {
                let call = cx.spawn(NodeKind::Call {
                    function: setter.key(),
                })?;
                if !setter.is_static {
                    let target = cx.pin(call, names::SELF, Direction::Input);
                    cx.wire(names::SELF, result_pin, target);
                }
                let slot = setter
                    .inputs()
                    .next()
                    .and_then(|p| cx.pin(call, &p.name, Direction::Input));
                cx.carry_to(pin_name, Direction::Input, slot, Carry::Move);
                return Ok(Some(cx.step(call)));
            }
            None => tracing::warn!(
                "setter '{}' for {}.{} not found; assigning by name",
                setter_name,
                target_class,
                prop.name
            ),
        }
    }

    let Some(function) = schema::set_by_name_function(ty) else {
        cx.log.fail(format!("'{pin_name}': type {ty} cannot be assigned by name"));
        return Ok(None);
    };
    let call = cx.spawn(NodeKind::Call { function })?;
    let object = cx.pin(call, names::OBJECT, Direction::Input);
    cx.wire(names::OBJECT, result_pin, object);
    if let Some(p) = cx.pin(call, names::PROPERTY_NAME, Direction::Input) {
        cx.graph.set_default(p, Some(prop.name.clone()));
    }
    let slot = cx.pin(call, names::VALUE, Direction::Input);

    match ty.enum_name() {
        Some(enum_name) if !linked && !ty.is_container() => {
            let literal = cx.spawn(NodeKind::EnumLiteral {
                enum_name: enum_name.to_string(),
            })?;
            if let Some(p) = cx.pin(literal, names::ENUM, Direction::Input) {
                cx.graph.set_default(p, value);
            }
            let byte = cx.pin(literal, names::RETURN_VALUE, Direction::Output);
            cx.wire(pin_name, byte, slot);
        }
        _ => {
            if let Some(p) = slot.and_then(|s| cx.graph.pin_mut(s)) {
                if p.ty.is_wildcard() {
                    p.ty = ty.clone();
                }
                if !linked && matches!(ty.kind, TypeKind::Struct(_)) {
                    p.is_reference = true;
                }
            }
            cx.carry_to(pin_name, Direction::Input, slot, Carry::Move);
        }
    }
    Ok(Some(cx.step(call)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eligibility::PlanCache;
    use crate::graph::GraphKind;
    use crate::registry::FunctionRef;
    use crate::synth::Synthesizer;

    const LIB: &str = r#"
        enum Color { Red, Green, Blue }
        class Widget : Object {
            #[ExposeOnSpawn] prop Health: real = 100.0;
            #[ExposeOnSpawn] prop Label: string;
            #[ExposeOnSpawn, Setter = "SetTint"] prop Tint: enum<Color> = Red;
            #[ExposeOnSpawn] prop Mode: enum<Color>;
            #[ExposeOnSpawn] prop Tags: array<name>;
            #[ExposeOnSpawn] prop Offset: struct<Vector>;
            fn SetTint(NewTint: enum<Color>);
        }
        class Thing : Actor { #[ExposeOnSpawn] prop Speed: real; }
        library Lib {
            #[NeatConstructor]
            fn MakeWidget(Class: class<Widget>, Outer: object<Object>) -> object<Widget>;
            #[NeatConstructor, RequiresValidation]
            fn SpawnThing(Class: class<Thing>) -> object<Thing>;
            fn Begin() -> real;
            fn After();
        }
    "#;

    struct Fixture {
        reg: Registry,
        graph: Graph,
        node: NodeId,
        plan: ConstructPlan,
    }

    fn fixture(function: &str, class: Option<&str>) -> Fixture {
        let reg = Registry::from_source(LIB).unwrap();
        let mut graph = Graph::new("g", GraphKind::EventGraph);
        let f = FunctionRef::new("Lib", function);
        let node = graph.add_node(NodeKind::IntentConstruct { function: f.clone() });
        let synth = Synthesizer::new(&reg, true);
        synth.synthesize(&mut graph, node).unwrap();
        if let Some(class) = class {
            let pin = graph.find_pin(node, names::CLASS).unwrap();
            graph.set_default(pin, Some(class.to_string()));
            synth.synthesize(&mut graph, node).unwrap();
        }
        let plan = PlanCache::new(true).construct(&reg, &f).unwrap();
        Fixture { reg, graph, node, plan }
    }

    fn set(f: &mut Fixture, pin: &str, value: &str) {
        let p = f.graph.find_pin(f.node, pin).unwrap();
        f.graph.set_default(p, Some(value.to_string()));
    }

    fn call_named(g: &Graph, created: &[NodeId], function: &str) -> NodeId {
        *created
            .iter()
            .find(|n| {
                g.node(**n)
                    .and_then(|n| n.kind.function())
                    .is_some_and(|f| f.name == function)
            })
            .unwrap()
    }

    /// Follow `then` links from `start`, collecting node kinds.
    fn walk(g: &Graph, start: NodeId) -> Vec<String> {
        let mut out = Vec::new();
        let mut cur = Some(start);
        while let Some(n) = cur {
            let node = g.node(n).unwrap();
            out.push(match node.kind.function() {
                Some(f) => f.name.clone(),
                None => node.kind.tag().to_string(),
            });
            cur = g
                .find_pin_dir(n, names::THEN, Direction::Output)
                .and_then(|p| g.pin(p))
                .and_then(|p| p.links.first())
                .and_then(|l| g.pin(*l))
                .map(|p| p.owner);
        }
        out
    }

    #[test]
    fn missing_class_detaches_without_primitives() {
        let mut f = fixture("SpawnThing", None);
        let begin = f.graph.add_node(NodeKind::Call {
            function: FunctionRef::new("Lib", "Begin"),
        });
        Synthesizer::new(&f.reg, true).synthesize(&mut f.graph, begin).unwrap();
        let then = f.graph.find_pin(begin, "then").unwrap();
        let exec = f.graph.find_pin(f.node, "execute").unwrap();
        f.graph.connect(&f.reg, then, exec).unwrap();
        let before = f.graph.node_count();

        let out = expand(&mut f.graph, &f.reg, f.node, &f.plan).unwrap();
        assert!(out.created.is_empty());
        let d = out.diagnostic.unwrap();
        assert_eq!(d.code, Some(codes::E0101));
        assert_eq!(d.node, Some(f.node));
        assert_eq!(f.graph.node_count(), before - 1);
        assert_eq!(f.graph.link_count(), 0);
    }

    #[test]
    fn finish_without_object_input_detaches() {
        let mut f = fixture("SpawnThing", Some("Thing"));
        set(&mut f, "Speed", "3.5");
        let begin = f.graph.add_node(NodeKind::Call {
            function: FunctionRef::new("Lib", "Begin"),
        });
        Synthesizer::new(&f.reg, true).synthesize(&mut f.graph, begin).unwrap();
        let then = f.graph.find_pin(begin, "then").unwrap();
        let exec = f.graph.find_pin(f.node, "execute").unwrap();
        f.graph.connect(&f.reg, then, exec).unwrap();
        // The cached plan names a finish input the signature no longer has.
        f.plan.finish.as_mut().unwrap().object_input = "Gone".into();

        let out = expand(&mut f.graph, &f.reg, f.node, &f.plan).unwrap();
        assert!(out.created.is_empty());
        let d = out.diagnostic.unwrap();
        assert_eq!(d.code, Some(codes::E0103));
        assert_eq!(d.node, Some(f.node));
        assert_eq!(f.graph.node_ids(), vec![begin]);
        assert_eq!(f.graph.link_count(), 0);
    }

    #[test]
    fn failed_continuation_move_keeps_rest_of_chain() {
        let mut f = fixture("MakeWidget", Some("Widget"));
        set(&mut f, "Label", "Hello");
        let begin = f.graph.add_node(NodeKind::Call {
            function: FunctionRef::new("Lib", "Begin"),
        });
        let after = f.graph.add_node(NodeKind::Call {
            function: FunctionRef::new("Lib", "After"),
        });
        let synth = Synthesizer::new(&f.reg, true);
        synth.synthesize(&mut f.graph, begin).unwrap();
        synth.synthesize(&mut f.graph, after).unwrap();
        let begin_then = f.graph.find_pin(begin, "then").unwrap();
        let exec = f.graph.find_pin(f.node, "execute").unwrap();
        f.graph.connect(&f.reg, begin_then, exec).unwrap();
        let then = f.graph.find_pin(f.node, "then").unwrap();
        let after_exec = f.graph.find_pin(after, "execute").unwrap();
        f.graph.connect(&f.reg, then, after_exec).unwrap();
        f.graph.pin_mut(after_exec).unwrap().connectable = false;

        let out = expand(&mut f.graph, &f.reg, f.node, &f.plan).unwrap();
        let d = out.diagnostic.as_ref().unwrap();
        assert_eq!(d.code, Some(codes::E0102));
        assert_eq!(d.cause_chain.len(), 1, "{:?}", d.cause_chain);
        assert!(d.cause_chain[0].message.contains("then"), "{}", d.cause_chain[0].message);

        let construct = out.created[0];
        let construct_exec = f.graph.find_pin(construct, names::EXECUTE).unwrap();
        assert_eq!(f.graph.pin(begin_then).unwrap().links, vec![construct_exec]);
        assert_eq!(walk(&f.graph, construct), vec!["MakeWidget", "SetStringPropertyByName"]);
        assert!(f.graph.pin(after_exec).unwrap().links.is_empty());
        assert!(!f.graph.contains_node(f.node));
    }

    #[test]
    fn chain_follows_pin_order_and_skips_defaults() {
        let mut f = fixture("MakeWidget", Some("Widget"));
        set(&mut f, "Health", "100");
        set(&mut f, "Label", "Hello");
        set(&mut f, "Mode", "Blue");
        let out = expand(&mut f.graph, &f.reg, f.node, &f.plan).unwrap();
        assert!(out.ok(), "{:?}", out.diagnostic);
        let construct = out.created[0];
        assert_eq!(
            walk(&f.graph, construct),
            vec!["MakeWidget", "SetStringPropertyByName", "SetBytePropertyByName"]
        );
        let literal = out
            .created
            .iter()
            .find(|n| matches!(f.graph.node(**n).unwrap().kind, NodeKind::EnumLiteral { .. }))
            .copied()
            .unwrap();
        let e = f.graph.find_pin(literal, names::ENUM).unwrap();
        assert_eq!(f.graph.pin(e).unwrap().default_value.as_deref(), Some("Blue"));
    }

    #[test]
    fn dedicated_setter_receives_object_on_self() {
        let mut f = fixture("MakeWidget", Some("Widget"));
        set(&mut f, "Tint", "Green");
        let out = expand(&mut f.graph, &f.reg, f.node, &f.plan).unwrap();
        assert!(out.ok(), "{:?}", out.diagnostic);
        let setter = call_named(&f.graph, &out.created, "SetTint");
        let construct = out.created[0];
        let result = f.graph.find_pin(construct, names::RETURN_VALUE).unwrap();
        let target = f.graph.find_pin(setter, names::SELF).unwrap();
        assert!(f.graph.is_linked(result, target));
        let value = f.graph.find_pin(setter, "NewTint").unwrap();
        assert_eq!(f.graph.pin(value).unwrap().default_value.as_deref(), Some("Green"));
    }

    #[test]
    fn containers_and_structs_use_specialized_value_pins() {
        let mut f = fixture("MakeWidget", Some("Widget"));
        set(&mut f, "Tags", "(A,B)");
        set(&mut f, "Offset", "(X=1,Y=0,Z=0)");
        let out = expand(&mut f.graph, &f.reg, f.node, &f.plan).unwrap();
        assert!(out.ok(), "{:?}", out.diagnostic);
        let arrays = call_named(&f.graph, &out.created, "SetArrayPropertyByName");
        let v = f.graph.pin(f.graph.find_pin(arrays, names::VALUE).unwrap()).unwrap();
        assert_eq!(v.ty.to_string(), "array<name>");
        let structs = call_named(&f.graph, &out.created, "SetStructurePropertyByName");
        let v = f.graph.pin(f.graph.find_pin(structs, names::VALUE).unwrap()).unwrap();
        assert_eq!(v.ty.to_string(), "struct<Vector>");
        assert!(v.is_reference);
        let n = f.graph.pin(f.graph.find_pin(structs, names::PROPERTY_NAME).unwrap()).unwrap();
        assert_eq!(n.default_value.as_deref(), Some("Offset"));
    }

    #[test]
    fn validated_actor_chain_with_default_finish() {
        let mut f = fixture("SpawnThing", Some("Thing"));
        set(&mut f, "Speed", "600");
        let after = f.graph.add_node(NodeKind::Call {
            function: FunctionRef::new("Lib", "After"),
        });
        let on_fail = f.graph.add_node(NodeKind::Call {
            function: FunctionRef::new("Lib", "After"),
        });
        let synth = Synthesizer::new(&f.reg, true);
        synth.synthesize(&mut f.graph, after).unwrap();
        synth.synthesize(&mut f.graph, on_fail).unwrap();
        let then = f.graph.find_pin(f.node, names::THEN).unwrap();
        let failed = f.graph.find_pin(f.node, names::FAILED).unwrap();
        let after_exec = f.graph.find_pin(after, names::EXECUTE).unwrap();
        let fail_exec = f.graph.find_pin(on_fail, names::EXECUTE).unwrap();
        f.graph.connect(&f.reg, then, after_exec).unwrap();
        f.graph.connect(&f.reg, failed, fail_exec).unwrap();

        let out = expand(&mut f.graph, &f.reg, f.node, &f.plan).unwrap();
        assert!(out.ok(), "{:?}", out.diagnostic);
        let construct = out.created[0];
        assert_eq!(
            walk(&f.graph, construct),
            vec![
                "SpawnThing",
                "Primitive.Branch",
                "SetRealPropertyByName",
                "DefaultFinishSpawningActor",
                "After"
            ]
        );
        let branch = out
            .created
            .iter()
            .find(|n| f.graph.node(**n).unwrap().kind == NodeKind::Branch)
            .copied()
            .unwrap();
        let otherwise = f.graph.find_pin(branch, names::ELSE).unwrap();
        assert_eq!(f.graph.pin(otherwise).unwrap().links, vec![fail_exec]);
    }

    #[test]
    fn linked_values_are_always_assigned() {
        let mut f = fixture("MakeWidget", Some("Widget"));
        let begin = f.graph.add_node(NodeKind::Call {
            function: FunctionRef::new("Lib", "Begin"),
        });
        Synthesizer::new(&f.reg, true).synthesize(&mut f.graph, begin).unwrap();
        let health_src = f.graph.find_pin(begin, names::RETURN_VALUE).unwrap();
        let health = f.graph.find_pin(f.node, "Health").unwrap();
        f.graph.connect(&f.reg, health_src, health).unwrap();

        let out = expand(&mut f.graph, &f.reg, f.node, &f.plan).unwrap();
        assert!(out.ok(), "{:?}", out.diagnostic);
        // The literal still equals the default, but the link wins.
        let set_real = call_named(&f.graph, &out.created, "SetRealPropertyByName");
        let value = f.graph.find_pin(set_real, names::VALUE).unwrap();
        assert_eq!(f.graph.pin(health_src).unwrap().links, vec![value]);
    }
}

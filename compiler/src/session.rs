// session.rs — Editor session over one graph
//
// Applies user link edits the way a host editor would: through the
// connection rules, optionally with the host's generic control auto-wiring,
// followed by the delegate auto-wire correction. Deferred work goes to an
// idle queue drained by `run_idle`.
//
// Preconditions: the registry is linked; node pins are synthesized.
// Postconditions: graph invariants hold after every call.
// Failure modes: rejected connections → `ConnectError` (graph unchanged).
// Side effects: mutates the owned graph.

use crate::delegate;
use crate::eligibility::ExpandError;
use crate::graph::{ConnectError, Direction, Graph};
use crate::id::{NodeId, PinId};
use crate::registry::Registry;
use crate::schema::names;
use crate::synth::{SynthReport, Synthesizer};

type IdleTask = Box<dyn FnOnce(&mut Graph)>;

/// One-shot tasks run on the host's next idle tick.
#[derive(Default)]
pub struct IdleQueue {
    tasks: Vec<IdleTask>,
}

impl IdleQueue {
    pub fn schedule(&mut self, task: impl FnOnce(&mut Graph) + 'static) {
        self.tasks.push(Box::new(task));
    }

    /// Run every pending task once, in scheduling order. Returns how many ran.
    pub fn run(&mut self, graph: &mut Graph) -> usize {
        let tasks = std::mem::take(&mut self.tasks);
        let count = tasks.len();
        for task in tasks {
            task(graph);
        }
        count
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl std::fmt::Debug for IdleQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdleQueue").field("pending", &self.tasks.len()).finish()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    /// Mimic the host's generic behavior of wiring `then → execute` when two
    /// nodes are joined by a data link.
    pub auto_wire_control: bool,
    pub default_finish: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        SessionOptions {
            auto_wire_control: true,
            default_finish: true,
        }
    }
}

#[derive(Debug)]
pub struct EditSession<'r> {
    graph: Graph,
    registry: &'r Registry,
    options: SessionOptions,
    idle: IdleQueue,
}

impl<'r> EditSession<'r> {
    pub fn new(graph: Graph, registry: &'r Registry, options: SessionOptions) -> Self {
        EditSession {
            graph,
            registry,
            options,
            idle: IdleQueue::default(),
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn into_graph(self) -> Graph {
        self.graph
    }

    pub fn pending_idle(&self) -> usize {
        self.idle.len()
    }

    /// Re-synthesize a node's pins (after creation or a signature change).
    pub fn refresh(&mut self, node: NodeId) -> Result<SynthReport, ExpandError> {
        Synthesizer::new(self.registry, self.options.default_finish).synthesize(&mut self.graph, node)
    }

    pub fn set_default(&mut self, pin: PinId, value: Option<String>) -> bool {
        self.graph.set_default(pin, value)
    }

    /// Create a link as the user would.
    pub fn connect(&mut self, a: PinId, b: PinId) -> Result<(), ConnectError> {
        let (out, inp) = self.graph.check_connection(self.registry, a, b)?;
        self.graph.connect(self.registry, out, inp)?;
        if self.options.auto_wire_control {
            self.generic_control_wire(out, inp);
        }
        for pin in [out, inp] {
            delegate::on_pin_linked(&mut self.graph, self.registry, pin, &mut self.idle);
        }
        Ok(())
    }

    pub fn disconnect(&mut self, a: PinId, b: PinId) -> bool {
        self.graph.break_link(a, b)
    }

    /// Drain the idle queue.
    pub fn run_idle(&mut self) -> usize {
        self.idle.run(&mut self.graph)
    }

    /// Host default: a data link between two impure nodes also chains their
    /// control flow when both ends are free.
    fn generic_control_wire(&mut self, out: PinId, inp: PinId) {
        let (Some(o), Some(i)) = (self.graph.pin(out), self.graph.pin(inp)) else {
            return;
        };
        if !o.is_data() {
            return;
        }
        let (from, to) = (o.owner, i.owner);
        let then = self.graph.find_pin_dir(from, names::THEN, Direction::Output);
        let entry = self.graph.find_pin_dir(to, names::EXECUTE, Direction::Input);
        if let (Some(then), Some(entry)) = (then, entry) {
            let free = |p: PinId| self.graph.pin(p).is_some_and(|p| !p.has_links());
            if free(then) && free(entry) {
                // A rejected control link just means no auto-wiring.
                let _ = self.graph.connect(self.registry, then, entry);
            }
        }
    }
}

// graph.rs — Node/pin graph IR
//
// The intermediate representation every component shares: nodes own ordered
// pins, pins hold symmetric link lists. Nodes and pins live in id-keyed
// arenas; ids are never reused, so a stale id simply resolves to nothing.
//
// Preconditions: none.
// Postconditions: links are always symmetric and only reference live pins;
//                 a data input and a control output hold at most one link.
// Failure modes: rejected connections → `ConnectError` (graph unchanged).
// Side effects: none.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::{IdAllocator, NodeId, PinId};
use crate::registry::{FunctionRef, Registry};
use crate::types::PinType;

// ── Node and pin model ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Input => Direction::Output,
            Direction::Output => Direction::Input,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Control,
    Data,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => write!(f, "input"),
            Direction::Output => write!(f, "output"),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Control => write!(f, "control"),
            Category::Data => write!(f, "data"),
        }
    }
}

/// What a node is. Intent kinds exist only until lowering replaces them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum NodeKind {
    #[serde(rename = "Intent.Call")]
    IntentCall { function: FunctionRef },
    #[serde(rename = "Intent.Construct")]
    IntentConstruct { function: FunctionRef },
    #[serde(rename = "Primitive.Call")]
    Call { function: FunctionRef },
    #[serde(rename = "Primitive.EventSink")]
    EventSink { delegate: String, event_name: String },
    #[serde(rename = "Primitive.Branch")]
    Branch,
    #[serde(rename = "Primitive.EnumLiteral")]
    EnumLiteral { enum_name: String },
}

impl NodeKind {
    pub fn tag(&self) -> &'static str {
        match self {
            NodeKind::IntentCall { .. } => "Intent.Call",
            NodeKind::IntentConstruct { .. } => "Intent.Construct",
            NodeKind::Call { .. } => "Primitive.Call",
            NodeKind::EventSink { .. } => "Primitive.EventSink",
            NodeKind::Branch => "Primitive.Branch",
            NodeKind::EnumLiteral { .. } => "Primitive.EnumLiteral",
        }
    }

    pub fn is_intent(&self) -> bool {
        matches!(
            self,
            NodeKind::IntentCall { .. } | NodeKind::IntentConstruct { .. }
        )
    }

    /// Bound function, for call-like kinds.
    pub fn function(&self) -> Option<&FunctionRef> {
        match self {
            NodeKind::IntentCall { function }
            | NodeKind::IntentConstruct { function }
            | NodeKind::Call { function } => Some(function),
            _ => None,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::IntentCall { function }
            | NodeKind::IntentConstruct { function }
            | NodeKind::Call { function } => write!(f, "{} {}", self.tag(), function),
            NodeKind::EventSink { event_name, .. } => write!(f, "{} {}", self.tag(), event_name),
            NodeKind::Branch => write!(f, "{}", self.tag()),
            NodeKind::EnumLiteral { enum_name } => write!(f, "{} {}", self.tag(), enum_name),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Pin {
    pub id: PinId,
    pub owner: NodeId,
    pub name: String,
    pub direction: Direction,
    pub category: Category,
    pub ty: PinType,
    pub default_value: Option<String>,
    /// Linked pins. Always mirrored on the other side.
    pub links: Vec<PinId>,
    /// Position of the owning callback's control pin within the node's pin list.
    pub source_index: Option<usize>,
    pub hidden: bool,
    pub connectable: bool,
    /// Passed by reference (no copy of the value at the call site).
    pub is_reference: bool,
}

impl Pin {
    pub fn is_input(&self) -> bool {
        self.direction == Direction::Input
    }

    pub fn is_output(&self) -> bool {
        self.direction == Direction::Output
    }

    pub fn is_control(&self) -> bool {
        self.category == Category::Control
    }

    pub fn is_data(&self) -> bool {
        self.category == Category::Data
    }

    pub fn has_links(&self) -> bool {
        !self.links.is_empty()
    }

    /// Data inputs and control outputs hold at most one link.
    pub fn is_single_link(&self) -> bool {
        matches!(
            (self.category, self.direction),
            (Category::Data, Direction::Input) | (Category::Control, Direction::Output)
        )
    }

    /// A literal default that is present and non-empty.
    pub fn literal(&self) -> Option<&str> {
        self.default_value.as_deref().filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Owned pins, in display order.
    pub pins: Vec<PinId>,
    /// Intent node this primitive was expanded from.
    pub origin: Option<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphKind {
    #[default]
    EventGraph,
    Function,
    Macro,
}

impl GraphKind {
    /// Only event graphs can host event sinks.
    pub fn supports_event_sinks(self) -> bool {
        self == GraphKind::EventGraph
    }
}

// ── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectError {
    #[error("pin {0} does not exist")]
    MissingPin(PinId),
    #[error("cannot link two pins of the same node")]
    SameNode,
    #[error("'{a}' and '{b}' are both {direction}s")]
    SameDirection {
        a: String,
        b: String,
        direction: Direction,
    },
    #[error("cannot link {from} pin '{a}' to {to} pin '{b}'")]
    CategoryMismatch {
        a: String,
        b: String,
        from: Category,
        to: Category,
    },
    #[error("'{output}' of type {from} is not assignable to '{input}' of type {to}")]
    TypeMismatch {
        output: String,
        input: String,
        from: PinType,
        to: PinType,
    },
    #[error("pin '{0}' is not connectable")]
    NotConnectable(String),
}

// ── Graph ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Graph {
    pub name: String,
    pub kind: GraphKind,
    /// Class the graph belongs to; drives the hidden-pin policy.
    pub host_class: Option<String>,
    ids: IdAllocator,
    nodes: BTreeMap<NodeId, Node>,
    pins: BTreeMap<PinId, Pin>,
}

impl Graph {
    pub fn new(name: impl Into<String>, kind: GraphKind) -> Self {
        Graph {
            name: name.into(),
            kind,
            host_class: None,
            ids: IdAllocator::new(),
            nodes: BTreeMap::new(),
            pins: BTreeMap::new(),
        }
    }

    // ── Nodes ───────────────────────────────────────────────────────────

    pub fn add_node(&mut self, kind: NodeKind) -> NodeId {
        let id = self.ids.alloc_node();
        self.insert_node(id, kind);
        id
    }

    /// Add a node under a caller-chosen id. Returns `false` if the id is taken.
    pub fn add_node_with_id(&mut self, id: NodeId, kind: NodeKind) -> bool {
        if self.nodes.contains_key(&id) {
            return false;
        }
        self.ids.reserve_node(id);
        self.insert_node(id, kind);
        true
    }

    fn insert_node(&mut self, id: NodeId, kind: NodeKind) {
        self.nodes.insert(
            id,
            Node {
                id,
                kind,
                pins: Vec::new(),
                origin: None,
            },
        );
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Sever every link of every pin, then drop the node and its pins.
    pub fn remove_node(&mut self, id: NodeId) -> bool {
        self.break_node_links(id);
        let Some(node) = self.nodes.remove(&id) else {
            return false;
        };
        for pin in node.pins {
            self.pins.remove(&pin);
        }
        true
    }

    // ── Pins ────────────────────────────────────────────────────────────

    /// Append a new, unlinked, visible pin to `node`.
    pub fn create_pin(
        &mut self,
        node: NodeId,
        name: impl Into<String>,
        direction: Direction,
        category: Category,
        ty: PinType,
    ) -> Option<PinId> {
        let owner = self.nodes.get_mut(&node)?;
        let id = self.ids.alloc_pin();
        owner.pins.push(id);
        self.pins.insert(
            id,
            Pin {
                id,
                owner: node,
                name: name.into(),
                direction,
                category,
                ty,
                default_value: None,
                links: Vec::new(),
                source_index: None,
                hidden: false,
                connectable: true,
                is_reference: false,
            },
        );
        Some(id)
    }

    /// Sever the pin's links, then remove it from its node.
    pub fn remove_pin(&mut self, id: PinId) -> bool {
        self.break_pin_links(id);
        let Some(pin) = self.pins.remove(&id) else {
            return false;
        };
        if let Some(node) = self.nodes.get_mut(&pin.owner) {
            node.pins.retain(|p| *p != id);
        }
        true
    }

    pub fn pin(&self, id: PinId) -> Option<&Pin> {
        self.pins.get(&id)
    }

    pub fn pin_mut(&mut self, id: PinId) -> Option<&mut Pin> {
        self.pins.get_mut(&id)
    }

    pub fn contains_pin(&self, id: PinId) -> bool {
        self.pins.contains_key(&id)
    }

    pub fn pins(&self) -> impl Iterator<Item = &Pin> {
        self.pins.values()
    }

    /// Pins of a node in display order.
    pub fn pins_of(&self, node: NodeId) -> Vec<&Pin> {
        self.nodes
            .get(&node)
            .map(|n| n.pins.iter().filter_map(|p| self.pins.get(p)).collect())
            .unwrap_or_default()
    }

    pub fn find_pin(&self, node: NodeId, name: &str) -> Option<PinId> {
        self.pins_of(node)
            .into_iter()
            .find(|p| p.name == name)
            .map(|p| p.id)
    }

    pub fn find_pin_dir(&self, node: NodeId, name: &str, direction: Direction) -> Option<PinId> {
        self.pins_of(node)
            .into_iter()
            .find(|p| p.name == name && p.direction == direction)
            .map(|p| p.id)
    }

    /// Pin at `index` in the node's display order.
    pub fn pin_at(&self, node: NodeId, index: usize) -> Option<PinId> {
        self.nodes.get(&node).and_then(|n| n.pins.get(index).copied())
    }

    pub fn set_default(&mut self, pin: PinId, value: Option<String>) -> bool {
        match self.pins.get_mut(&pin) {
            Some(p) => {
                p.default_value = value;
                true
            }
            None => false,
        }
    }

    // ── Links ───────────────────────────────────────────────────────────

    pub fn is_linked(&self, a: PinId, b: PinId) -> bool {
        self.pins.get(&a).is_some_and(|p| p.links.contains(&b))
    }

    /// Order a candidate pair as (output, input) and check every rule.
    pub fn check_connection(
        &self,
        registry: &Registry,
        a: PinId,
        b: PinId,
    ) -> Result<(PinId, PinId), ConnectError> {
        let pa = self.pins.get(&a).ok_or(ConnectError::MissingPin(a))?;
        let pb = self.pins.get(&b).ok_or(ConnectError::MissingPin(b))?;
        if pa.owner == pb.owner {
            return Err(ConnectError::SameNode);
        }
        if pa.direction == pb.direction {
            return Err(ConnectError::SameDirection {
                a: pa.name.clone(),
                b: pb.name.clone(),
                direction: pa.direction,
            });
        }
        if pa.category != pb.category {
            return Err(ConnectError::CategoryMismatch {
                a: pa.name.clone(),
                b: pb.name.clone(),
                from: pa.category,
                to: pb.category,
            });
        }
        for p in [pa, pb] {
            if !p.connectable {
                return Err(ConnectError::NotConnectable(p.name.clone()));
            }
        }
        let (out, inp) = if pa.is_output() { (pa, pb) } else { (pb, pa) };
        if out.is_data() && !crate::schema::is_assignable(registry, &out.ty, &inp.ty) {
            return Err(ConnectError::TypeMismatch {
                output: out.name.clone(),
                input: inp.name.clone(),
                from: out.ty.clone(),
                to: inp.ty.clone(),
            });
        }
        Ok((out.id, inp.id))
    }

    /// Connect two pins. A single-link endpoint drops its previous link first.
    pub fn connect(&mut self, registry: &Registry, a: PinId, b: PinId) -> Result<(), ConnectError> {
        let (out, inp) = self.check_connection(registry, a, b)?;
        if self.is_linked(out, inp) {
            return Ok(());
        }
        for end in [out, inp] {
            if self.pins.get(&end).is_some_and(Pin::is_single_link) {
                self.break_pin_links(end);
            }
        }
        self.make_link(out, inp);
        Ok(())
    }

    fn make_link(&mut self, a: PinId, b: PinId) {
        if let Some(p) = self.pins.get_mut(&a) {
            p.links.push(b);
        }
        if let Some(p) = self.pins.get_mut(&b) {
            p.links.push(a);
        }
    }

    pub fn break_link(&mut self, a: PinId, b: PinId) -> bool {
        let mut removed = false;
        if let Some(p) = self.pins.get_mut(&a) {
            let before = p.links.len();
            p.links.retain(|l| *l != b);
            removed = p.links.len() != before;
        }
        if let Some(p) = self.pins.get_mut(&b) {
            p.links.retain(|l| *l != a);
        }
        removed
    }

    pub fn break_pin_links(&mut self, pin: PinId) {
        let linked = match self.pins.get_mut(&pin) {
            Some(p) => std::mem::take(&mut p.links),
            None => return,
        };
        for other in linked {
            if let Some(p) = self.pins.get_mut(&other) {
                p.links.retain(|l| *l != pin);
            }
        }
    }

    pub fn break_node_links(&mut self, node: NodeId) {
        let pins = match self.nodes.get(&node) {
            Some(n) => n.pins.clone(),
            None => return,
        };
        for pin in pins {
            self.break_pin_links(pin);
        }
    }

    /// Re-home every link of `from` onto `to` and carry its default value.
    /// Each link is attempted independently; `from` ends up unlinked either
    /// way. Returns the first failure.
    pub fn move_links(&mut self, registry: &Registry, from: PinId, to: PinId) -> Result<(), ConnectError> {
        self.transfer_links(registry, from, to, true)
    }

    /// Like `move_links`, but `from` keeps its links.
    pub fn copy_links(&mut self, registry: &Registry, from: PinId, to: PinId) -> Result<(), ConnectError> {
        self.transfer_links(registry, from, to, false)
    }

    fn transfer_links(
        &mut self,
        registry: &Registry,
        from: PinId,
        to: PinId,
        detach: bool,
    ) -> Result<(), ConnectError> {
        let src = self.pins.get(&from).ok_or(ConnectError::MissingPin(from))?;
        let dst = self.pins.get(&to).ok_or(ConnectError::MissingPin(to))?;
        if src.direction != dst.direction || src.category != dst.category {
            let err = ConnectError::CategoryMismatch {
                a: src.name.clone(),
                b: dst.name.clone(),
                from: src.category,
                to: dst.category,
            };
            if detach {
                self.break_pin_links(from);
            }
            return Err(err);
        }
        let linked = src.links.clone();
        let default = src.default_value.clone();
        if default.is_some() {
            self.set_default(to, default);
        }

        let mut first_err = None;
        for other in linked {
            if detach {
                self.break_link(from, other);
            }
            if let Err(e) = self.connect(registry, to, other) {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Every link once, as (output, input).
    pub fn links(&self) -> Vec<(PinId, PinId)> {
        self.pins
            .values()
            .filter(|p| p.is_output())
            .flat_map(|p| p.links.iter().map(move |l| (p.id, *l)))
            .collect()
    }

    pub fn link_count(&self) -> usize {
        self.pins.values().map(|p| p.links.len()).sum::<usize>() / 2
    }
}

// ── Link move bookkeeping ───────────────────────────────────────────────────

/// Accumulates the outcome of best-effort link moves during one expansion.
#[derive(Debug, Default)]
pub struct MoveLog {
    failures: Vec<String>,
}

impl MoveLog {
    pub fn record(&mut self, what: &str, result: Result<(), ConnectError>) {
        if let Err(e) = result {
            tracing::debug!("link move '{}' failed: {}", what, e);
            self.failures.push(format!("'{what}': {e}"));
        }
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.failures.push(message.into());
    }

    pub fn ok(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures(&self) -> &[String] {
        &self.failures
    }
}

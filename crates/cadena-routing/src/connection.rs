//! Connection model, the unit of persistence and editing.
//!
//! A program's routing is a flat set of pin-to-pin wires ([`Connection`]),
//! each joining two [`Endpoint`]s. Endpoints name a graph vertex ([`Node`])
//! plus a pin index. The set ([`ConnectionSet`]) is the persisted routing
//! document content; everything else in this crate is derived from it.

#[cfg(not(feature = "std"))]
use alloc::{
    collections::{BTreeSet, btree_set},
    vec::Vec,
};
#[cfg(feature = "std")]
use std::collections::{BTreeSet, btree_set};

/// Identifier of an instantiated processing unit.
///
/// Unit ids are assigned by the unit-hosting subsystem; this engine treats
/// them as opaque keys and never looks up unit contents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitId(u32);

impl UnitId {
    /// Wraps a raw unit identifier.
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for UnitId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "UnitId({})", self.0)
    }
}

/// A graph vertex identity: the endpoint kind plus unit id, ignoring pin.
///
/// Two endpoints that differ only in pin map to the same node. The derived
/// ordering (`Io` < `ReturnSend` < `Unit`, then by unit id) is the
/// deterministic total order used for set iteration and map keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Node {
    /// The device's physical audio input/output boundary.
    Io,
    /// The auxiliary return/send bus.
    ReturnSend,
    /// A processing-unit instance.
    Unit(UnitId),
}

impl Node {
    /// Returns the unit id if this node is a processing unit.
    #[inline]
    pub fn unit_id(self) -> Option<UnitId> {
        match self {
            Node::Unit(id) => Some(id),
            _ => None,
        }
    }
}

impl core::fmt::Display for Node {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Node::Io => write!(f, "io"),
            Node::ReturnSend => write!(f, "return_send"),
            Node::Unit(id) => write!(f, "unit {}", id.index()),
        }
    }
}

/// One side of a wire: a node plus a pin index on that node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Endpoint {
    /// The vertex this endpoint belongs to.
    pub node: Node,
    /// Pin index on the node (0-based).
    pub pin: u32,
}

impl Endpoint {
    /// Creates an endpoint on an arbitrary node.
    #[inline]
    pub const fn new(node: Node, pin: u32) -> Self {
        Self { node, pin }
    }

    /// Creates an endpoint on the IO boundary node.
    #[inline]
    pub const fn io(pin: u32) -> Self {
        Self::new(Node::Io, pin)
    }

    /// Creates an endpoint on the return/send bus node.
    #[inline]
    pub const fn return_send(pin: u32) -> Self {
        Self::new(Node::ReturnSend, pin)
    }

    /// Creates an endpoint on a processing unit.
    #[inline]
    pub const fn unit(id: UnitId, pin: u32) -> Self {
        Self::new(Node::Unit(id), pin)
    }
}

/// A directed pin-to-pin wire from a source endpoint to a destination
/// endpoint.
///
/// The derived ordering (source, then destination) is the canonical order
/// connections iterate in within a [`ConnectionSet`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Connection {
    /// Where the signal comes from.
    pub source: Endpoint,
    /// Where the signal goes.
    pub dest: Endpoint,
}

impl Connection {
    /// Creates a connection between two endpoints.
    #[inline]
    pub const fn new(source: Endpoint, dest: Endpoint) -> Self {
        Self { source, dest }
    }

    /// Returns true if either endpoint lies on the given node.
    #[inline]
    pub fn touches(&self, node: Node) -> bool {
        self.source.node == node || self.dest.node == node
    }

    /// Returns true if this wire links `a` and `b` in either direction.
    #[inline]
    pub fn links(&self, a: Node, b: Node) -> bool {
        (self.source.node == a && self.dest.node == b)
            || (self.source.node == b && self.dest.node == a)
    }
}

impl core::fmt::Display for Connection {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{}:{} -> {}:{}",
            self.source.node, self.source.pin, self.dest.node, self.dest.pin
        )
    }
}

/// Which side of a node a pin or connection list refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PortSide {
    /// Connections arriving at the node.
    Input,
    /// Connections leaving the node.
    Output,
}

/// Result of a preferred-pin query: the pin plus every connection on it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreferredPin {
    /// The selected pin index.
    pub pin: u32,
    /// All connections landing on (or leaving) that pin, in canonical order.
    pub connections: Vec<Connection>,
}

/// The full set of connections for one program.
///
/// Backed by a `BTreeSet`, so the set is structurally deduplicated and
/// iterates in the canonical (source, destination) order. Rebuilding the
/// graph and the execution order from the same set is fully reproducible.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConnectionSet {
    connections: BTreeSet<Connection>,
}

impl ConnectionSet {
    /// Creates an empty connection set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the default content of a fresh program: one identity wire
    /// from the IO input boundary straight to the IO output boundary.
    pub fn identity() -> Self {
        let mut set = Self::new();
        set.insert(Connection::new(Endpoint::io(0), Endpoint::io(0)));
        set
    }

    /// Inserts a connection. Returns false if it was already present.
    pub fn insert(&mut self, connection: Connection) -> bool {
        self.connections.insert(connection)
    }

    /// Removes a connection. Returns false if it was not present.
    pub fn remove(&mut self, connection: &Connection) -> bool {
        self.connections.remove(connection)
    }

    /// Returns true if the exact connection is present.
    pub fn contains(&self, connection: &Connection) -> bool {
        self.connections.contains(connection)
    }

    /// Keeps only the connections matching the predicate.
    pub fn retain(&mut self, f: impl FnMut(&Connection) -> bool) {
        self.connections.retain(f);
    }

    /// Number of connections in the set.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Returns true if the set holds no connections.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Iterates connections in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter()
    }

    /// Iterates the connections with an endpoint on the given node.
    pub fn touching(&self, node: Node) -> impl Iterator<Item = &Connection> {
        self.connections.iter().filter(move |c| c.touches(node))
    }

    /// Finds the pin the editor should operate on for one side of a node.
    ///
    /// Pin 0 wins if anything is connected there; otherwise the pin of the
    /// first matching connection in canonical order is used. Returns `None`
    /// when the side has no connections at all.
    pub fn preferred_pin(&self, node: Node, side: PortSide) -> Option<PreferredPin> {
        let pin_on_side = |c: &Connection| -> Option<u32> {
            match side {
                PortSide::Input => (c.dest.node == node).then_some(c.dest.pin),
                PortSide::Output => (c.source.node == node).then_some(c.source.pin),
            }
        };

        let pin = if self.iter().any(|c| pin_on_side(c) == Some(0)) {
            0
        } else {
            self.iter().find_map(|c| pin_on_side(c))?
        };

        let connections = self
            .iter()
            .filter(|c| pin_on_side(c) == Some(pin))
            .copied()
            .collect();
        Some(PreferredPin { pin, connections })
    }
}

impl FromIterator<Connection> for ConnectionSet {
    fn from_iter<I: IntoIterator<Item = Connection>>(iter: I) -> Self {
        Self {
            connections: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ConnectionSet {
    type Item = &'a Connection;
    type IntoIter = btree_set::Iter<'a, Connection>;

    fn into_iter(self) -> Self::IntoIter {
        self.connections.iter()
    }
}

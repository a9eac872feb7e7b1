//! Derived adjacency structure and read-only graph queries.
//!
//! [`RoutingGraph`] maps each participating [`Node`] to per-direction,
//! per-pin connection lists. It is rebuilt from the [`ConnectionSet`]
//! whenever the set changes and discarded afterwards, a plain value owned
//! by the edit transaction rather than a cache shared across threads.

#[cfg(not(feature = "std"))]
use alloc::{
    collections::{BTreeMap, BTreeSet},
    vec::Vec,
};
#[cfg(feature = "std")]
use std::collections::{BTreeMap, BTreeSet};

use crate::connection::{Connection, ConnectionSet, Node, PortSide, UnitId};

/// Per-direction, per-pin connection lists of one node.
///
/// Each list is indexed by pin number; its length is one plus the highest
/// connected pin on that side, so lower unconnected pins exist as empty
/// entries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Ports {
    inputs: Vec<Vec<Connection>>,
    outputs: Vec<Vec<Connection>>,
}

impl Ports {
    /// Inbound connection lists, indexed by pin.
    pub fn inputs(&self) -> &[Vec<Connection>] {
        &self.inputs
    }

    /// Outbound connection lists, indexed by pin.
    pub fn outputs(&self) -> &[Vec<Connection>] {
        &self.outputs
    }

    /// Iterates every inbound connection across all pins.
    pub fn inbound(&self) -> impl Iterator<Item = &Connection> {
        self.inputs.iter().flatten()
    }

    /// Iterates every outbound connection across all pins.
    pub fn outbound(&self) -> impl Iterator<Item = &Connection> {
        self.outputs.iter().flatten()
    }

    /// Total number of inbound connections.
    pub fn inbound_count(&self) -> usize {
        self.inputs.iter().map(Vec::len).sum()
    }

    /// Total number of outbound connections.
    pub fn outbound_count(&self) -> usize {
        self.outputs.iter().map(Vec::len).sum()
    }

    fn register(&mut self, side: PortSide, pin: u32, connection: Connection) {
        let lists = match side {
            PortSide::Input => &mut self.inputs,
            PortSide::Output => &mut self.outputs,
        };
        let idx = pin as usize;
        if idx >= lists.len() {
            lists.resize_with(idx + 1, Vec::new);
        }
        lists[idx].push(connection);
    }
}

/// Upstream and downstream transitive closures of one node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reachability {
    /// Nodes the start node transitively depends on (via inbound edges).
    pub upstream: BTreeSet<Node>,
    /// Nodes transitively fed by the start node (via outbound edges).
    pub downstream: BTreeSet<Node>,
}

impl Reachability {
    /// Returns true if the node appears in either closure.
    pub fn contains(&self, node: Node) -> bool {
        self.upstream.contains(&node) || self.downstream.contains(&node)
    }
}

/// Adjacency structure keyed by node identity.
///
/// Only nodes participating in at least one connection appear. Iteration is
/// in node order, so derived traversals are reproducible.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoutingGraph {
    nodes: BTreeMap<Node, Ports>,
}

impl RoutingGraph {
    /// Builds the adjacency structure from a connection set.
    ///
    /// Pure and total: the empty set produces an empty graph, and every node
    /// present has at least one connection.
    pub fn build(connections: &ConnectionSet) -> Self {
        let mut nodes: BTreeMap<Node, Ports> = BTreeMap::new();
        for &connection in connections {
            nodes
                .entry(connection.source.node)
                .or_default()
                .register(PortSide::Output, connection.source.pin, connection);
            nodes
                .entry(connection.dest.node)
                .or_default()
                .register(PortSide::Input, connection.dest.pin, connection);
        }
        Self { nodes }
    }

    /// Returns the port lists of a node, if it participates in any wire.
    pub fn ports(&self, node: Node) -> Option<&Ports> {
        self.nodes.get(&node)
    }

    /// Returns true if the node participates in at least one connection.
    pub fn contains(&self, node: Node) -> bool {
        self.nodes.contains_key(&node)
    }

    /// Number of participating nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if no connections were registered.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates participating nodes in deterministic order.
    pub fn nodes(&self) -> impl Iterator<Item = Node> + '_ {
        self.nodes.keys().copied()
    }

    /// Iterates every connection arriving at a node, lowest pin first.
    pub fn inbound(&self, node: Node) -> impl Iterator<Item = &Connection> {
        self.nodes.get(&node).into_iter().flat_map(Ports::inbound)
    }

    /// Iterates every connection leaving a node, lowest pin first.
    pub fn outbound(&self, node: Node) -> impl Iterator<Item = &Connection> {
        self.nodes.get(&node).into_iter().flat_map(Ports::outbound)
    }

    // --- Coverage queries ---

    /// Returns true if some connection links `a` and `b` in either direction.
    pub fn directly_connected(&self, a: Node, b: Node) -> bool {
        self.outbound(a).any(|c| c.dest.node == b) || self.outbound(b).any(|c| c.dest.node == a)
    }

    /// Computes the upstream and downstream transitive closures of a node.
    ///
    /// Both walks are iterative with a visited set, so they terminate on any
    /// finite graph. The start node itself is not included unless a loop
    /// leads back to it.
    pub fn reachability(&self, start: Node) -> Reachability {
        Reachability {
            upstream: self.closure(start, PortSide::Input),
            downstream: self.closure(start, PortSide::Output),
        }
    }

    /// Returns true if audio can actually reach the device output: walking
    /// inbound edges transitively from the IO node arrives back at an IO
    /// source endpoint.
    pub fn output_reachable(&self) -> bool {
        let mut visited: BTreeSet<Node> = BTreeSet::new();
        let mut stack: Vec<Node> = Vec::new();
        visited.insert(Node::Io);
        stack.push(Node::Io);

        while let Some(node) = stack.pop() {
            for connection in self.inbound(node) {
                let source = connection.source.node;
                if source == Node::Io {
                    return true;
                }
                if visited.insert(source) {
                    stack.push(source);
                }
            }
        }
        false
    }

    /// Returns true if the unit is a harmless final tap before the output:
    /// exactly one inbound connection, landing on pin 0, with every outbound
    /// connection (any pin) targeting the IO node directly.
    pub fn is_terminal_tap(&self, unit: UnitId) -> bool {
        let Some(ports) = self.ports(Node::Unit(unit)) else {
            return false;
        };
        if ports.inbound_count() != 1 {
            return false;
        }
        if ports.inputs().first().is_none_or(|pin0| pin0.len() != 1) {
            return false;
        }
        ports.outbound().all(|c| c.dest.node == Node::Io)
    }

    fn closure(&self, start: Node, side: PortSide) -> BTreeSet<Node> {
        let mut seen: BTreeSet<Node> = BTreeSet::new();
        let mut stack: Vec<Node> = Vec::new();
        stack.push(start);

        while let Some(node) = stack.pop() {
            let neighbors: Vec<Node> = match side {
                PortSide::Input => self.inbound(node).map(|c| c.source.node).collect(),
                PortSide::Output => self.outbound(node).map(|c| c.dest.node).collect(),
            };
            for next in neighbors {
                if seen.insert(next) {
                    stack.push(next);
                }
            }
        }
        seen.remove(&start);
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Endpoint;

    fn uid(id: u32) -> UnitId {
        UnitId::new(id)
    }

    fn wire(source: Endpoint, dest: Endpoint) -> Connection {
        Connection::new(source, dest)
    }

    /// Io -> 1 -> 2 -> Io
    fn simple_chain() -> ConnectionSet {
        let mut set = ConnectionSet::new();
        set.insert(wire(Endpoint::io(0), Endpoint::unit(uid(1), 0)));
        set.insert(wire(Endpoint::unit(uid(1), 0), Endpoint::unit(uid(2), 0)));
        set.insert(wire(Endpoint::unit(uid(2), 0), Endpoint::io(0)));
        set
    }

    #[test]
    fn empty_set_builds_empty_graph() {
        let graph = RoutingGraph::build(&ConnectionSet::new());
        assert!(graph.is_empty());
        assert_eq!(graph.node_count(), 0);
    }

    #[test]
    fn only_participating_nodes_appear() {
        let graph = RoutingGraph::build(&simple_chain());
        assert_eq!(graph.node_count(), 3);
        assert!(graph.contains(Node::Io));
        assert!(graph.contains(Node::Unit(uid(1))));
        assert!(!graph.contains(Node::ReturnSend));
        assert!(!graph.contains(Node::Unit(uid(9))));
    }

    #[test]
    fn port_list_length_is_highest_pin_plus_one() {
        let mut set = ConnectionSet::new();
        set.insert(wire(Endpoint::io(0), Endpoint::unit(uid(1), 2)));
        let graph = RoutingGraph::build(&set);

        let ports = graph.ports(Node::Unit(uid(1))).unwrap();
        assert_eq!(ports.inputs().len(), 3);
        assert!(ports.inputs()[0].is_empty());
        assert!(ports.inputs()[1].is_empty());
        assert_eq!(ports.inputs()[2].len(), 1);
        assert!(ports.outputs().is_empty());
    }

    #[test]
    fn connections_registered_on_both_sides() {
        let graph = RoutingGraph::build(&simple_chain());
        assert_eq!(graph.outbound(Node::Io).count(), 1);
        assert_eq!(graph.inbound(Node::Io).count(), 1);
        assert_eq!(graph.inbound(Node::Unit(uid(1))).count(), 1);
        assert_eq!(graph.outbound(Node::Unit(uid(1))).count(), 1);
    }

    #[test]
    fn directly_connected_either_direction() {
        let graph = RoutingGraph::build(&simple_chain());
        assert!(graph.directly_connected(Node::Io, Node::Unit(uid(1))));
        assert!(graph.directly_connected(Node::Unit(uid(1)), Node::Io));
        assert!(!graph.directly_connected(Node::Io, Node::Unit(uid(9))));
        // 1 and Io are linked; 1 and 2 are linked; Io and 2 are linked too
        // (unit 2 feeds the output).
        assert!(graph.directly_connected(Node::Unit(uid(2)), Node::Io));
    }

    #[test]
    fn reachability_splits_upstream_and_downstream() {
        let graph = RoutingGraph::build(&simple_chain());
        let reach = graph.reachability(Node::Unit(uid(1)));

        assert!(reach.upstream.contains(&Node::Io));
        assert!(!reach.upstream.contains(&Node::Unit(uid(2))));
        assert!(reach.downstream.contains(&Node::Unit(uid(2))));
        assert!(reach.downstream.contains(&Node::Io));
        assert!(!reach.contains(Node::ReturnSend));
    }

    #[test]
    fn reachability_excludes_start_node() {
        let graph = RoutingGraph::build(&simple_chain());
        let reach = graph.reachability(Node::Unit(uid(1)));
        assert!(!reach.upstream.contains(&Node::Unit(uid(1))));
        assert!(!reach.downstream.contains(&Node::Unit(uid(1))));
    }

    #[test]
    fn output_reachable_through_chain() {
        assert!(RoutingGraph::build(&simple_chain()).output_reachable());
    }

    #[test]
    fn output_reachable_on_identity_program() {
        assert!(RoutingGraph::build(&ConnectionSet::identity()).output_reachable());
    }

    #[test]
    fn output_unreachable_when_chain_is_severed() {
        let mut set = ConnectionSet::new();
        // Input feeds unit 1, but nothing reaches the output boundary.
        set.insert(wire(Endpoint::io(0), Endpoint::unit(uid(1), 0)));
        assert!(!RoutingGraph::build(&set).output_reachable());
    }

    #[test]
    fn output_unreachable_when_only_return_send_feeds_it() {
        let mut set = ConnectionSet::new();
        set.insert(wire(Endpoint::return_send(0), Endpoint::io(0)));
        assert!(!RoutingGraph::build(&set).output_reachable());
    }

    #[test]
    fn terminal_tap_requires_single_pin_zero_input_and_io_outputs() {
        let mut set = ConnectionSet::new();
        set.insert(wire(Endpoint::unit(uid(1), 0), Endpoint::unit(uid(2), 0)));
        set.insert(wire(Endpoint::unit(uid(2), 0), Endpoint::io(0)));
        set.insert(wire(Endpoint::unit(uid(2), 1), Endpoint::io(1)));
        let graph = RoutingGraph::build(&set);
        assert!(graph.is_terminal_tap(uid(2)));
    }

    #[test]
    fn terminal_tap_rejects_two_inbound_connections() {
        let mut set = ConnectionSet::new();
        set.insert(wire(Endpoint::unit(uid(1), 0), Endpoint::unit(uid(3), 0)));
        set.insert(wire(Endpoint::unit(uid(2), 0), Endpoint::unit(uid(3), 0)));
        set.insert(wire(Endpoint::unit(uid(3), 0), Endpoint::io(0)));
        let graph = RoutingGraph::build(&set);
        assert!(!graph.is_terminal_tap(uid(3)));
    }

    #[test]
    fn terminal_tap_rejects_input_on_nonzero_pin() {
        let mut set = ConnectionSet::new();
        set.insert(wire(Endpoint::unit(uid(1), 0), Endpoint::unit(uid(2), 1)));
        set.insert(wire(Endpoint::unit(uid(2), 0), Endpoint::io(0)));
        let graph = RoutingGraph::build(&set);
        assert!(!graph.is_terminal_tap(uid(2)));
    }

    #[test]
    fn terminal_tap_rejects_non_io_output() {
        let mut set = ConnectionSet::new();
        set.insert(wire(Endpoint::unit(uid(1), 0), Endpoint::unit(uid(2), 0)));
        set.insert(wire(Endpoint::unit(uid(2), 0), Endpoint::unit(uid(3), 0)));
        let graph = RoutingGraph::build(&set);
        assert!(!graph.is_terminal_tap(uid(2)));
    }

    #[test]
    fn terminal_tap_unknown_unit_is_false() {
        let graph = RoutingGraph::build(&simple_chain());
        assert!(!graph.is_terminal_tap(uid(42)));
    }
}

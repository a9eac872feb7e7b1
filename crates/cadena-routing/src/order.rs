//! Execution-order computation for the renderer.
//!
//! From the adjacency structure and the externally supplied unit
//! classification, [`ExecutionOrder::compute`] produces the two ordered
//! lists the renderer walks each block: audio-rate units in dependency
//! order, and signal/control-rate units. The traversal has no cycle guard
//! of its own, so the cycle detector runs first and a cyclic set is
//! rejected before any walk starts.

#[cfg(not(feature = "std"))]
use alloc::{collections::BTreeSet, vec::Vec};
#[cfg(feature = "std")]
use std::collections::BTreeSet;

use crate::connection::{Node, UnitId};
use crate::cycle::has_cycle;
use crate::error::RoutingError;
use crate::graph::RoutingGraph;

/// Defensive cap on traversal path depth: the number of nodes entered but
/// not yet exited on one walk. Frontier width (queued sibling frames) does
/// not count against it.
///
/// Unreachable for any realistic program; converts a broken invariant into
/// [`RoutingError::DepthLimitExceeded`] instead of unbounded work.
pub const MAX_TRAVERSAL_DEPTH: usize = 4096;

/// The ordered execution lists consumed by the renderer for one block.
///
/// Immutable once computed; published to the render context inside a
/// [`RoutingSnapshot`](crate::RoutingSnapshot).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutionOrder {
    /// Audio-rate units, every unit after all of its upstream dependencies.
    pub audio: Vec<UnitId>,
    /// Signal/control-rate units, in document order.
    pub signal: Vec<UnitId>,
}

impl ExecutionOrder {
    /// Computes the execution order for the given adjacency structure.
    ///
    /// `units` is the full list of known unit ids from the owning document;
    /// `signal_units` is the external classification of which of those run
    /// at signal rate. Every known unit lands in exactly one of the two
    /// lists:
    ///
    /// 1. Signal-rate units are partitioned out first, keeping document
    ///    order.
    /// 2. A post-order walk over inbound edges runs from the IO node, then
    ///    from the return/send node, appending each pending unit after its
    ///    upstream dependencies.
    /// 3. Pending units with no outbound connections (dead ends, fully
    ///    isolated units) seed additional walks, then any stragglers left by
    ///    unusual topologies seed their own, so disconnected sub-chains are
    ///    still included.
    ///
    /// # Errors
    ///
    /// [`RoutingError::CycleDetected`] if the graph is cyclic (checked up
    /// front; the walks themselves have no cycle guard), or
    /// [`RoutingError::DepthLimitExceeded`] if a walk exceeds
    /// [`MAX_TRAVERSAL_DEPTH`].
    pub fn compute(
        graph: &RoutingGraph,
        units: &[UnitId],
        signal_units: &BTreeSet<UnitId>,
    ) -> Result<Self, RoutingError> {
        if has_cycle(graph) {
            return Err(RoutingError::CycleDetected);
        }

        let mut signal: Vec<UnitId> = Vec::new();
        let mut pending: BTreeSet<UnitId> = BTreeSet::new();
        for &unit in units {
            if signal_units.contains(&unit) {
                signal.push(unit);
            } else {
                pending.insert(unit);
            }
        }

        let mut audio: Vec<UnitId> = Vec::with_capacity(pending.len());

        visit_upstream(graph, Node::Io, &mut pending, &mut audio)?;
        visit_upstream(graph, Node::ReturnSend, &mut pending, &mut audio)?;

        // Dead-end sweep: sub-chains with no downstream consumer and fully
        // isolated units are unreachable from the boundary nodes.
        let candidates: Vec<UnitId> = pending.iter().copied().collect();
        for unit in candidates {
            if pending.contains(&unit) && graph.outbound(Node::Unit(unit)).next().is_none() {
                visit_upstream(graph, Node::Unit(unit), &mut pending, &mut audio)?;
            }
        }

        // Stragglers: a unit whose only consumers are signal-rate units is
        // reachable from neither the boundary nodes nor a dead end.
        while let Some(&unit) = pending.iter().next() {
            visit_upstream(graph, Node::Unit(unit), &mut pending, &mut audio)?;
        }

        debug_assert_eq!(audio.len() + signal.len(), units.len());

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "route_order: {} audio, {} signal units",
            audio.len(),
            signal.len()
        );

        Ok(Self { audio, signal })
    }

    /// Total number of units across both lists.
    pub fn len(&self) -> usize {
        self.audio.len() + self.signal.len()
    }

    /// Returns true if no units are scheduled.
    pub fn is_empty(&self) -> bool {
        self.audio.is_empty() && self.signal.is_empty()
    }
}

enum Frame {
    Enter(Node),
    Exit(Node),
}

/// Post-order walk over inbound edges from `start`: every node's upstream
/// dependencies are exited (and therefore appended) before the node itself.
/// A unit is appended only while still pending, so repeated walks never
/// produce duplicates.
fn visit_upstream(
    graph: &RoutingGraph,
    start: Node,
    pending: &mut BTreeSet<UnitId>,
    audio: &mut Vec<UnitId>,
) -> Result<(), RoutingError> {
    let mut entered: BTreeSet<Node> = BTreeSet::new();
    let mut stack: Vec<Frame> = Vec::new();
    // Outstanding Exit frames: every one still on the stack belongs to an
    // ancestor of the current node, so this counts true path depth.
    let mut depth: usize = 0;
    stack.push(Frame::Enter(start));

    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Enter(node) => {
                if !entered.insert(node) {
                    continue;
                }
                depth += 1;
                if depth > MAX_TRAVERSAL_DEPTH {
                    return Err(RoutingError::DepthLimitExceeded);
                }
                stack.push(Frame::Exit(node));
                for connection in graph.inbound(node) {
                    let source = connection.source.node;
                    if !entered.contains(&source) {
                        stack.push(Frame::Enter(source));
                    }
                }
            }
            Frame::Exit(node) => {
                depth -= 1;
                if let Node::Unit(id) = node
                    && pending.remove(&id)
                {
                    audio.push(id);
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{Connection, ConnectionSet, Endpoint};

    fn uid(id: u32) -> UnitId {
        UnitId::new(id)
    }

    fn graph_of(pairs: &[(Endpoint, Endpoint)]) -> RoutingGraph {
        let mut set = ConnectionSet::new();
        for &(source, dest) in pairs {
            set.insert(Connection::new(source, dest));
        }
        RoutingGraph::build(&set)
    }

    fn position(order: &[UnitId], unit: u32) -> usize {
        order
            .iter()
            .position(|&u| u == uid(unit))
            .unwrap_or_else(|| panic!("unit {unit} missing from order"))
    }

    #[test]
    fn empty_program_yields_two_empty_lists() {
        let graph = RoutingGraph::build(&ConnectionSet::identity());
        let order = ExecutionOrder::compute(&graph, &[], &BTreeSet::new()).unwrap();
        assert!(order.audio.is_empty());
        assert!(order.signal.is_empty());
        assert!(order.is_empty());
    }

    #[test]
    fn chain_orders_upstream_before_downstream() {
        let graph = graph_of(&[
            (Endpoint::io(0), Endpoint::unit(uid(1), 0)),
            (Endpoint::unit(uid(1), 0), Endpoint::unit(uid(2), 0)),
            (Endpoint::unit(uid(2), 0), Endpoint::unit(uid(3), 0)),
            (Endpoint::unit(uid(3), 0), Endpoint::io(0)),
        ]);
        let units = [uid(1), uid(2), uid(3)];
        let order = ExecutionOrder::compute(&graph, &units, &BTreeSet::new()).unwrap();

        assert_eq!(order.audio, vec![uid(1), uid(2), uid(3)]);
        assert!(order.signal.is_empty());
    }

    #[test]
    fn signal_units_are_partitioned_in_document_order() {
        let graph = graph_of(&[
            (Endpoint::io(0), Endpoint::unit(uid(1), 0)),
            (Endpoint::unit(uid(1), 0), Endpoint::io(0)),
        ]);
        let units = [uid(1), uid(7), uid(4)];
        let signal: BTreeSet<UnitId> = [uid(7), uid(4)].into_iter().collect();
        let order = ExecutionOrder::compute(&graph, &units, &signal).unwrap();

        assert_eq!(order.audio, vec![uid(1)]);
        assert_eq!(order.signal, vec![uid(7), uid(4)]);
    }

    #[test]
    fn disconnected_unit_appears_exactly_once() {
        let graph = RoutingGraph::build(&ConnectionSet::identity());
        let units = [uid(1)];
        let order = ExecutionOrder::compute(&graph, &units, &BTreeSet::new()).unwrap();
        assert_eq!(order.audio, vec![uid(1)]);
    }

    #[test]
    fn dead_end_sub_chain_is_included() {
        // Main path Io -> 1 -> Io, plus 2 -> 3 going nowhere.
        let graph = graph_of(&[
            (Endpoint::io(0), Endpoint::unit(uid(1), 0)),
            (Endpoint::unit(uid(1), 0), Endpoint::io(0)),
            (Endpoint::unit(uid(2), 0), Endpoint::unit(uid(3), 0)),
        ]);
        let units = [uid(1), uid(2), uid(3)];
        let order = ExecutionOrder::compute(&graph, &units, &BTreeSet::new()).unwrap();

        assert_eq!(order.audio.len(), 3);
        assert!(position(&order.audio, 2) < position(&order.audio, 3));
    }

    #[test]
    fn unit_feeding_only_a_signal_unit_is_still_scheduled() {
        // 1 feeds 2; 2 is signal-rate, so 1 is reachable from neither the
        // boundaries nor a pending dead end.
        let graph = graph_of(&[
            (Endpoint::io(0), Endpoint::unit(uid(1), 0)),
            (Endpoint::unit(uid(1), 0), Endpoint::unit(uid(2), 0)),
        ]);
        let units = [uid(1), uid(2)];
        let signal: BTreeSet<UnitId> = [uid(2)].into_iter().collect();
        let order = ExecutionOrder::compute(&graph, &units, &signal).unwrap();

        assert_eq!(order.audio, vec![uid(1)]);
        assert_eq!(order.signal, vec![uid(2)]);
    }

    #[test]
    fn return_send_path_is_traversed() {
        let graph = graph_of(&[
            (Endpoint::io(0), Endpoint::unit(uid(1), 0)),
            (Endpoint::unit(uid(1), 0), Endpoint::io(0)),
            (Endpoint::unit(uid(2), 0), Endpoint::return_send(0)),
        ]);
        let units = [uid(1), uid(2)];
        let order = ExecutionOrder::compute(&graph, &units, &BTreeSet::new()).unwrap();
        assert_eq!(order.audio.len(), 2);
    }

    #[test]
    fn fan_in_orders_both_sources_before_the_merge() {
        let graph = graph_of(&[
            (Endpoint::io(0), Endpoint::unit(uid(1), 0)),
            (Endpoint::io(0), Endpoint::unit(uid(2), 0)),
            (Endpoint::unit(uid(1), 0), Endpoint::unit(uid(3), 0)),
            (Endpoint::unit(uid(2), 0), Endpoint::unit(uid(3), 1)),
            (Endpoint::unit(uid(3), 0), Endpoint::io(0)),
        ]);
        let units = [uid(1), uid(2), uid(3)];
        let order = ExecutionOrder::compute(&graph, &units, &BTreeSet::new()).unwrap();

        assert_eq!(order.audio.len(), 3);
        assert!(position(&order.audio, 1) < position(&order.audio, 3));
        assert!(position(&order.audio, 2) < position(&order.audio, 3));
    }

    #[test]
    fn every_unit_scheduled_exactly_once() {
        let graph = graph_of(&[
            (Endpoint::io(0), Endpoint::unit(uid(1), 0)),
            (Endpoint::unit(uid(1), 0), Endpoint::unit(uid(2), 0)),
            (Endpoint::unit(uid(2), 0), Endpoint::io(0)),
            (Endpoint::unit(uid(4), 0), Endpoint::unit(uid(5), 0)),
        ]);
        let units = [uid(1), uid(2), uid(3), uid(4), uid(5), uid(6)];
        let signal: BTreeSet<UnitId> = [uid(6)].into_iter().collect();
        let order = ExecutionOrder::compute(&graph, &units, &signal).unwrap();

        assert_eq!(order.len(), units.len());
        let mut seen: BTreeSet<UnitId> = BTreeSet::new();
        for &u in order.audio.iter().chain(order.signal.iter()) {
            assert!(seen.insert(u), "{u} scheduled twice");
        }
    }

    #[test]
    fn wide_fan_in_stays_under_the_depth_cap() {
        // Thousands of units all feeding the output directly: the walk's
        // frontier is huge but its path depth never leaves single digits.
        let count = u32::try_from(MAX_TRAVERSAL_DEPTH).unwrap() + 8;
        let mut set = ConnectionSet::new();
        let units: Vec<UnitId> = (1..=count).map(uid).collect();
        for &u in &units {
            set.insert(Connection::new(Endpoint::unit(u, 0), Endpoint::io(0)));
        }
        let graph = RoutingGraph::build(&set);
        let order = ExecutionOrder::compute(&graph, &units, &BTreeSet::new()).unwrap();
        assert_eq!(order.audio.len(), units.len());
    }

    #[test]
    fn depth_cap_rejects_a_chain_deeper_than_the_limit() {
        let count = u32::try_from(MAX_TRAVERSAL_DEPTH).unwrap() + 2;
        let mut set = ConnectionSet::new();
        for i in 1..count {
            set.insert(Connection::new(
                Endpoint::unit(uid(i), 0),
                Endpoint::unit(uid(i + 1), 0),
            ));
        }
        set.insert(Connection::new(Endpoint::unit(uid(count), 0), Endpoint::io(0)));
        let units: Vec<UnitId> = (1..=count).map(uid).collect();
        let graph = RoutingGraph::build(&set);
        assert_eq!(
            ExecutionOrder::compute(&graph, &units, &BTreeSet::new()),
            Err(RoutingError::DepthLimitExceeded)
        );
    }

    #[test]
    fn cyclic_graph_is_rejected_before_traversal() {
        let graph = graph_of(&[
            (Endpoint::unit(uid(1), 0), Endpoint::unit(uid(2), 0)),
            (Endpoint::unit(uid(2), 0), Endpoint::unit(uid(1), 0)),
        ]);
        let units = [uid(1), uid(2)];
        let result = ExecutionOrder::compute(&graph, &units, &BTreeSet::new());
        assert_eq!(result, Err(RoutingError::CycleDetected));
    }
}

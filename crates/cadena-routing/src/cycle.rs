//! Cycle detection over the unit dependency graph.
//!
//! Runs once per candidate connection set, before the set is accepted.
//! Callers of the editor must reject any set for which [`has_cycle`] returns
//! true and keep the previously committed set in force (fail-closed).

#[cfg(not(feature = "std"))]
use alloc::{collections::BTreeSet, vec::Vec};
#[cfg(feature = "std")]
use std::collections::BTreeSet;

use crate::connection::{Node, UnitId};
use crate::graph::RoutingGraph;

/// Returns true if the connection set behind `graph` contains a dependency
/// cycle among processing units.
///
/// Depth-first search over `Unit` nodes only, walking inbound edges back to
/// each edge's source. `Io` and `ReturnSend` endpoints terminate a walk:
/// they are roots/leaves that cannot themselves participate in a cycle, so
/// the identity IO-to-IO wire of an empty program is not a cycle. The search
/// is iterative (explicit stack), so it is total over any finite graph,
/// cyclic or not.
pub fn has_cycle(graph: &RoutingGraph) -> bool {
    let mut visited: BTreeSet<UnitId> = BTreeSet::new();
    let mut on_path: BTreeSet<UnitId> = BTreeSet::new();

    for node in graph.nodes() {
        if let Node::Unit(id) = node
            && !visited.contains(&id)
            && walk_inbound(graph, id, &mut visited, &mut on_path)
        {
            return true;
        }
    }
    false
}

enum Frame {
    Enter(UnitId),
    Exit(UnitId),
}

/// One DFS rooted at `start`. Reports a cycle the first time an inbound walk
/// reaches a unit already on the current path.
fn walk_inbound(
    graph: &RoutingGraph,
    start: UnitId,
    visited: &mut BTreeSet<UnitId>,
    on_path: &mut BTreeSet<UnitId>,
) -> bool {
    let mut stack: Vec<Frame> = Vec::new();
    stack.push(Frame::Enter(start));

    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Enter(id) => {
                if !visited.insert(id) {
                    continue;
                }
                on_path.insert(id);
                stack.push(Frame::Exit(id));

                for connection in graph.inbound(Node::Unit(id)) {
                    if let Node::Unit(source) = connection.source.node {
                        if on_path.contains(&source) {
                            return true;
                        }
                        if !visited.contains(&source) {
                            stack.push(Frame::Enter(source));
                        }
                    }
                }
            }
            Frame::Exit(id) => {
                on_path.remove(&id);
            }
        }
    }
    false
}

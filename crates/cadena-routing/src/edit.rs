//! Graph-rewriting operations behind the chain-editing UI.
//!
//! All operations mutate a living [`ConnectionSet`] and preserve downstream
//! connectivity where the semantics call for it. None of them validate
//! acyclicity: the caller re-runs [`crate::has_cycle`] (or commits through
//! [`crate::RoutingEngine`], which does) after every edit and rejects the
//! set if a loop appeared.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::connection::{Connection, ConnectionSet, Endpoint, Node, PortSide, UnitId};
use crate::graph::RoutingGraph;

/// Inserts `new_unit` immediately upstream of `target` (`None` targets the
/// IO output boundary).
///
/// Every connection landing on the target's preferred input pin is rewired
/// so its destination becomes `new_unit` pin 0, then a single wire is added
/// from `new_unit` output pin 0 to the target's preferred pin (pin 0 if the
/// side was unconnected). Other pins of both units are left untouched.
pub fn insert_before(set: &mut ConnectionSet, new_unit: UnitId, target: Option<UnitId>) {
    let target_node = target.map_or(Node::Io, Node::Unit);
    let preferred = set.preferred_pin(target_node, PortSide::Input);
    let target_pin = preferred.as_ref().map_or(0, |p| p.pin);

    if let Some(preferred) = preferred {
        for connection in preferred.connections {
            set.remove(&connection);
            set.insert(Connection::new(
                connection.source,
                Endpoint::unit(new_unit, 0),
            ));
        }
    }
    set.insert(Connection::new(
        Endpoint::unit(new_unit, 0),
        Endpoint::new(target_node, target_pin),
    ));

    #[cfg(feature = "tracing")]
    tracing::debug!("route_insert: {new_unit} before {target_node}");
}

/// Inserts `new_unit` immediately downstream of `target` (`None` targets
/// the IO input boundary). Output-side mirror of [`insert_before`].
pub fn insert_after(set: &mut ConnectionSet, new_unit: UnitId, target: Option<UnitId>) {
    let target_node = target.map_or(Node::Io, Node::Unit);
    let preferred = set.preferred_pin(target_node, PortSide::Output);
    let target_pin = preferred.as_ref().map_or(0, |p| p.pin);

    if let Some(preferred) = preferred {
        for connection in preferred.connections {
            set.remove(&connection);
            set.insert(Connection::new(
                Endpoint::unit(new_unit, 0),
                connection.dest,
            ));
        }
    }
    set.insert(Connection::new(
        Endpoint::new(target_node, target_pin),
        Endpoint::unit(new_unit, 0),
    ));

    #[cfg(feature = "tracing")]
    tracing::debug!("route_insert: {new_unit} after {target_node}");
}

/// Removes `unit` from the chain while preserving through-connectivity on
/// its preferred pins.
///
/// Every connection touching the unit is removed, then each former source
/// on the preferred input pin is bridged directly to each former destination
/// of the preferred output pin (fan-in times fan-out wires).
///
/// Connections on non-preferred pins are dropped entirely, not rewired.
/// That matches the device's historical behavior; whether secondary-pin
/// wiring should survive a disconnect is an open product question.
pub fn disconnect(set: &mut ConnectionSet, unit: UnitId) {
    let node = Node::Unit(unit);
    let inputs = set.preferred_pin(node, PortSide::Input);
    let outputs = set.preferred_pin(node, PortSide::Output);

    set.retain(|c| !c.touches(node));

    if let (Some(inputs), Some(outputs)) = (inputs, outputs) {
        for arriving in &inputs.connections {
            for leaving in &outputs.connections {
                // A loop through the removed unit would re-introduce it.
                if arriving.source.node == node || leaving.dest.node == node {
                    continue;
                }
                set.insert(Connection::new(arriving.source, leaving.dest));
            }
        }
    }

    #[cfg(feature = "tracing")]
    tracing::debug!("route_disconnect: {unit}");
}

/// Moves `unit` to `new_position` in the rendered chain.
///
/// The target gap is described by the units on either side of
/// `new_position` in `audio_order` (with `unit` itself ignored). Straight
/// gaps (a missing neighbor, or two neighbors wired directly to each other)
/// are handled by a disconnect plus [`insert_before`] the following
/// neighbor. Forked topologies fall back to a single direct wire toward
/// whichever neighbor already shares a reachability set with the unit; if
/// neither does, the placement is ambiguous and the set is left unchanged.
pub fn move_unit(
    set: &mut ConnectionSet,
    unit: UnitId,
    new_position: usize,
    audio_order: &[UnitId],
    graph: &RoutingGraph,
) {
    if audio_order.get(new_position) == Some(&unit) {
        return;
    }

    let rest: Vec<UnitId> = audio_order.iter().copied().filter(|&u| u != unit).collect();
    let before = new_position
        .checked_sub(1)
        .and_then(|i| rest.get(i).copied());
    let after = rest.get(new_position).copied();

    let (Some(before), Some(after)) = (before, after) else {
        disconnect(set, unit);
        insert_before(set, unit, after);
        return;
    };

    if graph.directly_connected(Node::Unit(before), Node::Unit(after)) {
        disconnect(set, unit);
        insert_before(set, unit, Some(after));
        return;
    }

    let reach = graph.reachability(Node::Unit(unit));
    if reach.contains(Node::Unit(before)) {
        disconnect(set, unit);
        set.insert(Connection::new(
            Endpoint::unit(before, 0),
            Endpoint::unit(unit, 0),
        ));
    } else if reach.contains(Node::Unit(after)) {
        disconnect(set, unit);
        set.insert(Connection::new(
            Endpoint::unit(unit, 0),
            Endpoint::unit(after, 0),
        ));
    }
    // Neither neighbor relates to the unit: ambiguous placement, defined
    // no-op.

    #[cfg(feature = "tracing")]
    tracing::debug!("route_move: {unit} to position {new_position}");
}

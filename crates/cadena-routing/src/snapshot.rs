//! Commit point and renderer hand-off.
//!
//! The control context owns a [`RoutingEngine`]; the render context only
//! ever holds an `Arc<RoutingSnapshot>`. A commit validates acyclicity,
//! recomputes the execution order, and publishes a fresh snapshot. The
//! renderer observes complete, validated state or the previous snapshot,
//! never an in-progress edit. Queuing or double-buffering for the actual
//! thread hand-off is the hosting subsystem's job, not this crate's.

#[cfg(not(feature = "std"))]
use alloc::{collections::BTreeSet, sync::Arc};
#[cfg(feature = "std")]
use std::{collections::BTreeSet, sync::Arc};

use crate::connection::{ConnectionSet, UnitId};
use crate::error::RoutingError;
use crate::graph::RoutingGraph;
use crate::order::ExecutionOrder;

/// Immutable snapshot of one committed routing state.
///
/// Holds the connection set it was computed from and the execution order
/// the renderer walks per block. Never mutated after creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoutingSnapshot {
    connections: ConnectionSet,
    order: ExecutionOrder,
}

impl RoutingSnapshot {
    /// The connection set this snapshot was computed from.
    pub fn connections(&self) -> &ConnectionSet {
        &self.connections
    }

    /// The execution order for the renderer.
    pub fn order(&self) -> &ExecutionOrder {
        &self.order
    }
}

/// Owner of the living connection set and the last published snapshot.
///
/// Exclusively owned by the control context. Mutations go through
/// [`connections_mut`](Self::connections_mut) (typically via the
/// [`edit`](crate::edit) operations); [`commit`](Self::commit) is the only
/// way a new state becomes visible to the renderer.
#[derive(Clone, Debug, Default)]
pub struct RoutingEngine {
    connections: ConnectionSet,
    published: Option<Arc<RoutingSnapshot>>,
}

impl RoutingEngine {
    /// Creates an engine seeded with the default identity program
    /// (IO input wired straight to IO output).
    pub fn new() -> Self {
        Self {
            connections: ConnectionSet::identity(),
            published: None,
        }
    }

    /// Creates an engine around an existing connection set (e.g. a loaded
    /// program). The set is not validated until the first commit.
    pub fn from_connections(connections: ConnectionSet) -> Self {
        Self {
            connections,
            published: None,
        }
    }

    /// The living connection set.
    pub fn connections(&self) -> &ConnectionSet {
        &self.connections
    }

    /// Mutable access for the editor operations.
    pub fn connections_mut(&mut self) -> &mut ConnectionSet {
        &mut self.connections
    }

    /// Validates the current set and publishes a fresh snapshot.
    ///
    /// Rebuilds the adjacency structure, fails closed on a cycle, computes
    /// the execution order and atomically replaces the published snapshot.
    /// On error the previously published snapshot stays in force.
    ///
    /// # Errors
    ///
    /// [`RoutingError::CycleDetected`] if the edits introduced a loop;
    /// [`RoutingError::DepthLimitExceeded`] if a traversal blew the
    /// defensive depth cap.
    pub fn commit(
        &mut self,
        units: &[UnitId],
        signal_units: &BTreeSet<UnitId>,
    ) -> Result<Arc<RoutingSnapshot>, RoutingError> {
        let graph = RoutingGraph::build(&self.connections);
        let order = ExecutionOrder::compute(&graph, units, signal_units)?;

        let snapshot = Arc::new(RoutingSnapshot {
            connections: self.connections.clone(),
            order,
        });
        self.published = Some(Arc::clone(&snapshot));

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "route_commit: {} connections, {} units published",
            snapshot.connections().len(),
            snapshot.order().len()
        );

        Ok(snapshot)
    }

    /// The last successfully published snapshot, if any.
    pub fn published(&self) -> Option<&Arc<RoutingSnapshot>> {
        self.published.as_ref()
    }
}

//! Cadena Routing - signal routing graph engine for a multi-effects processor
//!
//! This crate models how processing units are wired together inside one
//! program: the persisted connection set, the derived adjacency graph, cycle
//! detection, the execution order consumed by the renderer, and the
//! graph-rewriting operations behind the chain-editing UI.
//!
//! # Architecture
//!
//! The engine uses a **two-object split**:
//!
//! - [`ConnectionSet`]: the persisted routing document content, exclusively
//!   owned and mutated by the control context through the [`edit`] operations.
//! - [`RoutingSnapshot`]: immutable snapshot (connections + execution
//!   order) published via `Arc` at a commit point. The render thread never
//!   sees a partial or unvalidated edit.
//!
//! Between those sits [`RoutingGraph`], a derived adjacency structure rebuilt
//! from the connection set on every mutation and discarded afterwards. It is
//! a plain value owned by the caller, never a cache and never shared.
//!
//! # Edit/commit cycle
//!
//! ```rust,ignore
//! use cadena_routing::{RoutingEngine, UnitId, edit};
//!
//! let mut engine = RoutingEngine::new();
//! edit::insert_before(engine.connections_mut(), UnitId::new(1), None);
//! edit::insert_after(engine.connections_mut(), UnitId::new(2), Some(UnitId::new(1)));
//!
//! // Validates acyclicity, computes the execution order, publishes.
//! let snapshot = engine.commit(&units, &signal_units)?;
//! renderer.swap(snapshot);
//! ```
//!
//! # Acyclicity
//!
//! Every editor operation must leave the set loop-free; the editors
//! themselves do not validate this. [`RoutingEngine::commit`] fails closed:
//! a cyclic set is rejected before any traversal runs and the previously
//! published snapshot stays in force.
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible with `alloc`. Disable the default `std`
//! feature:
//!
//! ```toml
//! [dependencies]
//! cadena-routing = { version = "0.1", default-features = false }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod connection;
pub mod cycle;
pub mod edit;
pub mod error;
pub mod graph;
pub mod order;
pub mod snapshot;

pub use connection::{Connection, ConnectionSet, Endpoint, Node, PortSide, PreferredPin, UnitId};
pub use cycle::has_cycle;
pub use error::RoutingError;
pub use graph::{Ports, Reachability, RoutingGraph};
pub use order::{ExecutionOrder, MAX_TRAVERSAL_DEPTH};
pub use snapshot::{RoutingEngine, RoutingSnapshot};

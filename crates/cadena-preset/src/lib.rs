//! Routing program persistence and validation for the cadena engine.
//!
//! This crate is the std-side companion to `cadena-routing`: it reads and
//! writes routing programs as TOML documents, validates them (unit id rules,
//! referential integrity, acyclicity), and compiles them into published
//! routing snapshots.
//!
//! # Features
//!
//! - **Documents**: Load and save routing programs from TOML files
//! - **Validation**: Reject malformed endpoints, dangling unit references,
//!   and feedback loops before the engine ever sees them
//! - **Compilation**: Turn a validated document into an
//!   `Arc<RoutingSnapshot>` ready for the renderer
//!
//! # Example
//!
//! ```rust,no_run
//! use cadena_preset::RoutingDocument;
//!
//! let document = RoutingDocument::load("programs/clean_chorus.toml").unwrap();
//! let snapshot = document.compile().unwrap();
//! for unit in &snapshot.order().audio {
//!     println!("process {unit}");
//! }
//! ```

mod document;
mod error;

/// Structural validation for routing documents.
pub mod validation;

pub use document::{ConnectionRecord, EndpointKind, EndpointRecord, RoutingDocument, UnitEntry};
pub use error::PresetError;
pub use validation::{MAX_PIN, ValidationError, validate};

/// Re-export commonly used types from cadena-routing.
pub use cadena_routing::{Connection, ConnectionSet, Endpoint, Node, RoutingSnapshot, UnitId};

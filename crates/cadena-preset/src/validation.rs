//! Structural validation for routing documents.
//!
//! Checks the things the TOML schema alone cannot express: unit id rules for
//! each endpoint kind, the pin bound, referential integrity between the
//! connection table and the unit table, and acyclicity of the resulting unit
//! graph. A document that passes [`validate`] will be accepted by the routing
//! engine's commit.

use thiserror::Error;

use cadena_routing::{RoutingGraph, has_cycle};

use crate::document::RoutingDocument;

/// Highest pin index a document may reference.
///
/// Port lists in the engine are sized to the highest connected pin, so an
/// unbounded pin in a hostile document would translate into an allocation of
/// the same magnitude. No supported hardware comes near this many pins.
pub const MAX_PIN: u32 = 255;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A `unit` endpoint without a unit id (or with the reserved id 0).
    #[error("unit endpoint on pin {pin} is missing a unit id")]
    MissingUnitId {
        /// Pin of the offending endpoint.
        pin: u32,
    },

    /// A boundary endpoint carrying a unit id.
    #[error("endpoint kind '{kind}' does not take a unit id (got {unit_id})")]
    UnexpectedUnitId {
        /// Kind of the offending endpoint.
        kind: &'static str,
        /// The unit id that should not be there.
        unit_id: u32,
    },

    /// A pin index beyond the supported range.
    #[error("pin {pin} exceeds the supported maximum {max}", max = MAX_PIN)]
    PinOutOfRange {
        /// The offending pin index.
        pin: u32,
    },

    /// A unit declared with the reserved id 0.
    #[error("unit id 0 is reserved; declared units must use ids >= 1")]
    ReservedUnitId,

    /// The same unit id declared twice.
    #[error("unit id {0} is declared more than once")]
    DuplicateUnit(u32),

    /// A connection referencing a unit the document never declares.
    #[error("connection references undeclared unit {0}")]
    UnknownUnit(u32),

    /// The connection table describes a feedback loop between units.
    #[error("connections form a cycle between units")]
    CycleDetected,
}

/// Validates a routing document end to end.
///
/// Runs the unit table checks, decodes every connection record (which
/// enforces the per-kind unit id rules and the pin bound), verifies that
/// every referenced unit is declared, and finally rejects cyclic wiring.
///
/// # Errors
///
/// The first [`ValidationError`] encountered, in the order described above.
pub fn validate(document: &RoutingDocument) -> Result<(), ValidationError> {
    let mut declared = std::collections::BTreeSet::new();
    for entry in &document.units {
        if entry.id == 0 {
            return Err(ValidationError::ReservedUnitId);
        }
        if !declared.insert(entry.id) {
            return Err(ValidationError::DuplicateUnit(entry.id));
        }
    }

    let set = document.connection_set()?;
    for connection in set.iter() {
        for endpoint in [connection.source, connection.dest] {
            if let Some(unit) = endpoint.node.unit_id()
                && !declared.contains(&unit.index())
            {
                return Err(ValidationError::UnknownUnit(unit.index()));
            }
        }
    }

    if has_cycle(&RoutingGraph::build(&set)) {
        return Err(ValidationError::CycleDetected);
    }
    Ok(())
}

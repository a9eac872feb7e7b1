//! Error type for routing operations.

/// Errors reported by the routing engine.
///
/// Editor ambiguity is deliberately not an error: an ambiguous `move`
/// performs no change (see [`crate::edit::move_unit`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoutingError {
    /// The connection set contains a dependency cycle among units.
    ///
    /// Reported by the fail-closed check that runs before any graph
    /// traversal; the previously committed snapshot stays in force.
    CycleDetected,
    /// A traversal exceeded the defensive depth cap.
    ///
    /// The cycle check makes this unreachable for any accepted set; the cap
    /// exists so a future invariant break degrades into an error instead of
    /// runaway work on the control thread.
    DepthLimitExceeded,
}

impl core::fmt::Display for RoutingError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::CycleDetected => write!(f, "connection set contains a dependency cycle"),
            Self::DepthLimitExceeded => write!(f, "graph traversal exceeded the depth limit"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for RoutingError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            RoutingError::CycleDetected.to_string(),
            "connection set contains a dependency cycle"
        );
        assert_eq!(
            RoutingError::DepthLimitExceeded.to_string(),
            "graph traversal exceeded the depth limit"
        );
    }
}

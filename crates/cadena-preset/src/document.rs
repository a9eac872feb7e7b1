//! Routing program file format and operations.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use cadena_routing::{
    Connection, ConnectionSet, Endpoint, Node, RoutingEngine, RoutingSnapshot, UnitId,
};

use crate::error::PresetError;
use crate::validation::{self, ValidationError};

/// On-disk description of a routing program.
///
/// Documents are stored as TOML files declaring the processing units and the
/// wires between them. Unit ids start at 1; on the wire, id 0 marks "no unit"
/// and appears only implicitly, when a boundary endpoint omits `unit_id`.
///
/// # TOML Format
///
/// ```toml
/// name = "Clean Chorus"
/// description = "Stereo chorus with a tempo LFO"
///
/// [[units]]
/// id = 1
/// effect = "chorus"
///
/// [[units]]
/// id = 2
/// effect = "lfo"
/// signal_rate = true
///
/// [[connections]]
/// source = { kind = "io", pin = 0 }
/// dest = { kind = "unit", unit_id = 1, pin = 0 }
///
/// [[connections]]
/// source = { kind = "unit", unit_id = 1, pin = 0 }
/// dest = { kind = "io", pin = 0 }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoutingDocument {
    /// Name of the program.
    pub name: String,

    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Declared processing units.
    #[serde(default)]
    pub units: Vec<UnitEntry>,

    /// Wires between unit and boundary endpoints.
    #[serde(default)]
    pub connections: Vec<ConnectionRecord>,
}

/// One declared processing unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnitEntry {
    /// Unit id, unique within the document, >= 1.
    pub id: u32,

    /// Effect type this unit instantiates.
    pub effect: String,

    /// True for signal-rate units (LFOs, envelope followers) that run after
    /// the audio pass.
    #[serde(default, skip_serializing_if = "core::ops::Not::not")]
    pub signal_rate: bool,
}

/// Endpoint kind discriminator as written in TOML.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EndpointKind {
    /// Hardware input or output boundary.
    Io,
    /// Auxiliary send/return boundary.
    ReturnSend,
    /// A declared processing unit.
    Unit,
}

impl EndpointKind {
    fn as_str(self) -> &'static str {
        match self {
            EndpointKind::Io => "io",
            EndpointKind::ReturnSend => "return_send",
            EndpointKind::Unit => "unit",
        }
    }
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

/// One endpoint as written in TOML. `unit_id` defaults to 0, the "no unit"
/// sentinel, and is only meaningful for `kind = "unit"`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct EndpointRecord {
    /// Endpoint kind.
    pub kind: EndpointKind,

    /// Unit id for `unit` endpoints; 0 (omitted) otherwise.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub unit_id: u32,

    /// Pin number on the endpoint.
    pub pin: u32,
}

impl EndpointRecord {
    /// Decodes the record into an in-memory endpoint, enforcing the unit id
    /// rules for each kind and the pin bound.
    ///
    /// # Errors
    ///
    /// [`ValidationError::PinOutOfRange`] for a pin beyond
    /// [`MAX_PIN`](crate::validation::MAX_PIN);
    /// [`ValidationError::MissingUnitId`] for a `unit` endpoint with id 0;
    /// [`ValidationError::UnexpectedUnitId`] for a boundary endpoint with a
    /// nonzero id.
    pub fn decode(&self) -> Result<Endpoint, ValidationError> {
        if self.pin > validation::MAX_PIN {
            return Err(ValidationError::PinOutOfRange { pin: self.pin });
        }
        match self.kind {
            EndpointKind::Unit => {
                if self.unit_id == 0 {
                    return Err(ValidationError::MissingUnitId { pin: self.pin });
                }
                Ok(Endpoint::unit(UnitId::new(self.unit_id), self.pin))
            }
            EndpointKind::Io | EndpointKind::ReturnSend => {
                if self.unit_id != 0 {
                    return Err(ValidationError::UnexpectedUnitId {
                        kind: self.kind.as_str(),
                        unit_id: self.unit_id,
                    });
                }
                Ok(match self.kind {
                    EndpointKind::Io => Endpoint::io(self.pin),
                    _ => Endpoint::return_send(self.pin),
                })
            }
        }
    }
}

impl From<Endpoint> for EndpointRecord {
    fn from(endpoint: Endpoint) -> Self {
        match endpoint.node {
            Node::Io => Self {
                kind: EndpointKind::Io,
                unit_id: 0,
                pin: endpoint.pin,
            },
            Node::ReturnSend => Self {
                kind: EndpointKind::ReturnSend,
                unit_id: 0,
                pin: endpoint.pin,
            },
            Node::Unit(id) => Self {
                kind: EndpointKind::Unit,
                unit_id: id.index(),
                pin: endpoint.pin,
            },
        }
    }
}

/// One wire as written in TOML.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionRecord {
    /// Source endpoint (an output pin).
    pub source: EndpointRecord,

    /// Destination endpoint (an input pin).
    pub dest: EndpointRecord,
}

impl ConnectionRecord {
    /// Decodes both endpoints.
    ///
    /// # Errors
    ///
    /// Propagates the first endpoint decode failure.
    pub fn decode(&self) -> Result<Connection, ValidationError> {
        Ok(Connection::new(self.source.decode()?, self.dest.decode()?))
    }
}

impl From<Connection> for ConnectionRecord {
    fn from(connection: Connection) -> Self {
        Self {
            source: connection.source.into(),
            dest: connection.dest.into(),
        }
    }
}

impl RoutingDocument {
    /// Create a new document seeded with the identity program (IO input
    /// wired straight to IO output).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            units: Vec::new(),
            connections: vec![Connection::new(Endpoint::io(0), Endpoint::io(0)).into()],
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Declare an audio-rate unit.
    #[must_use]
    pub fn with_unit(mut self, id: u32, effect: impl Into<String>) -> Self {
        self.units.push(UnitEntry {
            id,
            effect: effect.into(),
            signal_rate: false,
        });
        self
    }

    /// Declare a signal-rate unit.
    #[must_use]
    pub fn with_signal_unit(mut self, id: u32, effect: impl Into<String>) -> Self {
        self.units.push(UnitEntry {
            id,
            effect: effect.into(),
            signal_rate: true,
        });
        self
    }

    /// Add a wire.
    #[must_use]
    pub fn with_connection(mut self, connection: Connection) -> Self {
        self.connections.push(connection.into());
        self
    }

    /// Replace the connection table with the contents of a connection set,
    /// e.g. after a round of editor operations.
    pub fn set_connections(&mut self, set: &ConnectionSet) {
        self.connections = set.iter().copied().map(ConnectionRecord::from).collect();
    }

    /// Load a document from a TOML file.
    ///
    /// # Errors
    ///
    /// [`PresetError::ReadFile`] or [`PresetError::TomlParse`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PresetError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| PresetError::read_file(path, e))?;
        let document: RoutingDocument = toml::from_str(&content)?;
        Ok(document)
    }

    /// Load a document from a TOML string.
    ///
    /// # Errors
    ///
    /// [`PresetError::TomlParse`].
    pub fn from_toml(toml_str: &str) -> Result<Self, PresetError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the document to a TOML file, creating parent directories as
    /// needed.
    ///
    /// # Errors
    ///
    /// [`PresetError::CreateDir`], [`PresetError::WriteFile`], or
    /// [`PresetError::TomlSerialize`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PresetError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| PresetError::create_dir(parent, e))?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| PresetError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the document to a TOML string.
    ///
    /// # Errors
    ///
    /// [`PresetError::TomlSerialize`].
    pub fn to_toml(&self) -> Result<String, PresetError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Decodes the connection table into a connection set.
    ///
    /// # Errors
    ///
    /// The first endpoint decode failure.
    pub fn connection_set(&self) -> Result<ConnectionSet, ValidationError> {
        self.connections.iter().map(ConnectionRecord::decode).collect()
    }

    /// Declared unit ids in document order.
    pub fn unit_ids(&self) -> Vec<UnitId> {
        self.units.iter().map(|entry| UnitId::new(entry.id)).collect()
    }

    /// Ids of the units declared as signal-rate.
    pub fn signal_unit_ids(&self) -> BTreeSet<UnitId> {
        self.units
            .iter()
            .filter(|entry| entry.signal_rate)
            .map(|entry| UnitId::new(entry.id))
            .collect()
    }

    /// Validates the document and compiles it into a published routing
    /// snapshot ready for the renderer.
    ///
    /// # Errors
    ///
    /// [`PresetError::Validation`] for structural problems (including
    /// cycles); [`PresetError::Routing`] if the engine rejects the commit.
    pub fn compile(&self) -> Result<Arc<RoutingSnapshot>, PresetError> {
        validation::validate(self)?;
        let set = self.connection_set()?;
        let mut engine = RoutingEngine::from_connections(set);
        let snapshot = engine.commit(&self.unit_ids(), &self.signal_unit_ids())?;
        Ok(snapshot)
    }
}

impl Default for RoutingDocument {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

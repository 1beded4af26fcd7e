use crate::entity::{EntityId, EntityKind, Position};
use crate::error::ConfigError;
use crate::scenario::ScenarioConfig;

#[derive(Debug, Clone)]
struct EntityRecord {
    kind: EntityKind,
    position: Position,
    tx_power_dbm: f64,
}

/// Static registry of every simulated node. Entities are created once at
/// setup, never moved and never removed.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    entities: Vec<EntityRecord>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the standard registry for a scenario: macro cells first, then
    /// local cells, then clients, then the core anchor. Client index i maps
    /// to the i-th entity of kind `Client`.
    pub fn from_scenario(config: &ScenarioConfig) -> Self {
        let mut topology = Self::new();
        for &position in &config.macro_positions {
            topology.add_entity(EntityKind::MacroCell, position, config.macro_tx_power_dbm);
        }
        for &position in &config.fap_positions {
            topology.add_entity(EntityKind::LocalCell, position, config.fap_tx_power_dbm);
        }
        for &position in &config.client_positions {
            topology.add_entity(EntityKind::Client, position, config.client_tx_power_dbm);
        }
        // The anchor sits behind the core network; its coordinates only
        // matter for rendering.
        topology.add_entity(EntityKind::CoreAnchor, Position::new(120.0, 100.0, 0.0), 0.0);
        topology
    }

    pub fn add_entity(&mut self, kind: EntityKind, position: Position, tx_power_dbm: f64) -> EntityId {
        let id = EntityId(self.entities.len() as u32);
        self.entities.push(EntityRecord {
            kind,
            position,
            tx_power_dbm,
        });
        id
    }

    pub fn position_of(&self, id: EntityId) -> Result<Position, ConfigError> {
        self.record(id).map(|r| r.position)
    }

    pub fn tx_power_of(&self, id: EntityId) -> Result<f64, ConfigError> {
        self.record(id).map(|r| r.tx_power_dbm)
    }

    /// Ids of all entities of one kind, in insertion order.
    pub fn entities_of_kind(&self, kind: EntityKind) -> Vec<EntityId> {
        self.entities
            .iter()
            .enumerate()
            .filter(|(_, r)| r.kind == kind)
            .map(|(i, _)| EntityId(i as u32))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    fn record(&self, id: EntityId) -> Result<&EntityRecord, ConfigError> {
        self.entities
            .get(id.0 as usize)
            .ok_or(ConfigError::UnknownEntity(id.0))
    }
}

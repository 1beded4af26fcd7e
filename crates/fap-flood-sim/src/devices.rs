use fap_flood_abstract::{CellId, ConfigError, EntityId, Position};
use fap_flood_core::DeviceLookup;
use std::collections::BTreeMap;
use tracing::debug;

/// Radio capability of one entity. Each entity kind gets its own
/// implementation, chosen when the device is constructed; callers never
/// downcast to recover kind-specific behavior.
pub trait RadioDevice {
    fn position(&self) -> Position;
    fn set_tx_power(&mut self, power_dbm: f64);
    fn tx_power_dbm(&self) -> f64;
    /// Serving cell recorded at attach time. `None` for non-client devices
    /// and for clients that never attached.
    fn serving_cell(&self) -> Option<CellId>;
    /// Cell id advertised by cell devices; `None` otherwise.
    fn cell_id(&self) -> Option<CellId>;
    /// Record the attach oracle's decision. Only client devices keep it.
    fn record_attach(&mut self, _cell: CellId) {}
}

pub struct ClientDevice {
    position: Position,
    tx_power_dbm: f64,
    serving: Option<CellId>,
}

impl ClientDevice {
    pub fn new(position: Position, tx_power_dbm: f64) -> Self {
        Self {
            position,
            tx_power_dbm,
            serving: None,
        }
    }
}

impl RadioDevice for ClientDevice {
    fn position(&self) -> Position {
        self.position
    }

    fn set_tx_power(&mut self, power_dbm: f64) {
        self.tx_power_dbm = power_dbm;
    }

    fn tx_power_dbm(&self) -> f64 {
        self.tx_power_dbm
    }

    fn serving_cell(&self) -> Option<CellId> {
        self.serving
    }

    fn cell_id(&self) -> Option<CellId> {
        None
    }

    fn record_attach(&mut self, cell: CellId) {
        self.serving = Some(cell);
    }
}

pub struct CellDevice {
    position: Position,
    tx_power_dbm: f64,
    cell: CellId,
}

impl CellDevice {
    pub fn new(position: Position, tx_power_dbm: f64, cell: CellId) -> Self {
        Self {
            position,
            tx_power_dbm,
            cell,
        }
    }
}

impl RadioDevice for CellDevice {
    fn position(&self) -> Position {
        self.position
    }

    fn set_tx_power(&mut self, power_dbm: f64) {
        self.tx_power_dbm = power_dbm;
    }

    fn tx_power_dbm(&self) -> f64 {
        self.tx_power_dbm
    }

    fn serving_cell(&self) -> Option<CellId> {
        None
    }

    fn cell_id(&self) -> Option<CellId> {
        Some(self.cell)
    }
}

pub struct AnchorDevice {
    position: Position,
}

impl AnchorDevice {
    pub fn new(position: Position) -> Self {
        Self { position }
    }
}

impl RadioDevice for AnchorDevice {
    fn position(&self) -> Position {
        self.position
    }

    fn set_tx_power(&mut self, _power_dbm: f64) {}

    fn tx_power_dbm(&self) -> f64 {
        0.0
    }

    fn serving_cell(&self) -> Option<CellId> {
        None
    }

    fn cell_id(&self) -> Option<CellId> {
        None
    }
}

/// Owns the per-entity devices and implements the attach oracle the
/// association engine records.
#[derive(Default)]
pub struct DeviceRegistry {
    devices: BTreeMap<EntityId, Box<dyn RadioDevice>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: EntityId, device: Box<dyn RadioDevice>) {
        self.devices.insert(id, device);
    }

    pub fn get(&self, id: EntityId) -> Option<&dyn RadioDevice> {
        self.devices.get(&id).map(|d| d.as_ref())
    }

    pub fn set_tx_power(&mut self, id: EntityId, power_dbm: f64) -> Result<(), ConfigError> {
        self.devices
            .get_mut(&id)
            .ok_or(ConfigError::DeviceNotFound(id.0))?
            .set_tx_power(power_dbm);
        Ok(())
    }

    /// Attach every client to its nearest cell (3D distance). Ties keep the
    /// first candidate, matching the cell iteration order; the decision is
    /// final for the whole run.
    pub fn attach_to_closest(
        &mut self,
        clients: &[EntityId],
        cells: &[EntityId],
    ) -> Result<(), ConfigError> {
        for &client in clients {
            let client_pos = self
                .get(client)
                .ok_or(ConfigError::DeviceNotFound(client.0))?
                .position();

            let mut best: Option<(CellId, f64)> = None;
            for &cell_entity in cells {
                let device = self
                    .get(cell_entity)
                    .ok_or(ConfigError::DeviceNotFound(cell_entity.0))?;
                let Some(cell) = device.cell_id() else {
                    return Err(ConfigError::UnknownEntity(cell_entity.0));
                };
                let distance = client_pos.distance_to(&device.position());
                if best.is_none_or(|(_, d)| distance < d) {
                    best = Some((cell, distance));
                }
            }

            if let Some((cell, distance)) = best {
                debug!(client = client.0, cell = cell.0, distance, "attached");
                if let Some(device) = self.devices.get_mut(&client) {
                    device.record_attach(cell);
                }
            }
        }
        Ok(())
    }
}

impl DeviceLookup for DeviceRegistry {
    fn client_serving_cell(&self, client: EntityId) -> Result<Option<CellId>, ConfigError> {
        self.devices
            .get(&client)
            .map(|d| d.serving_cell())
            .ok_or(ConfigError::DeviceNotFound(client.0))
    }

    fn cell_id(&self, cell: EntityId) -> Result<CellId, ConfigError> {
        self.devices
            .get(&cell)
            .and_then(|d| d.cell_id())
            .ok_or(ConfigError::UnknownEntity(cell.0))
    }
}

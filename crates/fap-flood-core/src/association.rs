use fap_flood_abstract::{CellId, ConfigError, EntityId};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

/// Capability surface the association engine needs from the radio layer.
/// One implementation per entity kind, selected at construction; the engine
/// never inspects concrete device types.
pub trait DeviceLookup {
    /// Serving-cell decision recorded by the client's device after attach,
    /// or `None` when the device reports "not connected". `Err` when the
    /// device itself cannot be resolved.
    fn client_serving_cell(&self, client: EntityId) -> Result<Option<CellId>, ConfigError>;

    /// Cell id advertised by a cell entity's device.
    fn cell_id(&self, cell: EntityId) -> Result<CellId, ConfigError>;
}

/// A client that could not be placed in the served population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AttachIssue {
    /// The client's device could not be resolved; the client is excluded
    /// from the served population entirely.
    DeviceNotFound { client: EntityId },
    /// The device exists but reports no serving cell; the client is
    /// reported but excluded from cell-type classification.
    NotConnected { client: EntityId },
}

/// The client -> serving-cell snapshot plus its inverse lookup. Built once
/// after cell discovery and read-only afterwards. The attach decision is an
/// opaque oracle: this engine records results, it never ranks candidates or
/// re-resolves ties. If the delivery engine re-associates clients mid-run
/// this snapshot goes stale; handover tracking is a known non-feature.
#[derive(Debug, Clone)]
pub struct Association {
    serving: BTreeMap<EntityId, CellId>,
    cell_owner: BTreeMap<CellId, EntityId>,
    macro_cells: BTreeSet<CellId>,
}

impl Association {
    /// Record the radio layer's attach decisions for every client. Cell
    /// resolution failures abort setup; client device failures only exclude
    /// that client.
    pub fn build(
        clients: &[EntityId],
        macro_cells: &[EntityId],
        local_cells: &[EntityId],
        devices: &dyn DeviceLookup,
    ) -> Result<(Self, Vec<AttachIssue>), ConfigError> {
        let mut cell_owner = BTreeMap::new();
        let mut macro_set = BTreeSet::new();
        for &owner in macro_cells {
            let cell = devices.cell_id(owner)?;
            cell_owner.insert(cell, owner);
            macro_set.insert(cell);
        }
        for &owner in local_cells {
            let cell = devices.cell_id(owner)?;
            cell_owner.insert(cell, owner);
        }

        let mut serving = BTreeMap::new();
        let mut issues = Vec::new();
        for &client in clients {
            match devices.client_serving_cell(client) {
                Ok(Some(cell)) => {
                    serving.insert(client, cell);
                }
                Ok(None) => {
                    info!(client = client.0, "client not connected to any cell");
                    issues.push(AttachIssue::NotConnected { client });
                }
                Err(_) => {
                    warn!(client = client.0, "client device not found");
                    issues.push(AttachIssue::DeviceNotFound { client });
                }
            }
        }

        Ok((
            Self {
                serving,
                cell_owner,
                macro_cells: macro_set,
            },
            issues,
        ))
    }

    /// Serving cell of a client; `None` for unattached or excluded clients.
    pub fn serving_cell(&self, client: EntityId) -> Option<CellId> {
        self.serving.get(&client).copied()
    }

    /// Node that owns a cell id.
    pub fn owner_of(&self, cell: CellId) -> Option<EntityId> {
        self.cell_owner.get(&cell).copied()
    }

    /// Whether a cell id belongs to the macro-cell set. Needed only for
    /// reporting.
    pub fn is_macro(&self, cell: CellId) -> bool {
        self.macro_cells.contains(&cell)
    }

    pub fn served_clients(&self) -> impl Iterator<Item = (EntityId, CellId)> + '_ {
        self.serving.iter().map(|(&c, &cell)| (c, cell))
    }
}

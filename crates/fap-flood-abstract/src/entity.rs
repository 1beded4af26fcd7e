use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a simulated node (cell, client or core anchor).
/// Assigned by the topology in insertion order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Radio cell identifier as advertised by a cell's device. Distinct from
/// [`EntityId`]: the association engine keeps the cell-id -> owning-node
/// table itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellId(pub u16);

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Wide-coverage access point (high mast, high transmit power).
    MacroCell,
    /// Short-range femto access point ("FAP", low height, low power).
    LocalCell,
    /// User terminal generating or receiving traffic.
    Client,
    /// Core-network endpoint all uplink traffic is sent to.
    CoreAnchor,
}

/// Fixed 3D coordinates in meters. Entities never move.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn distance_to(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::Position;

    #[test]
    fn distance_accounts_for_height() {
        let mast = Position::new(0.0, 0.0, 25.0);
        let terminal = Position::new(0.0, 0.0, 1.5);
        assert!((mast.distance_to(&terminal) - 23.5).abs() < 1e-9);
    }
}

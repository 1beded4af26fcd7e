pub mod entity;
pub mod error;
pub mod flow;
pub mod profile;
pub mod role;
pub mod scenario;
pub mod topology;

pub use entity::{CellId, EntityId, EntityKind, Position};
pub use error::ConfigError;
pub use flow::{Direction, FiveTuple, FlowId, FlowRecord, PROTO_UDP};
pub use profile::{Phase, TimeWindow, TrafficProfile};
pub use role::{ClientRole, RolePlan};
pub use scenario::ScenarioConfig;
pub use topology::Topology;

/// Simulated time in microseconds. The attack cadence is sub-millisecond,
/// so milliseconds are too coarse for the event clock.
pub type SimTime = u64;

use fap_flood_abstract::{CellId, ClientRole, EntityId, Phase, SimTime};
use fap_flood_core::{AttachIssue, ClassifiedFlow, RoleAggregate};
use serde::Serialize;
use std::net::Ipv4Addr;

/// End-of-run connectivity and role line for one client, mirroring the
/// association table the reporting collaborators consume.
#[derive(Debug, Clone, Serialize)]
pub struct ClientSummary {
    pub client: u32,
    pub entity: EntityId,
    pub addr: Ipv4Addr,
    pub role: Option<ClientRole>,
    pub serving_cell: Option<CellId>,
    pub serving_node: Option<EntityId>,
    /// `Some(true)` macro, `Some(false)` FAP, `None` when not connected.
    pub macro_cell: Option<bool>,
}

/// Per-role aggregates restricted to one attack phase. Only packets emitted
/// during the phase count; flows with no activity in the phase are omitted.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseBreakdown {
    pub phase: Phase,
    pub aggregates: Vec<RoleAggregate>,
}

/// Serializable snapshot of a finished run: the raw classified flows plus
/// the per-role aggregates that quantify attack impact, whole-run and per
/// attack phase.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub duration_us: SimTime,
    pub clients: Vec<ClientSummary>,
    pub attach_issues: Vec<AttachIssue>,
    pub flows: Vec<ClassifiedFlow>,
    pub aggregates: Vec<RoleAggregate>,
    /// Ordered before / inside / after the attack window.
    pub phases: Vec<PhaseBreakdown>,
}

pub mod association;
pub mod classify;
pub mod traffic;

pub use association::{Association, AttachIssue, DeviceLookup};
pub use classify::{aggregate, classify, ClassifiedFlow, FlowMetrics, RoleAggregate, RoleLabel};
pub use traffic::TrafficPlan;

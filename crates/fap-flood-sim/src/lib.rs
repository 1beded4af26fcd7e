pub mod devices;
pub mod engine;
pub mod monitor;
pub mod trace;

pub use devices::{DeviceRegistry, RadioDevice};
pub use engine::Simulator;
pub use monitor::FlowMonitor;
pub use trace::{ClientSummary, PhaseBreakdown, SimulationReport};

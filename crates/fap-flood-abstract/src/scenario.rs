use crate::entity::Position;
use crate::error::ConfigError;
use crate::profile::TimeWindow;
use crate::role::RolePlan;
use crate::SimTime;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// Everything the scenario consumes as static input: role partition,
/// geometry, traffic parameters, attack window and the reference delivery
/// model's knobs. One value object passed by reference into setup; no
/// module-level state. Scenario files are TOML; any omitted field falls
/// back to the canonical FAP-flood scenario via `#[serde(default)]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub sim_stop_us: SimTime,
    pub attack_window: TimeWindow,

    // Geometry. Client indices are positions in `client_positions`.
    pub macro_positions: Vec<Position>,
    pub fap_positions: Vec<Position>,
    pub client_positions: Vec<Position>,

    pub macro_tx_power_dbm: f64,
    pub fap_tx_power_dbm: f64,
    pub client_tx_power_dbm: f64,

    // Role partition over client indices.
    pub attackers: Vec<u32>,
    pub impacted: Vec<u32>,
    pub other_legit: Vec<u32>,

    // Addressing. Clients get consecutive addresses starting at
    // `client_addr_base`; all uplink traffic targets the core anchor.
    pub client_addr_base: Ipv4Addr,
    pub anchor_addr: Ipv4Addr,
    pub uplink_port: u16,
    pub downlink_port: u16,

    // Per-role traffic parameters (the scheduler's fixed table).
    pub attacker_interval_us: u64,
    pub attacker_packet_size: u32,
    pub legit_ul_interval_us: u64,
    pub legit_ul_packet_size: u32,
    pub legit_dl_interval_us: u64,
    pub legit_dl_packet_size: u32,

    /// Legitimate uplink starts this far into the run (association warm-up).
    pub legit_ul_start_us: SimTime,
    /// Downlink starts this far into the run.
    pub legit_dl_start_us: SimTime,
    /// Legitimate traffic stops this far before the simulation end.
    pub tail_margin_us: SimTime,

    // Reference delivery model.
    pub macro_uplink_bps: f64,
    pub fap_uplink_bps: f64,
    pub downlink_bps: f64,
    pub core_latency_us: u64,
    /// A packet whose queueing delay would exceed this bound is dropped
    /// (the cell's uplink buffer is full).
    pub max_backlog_us: u64,
    pub jitter_max_us: u64,
    pub seed: u64,
}

impl Default for ScenarioConfig {
    /// The canonical scenario: 2 macro cells, 2 FAPs, 7 clients. Attackers
    /// (ids 3, 4) sit next to the FAPs and flood their uplink over
    /// [10 s, 25 s] of a 40 s run; clients 0 and 1 share those FAPs,
    /// clients 2, 5 and 6 are served by the macros.
    fn default() -> Self {
        Self {
            sim_stop_us: 40_000_000,
            attack_window: TimeWindow::new(10_000_000, 25_000_000),
            macro_positions: vec![
                Position::new(0.0, 0.0, 25.0),
                Position::new(0.0, 80.0, 25.0),
            ],
            fap_positions: vec![
                Position::new(40.0, 5.0, 5.0),
                Position::new(35.0, 45.0, 5.0),
            ],
            client_positions: vec![
                Position::new(42.0, 3.0, 1.5),  // legit near FAP 0
                Position::new(37.0, 42.0, 1.5), // legit near FAP 1
                Position::new(5.0, 5.0, 1.5),   // legit near macro 0
                Position::new(38.0, 7.0, 1.5),  // attacker near FAP 0
                Position::new(33.0, 47.0, 1.5), // attacker near FAP 1
                Position::new(5.0, 75.0, 1.5),  // legit near macro 1
                Position::new(10.0, 85.0, 1.5), // legit near macro 1
            ],
            macro_tx_power_dbm: 40.0,
            fap_tx_power_dbm: 20.0,
            client_tx_power_dbm: 23.0,
            attackers: vec![3, 4],
            impacted: vec![0, 1],
            other_legit: vec![2, 5, 6],
            client_addr_base: Ipv4Addr::new(7, 0, 0, 2),
            anchor_addr: Ipv4Addr::new(1, 0, 0, 2),
            uplink_port: 20_000,
            downlink_port: 10_000,
            attacker_interval_us: 20,
            attacker_packet_size: 1024,
            legit_ul_interval_us: 120_000,
            legit_ul_packet_size: 512,
            legit_dl_interval_us: 100_000,
            legit_dl_packet_size: 1024,
            legit_ul_start_us: 1_500_000,
            legit_dl_start_us: 1_000_000,
            tail_margin_us: 1_000_000,
            macro_uplink_bps: 50e6,
            fap_uplink_bps: 20e6,
            downlink_bps: 100e6,
            core_latency_us: 10_000,
            max_backlog_us: 200_000,
            jitter_max_us: 2_000,
            seed: 42,
        }
    }
}

impl ScenarioConfig {
    pub fn num_clients(&self) -> u32 {
        self.client_positions.len() as u32
    }

    pub fn simulation_window(&self) -> TimeWindow {
        TimeWindow::new(0, self.sim_stop_us)
    }

    pub fn role_plan(&self) -> RolePlan {
        RolePlan::new(
            self.attackers.iter().copied(),
            self.impacted.iter().copied(),
            self.other_legit.iter().copied(),
        )
    }

    /// Address of a client by index (consecutive from `client_addr_base`).
    pub fn client_addr(&self, client: u32) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.client_addr_base) + client)
    }

    /// Inverse of [`ScenarioConfig::client_addr`]: which client, if any,
    /// owns this address.
    pub fn client_index_of(&self, addr: Ipv4Addr) -> Option<u32> {
        let offset = u32::from(addr).checked_sub(u32::from(self.client_addr_base))?;
        (offset < self.num_clients()).then_some(offset)
    }

    /// Check every invariant downstream classification relies on. Called
    /// once before any entity is created.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.role_plan().validate(self.num_clients())?;

        if !self.attack_window.strictly_inside(&self.simulation_window()) {
            return Err(ConfigError::AttackWindowOutOfBounds {
                start_us: self.attack_window.start,
                stop_us: self.attack_window.stop,
                sim_stop_us: self.sim_stop_us,
            });
        }
        // Attacking before attachment and legitimate traffic have
        // stabilized produces undefined classification.
        if self.attack_window.start < self.legit_ul_start_us {
            return Err(ConfigError::AttackBeforeWarmup {
                start_us: self.attack_window.start,
                warmup_us: self.legit_ul_start_us,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_scenario_is_valid() {
        assert_eq!(ScenarioConfig::default().validate(), Ok(()));
    }

    #[test]
    fn attack_window_must_nest_inside_the_run() {
        let mut config = ScenarioConfig::default();
        config.attack_window = TimeWindow::new(10_000_000, 40_000_000);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::AttackWindowOutOfBounds { .. })
        ));
    }

    #[test]
    fn attack_window_must_start_after_warmup() {
        let mut config = ScenarioConfig::default();
        config.attack_window = TimeWindow::new(1_000_000, 25_000_000);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::AttackBeforeWarmup { .. })
        ));
    }

    #[test]
    fn client_addressing_round_trips() {
        let config = ScenarioConfig::default();
        let addr = config.client_addr(4);
        assert_eq!(addr, Ipv4Addr::new(7, 0, 0, 6));
        assert_eq!(config.client_index_of(addr), Some(4));
        assert_eq!(config.client_index_of(config.anchor_addr), None);
        assert_eq!(config.client_index_of(Ipv4Addr::new(7, 0, 0, 100)), None);
    }
}

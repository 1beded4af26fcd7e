use crate::devices::{AnchorDevice, CellDevice, ClientDevice, DeviceRegistry};
use crate::monitor::FlowMonitor;
use crate::trace::{ClientSummary, PhaseBreakdown, SimulationReport};
use fap_flood_abstract::{
    CellId, ConfigError, Direction, EntityId, EntityKind, FiveTuple, Phase, ScenarioConfig,
    SimTime, Topology,
};
use fap_flood_core::{aggregate, classify, Association, AttachIssue, TrafficPlan};
use rand::Rng;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use tracing::{debug, info};

#[derive(Debug)]
enum EventType {
    /// A traffic profile emits one packet.
    Emission { profile: usize },
    /// A packet that survived the cell queue reaches its endpoint.
    Delivery {
        tuple: FiveTuple,
        bytes: u32,
        sent_at: SimTime,
    },
}

#[derive(Debug)]
struct Event {
    time: SimTime,
    event_type: EventType,
    id: u64, // Unique ID to differentiate events at same time
}

// Custom Ord for Min-Heap (smallest time pops first)
impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.id == other.id
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse comparison for time: smallest time is Greater in BinaryHeap
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// One direction of a cell's radio scheduler: a work-conserving queue with
/// a fixed service rate and a bounded backlog horizon.
#[derive(Debug)]
struct LinkState {
    capacity_bps: f64,
    busy_until: SimTime,
}

/// Reference delivery engine. Builds the topology and devices from a
/// scenario, runs attach, records the association snapshot, installs the
/// traffic plan on the event clock and executes delivery with per-cell
/// uplink contention. Stands in for the radio engine the core treats as an
/// external collaborator.
pub struct Simulator {
    time: SimTime,
    event_queue: BinaryHeap<Event>,
    event_id_counter: u64,

    config: ScenarioConfig,
    rng: rand::rngs::StdRng,

    topology: Topology,
    client_entities: Vec<EntityId>,
    devices: DeviceRegistry,
    association: Association,
    attach_issues: Vec<AttachIssue>,

    plan: TrafficPlan,
    emitted: Vec<u64>,
    links: HashMap<(CellId, Direction), LinkState>,
    monitor: FlowMonitor,
}

impl Simulator {
    pub fn new(config: ScenarioConfig) -> Result<Self, ConfigError> {
        use rand::SeedableRng;
        config.validate()?;
        let rng = rand::rngs::StdRng::seed_from_u64(config.seed);

        let topology = Topology::from_scenario(&config);
        let macro_entities = topology.entities_of_kind(EntityKind::MacroCell);
        let local_entities = topology.entities_of_kind(EntityKind::LocalCell);
        let client_entities = topology.entities_of_kind(EntityKind::Client);
        let anchor = topology.entities_of_kind(EntityKind::CoreAnchor)[0];

        // Cell ids count up from 1 across macros then FAPs, in entity order.
        let mut devices = DeviceRegistry::new();
        let mut links = HashMap::new();
        let mut next_cell = 1u16;
        for &entity in &macro_entities {
            let cell = CellId(next_cell);
            next_cell += 1;
            devices.insert(
                entity,
                Box::new(CellDevice::new(
                    topology.position_of(entity)?,
                    topology.tx_power_of(entity)?,
                    cell,
                )),
            );
            links.insert(
                (cell, Direction::Uplink),
                LinkState {
                    capacity_bps: config.macro_uplink_bps,
                    busy_until: 0,
                },
            );
            links.insert(
                (cell, Direction::Downlink),
                LinkState {
                    capacity_bps: config.downlink_bps,
                    busy_until: 0,
                },
            );
        }
        for &entity in &local_entities {
            let cell = CellId(next_cell);
            next_cell += 1;
            devices.insert(
                entity,
                Box::new(CellDevice::new(
                    topology.position_of(entity)?,
                    topology.tx_power_of(entity)?,
                    cell,
                )),
            );
            links.insert(
                (cell, Direction::Uplink),
                LinkState {
                    capacity_bps: config.fap_uplink_bps,
                    busy_until: 0,
                },
            );
            links.insert(
                (cell, Direction::Downlink),
                LinkState {
                    capacity_bps: config.downlink_bps,
                    busy_until: 0,
                },
            );
        }
        for &entity in &client_entities {
            devices.insert(
                entity,
                Box::new(ClientDevice::new(
                    topology.position_of(entity)?,
                    topology.tx_power_of(entity)?,
                )),
            );
        }
        devices.insert(anchor, Box::new(AnchorDevice::new(topology.position_of(anchor)?)));

        // Association must converge before any traffic is emitted, and the
        // scheduler guarantees the attack starts after the warm-up.
        let all_cells: Vec<EntityId> = macro_entities
            .iter()
            .chain(&local_entities)
            .copied()
            .collect();
        devices.attach_to_closest(&client_entities, &all_cells)?;
        let (association, attach_issues) =
            Association::build(&client_entities, &macro_entities, &local_entities, &devices)?;
        info!(
            served = association.served_clients().count(),
            issues = attach_issues.len(),
            "association snapshot recorded"
        );

        let roles = config.role_plan();
        let plan = TrafficPlan::build(&config, &roles)?;
        let attack_window = config.attack_window;

        let mut sim = Self {
            time: 0,
            event_queue: BinaryHeap::new(),
            event_id_counter: 0,
            config,
            rng,
            topology,
            client_entities,
            devices,
            association,
            attach_issues,
            emitted: Vec::new(),
            plan,
            links,
            monitor: FlowMonitor::new(attack_window),
        };
        sim.emitted = vec![0; sim.plan.profiles.len()];
        for i in 0..sim.plan.profiles.len() {
            let start = sim.plan.profiles[i].window.start;
            if start < sim.config.sim_stop_us {
                sim.push_event(start, EventType::Emission { profile: i });
            }
        }
        Ok(sim)
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    pub fn association(&self) -> &Association {
        &self.association
    }

    pub fn devices(&self) -> &DeviceRegistry {
        &self.devices
    }

    pub fn attach_issues(&self) -> &[AttachIssue] {
        &self.attach_issues
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn current_time(&self) -> SimTime {
        self.time
    }

    pub fn remaining_events(&self) -> usize {
        self.event_queue.len()
    }

    fn push_event(&mut self, time: SimTime, event_type: EventType) {
        self.event_queue.push(Event {
            time,
            event_type,
            id: self.event_id_counter,
        });
        self.event_id_counter += 1;
    }

    /// Process the next event. Returns false when the queue is empty or the
    /// clock has reached the configured stop time; anything still in flight
    /// at that point is simply truncated.
    pub fn step(&mut self) -> bool {
        let event = match self.event_queue.pop() {
            Some(e) => e,
            None => return false,
        };

        // The run covers [0, sim_stop): a delivery landing exactly on the
        // stop instant is truncated, like every other window bound.
        if event.time >= self.config.sim_stop_us {
            self.time = self.config.sim_stop_us;
            self.event_queue.clear();
            return false;
        }

        self.time = event.time;
        debug!("Processing event at {}: {:?}", self.time, event.event_type);

        match event.event_type {
            EventType::Emission { profile } => self.emit(profile),
            EventType::Delivery {
                tuple,
                bytes,
                sent_at,
            } => {
                self.monitor.record_rx(tuple, bytes, sent_at, self.time);
            }
        }
        true
    }

    pub fn run_until_complete(&mut self) {
        info!(
            sim_stop_us = self.config.sim_stop_us,
            attack_start_us = self.config.attack_window.start,
            attack_stop_us = self.config.attack_window.stop,
            profiles = self.plan.profiles.len(),
            "starting simulation"
        );
        while self.step() {}
        info!(
            duration_us = self.time,
            flows = self.monitor.flow_count(),
            "simulation finished"
        );
    }

    fn emit(&mut self, profile_index: usize) {
        let (tuple, bytes, interval, window, cap, client, direction) = {
            let p = &self.plan.profiles[profile_index];
            (
                p.endpoints,
                p.packet_size,
                p.interval_us,
                p.window,
                p.max_packets,
                p.client,
                p.direction,
            )
        };

        if let Some(cap) = cap {
            if self.emitted[profile_index] >= cap {
                return;
            }
        }
        self.emitted[profile_index] += 1;

        let next = self.time + interval;
        if window.contains(next) && next < self.config.sim_stop_us {
            self.push_event(next, EventType::Emission { profile: profile_index });
        }

        self.monitor.record_tx(tuple, bytes, self.time);

        // Both directions contend on the client's serving cell; an
        // unattached client can neither send nor be reached.
        let entity = self.client_entities[client as usize];
        let Some(cell) = self.association.serving_cell(entity) else {
            debug!(client, "packet from/to unattached client lost");
            self.monitor.record_lost(tuple, self.time);
            return;
        };
        self.transmit((cell, direction), tuple, bytes);
    }

    fn transmit(&mut self, key: (CellId, Direction), tuple: FiveTuple, bytes: u32) {
        let Some(link) = self.links.get_mut(&key) else {
            self.monitor.record_lost(tuple, self.time);
            return;
        };

        let backlog = link.busy_until.saturating_sub(self.time);
        if backlog > self.config.max_backlog_us {
            debug!(cell = key.0 .0, backlog, "cell queue full, packet dropped");
            self.monitor.record_lost(tuple, self.time);
            return;
        }

        let tx_us = serialization_us(bytes, link.capacity_bps);
        link.busy_until = link.busy_until.max(self.time) + tx_us;
        let jitter = self.rng.random_range(0..=self.config.jitter_max_us);
        let deliver_at = link.busy_until + self.config.core_latency_us + jitter;
        self.push_event(
            deliver_at,
            EventType::Delivery {
                tuple,
                bytes,
                sent_at: self.time,
            },
        );
    }

    /// Produce the end-of-run report: classified flows, role aggregates and
    /// the per-client association table.
    pub fn export_report(&self) -> SimulationReport {
        let roles = self.config.role_plan();
        let snapshot = self.monitor.snapshot();
        let flows = classify(&snapshot, &self.config, &roles);
        let aggregates = aggregate(&flows);

        let phased = self.monitor.phased_snapshot();
        let phases = Phase::ALL
            .iter()
            .map(|&phase| {
                let snapshot: Vec<_> = phased
                    .iter()
                    .map(|&(id, tuple, bins)| (id, tuple, bins[phase.index()]))
                    .filter(|(_, _, r)| r.tx_packets > 0 || r.rx_packets > 0)
                    .collect();
                PhaseBreakdown {
                    phase,
                    aggregates: aggregate(&classify(&snapshot, &self.config, &roles)),
                }
            })
            .collect();

        let clients = self
            .client_entities
            .iter()
            .enumerate()
            .map(|(i, &entity)| {
                let client = i as u32;
                let serving_cell = self.association.serving_cell(entity);
                let serving_node = serving_cell.and_then(|c| self.association.owner_of(c));
                ClientSummary {
                    client,
                    entity,
                    addr: self.config.client_addr(client),
                    role: roles.role_of(client),
                    serving_cell,
                    serving_node,
                    macro_cell: serving_cell.map(|c| self.association.is_macro(c)),
                }
            })
            .collect();

        SimulationReport {
            duration_us: self.time,
            clients,
            attach_issues: self.attach_issues.clone(),
            flows,
            aggregates,
            phases,
        }
    }
}

/// Time to clock `bytes` out at `capacity_bps`, in whole microseconds
/// (at least one).
fn serialization_us(bytes: u32, capacity_bps: f64) -> SimTime {
    ((bytes as f64 * 8.0 / capacity_bps) * 1e6).ceil().max(1.0) as SimTime
}

#[cfg(test)]
mod tests {
    use super::*;
    use fap_flood_abstract::{Position, TimeWindow};

    /// One macro cell, one client, short run: enough to watch the emission
    /// cadence without contention.
    fn quiet_scenario() -> ScenarioConfig {
        ScenarioConfig {
            sim_stop_us: 3_000_000,
            attack_window: TimeWindow::new(1_600_000, 2_000_000),
            macro_positions: vec![Position::new(0.0, 0.0, 25.0)],
            fap_positions: vec![],
            client_positions: vec![Position::new(5.0, 5.0, 1.5)],
            attackers: vec![],
            impacted: vec![],
            other_legit: vec![0],
            legit_ul_start_us: 1_500_000,
            legit_dl_start_us: 1_000_000,
            tail_margin_us: 1_000_000,
            jitter_max_us: 0,
            ..ScenarioConfig::default()
        }
    }

    #[test]
    fn legitimate_uplink_follows_its_window_and_interval() {
        let mut sim = Simulator::new(quiet_scenario()).unwrap();
        sim.run_until_complete();
        let report = sim.export_report();

        let ul = report
            .flows
            .iter()
            .find(|f| f.direction == Direction::Uplink)
            .unwrap();
        // Window [1.5 s, 2.0 s), interval 120 ms: 1.50, 1.62, 1.74, 1.86, 1.98.
        assert_eq!(ul.record.tx_packets, 5);
        assert_eq!(ul.record.rx_packets, 5);
        assert_eq!(ul.record.lost_packets, 0);
        assert_eq!(ul.metrics.loss_ratio, Some(0.0));
        // Uncontended delay is serialization plus core latency.
        let mean_delay = ul.metrics.mean_delay_s.unwrap();
        assert!(mean_delay > 0.009 && mean_delay < 0.012, "{mean_delay}");
    }

    #[test]
    fn clients_with_no_cell_lose_all_uplink_traffic() {
        let mut config = quiet_scenario();
        config.macro_positions = vec![];
        let mut sim = Simulator::new(config).unwrap();
        assert_eq!(sim.attach_issues().len(), 1);
        sim.run_until_complete();
        let report = sim.export_report();
        let ul = report
            .flows
            .iter()
            .find(|f| f.direction == Direction::Uplink)
            .unwrap();
        assert_eq!(ul.record.rx_packets, 0);
        assert_eq!(ul.record.lost_packets, ul.record.tx_packets);
        assert_eq!(ul.metrics.loss_ratio, Some(1.0));
        assert_eq!(ul.metrics.throughput_bps, None);
    }

    #[test]
    fn event_clock_stops_at_the_configured_end() {
        let mut sim = Simulator::new(quiet_scenario()).unwrap();
        sim.run_until_complete();
        assert!(sim.current_time() <= sim.config().sim_stop_us);
        assert_eq!(sim.remaining_events(), 0);
    }

    #[test]
    fn deliveries_at_the_stop_instant_are_truncated() {
        // One uplink emission at 1.5 s; with 82 us serialization, 10 ms core
        // latency and no jitter its delivery lands exactly on the stop
        // instant, outside the half-open run.
        let config = ScenarioConfig {
            sim_stop_us: 1_510_082,
            attack_window: TimeWindow::new(1_500_001, 1_500_002),
            tail_margin_us: 82,
            ..quiet_scenario()
        };
        let mut sim = Simulator::new(config).unwrap();
        sim.run_until_complete();
        assert_eq!(sim.current_time(), sim.config().sim_stop_us);

        let report = sim.export_report();
        let ul = report
            .flows
            .iter()
            .find(|f| f.direction == Direction::Uplink)
            .unwrap();
        assert_eq!(ul.record.tx_packets, 1);
        // Truncated in flight: neither received nor counted as lost.
        assert_eq!(ul.record.rx_packets, 0);
        assert_eq!(ul.record.lost_packets, 0);
    }

    #[test]
    fn identical_seeds_give_identical_reports() {
        let run = || {
            let mut sim = Simulator::new(quiet_scenario()).unwrap();
            sim.run_until_complete();
            sim.export_report()
        };
        let a = run();
        let b = run();
        assert_eq!(a.flows.len(), b.flows.len());
        for (x, y) in a.flows.iter().zip(&b.flows) {
            assert_eq!(x.record, y.record);
        }
    }
}

use fap_flood_abstract::{
    ClientRole, Direction, FiveTuple, FlowId, FlowRecord, RolePlan, ScenarioConfig,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// Role attribution of a classified flow. `Other` covers addresses outside
/// the modeled client population (infrastructure nodes and the like); such
/// flows stay in the raw report but are excluded from role aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum RoleLabel {
    Attacker,
    ImpactedLegitimate,
    OtherLegitimate,
    Other,
}

impl From<ClientRole> for RoleLabel {
    fn from(role: ClientRole) -> Self {
        match role {
            ClientRole::Attacker => RoleLabel::Attacker,
            ClientRole::ImpactedLegitimate => RoleLabel::ImpactedLegitimate,
            ClientRole::OtherLegitimate => RoleLabel::OtherLegitimate,
        }
    }
}

/// Per-flow impact metrics. `None` means not applicable (the divisor was
/// zero), never zero: a flow with no transmitted packets has no loss ratio
/// at all.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FlowMetrics {
    pub loss_ratio: Option<f64>,
    pub mean_delay_s: Option<f64>,
    pub throughput_bps: Option<f64>,
    pub mean_jitter_s: Option<f64>,
}

impl FlowMetrics {
    pub fn derive(record: &FlowRecord) -> Self {
        let loss_ratio = (record.tx_packets > 0)
            .then(|| record.lost_packets as f64 / record.tx_packets as f64);
        let mean_delay_s = (record.rx_packets > 0)
            .then(|| record.delay_sum_us as f64 / record.rx_packets as f64 / 1e6);
        let duration_us = record.time_last_rx.saturating_sub(record.time_first_tx);
        let throughput_bps = (record.rx_packets > 0 && duration_us > 0)
            .then(|| record.rx_bytes as f64 * 8.0 / (duration_us as f64 / 1e6));
        let mean_jitter_s = (record.rx_packets > 1)
            .then(|| record.jitter_sum_us as f64 / (record.rx_packets - 1) as f64 / 1e6);
        Self {
            loss_ratio,
            mean_delay_s,
            throughput_bps,
            mean_jitter_s,
        }
    }
}

/// A flow record annotated with direction, role and derived metrics.
/// Recomputed for each report, never stored across runs.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedFlow {
    pub flow_id: FlowId,
    pub tuple: FiveTuple,
    pub direction: Direction,
    pub role: RoleLabel,
    /// Console label, e.g. "Attacker UL Flood".
    pub label: &'static str,
    pub record: FlowRecord,
    pub metrics: FlowMetrics,
}

/// Attribute every flow to a direction and role and derive its metrics.
/// Deterministic and input-order independent: output is totally ordered by
/// flow id and computed from final counters only.
pub fn classify(
    flows: &[(FlowId, FiveTuple, FlowRecord)],
    config: &ScenarioConfig,
    roles: &RolePlan,
) -> Vec<ClassifiedFlow> {
    let mut classified: Vec<ClassifiedFlow> = flows
        .iter()
        .map(|&(flow_id, tuple, record)| {
            let (direction, role) = attribute(&tuple, config, roles);
            ClassifiedFlow {
                flow_id,
                tuple,
                direction,
                role,
                label: label_for(direction, role),
                record,
                metrics: FlowMetrics::derive(&record),
            }
        })
        .collect();
    classified.sort_by_key(|f| f.flow_id);
    classified
}

fn attribute(
    tuple: &FiveTuple,
    config: &ScenarioConfig,
    roles: &RolePlan,
) -> (Direction, RoleLabel) {
    if tuple.dst_addr == config.anchor_addr && tuple.dst_port == config.uplink_port {
        (Direction::Uplink, role_of_addr(tuple.src_addr, config, roles))
    } else if tuple.src_addr == config.anchor_addr && tuple.dst_port == config.downlink_port {
        (
            Direction::Downlink,
            role_of_addr(tuple.dst_addr, config, roles),
        )
    } else {
        (Direction::Unclassified, RoleLabel::Other)
    }
}

fn role_of_addr(
    addr: std::net::Ipv4Addr,
    config: &ScenarioConfig,
    roles: &RolePlan,
) -> RoleLabel {
    config
        .client_index_of(addr)
        .and_then(|client| roles.role_of(client))
        .map(RoleLabel::from)
        .unwrap_or(RoleLabel::Other)
}

fn label_for(direction: Direction, role: RoleLabel) -> &'static str {
    match (direction, role) {
        (Direction::Uplink, RoleLabel::Attacker) => "Attacker UL Flood",
        (Direction::Uplink, RoleLabel::ImpactedLegitimate) => "FAP-Legit UL",
        (Direction::Uplink, RoleLabel::OtherLegitimate) => "Macro-Legit UL",
        (Direction::Uplink, RoleLabel::Other) => "Other UL",
        (Direction::Downlink, RoleLabel::ImpactedLegitimate) => "FAP-Legit DL",
        (Direction::Downlink, RoleLabel::OtherLegitimate) => "Macro-Legit DL",
        (Direction::Downlink, _) => "Other DL",
        (Direction::Unclassified, _) => "Unknown",
    }
}

/// Summed counters for one role and direction. Ratio metrics are recomputed
/// from the summed counters, so the aggregate loss ratio is packet-weighted
/// rather than a mean of per-flow ratios.
#[derive(Debug, Clone, Serialize)]
pub struct RoleAggregate {
    pub role: RoleLabel,
    pub direction: Direction,
    pub flows: u32,
    pub tx_packets: u64,
    pub tx_bytes: u64,
    pub rx_packets: u64,
    pub rx_bytes: u64,
    pub lost_packets: u64,
    pub delay_sum_us: u64,
    pub jitter_sum_us: u64,
    pub loss_ratio: Option<f64>,
    pub mean_delay_s: Option<f64>,
    /// Sum of per-flow throughputs (flows with undefined throughput
    /// contribute nothing).
    pub throughput_bps: Option<f64>,
    pub mean_jitter_s: Option<f64>,
}

/// The scenario's primary output: per-role, per-direction aggregates.
/// `Other`-labeled and direction-unclassified flows are excluded. Groups
/// with no flows are omitted.
pub fn aggregate(flows: &[ClassifiedFlow]) -> Vec<RoleAggregate> {
    let mut groups: BTreeMap<(RoleLabel, Direction), Vec<&ClassifiedFlow>> = BTreeMap::new();
    for flow in flows {
        if flow.role == RoleLabel::Other || flow.direction == Direction::Unclassified {
            continue;
        }
        groups.entry((flow.role, flow.direction)).or_default().push(flow);
    }

    groups
        .into_iter()
        .map(|((role, direction), members)| {
            let mut agg = RoleAggregate {
                role,
                direction,
                flows: members.len() as u32,
                tx_packets: 0,
                tx_bytes: 0,
                rx_packets: 0,
                rx_bytes: 0,
                lost_packets: 0,
                delay_sum_us: 0,
                jitter_sum_us: 0,
                loss_ratio: None,
                mean_delay_s: None,
                throughput_bps: None,
                mean_jitter_s: None,
            };
            let mut throughput = 0.0;
            let mut has_throughput = false;
            for flow in &members {
                agg.tx_packets += flow.record.tx_packets;
                agg.tx_bytes += flow.record.tx_bytes;
                agg.rx_packets += flow.record.rx_packets;
                agg.rx_bytes += flow.record.rx_bytes;
                agg.lost_packets += flow.record.lost_packets;
                agg.delay_sum_us += flow.record.delay_sum_us;
                agg.jitter_sum_us += flow.record.jitter_sum_us;
                if let Some(bps) = flow.metrics.throughput_bps {
                    throughput += bps;
                    has_throughput = true;
                }
            }
            agg.loss_ratio =
                (agg.tx_packets > 0).then(|| agg.lost_packets as f64 / agg.tx_packets as f64);
            agg.mean_delay_s =
                (agg.rx_packets > 0).then(|| agg.delay_sum_us as f64 / agg.rx_packets as f64 / 1e6);
            agg.mean_jitter_s = (agg.rx_packets > 1)
                .then(|| agg.jitter_sum_us as f64 / (agg.rx_packets - 1) as f64 / 1e6);
            agg.throughput_bps = has_throughput.then_some(throughput);
            agg
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fap_flood_abstract::PROTO_UDP;
    use std::net::Ipv4Addr;

    fn config() -> ScenarioConfig {
        ScenarioConfig::default()
    }

    fn tuple(src: Ipv4Addr, src_port: u16, dst: Ipv4Addr, dst_port: u16) -> FiveTuple {
        FiveTuple {
            src_addr: src,
            src_port,
            dst_addr: dst,
            dst_port,
            protocol: PROTO_UDP,
        }
    }

    fn uplink_tuple(config: &ScenarioConfig, client: u32) -> FiveTuple {
        tuple(
            config.client_addr(client),
            49_152 + client as u16,
            config.anchor_addr,
            config.uplink_port,
        )
    }

    fn record(tx: u64, rx: u64, lost: u64) -> FlowRecord {
        FlowRecord {
            tx_packets: tx,
            tx_bytes: tx * 512,
            rx_packets: rx,
            rx_bytes: rx * 512,
            lost_packets: lost,
            delay_sum_us: rx * 10_000,
            jitter_sum_us: rx.saturating_sub(1) * 100,
            time_first_tx: 1_500_000,
            time_last_rx: 39_000_000,
        }
    }

    #[test]
    fn directions_and_roles_follow_the_address_rules() {
        let config = config();
        let roles = config.role_plan();
        let flows = vec![
            (1, uplink_tuple(&config, 3), record(1000, 100, 900)),
            (2, uplink_tuple(&config, 0), record(300, 250, 50)),
            (3, uplink_tuple(&config, 2), record(300, 300, 0)),
            (
                4,
                tuple(
                    config.anchor_addr,
                    36_000,
                    config.client_addr(0),
                    config.downlink_port,
                ),
                record(380, 380, 0),
            ),
            // Infrastructure chatter: neither uplink sink nor downlink.
            (
                5,
                tuple(Ipv4Addr::new(9, 0, 0, 1), 5, Ipv4Addr::new(9, 0, 0, 2), 6),
                record(10, 10, 0),
            ),
        ];
        let classified = classify(&flows, &config, &roles);
        assert_eq!(classified[0].label, "Attacker UL Flood");
        assert_eq!(classified[0].direction, Direction::Uplink);
        assert_eq!(classified[1].label, "FAP-Legit UL");
        assert_eq!(classified[2].label, "Macro-Legit UL");
        assert_eq!(classified[3].label, "FAP-Legit DL");
        assert_eq!(classified[4].label, "Unknown");
        assert_eq!(classified[4].role, RoleLabel::Other);
    }

    #[test]
    fn unknown_source_to_the_sink_is_other_uplink() {
        let config = config();
        let roles = config.role_plan();
        let flows = vec![(
            1,
            tuple(
                Ipv4Addr::new(9, 9, 9, 9),
                1234,
                config.anchor_addr,
                config.uplink_port,
            ),
            record(10, 10, 0),
        )];
        let classified = classify(&flows, &config, &roles);
        assert_eq!(classified[0].label, "Other UL");
        assert_eq!(classified[0].role, RoleLabel::Other);
        // Present in the raw report, absent from role aggregates.
        assert!(aggregate(&classified).is_empty());
    }

    #[test]
    fn classification_is_order_independent() {
        let config = config();
        let roles = config.role_plan();
        let mut flows = vec![
            (3, uplink_tuple(&config, 2), record(300, 300, 0)),
            (1, uplink_tuple(&config, 3), record(1000, 100, 900)),
            (2, uplink_tuple(&config, 0), record(300, 250, 50)),
        ];
        let forward = classify(&flows, &config, &roles);
        flows.reverse();
        let reversed = classify(&flows, &config, &roles);
        let forward_json = serde_json::to_string(&forward).unwrap();
        let reversed_json = serde_json::to_string(&reversed).unwrap();
        assert_eq!(forward_json, reversed_json);
        assert!(forward.windows(2).all(|w| w[0].flow_id < w[1].flow_id));
    }

    #[test]
    fn classification_is_idempotent() {
        let config = config();
        let roles = config.role_plan();
        let flows = vec![(1, uplink_tuple(&config, 0), record(300, 250, 50))];
        let first = serde_json::to_string(&classify(&flows, &config, &roles)).unwrap();
        let second = serde_json::to_string(&classify(&flows, &config, &roles)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn metrics_are_omitted_rather_than_zeroed() {
        // No tx: loss ratio undefined.
        let silent = FlowMetrics::derive(&FlowRecord::default());
        assert_eq!(silent.loss_ratio, None);
        assert_eq!(silent.mean_delay_s, None);
        assert_eq!(silent.throughput_bps, None);
        assert_eq!(silent.mean_jitter_s, None);

        // One rx packet: delay defined, jitter not; zero duration kills
        // throughput.
        let one = FlowRecord {
            tx_packets: 1,
            tx_bytes: 512,
            rx_packets: 1,
            rx_bytes: 512,
            lost_packets: 0,
            delay_sum_us: 20_000,
            jitter_sum_us: 0,
            time_first_tx: 5,
            time_last_rx: 5,
        };
        let metrics = FlowMetrics::derive(&one);
        assert_eq!(metrics.loss_ratio, Some(0.0));
        assert_eq!(metrics.mean_delay_s, Some(0.02));
        assert_eq!(metrics.throughput_bps, None);
        assert_eq!(metrics.mean_jitter_s, None);
    }

    #[test]
    fn loss_ratio_stays_within_unit_interval() {
        let metrics = FlowMetrics::derive(&record(1000, 100, 900));
        assert_eq!(metrics.loss_ratio, Some(0.9));
        let clean = FlowMetrics::derive(&record(100, 100, 0));
        assert_eq!(clean.loss_ratio, Some(0.0));
    }

    #[test]
    fn throughput_matches_bits_over_duration() {
        let rec = FlowRecord {
            tx_packets: 10,
            tx_bytes: 5_120,
            rx_packets: 10,
            rx_bytes: 5_120,
            lost_packets: 0,
            delay_sum_us: 100_000,
            jitter_sum_us: 900,
            time_first_tx: 0,
            time_last_rx: 1_000_000,
        };
        let metrics = FlowMetrics::derive(&rec);
        assert_eq!(metrics.throughput_bps, Some(5_120.0 * 8.0));
    }

    #[test]
    fn aggregates_sum_counters_per_role_and_direction() {
        let config = config();
        let roles = config.role_plan();
        let flows = vec![
            (1, uplink_tuple(&config, 0), record(300, 200, 100)),
            (2, uplink_tuple(&config, 1), record(300, 250, 50)),
            (3, uplink_tuple(&config, 3), record(1000, 10, 990)),
        ];
        let aggregates = aggregate(&classify(&flows, &config, &roles));
        assert_eq!(aggregates.len(), 2);
        let impacted = aggregates
            .iter()
            .find(|a| a.role == RoleLabel::ImpactedLegitimate)
            .unwrap();
        assert_eq!(impacted.flows, 2);
        assert_eq!(impacted.tx_packets, 600);
        assert_eq!(impacted.lost_packets, 150);
        assert_eq!(impacted.loss_ratio, Some(0.25));
        let attacker = aggregates
            .iter()
            .find(|a| a.role == RoleLabel::Attacker)
            .unwrap();
        assert_eq!(attacker.direction, Direction::Uplink);
        assert_eq!(attacker.loss_ratio, Some(0.99));
    }
}

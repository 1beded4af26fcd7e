//! End-to-end run of the canonical scenario: two attackers flooding the two
//! FAP uplinks must degrade the FAP-attached legitimate clients far more
//! than the macro-attached ones.

use fap_flood_abstract::{Direction, Phase, ScenarioConfig};
use fap_flood_core::{RoleAggregate, RoleLabel};
use fap_flood_sim::Simulator;

fn run_canonical() -> fap_flood_sim::SimulationReport {
    let mut sim = Simulator::new(ScenarioConfig::default()).unwrap();
    sim.run_until_complete();
    sim.export_report()
}

#[test]
fn canonical_scenario_shows_localized_uplink_degradation() {
    let report = run_canonical();

    // Every client is connected, and to the expected cell type.
    assert!(report.attach_issues.is_empty());
    for summary in &report.clients {
        assert!(summary.serving_cell.is_some());
        assert!(summary.serving_node.is_some());
    }
    let macro_served: Vec<u32> = report
        .clients
        .iter()
        .filter(|c| c.macro_cell == Some(true))
        .map(|c| c.client)
        .collect();
    assert_eq!(macro_served, vec![2, 5, 6]);
    // Attacker and victim share the FAP they sit next to.
    let cell_of = |client: u32| report.clients[client as usize].serving_cell.unwrap();
    assert_eq!(cell_of(0), cell_of(3));
    assert_eq!(cell_of(1), cell_of(4));

    // Attacker uplink flows carry the flood label and the flood cadence:
    // one packet per 20 us over the 15 s attack window.
    let attack_flows: Vec<_> = report
        .flows
        .iter()
        .filter(|f| f.label == "Attacker UL Flood")
        .collect();
    assert_eq!(attack_flows.len(), 2);
    for flow in &attack_flows {
        assert!(
            flow.record.tx_packets >= 740_000 && flow.record.tx_packets <= 750_000,
            "attack tx_packets = {}",
            flow.record.tx_packets
        );
        // A 400+ Mb/s flood into a 20 Mb/s uplink sheds most of its load.
        assert!(flow.metrics.loss_ratio.unwrap() > 0.9);
    }

    // The primary impact check: FAP-adjacent legitimate uplink suffers
    // materially more loss and delay than macro-adjacent uplink.
    let find = |role: RoleLabel| {
        report
            .aggregates
            .iter()
            .find(|a| a.role == role && a.direction == Direction::Uplink)
            .unwrap()
    };
    let impacted = find(RoleLabel::ImpactedLegitimate);
    let other = find(RoleLabel::OtherLegitimate);

    let impacted_loss = impacted.loss_ratio.unwrap();
    let other_loss = other.loss_ratio.unwrap();
    assert!(
        impacted_loss > other_loss + 0.05,
        "impacted loss {impacted_loss} vs other loss {other_loss}"
    );
    assert!(other_loss < 0.01, "macro uplink should stay clean: {other_loss}");

    let impacted_delay = impacted.mean_delay_s.unwrap();
    let other_delay = other.mean_delay_s.unwrap();
    assert!(
        impacted_delay > 2.0 * other_delay,
        "impacted delay {impacted_delay} vs other delay {other_delay}"
    );
}

#[test]
fn impacted_uplink_degradation_concentrates_in_the_attack_window() {
    let report = run_canonical();
    let uplink = |phase: Phase, role: RoleLabel| -> RoleAggregate {
        report
            .phases
            .iter()
            .find(|b| b.phase == phase)
            .unwrap()
            .aggregates
            .iter()
            .find(|a| a.role == role && a.direction == Direction::Uplink)
            .unwrap()
            .clone()
    };

    let before = uplink(Phase::Before, RoleLabel::ImpactedLegitimate);
    let inside = uplink(Phase::Inside, RoleLabel::ImpactedLegitimate);
    let after = uplink(Phase::After, RoleLabel::ImpactedLegitimate);

    // Loss is confined to the attack window: the FAP uplink is clean before
    // the flood starts and recovers once it stops.
    assert!(inside.loss_ratio.unwrap() > 0.5, "{:?}", inside.loss_ratio);
    assert!(before.loss_ratio.unwrap() < 0.01, "{:?}", before.loss_ratio);
    assert!(after.loss_ratio.unwrap() < 0.01, "{:?}", after.loss_ratio);
    assert!(
        inside.mean_delay_s.unwrap() > 5.0 * before.mean_delay_s.unwrap(),
        "during {:?} vs before {:?}",
        inside.mean_delay_s,
        before.mean_delay_s
    );

    // The macro uplink stays clean even during the flood.
    let macro_inside = uplink(Phase::Inside, RoleLabel::OtherLegitimate);
    assert!(macro_inside.loss_ratio.unwrap() < 0.01);

    // The phase bins partition the whole-run aggregate.
    let total = report
        .aggregates
        .iter()
        .find(|a| a.role == RoleLabel::ImpactedLegitimate && a.direction == Direction::Uplink)
        .unwrap();
    assert_eq!(
        total.tx_packets,
        before.tx_packets + inside.tx_packets + after.tx_packets
    );
    assert_eq!(
        total.lost_packets,
        before.lost_packets + inside.lost_packets + after.lost_packets
    );
}

#[test]
fn classification_of_a_snapshot_is_idempotent() {
    let mut sim = Simulator::new(ScenarioConfig::default()).unwrap();
    sim.run_until_complete();
    let first = serde_json::to_string(&sim.export_report().flows).unwrap();
    let second = serde_json::to_string(&sim.export_report().flows).unwrap();
    assert_eq!(first, second);
}

#[test]
fn downlink_flows_reach_only_legitimate_clients() {
    let report = run_canonical();
    let downlinks: Vec<_> = report
        .flows
        .iter()
        .filter(|f| f.direction == Direction::Downlink)
        .collect();
    assert_eq!(downlinks.len(), 5);
    assert!(downlinks.iter().all(|f| f.role != RoleLabel::Attacker));
    // Downlink stays uncongested: the flood targets the uplink only.
    for flow in &downlinks {
        assert!(flow.metrics.loss_ratio.unwrap() < 0.01);
    }
}

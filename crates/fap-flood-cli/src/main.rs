use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use fap_flood_abstract::{ClientRole, Direction, Phase, ScenarioConfig};
use fap_flood_core::{RoleAggregate, RoleLabel};
use fap_flood_sim::{SimulationReport, Simulator};

#[derive(Parser, Debug)]
#[command(author, version, about = "Small-cell uplink flood impact simulator")]
struct Args {
    /// Load a scenario from a TOML file (defaults to the canonical
    /// FAP-flood scenario).
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Write a JSON report of the finished simulation.
    #[arg(long)]
    report_out: Option<PathBuf>,

    /// Skip the console report (useful together with --report-out).
    #[arg(long, default_value_t = false)]
    quiet: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let config = match &args.scenario {
        Some(path) => load_scenario(path)?,
        None => ScenarioConfig::default(),
    };

    info!("fap-flood starting…");
    let mut sim = Simulator::new(config).context("Scenario rejected")?;
    sim.run_until_complete();
    let report = sim.export_report();

    if !args.quiet {
        print_report(&report);
    }
    if let Some(path) = &args.report_out {
        write_report(path, &report)?;
    }
    Ok(())
}

fn load_scenario(path: &Path) -> Result<ScenarioConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
    let config: ScenarioConfig =
        toml::from_str(&content).context("Failed to parse scenario file")?;
    Ok(config)
}

fn write_report(path: &Path, report: &SimulationReport) -> Result<()> {
    let data = serde_json::to_vec_pretty(report).context("Failed to serialize report")?;
    fs::write(path, &data)
        .with_context(|| format!("Failed to write report file {}", path.display()))?;
    Ok(())
}

fn role_name(role: Option<ClientRole>) -> &'static str {
    match role {
        Some(ClientRole::Attacker) => "Attacker",
        Some(ClientRole::ImpactedLegitimate) => "FAP-Legit",
        Some(ClientRole::OtherLegitimate) => "Macro-Legit",
        None => "Unassigned",
    }
}

fn phase_name(phase: Phase) -> &'static str {
    match phase {
        Phase::Before => "Before attack",
        Phase::Inside => "During attack",
        Phase::After => "After attack",
    }
}

fn direction_name(direction: Direction) -> &'static str {
    match direction {
        Direction::Uplink => "UL",
        Direction::Downlink => "DL",
        Direction::Unclassified => "??",
    }
}

fn print_report(report: &SimulationReport) {
    println!("--- Client Roles and Addresses ---");
    for client in &report.clients {
        println!(
            "Client {} ({}) IP: {}",
            client.client,
            role_name(client.role),
            client.addr
        );
    }

    println!("\n--- Flow Statistics ---");
    for flow in &report.flows {
        println!("Flow ID: {} ({}) {}", flow.flow_id, flow.label, flow.tuple);
        println!(
            "  Tx Packets: {} ({} bytes)",
            flow.record.tx_packets, flow.record.tx_bytes
        );
        println!(
            "  Rx Packets: {} ({} bytes)",
            flow.record.rx_packets, flow.record.rx_bytes
        );
        println!("  Lost Packets: {}", flow.record.lost_packets);
        if let Some(loss) = flow.metrics.loss_ratio {
            println!("  Loss Ratio: {loss:.4}");
        }
        match flow.metrics.mean_delay_s {
            Some(delay) => println!("  Mean Delay: {delay:.6} s"),
            None => println!("  No Packets Received"),
        }
        match flow.metrics.throughput_bps {
            Some(bps) => println!("  Throughput: {:.2} Kbps", bps / 1024.0),
            None => println!("  Throughput: N/A"),
        }
        match flow.metrics.mean_jitter_s {
            Some(jitter) => println!("  Mean Jitter: {jitter:.6} s"),
            None => println!("  Mean Jitter: N/A (<= 1 Rx packet)"),
        }
        println!("------------------------------------------");
    }

    println!("\n--- Per-Role Aggregates ---");
    for agg in &report.aggregates {
        println!(
            "{:?} {} ({} flows): tx={} rx={} lost={} loss={} delay={} throughput={}",
            agg.role,
            direction_name(agg.direction),
            agg.flows,
            agg.tx_packets,
            agg.rx_packets,
            agg.lost_packets,
            fmt_opt(agg.loss_ratio, 4),
            fmt_opt(agg.mean_delay_s, 6),
            fmt_opt(agg.throughput_bps.map(|b| b / 1024.0), 2),
        );
    }

    println!("\n--- Client Connectivity (End of Simulation) ---");
    for client in &report.clients {
        match (client.serving_cell, client.serving_node, client.macro_cell) {
            (Some(cell), Some(node), Some(is_macro)) => println!(
                "Client {}: Connected to Cell ID {} (Node ID: {}, Type: {})",
                client.client,
                cell,
                node,
                if is_macro { "Macro" } else { "FAP" }
            ),
            (Some(cell), None, _) => println!(
                "Client {}: Connected to Cell ID {} (Node mapping not found!)",
                client.client, cell
            ),
            _ => println!("Client {}: Not connected", client.client),
        }
    }
    if !report.attach_issues.is_empty() {
        println!("Attach issues: {:?}", report.attach_issues);
    }

    let uplink_of = |aggregates: &[RoleAggregate], role: RoleLabel| {
        aggregates
            .iter()
            .find(|a| a.role == role && a.direction == Direction::Uplink)
            .map(|a| (a.loss_ratio, a.mean_delay_s))
    };

    println!("\n--- Uplink Impact by Attack Phase (FAP-Legit vs Macro-Legit) ---");
    for breakdown in &report.phases {
        let impacted = uplink_of(&breakdown.aggregates, RoleLabel::ImpactedLegitimate);
        let baseline = uplink_of(&breakdown.aggregates, RoleLabel::OtherLegitimate);
        match (impacted, baseline) {
            (Some((i_loss, i_delay)), Some((b_loss, b_delay))) => println!(
                "{}: loss {} vs {}, delay {} s vs {} s",
                phase_name(breakdown.phase),
                fmt_opt(i_loss, 4),
                fmt_opt(b_loss, 4),
                fmt_opt(i_delay, 6),
                fmt_opt(b_delay, 6),
            ),
            _ => println!("{}: no uplink traffic", phase_name(breakdown.phase)),
        }
    }

    let attacked = uplink_of(&report.aggregates, RoleLabel::ImpactedLegitimate);
    let baseline = uplink_of(&report.aggregates, RoleLabel::OtherLegitimate);
    if let (Some((a_loss, a_delay)), Some((b_loss, b_delay))) = (attacked, baseline) {
        println!(
            "\nWhole-run uplink impact delta (FAP-legit vs Macro-legit): loss {} vs {}, delay {} s vs {} s",
            fmt_opt(a_loss, 4),
            fmt_opt(b_loss, 4),
            fmt_opt(a_delay, 6),
            fmt_opt(b_delay, 6),
        );
    }
}

fn fmt_opt(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{v:.precision$}"),
        None => "N/A".to_string(),
    }
}

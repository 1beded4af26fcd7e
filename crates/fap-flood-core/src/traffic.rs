use fap_flood_abstract::{
    ClientRole, ConfigError, Direction, FiveTuple, RolePlan, ScenarioConfig, TimeWindow,
    TrafficProfile, PROTO_UDP,
};
use tracing::debug;

/// Deterministic source-port bases so every profile owns a distinct
/// five-tuple: uplink clients bind 49152+i, the anchor's downlink sockets
/// bind 36000+i.
const UL_SRC_PORT_BASE: u16 = 49_152;
const DL_SRC_PORT_BASE: u16 = 36_000;

/// The full set of traffic profiles for one run. Profiles are emission
/// intents only; installing them on the event clock and executing delivery
/// is the radio engine's job.
#[derive(Debug, Clone)]
pub struct TrafficPlan {
    pub profiles: Vec<TrafficProfile>,
}

impl TrafficPlan {
    /// Instantiate one uplink profile per client and one downlink profile
    /// per legitimate client, from the fixed role table:
    ///
    /// - attacker uplink: sub-millisecond interval, large payload, active
    ///   only inside the attack window;
    /// - legitimate uplink: moderate interval, small payload, near-full run
    ///   offset from t=0;
    /// - legitimate downlink: moderate interval, near-full run;
    /// - attackers receive no downlink traffic.
    ///
    /// Every profile runs until its window closes; there is no packet cap.
    pub fn build(config: &ScenarioConfig, roles: &RolePlan) -> Result<Self, ConfigError> {
        config.validate()?;

        let legit_ul_window = TimeWindow::new(
            config.legit_ul_start_us,
            config.sim_stop_us - config.tail_margin_us,
        );
        let legit_dl_window = TimeWindow::new(
            config.legit_dl_start_us,
            config.sim_stop_us - config.tail_margin_us,
        );

        let mut profiles = Vec::new();
        for client in 0..config.num_clients() {
            let role = roles
                .role_of(client)
                .ok_or(ConfigError::RoleUnassigned(client))?;

            let uplink = FiveTuple {
                src_addr: config.client_addr(client),
                src_port: UL_SRC_PORT_BASE + client as u16,
                dst_addr: config.anchor_addr,
                dst_port: config.uplink_port,
                protocol: PROTO_UDP,
            };
            let (size, interval_us, window) = match role {
                ClientRole::Attacker => (
                    config.attacker_packet_size,
                    config.attacker_interval_us,
                    config.attack_window,
                ),
                ClientRole::ImpactedLegitimate | ClientRole::OtherLegitimate => (
                    config.legit_ul_packet_size,
                    config.legit_ul_interval_us,
                    legit_ul_window,
                ),
            };
            debug!(client, ?role, interval_us, "instantiating uplink profile");
            profiles.push(TrafficProfile {
                client,
                role,
                direction: Direction::Uplink,
                endpoints: uplink,
                packet_size: size,
                interval_us,
                window,
                max_packets: None,
            });

            if role == ClientRole::Attacker {
                continue;
            }
            profiles.push(TrafficProfile {
                client,
                role,
                direction: Direction::Downlink,
                endpoints: FiveTuple {
                    src_addr: config.anchor_addr,
                    src_port: DL_SRC_PORT_BASE + client as u16,
                    dst_addr: config.client_addr(client),
                    dst_port: config.downlink_port,
                    protocol: PROTO_UDP,
                },
                packet_size: config.legit_dl_packet_size,
                interval_us: config.legit_dl_interval_us,
                window: legit_dl_window,
                max_packets: None,
            });
        }

        Ok(Self { profiles })
    }
}

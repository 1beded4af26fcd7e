use crate::SimTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

/// Flow identifier assigned by the delivery engine in first-seen order,
/// starting at 1.
pub type FlowId = u32;

/// IP protocol number for UDP. All modeled traffic is UDP.
pub const PROTO_UDP: u8 = 17;

/// Flow key: all packets sharing one address/port pair and protocol belong
/// to the same flow for the whole run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct FiveTuple {
    pub src_addr: Ipv4Addr,
    pub src_port: u16,
    pub dst_addr: Ipv4Addr,
    pub dst_port: u16,
    pub protocol: u8,
}

impl fmt::Display for FiveTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} -> {}:{}",
            self.src_addr, self.src_port, self.dst_addr, self.dst_port
        )
    }
}

/// Traffic direction relative to the access network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    Uplink,
    Downlink,
    /// The flow matched neither the uplink-sink nor the downlink pattern.
    Unclassified,
}

/// End-of-run counters for one flow, as produced by the delivery engine.
/// The core only consumes the final snapshot; it never enforces
/// tx >= rx + lost (loss accounting belongs to the delivery engine).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowRecord {
    pub tx_packets: u64,
    pub tx_bytes: u64,
    pub rx_packets: u64,
    pub rx_bytes: u64,
    pub lost_packets: u64,
    pub delay_sum_us: u64,
    pub jitter_sum_us: u64,
    pub time_first_tx: SimTime,
    pub time_last_rx: SimTime,
}

use crate::flow::{Direction, FiveTuple};
use crate::{ClientRole, SimTime};
use serde::{Deserialize, Serialize};

/// Half-open interval of simulated time, `start <= t < stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: SimTime,
    pub stop: SimTime,
}

impl TimeWindow {
    pub const fn new(start: SimTime, stop: SimTime) -> Self {
        Self { start, stop }
    }

    pub fn contains(&self, t: SimTime) -> bool {
        t >= self.start && t < self.stop
    }

    /// True when `self` lies strictly inside `outer` on both ends.
    pub fn strictly_inside(&self, outer: &TimeWindow) -> bool {
        self.start > outer.start && self.stop < outer.stop && self.start < self.stop
    }

    /// Phase of an instant relative to this window, following the half-open
    /// convention: the start belongs to `Inside`, the stop to `After`.
    pub fn phase_of(&self, t: SimTime) -> Phase {
        if t < self.start {
            Phase::Before
        } else if t < self.stop {
            Phase::Inside
        } else {
            Phase::After
        }
    }
}

/// Position of an instant relative to a reference window (in practice the
/// attack window). Used to bin flow counters so impact can be compared
/// inside versus outside the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    Before,
    Inside,
    After,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Before, Phase::Inside, Phase::After];

    /// Stable bin index, matching the order of [`Phase::ALL`].
    pub fn index(self) -> usize {
        match self {
            Phase::Before => 0,
            Phase::Inside => 1,
            Phase::After => 2,
        }
    }
}

/// Emission intent for one client and one direction. The scheduler produces
/// these; the delivery engine executes them. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafficProfile {
    /// Client index within the scenario (not the entity id).
    pub client: u32,
    pub role: ClientRole,
    pub direction: Direction,
    pub endpoints: FiveTuple,
    pub packet_size: u32,
    pub interval_us: u64,
    pub window: TimeWindow,
    /// Always `None`: a profile stops when its window closes, never because
    /// a packet count was reached.
    pub max_packets: Option<u64>,
}

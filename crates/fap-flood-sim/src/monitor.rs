use fap_flood_abstract::{FiveTuple, FlowId, FlowRecord, SimTime, TimeWindow};
use std::collections::HashMap;

/// Flow-level counter collector. Flow ids are assigned in first-seen order
/// starting at 1; all counters accumulate over the whole run and are read
/// once, as a snapshot, after the clock stops.
///
/// Besides the whole-run totals, every flow keeps one counter bin per
/// attack phase (before, inside, after the attack window). A packet is
/// attributed to the phase of its emission instant, so a bin's tx always
/// eventually equals its rx plus its lost, even when delivery crosses a
/// window bound.
#[derive(Debug)]
pub struct FlowMonitor {
    attack_window: TimeWindow,
    records: Vec<FlowRecord>,
    phased: Vec<[FlowRecord; 3]>,
    tuples: Vec<FiveTuple>,
    index: HashMap<FiveTuple, usize>,
    last_delay_us: Vec<Option<u64>>,
    phased_last_delay_us: Vec<[Option<u64>; 3]>,
}

impl FlowMonitor {
    pub fn new(attack_window: TimeWindow) -> Self {
        Self {
            attack_window,
            records: Vec::new(),
            phased: Vec::new(),
            tuples: Vec::new(),
            index: HashMap::new(),
            last_delay_us: Vec::new(),
            phased_last_delay_us: Vec::new(),
        }
    }

    fn slot(&mut self, tuple: FiveTuple) -> usize {
        if let Some(&i) = self.index.get(&tuple) {
            return i;
        }
        let i = self.records.len();
        self.records.push(FlowRecord::default());
        self.phased.push([FlowRecord::default(); 3]);
        self.tuples.push(tuple);
        self.last_delay_us.push(None);
        self.phased_last_delay_us.push([None; 3]);
        self.index.insert(tuple, i);
        i
    }

    fn bin_of(&self, t: SimTime) -> usize {
        self.attack_window.phase_of(t).index()
    }

    pub fn record_tx(&mut self, tuple: FiveTuple, bytes: u32, now: SimTime) {
        let i = self.slot(tuple);
        let bin = self.bin_of(now);
        let record = &mut self.records[i];
        if record.tx_packets == 0 {
            record.time_first_tx = now;
        }
        record.tx_packets += 1;
        record.tx_bytes += bytes as u64;
        let phased = &mut self.phased[i][bin];
        if phased.tx_packets == 0 {
            phased.time_first_tx = now;
        }
        phased.tx_packets += 1;
        phased.tx_bytes += bytes as u64;
    }

    pub fn record_lost(&mut self, tuple: FiveTuple, now: SimTime) {
        let i = self.slot(tuple);
        let bin = self.bin_of(now);
        self.records[i].lost_packets += 1;
        self.phased[i][bin].lost_packets += 1;
    }

    pub fn record_rx(&mut self, tuple: FiveTuple, bytes: u32, sent_at: SimTime, now: SimTime) {
        let i = self.slot(tuple);
        let bin = self.bin_of(sent_at);
        let delay = now.saturating_sub(sent_at);
        let record = &mut self.records[i];
        record.rx_packets += 1;
        record.rx_bytes += bytes as u64;
        record.delay_sum_us += delay;
        record.time_last_rx = now;
        if let Some(previous) = self.last_delay_us[i] {
            record.jitter_sum_us += delay.abs_diff(previous);
        }
        self.last_delay_us[i] = Some(delay);

        let phased = &mut self.phased[i][bin];
        phased.rx_packets += 1;
        phased.rx_bytes += bytes as u64;
        phased.delay_sum_us += delay;
        phased.time_last_rx = now;
        if let Some(previous) = self.phased_last_delay_us[i][bin] {
            phased.jitter_sum_us += delay.abs_diff(previous);
        }
        self.phased_last_delay_us[i][bin] = Some(delay);
    }

    /// End-of-run snapshot, ordered by flow id.
    pub fn snapshot(&self) -> Vec<(FlowId, FiveTuple, FlowRecord)> {
        self.records
            .iter()
            .enumerate()
            .map(|(i, &record)| ((i + 1) as FlowId, self.tuples[i], record))
            .collect()
    }

    /// Per-phase counter bins, ordered by flow id. Bin order matches
    /// `Phase::ALL`.
    pub fn phased_snapshot(&self) -> Vec<(FlowId, FiveTuple, [FlowRecord; 3])> {
        self.phased
            .iter()
            .enumerate()
            .map(|(i, &bins)| ((i + 1) as FlowId, self.tuples[i], bins))
            .collect()
    }

    pub fn flow_count(&self) -> usize {
        self.records.len()
    }
}

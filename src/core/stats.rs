use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use serde::Serialize;

/// Per-core counters. Atomics, so the coordinator and the dashboard read
/// them without touching the owning worker; a snapshot may be slightly torn
/// across fields, which is acceptable for reporting.
#[derive(Debug, Default)]
pub(crate) struct CoreStats {
    messages_sent: AtomicU64,
    messages_received: AtomicU64,
    processes_executed: AtomicU64,
    context_switches: AtomicU64,
    msg_latency_us: AtomicU64,
    current_load: AtomicUsize,
}

impl CoreStats {
    pub(crate) fn sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn executed(&self) {
        self.processes_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn switched(&self) {
        self.context_switches.fetch_add(1, Ordering::Relaxed);
    }

    /// Last-sample latency gauge, overwritten on every receive.
    pub(crate) fn latency_sample(&self, micros: u64) {
        self.msg_latency_us.store(micros, Ordering::Relaxed);
    }

    pub(crate) fn set_load(&self, load: usize) {
        self.current_load.store(load, Ordering::Relaxed);
    }

    pub(crate) fn load(&self) -> usize {
        self.current_load.load(Ordering::Relaxed)
    }

    pub(crate) fn snapshot(&self, core: u32) -> CoreStatsSnapshot {
        CoreStatsSnapshot {
            core,
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            processes_executed: self.processes_executed.load(Ordering::Relaxed),
            context_switches: self.context_switches.load(Ordering::Relaxed),
            msg_latency_us: self.msg_latency_us.load(Ordering::Relaxed),
            current_load: self.current_load.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of one core's counters.
#[derive(Clone, Debug, Serialize)]
pub struct CoreStatsSnapshot {
    pub core: u32,
    pub messages_sent: u64,
    pub messages_received: u64,
    pub processes_executed: u64,
    pub context_switches: u64,
    /// latency of the most recently received message
    pub msg_latency_us: u64,
    pub current_load: usize,
}

/// Aggregate over all cores plus the derived transport health numbers the
/// comparison demos consume.
#[derive(Clone, Debug, Serialize)]
pub struct SystemSnapshot {
    pub cores: Vec<CoreStatsSnapshot>,
    /// messages pushed by the coordinator itself (core -1 traffic)
    pub system_messages_sent: u64,
    pub messages_sent_total: u64,
    pub messages_received_total: u64,
    pub processes_executed_total: u64,
    pub total_load: usize,
    pub comm_overhead_pct: f64,
    pub delivery_rate_pct: f64,
}

impl SystemSnapshot {
    pub(crate) fn collect(
        cores: Vec<CoreStatsSnapshot>,
        system_messages_sent: u64,
    ) -> Self {
        let sent: u64 = cores.iter().map(|c| c.messages_sent).sum();
        let received: u64 = cores.iter().map(|c| c.messages_received).sum();
        let executed: u64 = cores.iter().map(|c| c.processes_executed).sum();
        let total_load: usize = cores.iter().map(|c| c.current_load).sum();

        let traffic = sent + received;
        let comm_overhead_pct = if traffic + executed == 0 {
            0.0
        } else {
            traffic as f64 / (traffic + executed) as f64 * 100.0
        };

        // coordinator-origin pushes count into the send total so received
        // can never exceed sent system-wide
        let sent_all = sent + system_messages_sent;
        let delivery_rate_pct = if sent_all == 0 {
            100.0
        } else {
            received as f64 / sent_all as f64 * 100.0
        };

        Self {
            cores,
            system_messages_sent,
            messages_sent_total: sent,
            messages_received_total: received,
            processes_executed_total: executed,
            total_load,
            comm_overhead_pct,
            delivery_rate_pct,
        }
    }
}

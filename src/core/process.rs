use std::{
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

/// Lifecycle of a simulated process. `Terminated` is absorbing; the sweep at
/// the end of a scheduler pass removes such records before the next pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessState {
    Ready,
    Running,
    Blocked,
    Terminated,
}

/// Per-process record. A `Pcb` lives in exactly one core's table at any
/// instant; `core_id` changes only through a migrate handoff.
#[derive(Clone, Debug)]
pub struct Pcb {
    pub pid: i64,
    pub core_id: u32,
    pub state: ProcessState,
    pub priority: u8,
    pub created_at: Instant,
    pub cpu_time: Duration,
}

impl Pcb {
    pub fn new(pid: i64, core_id: u32, priority: u8) -> Self {
        Self {
            pid,
            core_id,
            state: ProcessState::Ready,
            priority,
            created_at: Instant::now(),
            cpu_time: Duration::ZERO,
        }
    }
}

/// Process-wide pid allocator. Cloned into every agent at construction so
/// pids stay globally unique and monotone without a mutable global.
#[derive(Clone, Debug)]
pub struct PidCounter(Arc<AtomicI64>);

impl PidCounter {
    pub fn new() -> Self {
        Self(Arc::new(AtomicI64::new(0)))
    }

    pub fn next(&self) -> i64 {
        self.0.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for PidCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Probability that a process terminates on this pass. Grows monotonically
/// with accumulated cpu time; the floor keeps every workload finite.
pub(crate) fn termination_chance(cpu_time: Duration) -> f64 {
    if cpu_time > Duration::from_millis(600) {
        0.8
    } else if cpu_time > Duration::from_millis(300) {
        0.5
    } else if cpu_time > Duration::from_millis(150) {
        0.3
    } else {
        0.2
    }
}

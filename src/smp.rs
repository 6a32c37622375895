//!
//! The shared-memory contrast implementation. Same workload surface as the
//! multikernel system, but every operation funnels through one global lock
//! over one shared process table, and every acquire is charged to the
//! contention counters. Deliberately pessimistic: the counters exist to
//! expose the cost of shared state, not to win the comparison.

use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    thread,
};

use parking_lot::{Mutex, MutexGuard};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;
use snafu::ResultExt;

use crate::core::{
    termination_chance, Error, Pcb, PidCounter, ProcessState, SpawnWorker,
    QUANTUM,
};

pub struct SmpSystem {
    shared: Arc<Shared>,
    workers: Mutex<Vec<thread::JoinHandle<()>>>,
    cores: usize,
    seed: u64,
}

struct Shared {
    /// the one lock every path contends on
    table: Mutex<Vec<Pcb>>,
    running: AtomicBool,
    pids: PidCounter,
    lock_contentions: AtomicU64,
    cache_invalidations: AtomicU64,
    processes_executed: AtomicU64,
}

impl Shared {
    /// Every acquire is charged; that is the point of the baseline.
    fn lock_table(&self) -> MutexGuard<'_, Vec<Pcb>> {
        self.lock_contentions.fetch_add(1, Ordering::Relaxed);
        self.cache_invalidations.fetch_add(1, Ordering::Relaxed);
        self.table.lock()
    }

    fn tick(&self, core: u32, rng: &mut StdRng) {
        let mut table = self.lock_table();
        for pcb in table.iter_mut().filter(|p| p.core_id == core) {
            match pcb.state {
                ProcessState::Ready | ProcessState::Running => {
                    pcb.state = ProcessState::Running;
                }
                ProcessState::Blocked | ProcessState::Terminated => continue,
            }
            pcb.cpu_time += QUANTUM;
            self.processes_executed.fetch_add(1, Ordering::Relaxed);
            if rng.gen_bool(termination_chance(pcb.cpu_time)) {
                pcb.state = ProcessState::Terminated;
            }
        }
        table.retain(|p| p.state != ProcessState::Terminated);
    }
}

impl SmpSystem {
    pub fn new(cores: usize, seed: u64) -> Self {
        Self {
            shared: Arc::new(Shared {
                table: Mutex::new(Vec::new()),
                running: AtomicBool::new(false),
                pids: PidCounter::new(),
                lock_contentions: AtomicU64::new(0),
                cache_invalidations: AtomicU64::new(0),
                processes_executed: AtomicU64::new(0),
            }),
            workers: Mutex::new(Vec::new()),
            cores,
            seed,
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    pub fn start(&self) -> Result<(), Error> {
        if self.shared.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        info!(
            "[SMP] starting {} workers against one shared table",
            self.cores
        );
        let mut workers = self.workers.lock();
        for core in 0 .. self.cores {
            let shared = Arc::clone(&self.shared);
            let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(core as u64));
            let handle = thread::Builder::new()
                .name(format!("smp-{}", core))
                .spawn(move || {
                    while shared.running.load(Ordering::SeqCst) {
                        shared.tick(core as u32, &mut rng);
                        thread::sleep(QUANTUM);
                    }
                })
                .context(SpawnWorker { core: core as u32 })?;
            workers.push(handle);
        }
        Ok(())
    }

    /// Same placement rule as the multikernel, except the least-loaded scan
    /// walks the whole shared table under the global lock.
    pub fn create_process(&self, priority: u8) -> i64 {
        if !self.is_running() {
            warn!("[SMP] create_process refused, baseline not running");
            return -1;
        }
        let mut table = self.shared.lock_table();
        let mut loads = vec![0usize; self.cores];
        for pcb in table.iter() {
            loads[pcb.core_id as usize] += 1;
        }
        let target = loads
            .iter()
            .enumerate()
            .min_by_key(|&(core, load)| (*load, core))
            .map(|(core, _)| core as u32)
            .unwrap_or(0);
        let pid = self.shared.pids.next();
        table.push(Pcb::new(pid, target, priority));
        pid
    }

    /// Per-core occupancy of the shared table, scanned under the lock.
    pub fn loads(&self) -> Vec<usize> {
        let table = self.shared.lock_table();
        let mut loads = vec![0usize; self.cores];
        for pcb in table.iter() {
            loads[pcb.core_id as usize] += 1;
        }
        loads
    }

    pub fn current_load(&self) -> usize {
        self.shared.lock_table().len()
    }

    pub fn statistics(&self) -> SmpSnapshot {
        SmpSnapshot {
            lock_contentions: self.shared.lock_contentions.load(Ordering::Relaxed),
            cache_invalidations: self
                .shared
                .cache_invalidations
                .load(Ordering::Relaxed),
            processes_executed: self
                .shared
                .processes_executed
                .load(Ordering::Relaxed),
            current_load: self.current_load(),
        }
    }

    pub fn shutdown(&self) {
        if !self.shared.running.swap(false, Ordering::SeqCst) {
            return;
        }
        for handle in self.workers.lock().drain(..) {
            let _ = handle.join();
        }
        info!("[SMP] baseline stopped");
    }
}

impl Drop for SmpSystem {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Counters exposed for the contrast printout.
#[derive(Clone, Debug, Serialize)]
pub struct SmpSnapshot {
    pub lock_contentions: u64,
    pub cache_invalidations: u64,
    pub processes_executed: u64,
    pub current_load: usize,
}

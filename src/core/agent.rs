//!
//! The per-core kernel instance. One agent maps to one simulated core and
//! owns everything that core touches: the inbox, the process table, the
//! statistics block and the RNG behind the termination policy. The worker
//! thread is the sole consumer of the inbox and drives one scheduler pass
//! per cycle; the table is mutated only under its own short-lived lock, and
//! no agent lock is ever held across a call into another agent.
//!
//! Outbound traffic goes through the routing table the coordinator froze at
//! construction. Agents hold a weak handle to it: the coordinator is the one
//! owner, every core a reader, which is what breaks the all-cores-reach-all-
//! cores cycle into an acyclic ownership story.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Weak,
    },
    thread,
};

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use rand::{rngs::StdRng, Rng, SeedableRng};
use snafu::{ensure, ResultExt};

use crate::core::{
    stats::CoreStats,
    termination_chance,
    CoreStatsSnapshot, Error, Inbox, InvalidCore, Message, MessageType,
    NotRunning, Payload, Pcb, PidCounter, ProcessState, SpawnWorker,
    TableFull, MAX_PROCESSES, MESSAGE_QUEUE_SIZE, QUANTUM,
};

/// Stable agent handles indexed by core id. Owned by the coordinator and
/// immutable once the first worker starts.
pub type RoutingTable = Vec<Arc<CoreAgent>>;

pub struct CoreAgent {
    core: u32,
    inbox: Inbox,
    running: AtomicBool,
    table: Mutex<Vec<Pcb>>,
    stats: CoreStats,
    rng: Mutex<StdRng>,
    pids: PidCounter,
    routing: OnceCell<Weak<RoutingTable>>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
}

impl CoreAgent {
    pub fn new(core: u32, pids: PidCounter, seed: u64) -> Arc<Self> {
        Arc::new(Self {
            core,
            inbox: Inbox::new(core, MESSAGE_QUEUE_SIZE),
            running: AtomicBool::new(false),
            table: Mutex::new(Vec::new()),
            stats: CoreStats::default(),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            pids,
            routing: OnceCell::new(),
            worker: Mutex::new(None),
        })
    }

    pub fn id(&self) -> u32 {
        self.core
    }

    pub fn inbox(&self) -> &Inbox {
        &self.inbox
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn load(&self) -> usize {
        self.stats.load()
    }

    /// Spawn the worker for this core. Idempotent; the routing handle set by
    /// the first call stays in place for the agent's lifetime.
    pub fn start(self: &Arc<Self>, routing: Weak<RoutingTable>) -> Result<(), Error> {
        let _ = self.routing.set(routing);
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let agent = Arc::clone(self);
        match thread::Builder::new()
            .name(format!("core-{}", self.core))
            .spawn(move || agent.work())
        {
            Ok(handle) => {
                *self.worker.lock() = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                Err(e).context(SpawnWorker { core: self.core })
            }
        }
    }

    /// Stop and join the worker. Idempotent.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.inbox.wake_all();
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
    }

    fn peers(&self) -> Option<Arc<RoutingTable>> {
        self.routing.get().and_then(Weak::upgrade)
    }

    /// Route one message to its destination inbox. Failures are logged and
    /// reported to the caller, never fatal, and there are no retries.
    pub fn send(&self, msg: Message) -> Result<(), Error> {
        let peers = match self.peers() {
            Some(peers) => peers,
            None => {
                error!(
                    "[Core {}] no routing table, dropping {}",
                    self.core, msg.kind
                );
                return NotRunning { core: self.core }.fail();
            }
        };
        if msg.dest_core < 0 || msg.dest_core as usize >= peers.len() {
            error!(
                "[Core {}] destination core {} out of range, {} dropped",
                self.core, msg.dest_core, msg.kind
            );
            return InvalidCore {
                core: msg.dest_core,
                count: peers.len(),
            }
            .fail();
        }
        match peers[msg.dest_core as usize].inbox.push(msg) {
            Ok(()) => {
                self.stats.sent();
                info!(
                    "[MSG] Core {} → Core {}: {}",
                    msg.source_core, msg.dest_core, msg.kind
                );
                Ok(())
            }
            Err(e) => {
                warn!(
                    "[Core {}] {} to core {} dropped: {}",
                    self.core, msg.kind, msg.dest_core, e
                );
                Err(e)
            }
        }
    }

    /// One addressed copy to every other core.
    pub fn broadcast(&self, kind: MessageType, payload: Payload) {
        let count = match self.peers() {
            Some(peers) => peers.len(),
            None => return,
        };
        for dest in 0 .. count {
            if dest as u32 == self.core {
                continue;
            }
            let _ = self.send(Message::new(
                kind,
                self.core as i32,
                dest as i32,
                -1,
                payload,
            ));
        }
    }

    /// Append a fresh READY process to the local table. Used both for direct
    /// placement by the coordinator and for CREATE messages from peers.
    pub fn create_local_process(&self, priority: u8) -> Result<i64, Error> {
        ensure!(self.is_running(), NotRunning { core: self.core });
        let mut table = self.table.lock();
        ensure!(table.len() < MAX_PROCESSES, TableFull { core: self.core });
        let pid = self.pids.next();
        table.push(Pcb::new(pid, self.core, priority));
        self.stats.set_load(table.len());
        drop(table);
        info!(
            "[Core {}] created process {} (priority {})",
            self.core, pid, priority
        );
        Ok(pid)
    }

    /// Hand a local process over to `target`. The MIGRATE message is
    /// enqueued before the local record is removed; delivery stays
    /// best-effort, so a rejected enqueue loses the process and shows up in
    /// the delivery rate rather than as a duplicated pid.
    pub fn migrate_process(&self, pid: i64, target: u32) -> bool {
        let priority = {
            let table = self.table.lock();
            match table.iter().find(|p| p.pid == pid) {
                Some(pcb) => pcb.priority,
                None => return false,
            }
        };
        let payload = Payload::from_text(&format!("priority={}", priority));
        let _ = self.send(Message::new(
            MessageType::Migrate,
            self.core as i32,
            target as i32,
            pid,
            payload,
        ));
        let mut table = self.table.lock();
        if let Some(idx) = table.iter().position(|p| p.pid == pid) {
            table.remove(idx);
            self.stats.set_load(table.len());
        }
        drop(table);
        info!(
            "[Core {}] migrated process {} to core {}",
            self.core, pid, target
        );
        true
    }

    /// Remove a process if it is resident; unknown pids are ignored.
    pub fn terminate_process(&self, pid: i64) {
        let mut table = self.table.lock();
        let before = table.len();
        table.retain(|p| p.pid != pid);
        if table.len() != before {
            self.stats.set_load(table.len());
            info!("[Core {}] terminated process {}", self.core, pid);
        }
    }

    pub fn statistics(&self) -> CoreStatsSnapshot {
        self.stats.snapshot(self.core)
    }

    /// Pids currently resident on this core.
    pub fn pids(&self) -> Vec<i64> {
        self.table.lock().iter().map(|p| p.pid).collect()
    }

    /// Table length and the load gauge, read under one lock so the pair is
    /// consistent. For invariant auditing.
    pub fn audit_load(&self) -> (usize, usize) {
        let table = self.table.lock();
        (table.len(), self.stats.load())
    }

    fn work(&self) {
        info!("[Core {}] kernel instance online", self.core);
        while self.is_running() {
            while let Some(msg) = self.inbox.pop_nonblocking() {
                self.dispatch(msg);
                if !self.is_running() {
                    break;
                }
            }
            if !self.is_running() {
                break;
            }
            self.scheduler_pass();
            // the inter-cycle wait doubles as the wakeup on fresh traffic
            match self.inbox.pop_blocking(QUANTUM) {
                Some(msg) => self.dispatch(msg),
                // a closed inbox means shutdown is in flight
                None if self.inbox.is_closed() => break,
                None => {}
            }
        }
        info!("[Core {}] kernel instance offline", self.core);
    }

    fn dispatch(&self, msg: Message) {
        self.stats.received();
        self.stats
            .latency_sample(msg.sent_at.elapsed().as_micros() as u64);
        match msg.kind {
            MessageType::Create => {
                if let Err(e) = self.create_local_process(msg.payload.priority()) {
                    warn!("[Core {}] remote create failed: {}", self.core, e);
                }
            }
            MessageType::Migrate => self.adopt(msg),
            MessageType::Terminate => self.terminate_process(msg.process_id),
            MessageType::Heartbeat => {
                debug!(
                    "[Core {}] heartbeat from core {}",
                    self.core, msg.source_core
                );
            }
            MessageType::Shutdown => {
                info!("[Core {}] shutdown message received", self.core);
                self.running.store(false, Ordering::SeqCst);
            }
            MessageType::ResourceRequest
            | MessageType::ResourceRelease
            | MessageType::SyncBarrier => {
                debug!(
                    "[Core {}] {} from core {} acknowledged",
                    self.core, msg.kind, msg.source_core
                );
            }
        }
    }

    /// A MIGRATE arrival. The carried pid is adopted unchanged; a pid that
    /// is already resident would duplicate the record, so it is dropped with
    /// a warning instead.
    fn adopt(&self, msg: Message) {
        let mut table = self.table.lock();
        if table.iter().any(|p| p.pid == msg.process_id) {
            warn!(
                "[Core {}] MIGRATE for pid {} which is already resident, dropped",
                self.core, msg.process_id
            );
            return;
        }
        if table.len() >= MAX_PROCESSES {
            warn!(
                "[Core {}] table full, dropping migrated process {}",
                self.core, msg.process_id
            );
            return;
        }
        table.push(Pcb::new(msg.process_id, self.core, msg.payload.priority()));
        self.stats.set_load(table.len());
        drop(table);
        info!(
            "[Core {}] adopted process {} from core {}",
            self.core, msg.process_id, msg.source_core
        );
    }

    fn scheduler_pass(&self) {
        let mut table = self.table.lock();
        let mut rng = self.rng.lock();
        for pcb in table.iter_mut() {
            match pcb.state {
                ProcessState::Ready | ProcessState::Running => {
                    pcb.state = ProcessState::Running;
                }
                ProcessState::Blocked | ProcessState::Terminated => continue,
            }
            pcb.cpu_time += QUANTUM;
            self.stats.executed();
            self.stats.switched();
            if rng.gen_bool(termination_chance(pcb.cpu_time)) {
                pcb.state = ProcessState::Terminated;
                debug!(
                    "[Core {}] process {} finished after {:?} of cpu time",
                    self.core, pcb.pid, pcb.cpu_time
                );
            }
        }
        table.retain(|p| p.state != ProcessState::Terminated);
        self.stats.set_load(table.len());
    }
}

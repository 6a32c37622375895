//!
//! The system coordinator. It owns the agents, freezes the routing table
//! before any worker runs, places new work by load, rebalances it, and folds
//! the per-core counters into one view. Control operations run on the
//! caller's thread; only placement and rebalance decisions are serialized by
//! the balancer mutex, and that mutex is never held across a call into an
//! agent, so an agent calling back into the coordinator cannot deadlock.

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use parking_lot::Mutex;

use crate::core::{
    CoreAgent, Error, Message, MessageType, Payload, PidCounter,
    RoutingTable, SystemSnapshot,
};

pub struct System {
    agents: Arc<RoutingTable>,
    running: AtomicBool,
    balancer: Mutex<()>,
    system_sent: AtomicU64,
}

impl System {
    /// Construct the agents and freeze the routing table. Nothing runs yet;
    /// `start` brings the workers up against the already-complete table.
    pub fn new(cores: usize, seed: u64) -> Self {
        let pids = PidCounter::new();
        let agents: RoutingTable = (0 .. cores)
            .map(|core| {
                CoreAgent::new(
                    core as u32,
                    pids.clone(),
                    seed.wrapping_add(core as u64),
                )
            })
            .collect();
        Self {
            agents: Arc::new(agents),
            running: AtomicBool::new(false),
            balancer: Mutex::new(()),
            system_sent: AtomicU64::new(0),
        }
    }

    pub fn core_count(&self) -> usize {
        self.agents.len()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn agent(&self, core: usize) -> Option<&Arc<CoreAgent>> {
        self.agents.get(core)
    }

    /// Bring up every kernel instance. Idempotent.
    pub fn start(&self) -> Result<(), Error> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        info!(
            "[SYSTEM] starting {} kernel instances",
            self.agents.len()
        );
        for agent in self.agents.iter() {
            agent.start(Arc::downgrade(&self.agents))?;
        }
        Ok(())
    }

    /// Push SHUTDOWN to every inbox, then stop and join every worker.
    /// Idempotent; pending traffic is discarded with the queues.
    pub fn shutdown(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        info!("[SYSTEM] shutdown initiated");
        for agent in self.agents.iter() {
            let msg = Message::system(
                MessageType::Shutdown,
                agent.id() as i32,
                -1,
                Payload::empty(),
            );
            if agent.inbox().push(msg).is_ok() {
                self.system_sent.fetch_add(1, Ordering::Relaxed);
            }
        }
        for agent in self.agents.iter() {
            agent.stop();
        }
        info!("[SYSTEM] all cores stopped");
    }

    /// Place a new process on the least-loaded core and return its pid, or
    /// -1 when the system is not running. The dashboard boundary consumes
    /// sentinels, not Results.
    pub fn create_process(&self, priority: u8) -> i64 {
        if !self.is_running() || self.agents.is_empty() {
            warn!("[SYSTEM] create_process refused, system not running");
            return -1;
        }
        let target = {
            let _placement = self.balancer.lock();
            self.least_loaded_core()
        };
        match self.agents[target].create_local_process(priority) {
            Ok(pid) => pid,
            Err(e) => {
                warn!("[SYSTEM] create_process failed: {}", e);
                -1
            }
        }
    }

    /// Index with the minimum current load; ties go to the lowest index.
    pub fn least_loaded_core(&self) -> usize {
        self.agents
            .iter()
            .enumerate()
            .min_by_key(|(core, agent)| (agent.load(), *core))
            .map(|(core, _)| core)
            .unwrap_or(0)
    }

    /// Delegate a handoff to the source agent. False for bad indices or a
    /// pid the source does not hold.
    pub fn migrate_process(&self, pid: i64, source: usize, target: usize) -> bool {
        if !self.is_running() {
            return false;
        }
        let count = self.agents.len();
        if source >= count || target >= count || source == target {
            warn!(
                "[SYSTEM] migrate_process({}, {}, {}) rejected, bad core indices",
                pid, source, target
            );
            return false;
        }
        self.agents[source].migrate_process(pid, target as u32)
    }

    /// Find which core currently holds `pid`, if any.
    pub fn locate(&self, pid: i64) -> Option<usize> {
        self.agents.iter().position(|a| a.pids().contains(&pid))
    }

    /// One rebalance pass: pair cores above 1.5x the mean load with cores
    /// below 0.7x of it, then shift one process per pair. The intents are
    /// computed under the balancer mutex, the migrations run after it is
    /// released.
    pub fn balance_load(&self) {
        if !self.is_running() {
            return;
        }
        let intents: Vec<(usize, usize)> = {
            let _rebalance = self.balancer.lock();
            let loads: Vec<usize> =
                self.agents.iter().map(|a| a.load()).collect();
            let total: usize = loads.iter().sum();
            let avg = total as f64 / loads.len() as f64;
            loads
                .iter()
                .enumerate()
                .filter(|(_, load)| (**load as f64) > avg * 1.5)
                .filter_map(|(source, _)| {
                    loads
                        .iter()
                        .position(|&load| (load as f64) < avg * 0.7)
                        .map(|target| (source, target))
                })
                .filter(|(source, target)| source != target)
                .collect()
        };
        for (source, target) in intents {
            info!(
                "[LOAD BALANCER] core {} over the load threshold, shifting one process to core {}",
                source, target
            );
            if let Some(pid) = self.agents[source].pids().first().copied() {
                self.migrate_process(pid, source, target);
            }
        }
    }

    /// HEARTBEAT broadcast from core 0 to every peer.
    pub fn heartbeat_fanout(&self) {
        if !self.is_running() {
            return;
        }
        info!("[SYSTEM] heartbeat fanout from core 0");
        if let Some(agent) = self.agents.first() {
            agent.broadcast(MessageType::Heartbeat, Payload::empty());
        }
    }

    /// A scripted request/release exchange, enough to push both resource
    /// message kinds through the transport.
    pub fn resource_demo(&self) {
        if !self.is_running() || self.agents.len() < 2 {
            return;
        }
        info!("[SYSTEM] resource request/release demo between cores 1 and 0");
        let payload = Payload::from_text("resource=shared_buffer");
        let requester = &self.agents[1];
        let _ = requester.send(Message::new(
            MessageType::ResourceRequest,
            1,
            0,
            -1,
            payload,
        ));
        let _ = requester.send(Message::new(
            MessageType::ResourceRelease,
            1,
            0,
            -1,
            payload,
        ));
    }

    pub fn statistics(&self) -> SystemSnapshot {
        SystemSnapshot::collect(
            self.agents.iter().map(|a| a.statistics()).collect(),
            self.system_sent.load(Ordering::Relaxed),
        )
    }

    pub fn comm_overhead_pct(&self) -> f64 {
        self.statistics().comm_overhead_pct
    }

    pub fn delivery_rate_pct(&self) -> f64 {
        self.statistics().delivery_rate_pct
    }
}

impl Drop for System {
    fn drop(&mut self) {
        self.shutdown();
    }
}

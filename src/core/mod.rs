//!
//! core contains the per-core kernel runtime and the coordinator that owns
//! it: messages and their bounded inboxes, process records, the kernel
//! agents, and the system-wide placement and balancing logic.

use std::time::Duration;

use snafu::Snafu;

mod agent;
mod inbox;
mod message;
mod process;
mod stats;
mod system;

pub use agent::{CoreAgent, RoutingTable};
pub use inbox::Inbox;
pub use message::{Message, MessageType, Payload};
pub use process::{Pcb, PidCounter, ProcessState};
pub use stats::{CoreStatsSnapshot, SystemSnapshot};
pub use system::System;

pub(crate) use process::termination_chance;

/// number of simulated cores when not overridden on the command line
pub const CORE_COUNT: usize = 8;
/// hard bound on per-core inbox occupancy
pub const MESSAGE_QUEUE_SIZE: usize = 100;
/// payload capacity of a single message in bytes
pub const MAX_PAYLOAD: usize = 512;
/// capacity of one core's process table
pub const MAX_PROCESSES: usize = 64;
/// simulated CPU time charged per scheduler pass, also the inter-cycle wait
pub const QUANTUM: Duration = Duration::from_millis(50);
/// priority assumed when a payload carries none, or one that fails to parse
pub const DEFAULT_PRIORITY: u8 = 5;

/// Errors for the kernel runtime.
#[derive(Debug, Snafu)]
#[snafu(visibility = "pub(crate)")]
pub enum Error {
    #[snafu(display("Core {} does not exist in a {}-core system", core, count))]
    InvalidCore { core: i32, count: usize },
    #[snafu(display("Inbox on core {} is at capacity", core))]
    InboxFull { core: u32 },
    #[snafu(display("Process table on core {} is full", core))]
    TableFull { core: u32 },
    #[snafu(display("Core {} is not running", core))]
    NotRunning { core: u32 },
    #[snafu(display("Failed to spawn the worker for core {}: {}", core, source))]
    SpawnWorker { core: u32, source: std::io::Error },
}

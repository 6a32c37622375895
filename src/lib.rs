//! Userspace simulation of a multikernel operating system: a fixed set of
//! per-core kernel instances that share no mutable state and coordinate
//! exclusively through asynchronous message passing. The `core` module holds
//! the per-core runtime and the coordinator that owns it; `smp` is the
//! contrasting shared-memory baseline that runs the same workload under a
//! single global lock so the cost of contention stays observable.

#[macro_use]
extern crate log;

pub mod core;
pub mod environment;
pub mod logger;
pub mod smp;

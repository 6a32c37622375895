#[macro_use]
extern crate log;

use std::{thread, time::Duration};

use structopt::StructOpt;

use multikern::{
    core::{System, DEFAULT_PRIORITY},
    environment::MultikernCliArgs,
    logger,
    smp::SmpSystem,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = MultikernCliArgs::from_args();
    logger::init("INFO");

    info!(
        "[SYSTEM] multikern starting: {} cores, {} scripted processes",
        args.cores, args.processes
    );
    let system = System::new(args.cores, args.seed);
    system.start()?;

    for i in 0 .. args.processes {
        let priority = (i % 10 + 1) as u8;
        system.create_process(priority);
    }

    // one scripted handoff so the migration path shows up in the statistics
    let pid = system.create_process(DEFAULT_PRIORITY);
    if pid >= 0 {
        if let Some(source) = system.locate(pid) {
            let target = (source + args.cores / 2) % args.cores;
            system.migrate_process(pid, source, target);
        }
    }

    system.heartbeat_fanout();
    system.resource_demo();

    for _ in 0 .. args.duration {
        thread::sleep(Duration::from_secs(1));
        system.balance_load();
    }

    let snapshot = system.statistics();
    println!("core   sent   recv   exec  switch  lat_us  load");
    for core in &snapshot.cores {
        println!(
            "{:>4} {:>6} {:>6} {:>6} {:>7} {:>7} {:>5}",
            core.core,
            core.messages_sent,
            core.messages_received,
            core.processes_executed,
            core.context_switches,
            core.msg_latency_us,
            core.current_load
        );
    }
    println!(
        "communication overhead {:.1}%, delivery rate {:.1}%",
        snapshot.comm_overhead_pct, snapshot.delivery_rate_pct
    );
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    system.shutdown();

    if !args.skip_smp {
        info!("[SMP] running the shared-memory baseline for contrast");
        let smp = SmpSystem::new(args.cores, args.seed);
        smp.start()?;
        for i in 0 .. args.processes {
            smp.create_process((i % 10 + 1) as u8);
        }
        thread::sleep(Duration::from_secs(args.duration));
        let contrast = smp.statistics();
        smp.shutdown();
        println!(
            "smp baseline: {} lock contentions, {} cache invalidations, {} executions",
            contrast.lock_contentions,
            contrast.cache_invalidations,
            contrast.processes_executed
        );
        println!(
            "multikernel paid {:.1}% messaging overhead where the baseline paid {} global lock acquires",
            snapshot.comm_overhead_pct, contrast.lock_contentions
        );
    }

    Ok(())
}

use std::{thread, time::Duration};

pub mod common;

// Four threads hammer balance_load while the main thread samples the core
// invariants: a pid lives in at most one table, and every load gauge matches
// its table. No deadlock, no panic, and the schedulers keep making progress.
#[test]
fn concurrent_balancing_holds_invariants() {
    let system = common::started(8, 5);
    for _ in 0 .. 40 {
        system.create_process(5);
    }
    let before = system.statistics().processes_executed_total;

    crossbeam::thread::scope(|scope| {
        for _ in 0 .. 4 {
            scope.spawn(|_| {
                for _ in 0 .. 100 {
                    system.balance_load();
                }
            });
        }

        for _ in 0 .. 50 {
            let mut resident = Vec::new();
            for core in 0 .. 8 {
                let agent = system.agent(core).unwrap();
                let (table_len, gauge) = agent.audit_load();
                assert_eq!(
                    table_len, gauge,
                    "core {} load gauge diverged from its table",
                    core
                );
                resident.extend(agent.pids());
            }
            let mut dedup = resident.clone();
            dedup.sort_unstable();
            dedup.dedup();
            assert_eq!(
                dedup.len(),
                resident.len(),
                "a pid appeared in two tables at once"
            );
            system.create_process(5);
            thread::sleep(Duration::from_millis(5));
        }
    })
    .unwrap();

    let after = system.statistics().processes_executed_total;
    assert!(after > before, "schedulers stalled while balancing ran");
    system.shutdown();
}

#[test]
fn balancing_an_even_system_is_a_no_op() {
    let system = common::started(4, 31);
    let before = system.statistics().messages_sent_total;
    system.balance_load();
    assert_eq!(system.statistics().messages_sent_total, before);
    system.shutdown();
}

use std::time::{Duration, Instant};

use multikern::core::System;

pub mod common;

#[test]
fn start_and_shutdown_are_idempotent_and_bounded() {
    common::init();
    let system = System::new(8, 1);
    // refusals before start
    assert_eq!(system.create_process(5), -1);
    assert!(!system.migrate_process(0, 0, 1));

    system.start().unwrap();
    system.start().unwrap(); // second start is a no-op
    let pid = system.create_process(5);
    assert!(pid >= 0);
    system.heartbeat_fanout();

    let begin = Instant::now();
    system.shutdown();
    system.shutdown();
    assert!(
        begin.elapsed() < Duration::from_secs(5),
        "shutdown must be bounded"
    );
    assert!(!system.is_running());
    for core in 0 .. 8 {
        assert!(!system.agent(core).unwrap().is_running());
    }

    // refusals after shutdown
    assert_eq!(system.create_process(5), -1);
    assert!(!system.migrate_process(pid, 0, 1));
}

#[test]
fn pids_are_unique_and_monotone() {
    let system = common::started(4, 77);
    let mut pids = Vec::new();
    for _ in 0 .. 20 {
        let pid = system.create_process(5);
        assert!(pid >= 0);
        pids.push(pid);
    }
    for pair in pids.windows(2) {
        assert!(pair[1] > pair[0], "pids must increase monotonically");
    }
    system.shutdown();
}

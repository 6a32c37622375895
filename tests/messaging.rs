use std::time::Duration;

use assert_matches::assert_matches;

use multikern::core::{
    Error, Message, MessageType, Payload, System, MESSAGE_QUEUE_SIZE,
};

pub mod common;

fn heartbeat(dest: i32, seq: i64) -> Message {
    Message::system(MessageType::Heartbeat, dest, seq, Payload::empty())
}

#[test]
fn heartbeat_fanout_reaches_every_peer() {
    let system = common::started(8, 11);
    system.heartbeat_fanout();
    let snapshot = common::retry(100, Duration::from_millis(10), || {
        let snapshot = system.statistics();
        if snapshot.messages_received_total >= 7 {
            Ok(snapshot)
        } else {
            Err("fanout not fully drained")
        }
    });
    assert_eq!(snapshot.cores[0].messages_sent, 7);
    for core in &snapshot.cores[1 ..] {
        assert_eq!(
            core.messages_received, 1,
            "core {} should have seen exactly one heartbeat",
            core.core
        );
    }
    assert_eq!(snapshot.delivery_rate_pct, 100.0);
    system.shutdown();
}

#[test]
fn resource_demo_round_trips() {
    let system = common::started(4, 13);
    system.resource_demo();
    let snapshot = common::retry(100, Duration::from_millis(10), || {
        let snapshot = system.statistics();
        if snapshot.cores[0].messages_received >= 2 {
            Ok(snapshot)
        } else {
            Err("request/release not drained")
        }
    });
    assert_eq!(snapshot.cores[1].messages_sent, 2);
    assert_eq!(snapshot.delivery_rate_pct, 100.0);
    system.shutdown();
}

#[test]
fn barrier_traffic_is_absorbed() {
    let system = common::started(2, 19);
    let sender = system.agent(1).unwrap();
    sender
        .send(Message::new(
            MessageType::SyncBarrier,
            1,
            0,
            -1,
            Payload::empty(),
        ))
        .unwrap();
    common::retry(100, Duration::from_millis(10), || {
        if system.agent(0).unwrap().statistics().messages_received >= 1 {
            Ok(())
        } else {
            Err("barrier not consumed")
        }
    });
    system.shutdown();
}

#[test]
fn create_messages_spawn_remote_processes() {
    let system = common::started(2, 23);
    let sender = system.agent(1).unwrap();
    sender
        .send(Message::new(
            MessageType::Create,
            1,
            0,
            -1,
            Payload::from_text("priority=7"),
        ))
        .unwrap();
    // the created process is executed at least once even if it terminates in
    // its first pass
    common::retry(100, Duration::from_millis(10), || {
        if system.agent(0).unwrap().statistics().processes_executed >= 1 {
            Ok(())
        } else {
            Err("remote create never executed")
        }
    });
    system.shutdown();
}

#[test]
fn out_of_range_destinations_are_reported() {
    let system = common::started(4, 29);
    let sender = system.agent(0).unwrap();
    let result = sender.send(Message::new(
        MessageType::Heartbeat,
        0,
        99,
        -1,
        Payload::empty(),
    ));
    assert_matches!(result, Err(Error::InvalidCore { .. }));
    assert_eq!(system.statistics().messages_sent_total, 0);
    system.shutdown();
}

#[test]
fn inbox_backpressure_is_visible_to_the_sender() {
    common::init();
    // not started: nothing drains, so the queue can actually fill
    let system = System::new(4, 17);
    let agent = system.agent(3).unwrap();
    for seq in 0 .. MESSAGE_QUEUE_SIZE as i64 {
        agent.inbox().push(heartbeat(3, seq)).unwrap();
    }
    assert_matches!(
        agent.inbox().push(heartbeat(3, 100)),
        Err(Error::InboxFull { .. })
    );
    assert_eq!(agent.statistics().messages_received, 0);

    // the system still comes up and drains the backlog
    system.start().unwrap();
    common::retry(100, Duration::from_millis(10), || {
        let received = agent.statistics().messages_received;
        if received == MESSAGE_QUEUE_SIZE as u64 {
            Ok(())
        } else {
            Err(format!("only {} of the backlog drained", received))
        }
    });
    system.shutdown();
}

#[test]
fn malformed_priority_payloads_fall_back_to_the_default() {
    common::init();
    assert_eq!(Payload::from_text("priority=7").priority(), 7);
    assert_eq!(Payload::from_text("priority=banana").priority(), 5);
    assert_eq!(Payload::from_text("priority=99").priority(), 5);
    assert_eq!(Payload::from_text("resource=x").priority(), 5);
    assert_eq!(Payload::empty().priority(), 5);
    assert_eq!(
        Payload::from_text("resource=shared_buffer priority=3").field("resource"),
        Some("shared_buffer")
    );
}

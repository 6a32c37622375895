//!
//! Bounded FIFO mailbox feeding exactly one core. Senders never block: a
//! push against a full queue is rejected on the spot and the sender decides
//! what to do with the loss. The consumer may park on the queue with a
//! timeout; `wake_all` releases it at shutdown. One mutex and one condition
//! variable per inbox, held only for the duration of an enqueue, dequeue or
//! signal.

use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};
use snafu::ensure;

use crate::core::{Error, InboxFull, Message};

struct Waiting {
    queue: VecDeque<Message>,
    closed: bool,
}

pub struct Inbox {
    core: u32,
    capacity: usize,
    state: Mutex<Waiting>,
    cvar: Condvar,
}

impl Inbox {
    pub fn new(core: u32, capacity: usize) -> Self {
        Self {
            core,
            capacity,
            state: Mutex::new(Waiting {
                queue: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            cvar: Condvar::new(),
        }
    }

    /// Deliver one message. Fails fast when occupancy equals capacity; the
    /// queue itself is never silently shortened.
    pub fn push(&self, msg: Message) -> Result<(), Error> {
        let mut state = self.state.lock();
        ensure!(state.queue.len() < self.capacity, InboxFull { core: self.core });
        state.queue.push_back(msg);
        drop(state);
        self.cvar.notify_one();
        Ok(())
    }

    pub fn pop_nonblocking(&self) -> Option<Message> {
        self.state.lock().queue.pop_front()
    }

    /// Wait at most `timeout` for a message. A zero timeout degenerates to a
    /// poll. `None` on timeout, or right away once the inbox has been closed.
    pub fn pop_blocking(&self, timeout: Duration) -> Option<Message> {
        if timeout.is_zero() {
            return self.pop_nonblocking();
        }
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            if let Some(msg) = state.queue.pop_front() {
                return Some(msg);
            }
            if state.closed {
                return None;
            }
            if self.cvar.wait_until(&mut state, deadline).timed_out() {
                return state.queue.pop_front();
            }
        }
    }

    /// Close the inbox and release a blocked consumer. Anything still queued
    /// is discarded with the queue at shutdown.
    pub fn wake_all(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        self.cvar.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn occupancy(&self) -> usize {
        self.state.lock().queue.len()
    }
}

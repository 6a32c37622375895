use std::{fmt, str, time::Instant};

use crate::core::{DEFAULT_PRIORITY, MAX_PAYLOAD};

/// The kinds of inter-core traffic the transport carries. Broadcast has no
/// kind of its own, it is modeled as one addressed copy per peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageType {
    Create,
    Migrate,
    Terminate,
    ResourceRequest,
    ResourceRelease,
    SyncBarrier,
    Heartbeat,
    Shutdown,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            MessageType::Create => "CREATE",
            MessageType::Migrate => "MIGRATE",
            MessageType::Terminate => "TERMINATE",
            MessageType::ResourceRequest => "RESOURCE_REQUEST",
            MessageType::ResourceRelease => "RESOURCE_RELEASE",
            MessageType::SyncBarrier => "SYNC_BARRIER",
            MessageType::Heartbeat => "HEARTBEAT",
            MessageType::Shutdown => "SHUTDOWN",
        })
    }
}

/// Fixed-size payload buffer carrying `key=value` text. Messages are copied
/// on send, so the buffer never aliases sender state.
#[derive(Clone, Copy)]
pub struct Payload {
    buf: [u8; MAX_PAYLOAD],
    len: usize,
}

impl Payload {
    pub fn empty() -> Self {
        Self {
            buf: [0; MAX_PAYLOAD],
            len: 0,
        }
    }

    /// Build a payload from text, truncating at capacity on a character
    /// boundary.
    pub fn from_text(text: &str) -> Self {
        let mut len = text.len().min(MAX_PAYLOAD);
        while len > 0 && !text.is_char_boundary(len) {
            len -= 1;
        }
        let mut buf = [0u8; MAX_PAYLOAD];
        buf[.. len].copy_from_slice(&text.as_bytes()[.. len]);
        Self { buf, len }
    }

    pub fn as_str(&self) -> &str {
        str::from_utf8(&self.buf[.. self.len]).unwrap_or("")
    }

    /// Look up one `key=value` field in the payload text.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.as_str().split_whitespace().find_map(|kv| {
            let (k, v) = kv.split_once('=')?;
            if k == key {
                Some(v)
            } else {
                None
            }
        })
    }

    /// Parse `priority=<n>`. Missing, malformed or out-of-range values fall
    /// back to the default priority.
    pub fn priority(&self) -> u8 {
        self.field("priority")
            .and_then(|v| v.parse::<u8>().ok())
            .filter(|p| *p <= 10)
            .unwrap_or(DEFAULT_PRIORITY)
    }
}

impl Default for Payload {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Payload({:?})", self.as_str())
    }
}

/// One unit of inter-core traffic, copied on send.
#[derive(Clone, Copy, Debug)]
pub struct Message {
    /// sending core, -1 when the coordinator itself is the origin
    pub source_core: i32,
    pub dest_core: i32,
    pub kind: MessageType,
    /// related pid, -1 when not applicable
    pub process_id: i64,
    pub payload: Payload,
    /// stamped by the sender at enqueue time; receivers read it only for
    /// latency accounting
    pub sent_at: Instant,
}

impl Message {
    pub fn new(
        kind: MessageType,
        source_core: i32,
        dest_core: i32,
        process_id: i64,
        payload: Payload,
    ) -> Self {
        Self {
            source_core,
            dest_core,
            kind,
            process_id,
            payload,
            sent_at: Instant::now(),
        }
    }

    /// A message originating from the coordinator rather than a core.
    pub fn system(
        kind: MessageType,
        dest_core: i32,
        process_id: i64,
        payload: Payload,
    ) -> Self {
        Self::new(kind, -1, dest_core, process_id, payload)
    }
}

use std::sync::Mutex;

use heapless::Deque;
use tracing::warn;

use crate::canbus::BusFrame;
use crate::someip::SomeIpMessage;

/// Bound on the detection inbox; the oldest message is evicted when full.
pub const INBOX_CAPACITY: usize = 64;

#[derive(Debug)]
struct StoreInner {
    latest_frame: Option<BusFrame>,
    inbox: Deque<SomeIpMessage, INBOX_CAPACITY>,
    dropped_messages: u64,
}

impl Default for StoreInner {
    fn default() -> Self {
        Self {
            latest_frame: None,
            inbox: Deque::new(),
            dropped_messages: 0,
        }
    }
}

/// Consistency-protected region shared by all ingestion tasks and the
/// simulation core.
///
/// One mutex guards both the latest bus frame and the detection inbox so
/// the per-tick snapshot (frame take plus at-most-one inbox pop) is a
/// single critical section. Callers must not hold the lock across blocking
/// I/O; every operation here is a short in-memory transaction.
#[derive(Debug, Default)]
pub struct SharedStore {
    inner: Mutex<StoreInner>,
}

impl SharedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest-value write from bus ingestion: replaces any unread frame.
    pub fn put_frame(&self, frame: BusFrame) {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        inner.latest_frame = Some(frame);
    }

    /// FIFO append from the datagram receiver, evicting the oldest message
    /// when the inbox is full.
    pub fn push_message(&self, message: SomeIpMessage) {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        if inner.inbox.is_full() {
            inner.inbox.pop_front();
            inner.dropped_messages += 1;
            warn!(
                dropped = inner.dropped_messages,
                "detection inbox full, evicted oldest message"
            );
        }
        // A slot is guaranteed free at this point.
        let _ = inner.inbox.push_back(message);
    }

    /// Per-tick snapshot for the simulation core: clears and returns the
    /// latest frame and pops the oldest pending message, atomically.
    pub fn snapshot(&self) -> (Option<BusFrame>, Option<SomeIpMessage>) {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let frame = inner.latest_frame.take();
        let message = inner.inbox.pop_front();
        (frame, message)
    }

    pub fn pending_messages(&self) -> usize {
        self.inner.lock().expect("store lock poisoned").inbox.len()
    }

    pub fn dropped_messages(&self) -> u64 {
        self.inner.lock().expect("store lock poisoned").dropped_messages
    }
}

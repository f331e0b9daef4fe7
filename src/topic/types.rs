//! Topic types.

use std::collections::BTreeSet;
use std::time::Instant;

/// One published change: the keys that changed together.
#[derive(Clone, Debug)]
pub struct TopicEvent {
    /// Position in the topic, 1-based and contiguous.
    pub id: u64,
    /// Changed keys. Never empty.
    pub keys: BTreeSet<String>,
    /// When the event was published.
    pub timestamp: Instant,
}

/// Result of a successful receive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Received {
    /// Highest id covered by `keys`. Pass it to the next receive.
    pub id: u64,
    /// Union of the keys of every event after the requested id.
    pub keys: BTreeSet<String>,
}

impl Received {
    /// Whether `key` changed.
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }
}

/// Point-in-time view of the topic counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TopicStats {
    pub last_id: u64,
    /// Id of the newest pruned event. A receive with `since` below it is stale.
    pub earliest_valid_id: u64,
    pub retained_events: usize,
}

//! Append-only change log with blocking readers.

use crate::error::{AutoupdateError, Result};
use crate::signal::Signal;
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use std::collections::{BTreeSet, VecDeque};
use std::time::Instant;

use super::types::{Received, TopicEvent, TopicStats};

/// Mutable topic state, guarded by one lock.
struct TopicState {
    /// Highest assigned id (0 = nothing published yet).
    last_id: u64,

    /// Readers asking for changes since an id below this get a stale error.
    earliest_valid_id: u64,

    /// Retained events, oldest first, ids contiguous.
    events: VecDeque<TopicEvent>,

    /// Wake channel of the current generation. Replacing the sender
    /// disconnects every receiver cloned before the replacement.
    wake_tx: Sender<()>,
    wake_rx: Receiver<()>,
}

impl TopicState {
    /// Union of the keys of every retained event with `id > since`.
    fn collect_since(&self, since: u64) -> Received {
        let start = self.events.partition_point(|event| event.id <= since);
        let keys: BTreeSet<String> = self
            .events
            .range(start..)
            .flat_map(|event| event.keys.iter().cloned())
            .collect();

        Received {
            id: self.last_id,
            keys,
        }
    }

    /// Start a new wake generation, waking everybody waiting on the old one.
    fn wake_all(&mut self) {
        let (wake_tx, wake_rx) = bounded(0);
        self.wake_tx = wake_tx;
        self.wake_rx = wake_rx;
    }
}

/// In-memory, prunable log of changed-key events.
///
/// Any number of threads may call [`receive`](Topic::receive) concurrently.
/// [`publish`](Topic::publish) and [`prune`](Topic::prune) are serialized by
/// the same lock that readers use to check for new data, so a reader that
/// starts waiting before a publish always sees it.
pub struct Topic {
    state: Mutex<TopicState>,

    /// Shutdown signal. Once fired, waiting readers return `Closed`.
    closed: Signal,
}

impl Topic {
    /// Create an empty topic that closes when `closed` fires.
    pub fn new(closed: Signal) -> Self {
        let (wake_tx, wake_rx) = bounded(0);

        Self {
            state: Mutex::new(TopicState {
                last_id: 0,
                earliest_valid_id: 0,
                events: VecDeque::new(),
                wake_tx,
                wake_rx,
            }),
            closed,
        }
    }

    /// Append one event holding `keys` and wake every waiting reader.
    ///
    /// Returns the new id, or `None` if `keys` is empty (nothing is
    /// published then).
    pub fn publish<I, S>(&self, keys: I) -> Option<u64>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys: BTreeSet<String> = keys.into_iter().map(Into::into).collect();
        if keys.is_empty() {
            return None;
        }

        let mut state = self.state.lock();
        state.last_id += 1;
        let id = state.last_id;
        let key_count = keys.len();

        state.events.push_back(TopicEvent {
            id,
            keys,
            timestamp: Instant::now(),
        });
        state.wake_all();
        drop(state);

        tracing::debug!(id, keys = key_count, "published topic event");
        Some(id)
    }

    /// Highest id published so far. Never blocks on readers.
    pub fn last_id(&self) -> u64 {
        self.state.lock().last_id
    }

    /// Wait for changes after `since`.
    ///
    /// Returns immediately if events newer than `since` exist; otherwise
    /// blocks until the next publish, until `signal` fires
    /// (`Cancelled`) or until the topic is closed (`Closed`). Fails with
    /// `StaleId` if the events after `since` were already pruned.
    pub fn receive(&self, since: u64, signal: &Signal) -> Result<Received> {
        loop {
            let wake = {
                let state = self.state.lock();

                if since < state.earliest_valid_id {
                    return Err(AutoupdateError::StaleId {
                        since,
                        earliest: state.earliest_valid_id,
                    });
                }

                if state.last_id > since {
                    return Ok(state.collect_since(since));
                }

                if self.closed.is_fired() {
                    return Err(AutoupdateError::Closed);
                }
                if signal.is_fired() {
                    return Err(AutoupdateError::Cancelled);
                }

                state.wake_rx.clone()
            };

            let signal_deadline = signal.deadline_channel();
            let closed_deadline = self.closed.deadline_channel();

            crossbeam_channel::select! {
                recv(wake) -> _ => {
                    tracing::trace!(since, "topic reader woke up");
                }
                recv(signal.receiver()) -> _ => return Err(AutoupdateError::Cancelled),
                recv(signal_deadline) -> _ => return Err(AutoupdateError::Cancelled),
                recv(self.closed.receiver()) -> _ => return Err(AutoupdateError::Closed),
                recv(closed_deadline) -> _ => return Err(AutoupdateError::Closed),
            }
        }
    }

    /// Drop every event published before `before`.
    ///
    /// Afterwards readers asking for changes since an id older than the
    /// newest dropped event get `StaleId`. Returns the number of dropped
    /// events.
    pub fn prune(&self, before: Instant) -> usize {
        let mut state = self.state.lock();

        let mut removed = 0;
        let mut newest_removed = None;
        while let Some(event) = state.events.front() {
            if event.timestamp >= before {
                break;
            }
            newest_removed = Some(event.id);
            state.events.pop_front();
            removed += 1;
        }

        if let Some(id) = newest_removed {
            state.earliest_valid_id = state.earliest_valid_id.max(id);
            tracing::info!(
                removed,
                earliest_valid_id = state.earliest_valid_id,
                "pruned topic"
            );
        }

        removed
    }

    /// Whether the shutdown signal fired.
    pub fn is_closed(&self) -> bool {
        self.closed.is_fired()
    }

    /// Current counters.
    pub fn stats(&self) -> TopicStats {
        let state = self.state.lock();
        TopicStats {
            last_id: state.last_id,
            earliest_valid_id: state.earliest_valid_id,
            retained_events: state.events.len(),
        }
    }
}

impl Default for Topic {
    fn default() -> Self {
        Self::new(Signal::never())
    }
}

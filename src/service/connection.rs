//! Per-client cursor over the topic.

use crate::error::{AutoupdateError, Result};
use crate::keys::KeysBuilder;
use crate::restrict::RestrictionGate;
use crate::signal::Signal;
use crate::topic::{Received, Topic};
use crate::types::{full_update_key, DataMap, UserId};
use std::collections::BTreeSet;
use std::sync::Arc;

/// A client's view of the service. Created by
/// [`Autoupdate::connect`](super::Autoupdate::connect).
pub struct Connection {
    topic: Arc<Topic>,
    gate: RestrictionGate,
    uid: UserId,
    kb: Box<dyn KeysBuilder>,

    /// Topic id the last returned data is based on. `None` until the first
    /// full update, and again after the topic dropped our history.
    tid: Option<u64>,
}

impl Connection {
    pub(crate) fn new(
        topic: Arc<Topic>,
        gate: RestrictionGate,
        uid: UserId,
        kb: Box<dyn KeysBuilder>,
    ) -> Self {
        Self {
            topic,
            gate,
            uid,
            kb,
            tid: None,
        }
    }

    /// User this connection restricts data for.
    pub fn uid(&self) -> UserId {
        self.uid
    }

    /// Topic id of the last data returned by `next`.
    pub fn last_seen_id(&self) -> Option<u64> {
        self.tid
    }

    /// Next batch of restricted data.
    ///
    /// The first call returns every key of interest. Later calls block until
    /// a key of interest changes and return only those keys; a full-update
    /// marker for this user (or for all users) returns every key again.
    /// If the connection fell behind the pruned topic history, it silently
    /// returns a full update instead.
    ///
    /// Returns `Cancelled` when `signal` fires and `Closed` when the service
    /// shuts down.
    pub fn next(&mut self, signal: &Signal) -> Result<DataMap> {
        loop {
            let since = match self.tid {
                Some(tid) => tid,
                None => return self.full_update(signal),
            };

            let received = match self.topic.receive(since, signal) {
                Ok(received) => received,
                Err(AutoupdateError::StaleId { since, earliest }) => {
                    tracing::debug!(
                        uid = %self.uid,
                        since,
                        earliest,
                        "connection fell behind the topic, sending full update"
                    );
                    self.tid = None;
                    continue;
                }
                Err(err) => return Err(err),
            };

            let keys = self.current_keys(signal)?;
            let keys: Vec<String> = if self.is_full_update(&received) {
                keys
            } else {
                keys.into_iter().filter(|key| received.contains(key)).collect()
            };

            if keys.is_empty() {
                self.tid = Some(received.id);
                continue;
            }

            let data = self.gate.restricted_data(self.uid, &keys)?;
            self.tid = Some(received.id);
            return Ok(data);
        }
    }

    /// Restricted data for every key of interest.
    fn full_update(&mut self, signal: &Signal) -> Result<DataMap> {
        // Read the id before the data: a change in between is then reported
        // again by the next receive instead of being lost.
        let tid = self.topic.last_id();

        let keys = self.current_keys(signal)?;
        let data = self.gate.restricted_data(self.uid, &keys)?;

        self.tid = Some(tid);
        Ok(data)
    }

    /// Deduplicated keys of interest, in a stable order.
    fn current_keys(&mut self, signal: &Signal) -> Result<Vec<String>> {
        let keys = self
            .kb
            .keys(signal)
            .map_err(|source| AutoupdateError::Keys {
                uid: self.uid,
                source,
            })?;

        Ok(keys
            .into_iter()
            .collect::<BTreeSet<String>>()
            .into_iter()
            .collect())
    }

    fn is_full_update(&self, received: &Received) -> bool {
        received.contains(&full_update_key(self.uid))
            || received.contains(&full_update_key(UserId::ALL))
    }
}

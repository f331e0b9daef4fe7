//! Autoupdate service tying datastore, restricter and topic together.

use crate::config::AutoupdateConfig;
use crate::datastore::Datastore;
use crate::error::{AutoupdateError, BoxError, Result};
use crate::keys::KeysBuilder;
use crate::restrict::{Restricter, RestrictionGate};
use crate::signal::Signal;
use crate::topic::Topic;
use crate::types::{full_update_key, ChangedData, DataMap, UserId, Value};
use crate::updater::UserUpdater;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::connection::Connection;

/// The autoupdate service.
///
/// Created with [`Autoupdate::new`]; runs until the `closed` signal passed
/// there fires.
pub struct Autoupdate {
    topic: Arc<Topic>,
    gate: RestrictionGate,
    config: AutoupdateConfig,

    /// Background maintenance threads.
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Autoupdate {
    /// Create the service with the default configuration.
    pub fn new(
        datastore: Arc<dyn Datastore>,
        restricter: Arc<dyn Restricter>,
        user_updater: Arc<dyn UserUpdater>,
        closed: Signal,
    ) -> Result<Self> {
        Self::with_config(
            datastore,
            restricter,
            user_updater,
            closed,
            AutoupdateConfig::default(),
        )
    }

    /// Create the service.
    ///
    /// Starts the prune and cache-reset threads, then registers a change
    /// listener on `datastore`. Both threads stop when `closed` fires, which
    /// also wakes every blocked connection.
    pub fn with_config(
        datastore: Arc<dyn Datastore>,
        restricter: Arc<dyn Restricter>,
        user_updater: Arc<dyn UserUpdater>,
        closed: Signal,
        config: AutoupdateConfig,
    ) -> Result<Self> {
        config.validate()?;

        let topic = Arc::new(Topic::new(closed.clone()));

        let mut workers = Vec::with_capacity(2);

        {
            let topic = Arc::clone(&topic);
            let closed = closed.clone();
            let interval = config.prune_interval;
            let retention = config.prune_retention;
            workers.push(
                thread::Builder::new()
                    .name("autoupdate-prune".to_string())
                    .spawn(move || prune_loop(&topic, &closed, interval, retention))?,
            );
        }

        {
            let topic = Arc::clone(&topic);
            let datastore = Arc::clone(&datastore);
            let interval = config.cache_reset_interval;
            workers.push(
                thread::Builder::new()
                    .name("autoupdate-cache-reset".to_string())
                    .spawn(move || cache_reset_loop(&topic, datastore.as_ref(), &closed, interval))?,
            );
        }

        // Registered last: once the datastore holds the listener it cannot
        // be removed again.
        {
            let topic = Arc::clone(&topic);
            datastore.register_change_listener(Box::new(
                move |changed: &ChangedData| -> std::result::Result<(), BoxError> {
                    publish_changes(&topic, user_updater.as_ref(), changed)
                        .map(|_| ())
                        .map_err(|err| {
                            tracing::warn!(error = %err, "could not publish datastore changes");
                            BoxError::from(err)
                        })
                },
            ));
        }

        Ok(Self {
            topic,
            gate: RestrictionGate::new(datastore, restricter),
            config,
            workers: Mutex::new(workers),
        })
    }

    /// Register a client. The connection needs no cleanup.
    pub fn connect<K>(&self, uid: UserId, kb: K) -> Connection
    where
        K: KeysBuilder + 'static,
    {
        Connection::new(Arc::clone(&self.topic), self.gate.clone(), uid, Box::new(kb))
    }

    /// Id of the last data update.
    pub fn last_id(&self) -> u64 {
        self.topic.last_id()
    }

    /// Restricted values for `keys`. Missing keys and keys `uid` may not see
    /// are both `None`.
    pub fn restricted_data(&self, uid: UserId, keys: &[String]) -> Result<DataMap> {
        self.gate.restricted_data(uid, keys)
    }

    /// Stream updates for `uid` to `writer` as one JSON object per line,
    /// flushing after each line.
    ///
    /// Runs until the first error, which is returned. `Cancelled` or
    /// `Closed` mean the stream was stopped on purpose.
    pub fn live<K, W>(&self, uid: UserId, kb: K, writer: &mut W, signal: &Signal) -> Result<()>
    where
        K: KeysBuilder + 'static,
        W: Write + ?Sized,
    {
        let mut conn = self.connect(uid, kb);

        loop {
            let data = conn.next(signal)?;

            let ordered: BTreeMap<&String, &Option<Value>> = data.iter().collect();
            let mut line = serde_json::to_vec(&ordered)?;
            line.push(b'\n');

            writer.write_all(&line)?;
            writer.flush()?;
        }
    }

    /// The change topic.
    pub fn topic(&self) -> &Arc<Topic> {
        &self.topic
    }

    /// Configuration the service runs with.
    pub fn config(&self) -> &AutoupdateConfig {
        &self.config
    }

    /// Wait for the maintenance threads. Returns once the `closed` signal
    /// has fired and both threads stopped.
    pub fn join(&self) {
        let workers: Vec<JoinHandle<()>> = self.workers.lock().drain(..).collect();
        for worker in workers {
            let name = worker.thread().name().unwrap_or("autoupdate").to_string();
            if worker.join().is_err() {
                tracing::warn!(thread = %name, "maintenance thread panicked");
            }
        }
    }
}

/// Publish the keys of one datastore write batch plus a full-update marker
/// for every additionally affected user.
fn publish_changes(
    topic: &Topic,
    user_updater: &dyn UserUpdater,
    changed: &ChangedData,
) -> Result<Option<u64>> {
    let mut keys: Vec<String> = changed.keys().cloned().collect();

    let uids = user_updater
        .additional_update(changed)
        .map_err(AutoupdateError::AdditionalUpdate)?;
    keys.extend(uids.into_iter().map(full_update_key));

    Ok(topic.publish(keys))
}

/// Prune the topic every `interval` until `closed` fires.
fn prune_loop(topic: &Topic, closed: &Signal, interval: Duration, retention: Duration) {
    tracing::info!(?interval, ?retention, "topic prune loop started");

    let ticker = crossbeam_channel::tick(interval);
    let closed_deadline = closed.deadline_channel();

    loop {
        crossbeam_channel::select! {
            recv(closed.receiver()) -> _ => break,
            recv(closed_deadline) -> _ => break,
            recv(ticker) -> _ => {
                // Nothing can be older than the retention window yet.
                if let Some(before) = Instant::now().checked_sub(retention) {
                    topic.prune(before);
                }
            }
        }
    }

    tracing::info!("topic prune loop stopped");
}

/// Reset the datastore cache every `interval` until `closed` fires. Every
/// reset is followed by a full update for all users, which refills the
/// cache.
fn cache_reset_loop(topic: &Topic, datastore: &dyn Datastore, closed: &Signal, interval: Duration) {
    tracing::info!(?interval, "cache reset loop started");

    let ticker = crossbeam_channel::tick(interval);
    let closed_deadline = closed.deadline_channel();

    loop {
        crossbeam_channel::select! {
            recv(closed.receiver()) -> _ => break,
            recv(closed_deadline) -> _ => break,
            recv(ticker) -> _ => {
                datastore.reset_cache();
                topic.publish([full_update_key(UserId::ALL)]);
            }
        }
    }

    tracing::info!("cache reset loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastore::MemoryDatastore;
    use crate::restrict::AllowAll;
    use crate::updater::NoAdditionalUpdates;
    use serde_json::json;

    #[test]
    fn test_publish_changes_adds_markers() {
        let topic = Topic::default();
        let updater = |changed: &ChangedData| -> std::result::Result<Vec<UserId>, BoxError> {
            if changed.contains_key("group/1/permissions") {
                Ok(vec![UserId(3), UserId(4)])
            } else {
                Ok(vec![])
            }
        };

        let mut changed = ChangedData::new();
        changed.insert("group/1/permissions".to_string(), Some(json!(["read"])));

        let id = publish_changes(&topic, &updater, &changed).unwrap();
        assert_eq!(id, Some(1));

        let received = topic.receive(0, &Signal::never()).unwrap();
        let keys: Vec<&str> = received.keys.iter().map(String::as_str).collect();
        assert_eq!(keys, vec!["fullupdate/3", "fullupdate/4", "group/1/permissions"]);
    }

    #[test]
    fn test_publish_changes_propagates_updater_error() {
        let topic = Topic::default();
        let updater = |_: &ChangedData| -> std::result::Result<Vec<UserId>, BoxError> {
            Err("lookup failed".into())
        };

        let mut changed = ChangedData::new();
        changed.insert("a".to_string(), None);

        let err = publish_changes(&topic, &updater, &changed).unwrap_err();
        assert!(matches!(err, AutoupdateError::AdditionalUpdate(_)));
        assert_eq!(topic.last_id(), 0);
    }

    #[test]
    fn test_cache_reset_loop_publishes_full_update() {
        let (shutdown, closed) = crate::signal::Trigger::new();
        let ds = Arc::new(MemoryDatastore::new());
        let config = AutoupdateConfig {
            cache_reset_interval: Duration::from_millis(10),
            ..Default::default()
        };

        let service = Autoupdate::with_config(
            ds.clone(),
            Arc::new(AllowAll),
            Arc::new(NoAdditionalUpdates),
            closed,
            config,
        )
        .unwrap();

        let received = service.topic().receive(0, &Signal::never()).unwrap();
        assert!(received.contains("fullupdate/-1"));
        assert!(ds.cache_resets() >= 1);

        shutdown.fire();
        service.join();
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = AutoupdateConfig {
            prune_interval: Duration::ZERO,
            ..Default::default()
        };

        let ds = Arc::new(MemoryDatastore::new());
        let result = Autoupdate::with_config(
            ds.clone(),
            Arc::new(AllowAll),
            Arc::new(NoAdditionalUpdates),
            Signal::never(),
            config,
        );
        assert!(matches!(result, Err(AutoupdateError::InvalidConfig(_))));
        assert_eq!(ds.listener_count(), 0);
    }

    #[test]
    fn test_listener_registered_once_service_is_running() {
        let (shutdown, closed) = crate::signal::Trigger::new();
        let ds = Arc::new(MemoryDatastore::new());

        let service = Autoupdate::new(
            ds.clone(),
            Arc::new(AllowAll),
            Arc::new(NoAdditionalUpdates),
            closed,
        )
        .unwrap();
        assert_eq!(ds.listener_count(), 1);
        assert_eq!(service.workers.lock().len(), 2);

        let mut changed = ChangedData::new();
        changed.insert("a".to_string(), Some(json!(1)));
        ds.send(changed).unwrap();
        assert_eq!(service.last_id(), 1);

        shutdown.fire();
        service.join();
    }
}

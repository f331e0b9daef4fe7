//! # Autoupdate
//!
//! Live updates from a shared key-value datastore to many concurrently
//! connected clients, each interested in its own, dynamically computed set
//! of keys and each seeing only the values it is allowed to see.
//!
//! ## Core Concepts
//!
//! - **Topic**: In-memory, prunable log of "these keys changed" events
//! - **Connection**: Per-client cursor turning the topic into restricted data
//! - **Autoupdate**: Wires datastore changes into the topic and runs the
//!   background maintenance (pruning, cache resets)
//! - **Full-update keys**: `fullupdate/<uid>` (`-1` for everybody) force a
//!   connection to recompute all of its data
//!
//! ## Example
//!
//! ```ignore
//! use autoupdate::{AllowAll, Autoupdate, MemoryDatastore, NoAdditionalUpdates, Signal, StaticKeys, Trigger, UserId};
//!
//! let (shutdown, closed) = Trigger::new();
//! let datastore = Arc::new(MemoryDatastore::with_data([("user/1/name", json!("admin"))]));
//! let service = Autoupdate::new(datastore, Arc::new(AllowAll), Arc::new(NoAdditionalUpdates), closed)?;
//!
//! // One JSON line per update, until the client goes away.
//! service.live(UserId(1), StaticKeys::new(["user/1/name"]), &mut stdout, &Signal::never())?;
//! ```

pub mod config;
pub mod datastore;
pub mod error;
pub mod keys;
pub mod restrict;
pub mod service;
pub mod signal;
pub mod topic;
pub mod types;
pub mod updater;

// Re-exports
pub use config::AutoupdateConfig;
pub use datastore::{ChangeListener, Datastore, MemoryDatastore};
pub use error::{AutoupdateError, BoxError, Result};
pub use keys::{KeysBuilder, StaticKeys};
pub use restrict::{AllowAll, Restricter, RestrictionGate};
pub use service::{Autoupdate, Connection};
pub use signal::{Signal, Trigger};
pub use topic::{Received, Topic, TopicEvent, TopicStats};
pub use types::*;
pub use updater::{NoAdditionalUpdates, UserUpdater};

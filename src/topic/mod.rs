//! In-memory change topic.
//!
//! The topic is an append-only, id-ordered log of "these keys changed"
//! events. Readers ask for everything after the last id they have seen and
//! block until there is something new. Old events are pruned by time; a
//! reader that fell behind the pruned history gets
//! [`AutoupdateError::StaleId`](crate::AutoupdateError::StaleId) and has to
//! resync.
//!
//! # Example
//!
//! ```ignore
//! let topic = Topic::new(Signal::never());
//!
//! let id = topic.publish(["user/1/name"]).unwrap();
//! let received = topic.receive(0, &Signal::never())?;
//! assert_eq!(received.id, id);
//! ```

mod log;
mod types;

pub use log::Topic;
pub use types::{Received, TopicEvent, TopicStats};

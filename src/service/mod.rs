//! The autoupdate service.
//!
//! [`Autoupdate`] wires the datastore's change notifications into the
//! [`Topic`](crate::topic::Topic), runs the background maintenance (topic
//! pruning and datastore cache resets) and hands out [`Connection`]s.
//!
//! A connection is a per-client cursor over the topic. Its first
//! [`next`](Connection::next) returns the full restricted data for the keys
//! the client is interested in; later calls block until one of those keys
//! changes and return only the changed keys.
//!
//! There is no need to close a connection. A client that stops calling
//! `next` leaves nothing behind.
//!
//! # Example
//!
//! ```ignore
//! let (shutdown, closed) = Trigger::new();
//! let service = Autoupdate::new(datastore, Arc::new(AllowAll), Arc::new(NoAdditionalUpdates), closed)?;
//!
//! let mut conn = service.connect(UserId(1), StaticKeys::new(["user/1/name"]));
//! let snapshot = conn.next(&Signal::never())?;
//! let changes = conn.next(&Signal::never())?; // blocks until user/1/name changes
//!
//! shutdown.fire();
//! service.join();
//! ```

mod connection;
mod coordinator;

pub use connection::Connection;
pub use coordinator::Autoupdate;

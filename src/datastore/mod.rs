//! Data source seam.
//!
//! The service reads values through [`Datastore`] and learns about writes
//! through the change listeners registered on it. [`MemoryDatastore`] is an
//! in-memory implementation for tests, benchmarks and embedding.

mod memory;

pub use memory::MemoryDatastore;

use crate::error::BoxError;
use crate::types::{ChangedData, Value};

/// Callback invoked once per datastore write batch with the changed fields.
pub type ChangeListener =
    Box<dyn Fn(&ChangedData) -> std::result::Result<(), BoxError> + Send + Sync>;

/// Key-value source the service distributes.
pub trait Datastore: Send + Sync {
    /// Values for `keys`, in the same order. `None` for keys that do not
    /// exist.
    fn get(&self, keys: &[String]) -> std::result::Result<Vec<Option<Value>>, BoxError>;

    /// Register a callback for every future write batch.
    fn register_change_listener(&self, listener: ChangeListener);

    /// Drop memoized values so later reads recompute from the store.
    fn reset_cache(&self);
}

//! Key-interest providers.
//!
//! A connection asks its [`KeysBuilder`] for the keys it currently cares
//! about every time it wakes up. The answer may depend on external state
//! (for example on values in the datastore), so it is never cached.

use crate::error::BoxError;
use crate::signal::Signal;

/// Computes the keys a connection is interested in.
pub trait KeysBuilder: Send {
    /// Current keys of interest. Must never return a `fullupdate/<n>` key.
    fn keys(&mut self, signal: &Signal) -> std::result::Result<Vec<String>, BoxError>;
}

impl<F> KeysBuilder for F
where
    F: FnMut(&Signal) -> std::result::Result<Vec<String>, BoxError> + Send,
{
    fn keys(&mut self, signal: &Signal) -> std::result::Result<Vec<String>, BoxError> {
        self(signal)
    }
}

/// A fixed set of keys.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StaticKeys(pub Vec<String>);

impl StaticKeys {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StaticKeys(keys.into_iter().map(Into::into).collect())
    }
}

impl KeysBuilder for StaticKeys {
    fn keys(&mut self, _signal: &Signal) -> std::result::Result<Vec<String>, BoxError> {
        Ok(self.0.clone())
    }
}

//! Per-user restriction of fetched data.

use crate::datastore::Datastore;
use crate::error::{AutoupdateError, BoxError, Result};
use crate::types::{DataMap, UserId};
use std::sync::Arc;

/// Decides which values a user may see.
pub trait Restricter: Send + Sync {
    /// Replace every value in `data` that `uid` may not see with `None`.
    fn restrict(&self, uid: UserId, data: &mut DataMap) -> std::result::Result<(), BoxError>;
}

impl<F> Restricter for F
where
    F: Fn(UserId, &mut DataMap) -> std::result::Result<(), BoxError> + Send + Sync,
{
    fn restrict(&self, uid: UserId, data: &mut DataMap) -> std::result::Result<(), BoxError> {
        self(uid, data)
    }
}

/// Restricter that lets every user see everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllowAll;

impl Restricter for AllowAll {
    fn restrict(&self, _uid: UserId, _data: &mut DataMap) -> std::result::Result<(), BoxError> {
        Ok(())
    }
}

/// Fetches values from the datastore and restricts them for one user.
#[derive(Clone)]
pub struct RestrictionGate {
    datastore: Arc<dyn Datastore>,
    restricter: Arc<dyn Restricter>,
}

impl RestrictionGate {
    /// Create a gate reading from `datastore` and filtering with `restricter`.
    pub fn new(datastore: Arc<dyn Datastore>, restricter: Arc<dyn Restricter>) -> Self {
        Self {
            datastore,
            restricter,
        }
    }

    /// Restricted values for `keys` as seen by `uid`.
    ///
    /// Keys that do not exist and keys the user may not see both map to
    /// `None`. On any error no data is returned.
    pub fn restricted_data(&self, uid: UserId, keys: &[String]) -> Result<DataMap> {
        let values = self
            .datastore
            .get(keys)
            .map_err(|source| AutoupdateError::Fetch {
                keys: keys.to_vec(),
                source,
            })?;

        if values.len() != keys.len() {
            return Err(AutoupdateError::Fetch {
                keys: keys.to_vec(),
                source: format!(
                    "datastore returned {} values for {} keys",
                    values.len(),
                    keys.len()
                )
                .into(),
            });
        }

        let mut data: DataMap = keys.iter().cloned().zip(values).collect();

        self.restricter
            .restrict(uid, &mut data)
            .map_err(|source| AutoupdateError::Restrict { uid, source })?;

        Ok(data)
    }
}

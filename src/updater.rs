//! Users affected by a write without any of their keys changing.

use crate::error::BoxError;
use crate::types::{ChangedData, UserId};

/// Finds users whose visible data may change because of a write even though
/// none of their keys appear in it (for example after a permission change).
pub trait UserUpdater: Send + Sync {
    fn additional_update(
        &self,
        changed: &ChangedData,
    ) -> std::result::Result<Vec<UserId>, BoxError>;
}

impl<F> UserUpdater for F
where
    F: Fn(&ChangedData) -> std::result::Result<Vec<UserId>, BoxError> + Send + Sync,
{
    fn additional_update(
        &self,
        changed: &ChangedData,
    ) -> std::result::Result<Vec<UserId>, BoxError> {
        self(changed)
    }
}

/// User updater that never reports additional users.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoAdditionalUpdates;

impl UserUpdater for NoAdditionalUpdates {
    fn additional_update(
        &self,
        _changed: &ChangedData,
    ) -> std::result::Result<Vec<UserId>, BoxError> {
        Ok(Vec::new())
    }
}

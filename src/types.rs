//! Core types for the autoupdate service.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A JSON value as stored in the datastore.
pub type Value = serde_json::Value;

/// Restricted data for one request: key -> value, `None` if the key does not
/// exist or the user may not see it.
pub type DataMap = HashMap<String, Option<Value>>;

/// Raw fields of one datastore write batch. `None` means the key was deleted.
pub type ChangedData = HashMap<String, Option<Value>>;

/// Prefix of topic keys that force a full recompute for one user.
const FULL_UPDATE_PREFIX: &str = "fullupdate/";

/// Identifier of a user. `UserId::ALL` (-1) addresses every user.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl UserId {
    /// Addresses every connected user in a full-update key.
    pub const ALL: UserId = UserId(-1);
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        UserId(id)
    }
}

/// Topic key that forces every connection of `uid` to recompute all of its
/// keys. It lives in the same namespace as data keys, so no data key may look
/// like `fullupdate/<number>`.
pub fn full_update_key(uid: UserId) -> String {
    format!("{}{}", FULL_UPDATE_PREFIX, uid.0)
}

/// Parse a full-update key back into its user id.
pub fn parse_full_update_key(key: &str) -> Option<UserId> {
    key.strip_prefix(FULL_UPDATE_PREFIX)?
        .parse::<i64>()
        .ok()
        .map(UserId)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_update_key_format() {
        assert_eq!(full_update_key(UserId(7)), "fullupdate/7");
        assert_eq!(full_update_key(UserId::ALL), "fullupdate/-1");
    }

    #[test]
    fn test_parse_full_update_key() {
        assert_eq!(parse_full_update_key("fullupdate/7"), Some(UserId(7)));
        assert_eq!(parse_full_update_key("fullupdate/-1"), Some(UserId::ALL));
        assert_eq!(parse_full_update_key("fullupdate/"), None);
        assert_eq!(parse_full_update_key("fullupdate/abc"), None);
        assert_eq!(parse_full_update_key("user/1/name"), None);
    }

    #[test]
    fn test_user_id_serde_transparent() {
        let json = serde_json::to_string(&UserId(42)).unwrap();
        assert_eq!(json, "42");
        let parsed: UserId = serde_json::from_str("-1").unwrap();
        assert_eq!(parsed, UserId::ALL);
    }
}

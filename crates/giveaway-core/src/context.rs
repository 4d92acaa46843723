//! Per-invocation correlation identifier.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A unique identifier for each procedure invocation, using UUID v7.
///
/// Only used to correlate log lines; never returned to callers.
///
/// # Example
///
/// ```
/// use giveaway_core::RequestId;
///
/// let id = RequestId::new();
/// assert_ne!(id, RequestId::new());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new time-ordered request ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Wraps an existing UUID, e.g. one taken from an `x-request-id` header.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_v7_and_unique() {
        let first = RequestId::new();
        let second = RequestId::new();
        assert_eq!(first.as_uuid().get_version_num(), 7);
        assert_ne!(first, second);
    }

    #[test]
    fn test_serializes_as_plain_uuid() {
        let uuid = Uuid::now_v7();
        let json = serde_json::to_value(RequestId::from_uuid(uuid)).expect("serialize");
        assert_eq!(json, serde_json::Value::String(uuid.to_string()));
    }
}

//! Failed CiviCRM sync model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::organisation::OrganisationId;

/// A unique identifier for a failed sync record, using UUID v7
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FailedSyncId(Uuid);

impl FailedSyncId {
    /// Create a new unique failed sync ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for FailedSyncId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FailedSyncId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FailedSyncId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Recorded failure of an automatic CiviCRM sync, pending retry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedSync {
    pub id: FailedSyncId,
    /// Organisation whose sync failed
    pub organisation_id: OrganisationId,
    /// HTTP or CiviCRM error status of the failed attempt
    pub status_code: i64,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
}

impl FailedSync {
    #[must_use]
    pub fn new(organisation_id: OrganisationId, status_code: i64) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: FailedSyncId::new(),
            organisation_id,
            status_code,
            created_at: now,
            updated_at: now,
        }
    }
}

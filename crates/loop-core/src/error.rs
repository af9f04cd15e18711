//! Error types for loop-core

use thiserror::Error;

use crate::config::ConfigError;
use crate::crm::CrmSyncError;
use crate::models::OrganisationId;

/// Result type alias using loop-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in loop-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Requested order is outside the allowed range for its partition
    #[error("Invalid order {requested}: must be between 1 and {max}")]
    InvalidOrder { requested: i64, max: i64 },

    /// CRM call failed
    #[error(transparent)]
    CrmSync(#[from] CrmSyncError),

    /// Update/delete attempted before the organisation has a CRM contact
    #[error("Organisation {0} has no CiviCRM contact id")]
    MissingExternalId(OrganisationId),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),
}

//! loop-core - Core library for LOOP
//!
//! This crate contains the ordered collection registry, the organisation
//! models and their CiviCRM sync, and the database layer used by the LOOP
//! command-line interface.

pub mod config;
pub mod crm;
pub mod db;
pub mod error;
pub mod import;
pub mod models;
pub mod ordering;
pub mod services;
pub mod util;

pub use config::{ConfigError, CrmConfig, CrmDriver};
pub use crm::{CrmClient, CrmSyncError, CrmSyncGateway};
pub use error::{Error, Result};
pub use models::{
    FailedSync, FailedSyncId, ItemId, OrderedItem, Organisation, OrganisationDraft,
    OrganisationId, PartitionKey, SyncState,
};
pub use services::{DatabaseService, OrganisationService, RetryCoordinator};

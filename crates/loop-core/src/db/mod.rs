//! Database layer for LOOP

mod collection_repository;
mod connection;
mod failed_sync_repository;
mod migrations;
mod organisation_repository;

pub use collection_repository::{LibSqlCollectionRepository, OrderedCollectionRegistry};
pub use connection::Database;
pub use failed_sync_repository::{FailedSyncRepository, LibSqlFailedSyncRepository};
pub use organisation_repository::{LibSqlOrganisationRepository, OrganisationRepository};

//! Shared database service wrapper used across clients.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError};

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::db::{
    Database, FailedSyncRepository, LibSqlCollectionRepository, LibSqlFailedSyncRepository,
    LibSqlOrganisationRepository, OrderedCollectionRegistry, OrganisationRepository,
};
use crate::models::{
    FailedSync, FailedSyncId, ItemId, OrderedItem, Organisation, OrganisationId, PartitionKey,
};
use crate::Result;

/// Thread-safe service for DB and repository operations.
#[derive(Clone)]
pub struct DatabaseService {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
    organisation_locks: Arc<std::sync::Mutex<HashMap<OrganisationId, Arc<Mutex<()>>>>>,
}

impl DatabaseService {
    /// Open a database service at the given filesystem path.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&db_path).await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: Some(db_path),
            organisation_locks: Arc::default(),
        })
    }

    /// Open an in-memory database service (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: None,
            organisation_locks: Arc::default(),
        })
    }

    /// Exclusive lock on one organisation's CRM sync.
    ///
    /// Held from the organisation write through the CRM call and the
    /// `civi_id` write, so at most one sync per organisation is in flight.
    pub async fn lock_organisation(&self, id: &OrganisationId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .organisation_locks
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(*id).or_default())
        };
        lock.lock_owned().await
    }

    /// Filesystem path of the database, if file-backed.
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// List a partition in order.
    pub async fn list_collections(&self, partition: &PartitionKey) -> Result<Vec<OrderedItem>> {
        let db = self.db.lock().await;
        let repo = LibSqlCollectionRepository::new(db.connection());
        repo.list(partition).await
    }

    /// Fetch a collection item by id.
    pub async fn get_collection(&self, id: &ItemId) -> Result<Option<OrderedItem>> {
        let db = self.db.lock().await;
        let repo = LibSqlCollectionRepository::new(db.connection());
        repo.get(id).await
    }

    /// Number of items in a partition.
    pub async fn count_collections(&self, partition: &PartitionKey) -> Result<i64> {
        let db = self.db.lock().await;
        let repo = LibSqlCollectionRepository::new(db.connection());
        repo.count(partition).await
    }

    /// Insert an item at `order`, shifting later siblings.
    pub async fn create_collection(
        &self,
        partition: &PartitionKey,
        name: &str,
        order: i64,
    ) -> Result<OrderedItem> {
        let db = self.db.lock().await;
        let repo = LibSqlCollectionRepository::new(db.connection());
        repo.create(partition, name, order).await
    }

    /// Rename an item and move it to `order`.
    pub async fn update_collection(
        &self,
        id: &ItemId,
        name: &str,
        order: i64,
    ) -> Result<OrderedItem> {
        let db = self.db.lock().await;
        let repo = LibSqlCollectionRepository::new(db.connection());
        repo.update(id, name, order).await
    }

    /// Move an item to `order`.
    pub async fn reorder_collection(&self, id: &ItemId, order: i64) -> Result<OrderedItem> {
        let db = self.db.lock().await;
        let repo = LibSqlCollectionRepository::new(db.connection());
        repo.reorder(id, order).await
    }

    /// Remove an item and close the gap.
    pub async fn delete_collection(&self, id: &ItemId) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlCollectionRepository::new(db.connection());
        repo.delete(id).await
    }

    /// Replace a partition's contents with `names`, in order.
    pub async fn replace_collections(
        &self,
        partition: &PartitionKey,
        names: &[String],
    ) -> Result<Vec<OrderedItem>> {
        let db = self.db.lock().await;
        let repo = LibSqlCollectionRepository::new(db.connection());
        repo.truncate(partition).await?;

        let mut items = Vec::with_capacity(names.len());
        for (order, name) in (1_i64..).zip(names) {
            items.push(repo.create(partition, name, order).await?);
        }
        Ok(items)
    }

    /// List organisations alphabetically.
    pub async fn list_organisations(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Organisation>> {
        let db = self.db.lock().await;
        let repo = LibSqlOrganisationRepository::new(db.connection());
        repo.list(limit, offset).await
    }

    /// Fetch an organisation by id.
    pub async fn get_organisation(&self, id: &OrganisationId) -> Result<Option<Organisation>> {
        let db = self.db.lock().await;
        let repo = LibSqlOrganisationRepository::new(db.connection());
        repo.get(id).await
    }

    /// Persist a new organisation.
    pub async fn create_organisation(&self, organisation: &Organisation) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlOrganisationRepository::new(db.connection());
        repo.create(organisation).await
    }

    /// Overwrite an organisation's profile.
    pub async fn update_organisation(&self, organisation: &Organisation) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlOrganisationRepository::new(db.connection());
        repo.update(organisation).await
    }

    /// Store the CRM contact id of an organisation.
    pub async fn set_organisation_civi_id(
        &self,
        id: &OrganisationId,
        civi_id: &str,
    ) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlOrganisationRepository::new(db.connection());
        repo.set_civi_id(id, civi_id).await
    }

    /// Delete an organisation and its failed syncs.
    pub async fn delete_organisation(&self, id: &OrganisationId) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlOrganisationRepository::new(db.connection());
        repo.delete(id).await
    }

    /// Record a failed CRM sync.
    pub async fn record_failed_sync(&self, failed_sync: &FailedSync) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlFailedSyncRepository::new(db.connection());
        repo.create(failed_sync).await
    }

    /// List failed syncs newest-first.
    pub async fn list_failed_syncs(&self, limit: usize, offset: usize) -> Result<Vec<FailedSync>> {
        let db = self.db.lock().await;
        let repo = LibSqlFailedSyncRepository::new(db.connection());
        repo.list(limit, offset).await
    }

    /// Fetch a failed sync by id.
    pub async fn get_failed_sync(&self, id: &FailedSyncId) -> Result<Option<FailedSync>> {
        let db = self.db.lock().await;
        let repo = LibSqlFailedSyncRepository::new(db.connection());
        repo.get(id).await
    }

    /// Number of outstanding failed syncs for an organisation.
    pub async fn count_failed_syncs_for(&self, organisation_id: &OrganisationId) -> Result<usize> {
        let db = self.db.lock().await;
        let repo = LibSqlFailedSyncRepository::new(db.connection());
        repo.count_for_organisation(organisation_id).await
    }

    /// Failed syncs recorded for one organisation.
    pub async fn list_failed_syncs_for(
        &self,
        organisation_id: &OrganisationId,
    ) -> Result<Vec<FailedSync>> {
        let db = self.db.lock().await;
        let repo = LibSqlFailedSyncRepository::new(db.connection());
        repo.list_for_organisation(organisation_id).await
    }

    /// Clear every failed sync of an organisation.
    pub async fn delete_failed_syncs_for(&self, organisation_id: &OrganisationId) -> Result<u64> {
        let db = self.db.lock().await;
        let repo = LibSqlFailedSyncRepository::new(db.connection());
        repo.delete_for_organisation(organisation_id).await
    }
}

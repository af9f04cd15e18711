//! Administrator-triggered retry of failed CRM syncs.

use crate::crm::CrmClient;
use crate::error::{Error, Result};
use crate::models::{FailedSync, FailedSyncId, Organisation};
use crate::services::DatabaseService;

pub struct RetryCoordinator<C> {
    db: DatabaseService,
    crm: C,
}

impl<C: CrmClient> RetryCoordinator<C> {
    pub const fn new(db: DatabaseService, crm: C) -> Self {
        Self { db, crm }
    }

    /// Failed syncs newest-first.
    pub async fn list_failed_syncs(&self, limit: usize, offset: usize) -> Result<Vec<FailedSync>> {
        self.db.list_failed_syncs(limit, offset).await
    }

    pub async fn get_failed_sync(&self, id: &FailedSyncId) -> Result<FailedSync> {
        self.db
            .get_failed_sync(id)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Re-send the organisation to the CRM as an update.
    ///
    /// On success every failed sync of the organisation is removed, not just
    /// the one retried. Errors propagate and leave the failed syncs in place.
    pub async fn retry(&self, id: &FailedSyncId) -> Result<Organisation> {
        let failed_sync = self.get_failed_sync(id).await?;
        let _sync = self.db.lock_organisation(&failed_sync.organisation_id).await;
        let organisation = self
            .db
            .get_organisation(&failed_sync.organisation_id)
            .await?
            .ok_or_else(|| Error::NotFound(failed_sync.organisation_id.to_string()))?;

        if organisation.civi_id.is_none() {
            return Err(Error::MissingExternalId(organisation.id));
        }

        if let Err(error) = self.crm.update(&organisation).await {
            tracing::error!(
                "Retry of failed sync {} for organisation {} failed: {}",
                id,
                organisation.id,
                error
            );
            return Err(error);
        }

        let cleared = self.db.delete_failed_syncs_for(&organisation.id).await?;
        tracing::info!(
            "Retried failed sync {}; cleared {} failed sync(s) for organisation {}",
            id,
            cleared,
            organisation.id
        );
        Ok(organisation)
    }
}

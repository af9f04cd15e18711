//! Organisation CRUD with automatic CRM sync.
//!
//! Sync is best-effort: a CRM failure on create/update is logged and recorded
//! as a [`FailedSync`], and the organisation change still succeeds.

use crate::crm::CrmClient;
use crate::error::{Error, Result};
use crate::models::{FailedSync, Organisation, OrganisationDraft, OrganisationId, SyncState};
use crate::services::DatabaseService;
use crate::util::unix_millis_now;

pub struct OrganisationService<C> {
    db: DatabaseService,
    crm: C,
}

impl<C: CrmClient> OrganisationService<C> {
    pub const fn new(db: DatabaseService, crm: C) -> Self {
        Self { db, crm }
    }

    pub async fn list(&self, limit: usize, offset: usize) -> Result<Vec<Organisation>> {
        self.db.list_organisations(limit, offset).await
    }

    pub async fn get(&self, id: &OrganisationId) -> Result<Organisation> {
        self.db
            .get_organisation(id)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// The organisation together with its current sync state.
    pub async fn get_with_state(&self, id: &OrganisationId) -> Result<(Organisation, SyncState)> {
        let organisation = self.get(id).await?;
        let failed = self.db.count_failed_syncs_for(id).await?;
        let state = organisation.sync_state(failed);
        Ok((organisation, state))
    }

    pub async fn create(&self, draft: OrganisationDraft) -> Result<Organisation> {
        let mut organisation = Organisation::new(draft);
        let _sync = self.db.lock_organisation(&organisation.id).await;
        self.db.create_organisation(&organisation).await?;
        tracing::info!("Created organisation {}", organisation.id);

        if organisation.civi_sync_enabled {
            self.sync_create(&mut organisation).await?;
        }
        Ok(organisation)
    }

    pub async fn update(&self, id: &OrganisationId, draft: OrganisationDraft) -> Result<Organisation> {
        let _sync = self.db.lock_organisation(id).await;
        // Re-read under the lock: a concurrent first sync may have set civi_id.
        let mut organisation = self.get(id).await?;
        organisation.apply(draft);
        organisation.updated_at = unix_millis_now();
        self.db.update_organisation(&organisation).await?;
        tracing::info!("Updated organisation {}", organisation.id);

        if organisation.civi_sync_enabled {
            if organisation.civi_id.is_some() {
                if let Err(error) = self.crm.update(&organisation).await {
                    self.record_failure(&organisation, error).await?;
                }
            } else {
                // Never reached the CRM yet: this is its first sync.
                self.sync_create(&mut organisation).await?;
            }
        }
        Ok(organisation)
    }

    /// Delete the organisation, marking its CRM contact deleted.
    ///
    /// The CRM call is best-effort: once the organisation is gone there is
    /// nothing to attach a failed sync to, so failures are only logged.
    pub async fn delete(&self, id: &OrganisationId) -> Result<()> {
        let _sync = self.db.lock_organisation(id).await;
        let organisation = self.get(id).await?;

        if organisation.civi_sync_enabled && organisation.civi_id.is_some() {
            let cleared = self.db.delete_failed_syncs_for(id).await?;
            if cleared > 0 {
                tracing::info!("Cleared {} failed sync(s) for organisation {}", cleared, id);
            }
            if let Err(error) = self.crm.delete(&organisation).await {
                tracing::error!(
                    "Failed to mark CiviCRM contact deleted for organisation {}: {}",
                    id,
                    error
                );
            }
        }

        self.db.delete_organisation(id).await?;
        tracing::info!("Deleted organisation {}", id);
        Ok(())
    }

    /// First CRM sync. Callers hold the organisation lock.
    async fn sync_create(&self, organisation: &mut Organisation) -> Result<()> {
        match self.crm.create(organisation).await {
            Ok(civi_id) => {
                self.db
                    .set_organisation_civi_id(&organisation.id, &civi_id)
                    .await?;
                organisation.civi_id = Some(civi_id);

                let cleared = self.db.delete_failed_syncs_for(&organisation.id).await?;
                if cleared > 0 {
                    tracing::info!(
                        "First sync succeeded; cleared {} failed sync(s) for organisation {}",
                        cleared,
                        organisation.id
                    );
                }
                Ok(())
            }
            Err(error) => self.record_failure(organisation, error).await,
        }
    }

    /// Turn a CRM error into a failed sync; any other error propagates.
    async fn record_failure(&self, organisation: &Organisation, error: Error) -> Result<()> {
        let sync_error = match error {
            Error::CrmSync(sync_error) => sync_error,
            other => return Err(other),
        };

        tracing::error!(
            "CiviCRM sync failed for organisation {}: {}",
            organisation.id,
            sync_error
        );
        let failed_sync = FailedSync::new(organisation.id, sync_error.status_code);
        self.db.record_failed_sync(&failed_sync).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{draft, StubCrm};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    async fn service(crm: StubCrm) -> OrganisationService<StubCrm> {
        let db = DatabaseService::open_in_memory().await.unwrap();
        OrganisationService::new(db, crm)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn create_with_sync_stores_contact_id() {
        let crm = StubCrm::succeeding("civi-1");
        let service = service(crm.clone()).await;

        let organisation = service.create(draft(true)).await.unwrap();
        assert_eq!(organisation.civi_id.as_deref(), Some("civi-1"));

        let (stored, state) = service.get_with_state(&organisation.id).await.unwrap();
        assert_eq!(stored.civi_id.as_deref(), Some("civi-1"));
        assert_eq!(state, SyncState::Synced);
        assert_eq!(crm.calls(), vec!["create"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn create_without_sync_skips_crm() {
        let crm = StubCrm::succeeding("civi-1");
        let service = service(crm.clone()).await;

        let organisation = service.create(draft(false)).await.unwrap();
        let (_, state) = service.get_with_state(&organisation.id).await.unwrap();
        assert_eq!(state, SyncState::Disabled);
        assert!(crm.calls().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_create_records_status_and_keeps_organisation() {
        let crm = StubCrm::failing(422);
        let service = service(crm).await;

        let organisation = service.create(draft(true)).await.unwrap();
        assert_eq!(organisation.civi_id, None);

        let (stored, state) = service.get_with_state(&organisation.id).await.unwrap();
        assert_eq!(stored.name, "Acme Org");
        assert_eq!(state, SyncState::Failed);

        let failed = service
            .db
            .list_failed_syncs_for(&organisation.id)
            .await
            .unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].status_code, 422);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_of_synced_organisation_calls_update() {
        let crm = StubCrm::succeeding("civi-1");
        let service = service(crm.clone()).await;
        let organisation = service.create(draft(true)).await.unwrap();

        let mut changes = organisation.to_draft();
        changes.name = "Acme Renamed".to_string();
        let updated = service.update(&organisation.id, changes).await.unwrap();

        assert_eq!(updated.name, "Acme Renamed");
        assert_eq!(updated.civi_id.as_deref(), Some("civi-1"));
        assert_eq!(crm.calls(), vec!["create", "update"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_failure_is_recorded() {
        let crm = StubCrm::succeeding("civi-1");
        let service = service(crm.clone()).await;
        let organisation = service.create(draft(true)).await.unwrap();

        crm.fail_with(500);
        service
            .update(&organisation.id, organisation.to_draft())
            .await
            .unwrap();

        let (_, state) = service.get_with_state(&organisation.id).await.unwrap();
        assert_eq!(state, SyncState::Failed);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn enabling_sync_on_update_creates_contact() {
        let crm = StubCrm::succeeding("civi-9");
        let service = service(crm.clone()).await;
        let organisation = service.create(draft(false)).await.unwrap();

        let mut changes = organisation.to_draft();
        changes.civi_sync_enabled = true;
        let updated = service.update(&organisation.id, changes).await.unwrap();

        assert_eq!(updated.civi_id.as_deref(), Some("civi-9"));
        assert_eq!(crm.calls(), vec!["create"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn first_sync_on_update_clears_earlier_failures() {
        let crm = StubCrm::succeeding("civi-3");
        crm.fail_with(503);
        let service = service(crm.clone()).await;
        let organisation = service.create(draft(true)).await.unwrap();
        let (_, state) = service.get_with_state(&organisation.id).await.unwrap();
        assert_eq!(state, SyncState::Failed);

        crm.succeed();
        let updated = service
            .update(&organisation.id, organisation.to_draft())
            .await
            .unwrap();

        assert_eq!(updated.civi_id.as_deref(), Some("civi-3"));
        let (_, state) = service.get_with_state(&organisation.id).await.unwrap();
        assert_eq!(state, SyncState::Synced);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_updates_create_a_single_contact() {
        let crm = StubCrm::succeeding("civi-5");
        crm.fail_with(503);
        let service = service(crm.clone()).await;
        let organisation = service.create(draft(true)).await.unwrap();
        assert_eq!(organisation.civi_id, None);

        crm.succeed();
        crm.slow_create(Duration::from_millis(100));
        let (first, second) = tokio::join!(
            service.update(&organisation.id, organisation.to_draft()),
            service.update(&organisation.id, organisation.to_draft()),
        );

        assert_eq!(first.unwrap().civi_id.as_deref(), Some("civi-5"));
        assert_eq!(second.unwrap().civi_id.as_deref(), Some("civi-5"));
        assert_eq!(crm.calls(), vec!["create", "create", "update"]);

        let (stored, state) = service.get_with_state(&organisation.id).await.unwrap();
        assert_eq!(stored.civi_id.as_deref(), Some("civi-5"));
        assert_eq!(state, SyncState::Synced);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn delete_clears_failed_syncs_and_ignores_crm_failure() {
        let crm = StubCrm::succeeding("civi-1");
        let service = service(crm.clone()).await;
        let organisation = service.create(draft(true)).await.unwrap();

        crm.fail_with(503);
        service
            .update(&organisation.id, organisation.to_draft())
            .await
            .unwrap();
        service.delete(&organisation.id).await.unwrap();

        assert!(matches!(
            service.get(&organisation.id).await,
            Err(Error::NotFound(_))
        ));
        assert!(service.db.list_failed_syncs(10, 0).await.unwrap().is_empty());
        assert_eq!(crm.calls(), vec!["create", "update", "delete"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_organisation_is_not_found() {
        let service = service(StubCrm::succeeding("civi-1")).await;
        let id = OrganisationId::new();

        assert!(matches!(
            service.update(&id, draft(true)).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(service.delete(&id).await, Err(Error::NotFound(_))));
    }
}

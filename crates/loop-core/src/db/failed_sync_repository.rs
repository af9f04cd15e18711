//! Failed CiviCRM sync repository implementation

use libsql::{params, Connection, Row};

use crate::error::{Error, Result};
use crate::models::{FailedSync, FailedSyncId, OrganisationId};

/// Trait for failed sync storage operations (async)
#[allow(async_fn_in_trait)]
pub trait FailedSyncRepository {
    /// Record a failed sync
    async fn create(&self, failed_sync: &FailedSync) -> Result<()>;

    /// Get a failed sync by ID
    async fn get(&self, id: &FailedSyncId) -> Result<Option<FailedSync>>;

    /// List failed syncs newest-first
    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<FailedSync>>;

    /// Total number of recorded failed syncs
    async fn count(&self) -> Result<i64>;

    /// List failed syncs recorded for one organisation, newest-first
    async fn list_for_organisation(&self, organisation_id: &OrganisationId)
        -> Result<Vec<FailedSync>>;

    /// Number of outstanding failed syncs for one organisation
    async fn count_for_organisation(&self, organisation_id: &OrganisationId) -> Result<usize>;

    /// Remove every failed sync recorded for an organisation
    async fn delete_for_organisation(&self, organisation_id: &OrganisationId) -> Result<u64>;
}

/// libSQL implementation of `FailedSyncRepository`
pub struct LibSqlFailedSyncRepository<'a> {
    conn: &'a Connection,
}

const SELECT_COLUMNS: &str =
    "SELECT id, organisation_id, status_code, created_at, updated_at FROM failed_civi_syncs";

impl<'a> LibSqlFailedSyncRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_failed_sync(row: &Row) -> Result<FailedSync> {
        let id: String = row.get(0)?;
        let organisation_id: String = row.get(1)?;
        Ok(FailedSync {
            id: id
                .parse()
                .map_err(|_| Error::Database(format!("Invalid failed sync ID: {id}")))?,
            organisation_id: organisation_id.parse().map_err(|_| {
                Error::Database(format!("Invalid organisation ID: {organisation_id}"))
            })?,
            status_code: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }

    async fn collect(mut rows: libsql::Rows) -> Result<Vec<FailedSync>> {
        let mut failed_syncs = Vec::new();
        while let Some(row) = rows.next().await? {
            failed_syncs.push(Self::parse_failed_sync(&row)?);
        }
        Ok(failed_syncs)
    }
}

impl FailedSyncRepository for LibSqlFailedSyncRepository<'_> {
    async fn create(&self, failed_sync: &FailedSync) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO failed_civi_syncs (id, organisation_id, status_code, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?)",
                params![
                    failed_sync.id.as_str(),
                    failed_sync.organisation_id.as_str(),
                    failed_sync.status_code,
                    failed_sync.created_at,
                    failed_sync.updated_at
                ],
            )
            .await?;
        Ok(())
    }

    async fn get(&self, id: &FailedSyncId) -> Result<Option<FailedSync>> {
        let mut rows = self
            .conn
            .query(&format!("{SELECT_COLUMNS} WHERE id = ?"), [id.as_str()])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_failed_sync(&row)?)),
            None => Ok(None),
        }
    }

    #[allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT/OFFSET
    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<FailedSync>> {
        let rows = self
            .conn
            .query(
                &format!("{SELECT_COLUMNS} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"),
                params![limit as i64, offset as i64],
            )
            .await?;
        Self::collect(rows).await
    }

    async fn count(&self) -> Result<i64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM failed_civi_syncs", ())
            .await?;
        match rows.next().await? {
            Some(row) => Ok(row.get(0)?),
            None => Ok(0),
        }
    }

    async fn list_for_organisation(
        &self,
        organisation_id: &OrganisationId,
    ) -> Result<Vec<FailedSync>> {
        let rows = self
            .conn
            .query(
                &format!(
                    "{SELECT_COLUMNS} WHERE organisation_id = ? ORDER BY created_at DESC, id DESC"
                ),
                [organisation_id.as_str()],
            )
            .await?;
        Self::collect(rows).await
    }

    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    async fn count_for_organisation(&self, organisation_id: &OrganisationId) -> Result<usize> {
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*) FROM failed_civi_syncs WHERE organisation_id = ?",
                [organisation_id.as_str()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)? as usize),
            None => Ok(0),
        }
    }

    async fn delete_for_organisation(&self, organisation_id: &OrganisationId) -> Result<u64> {
        let deleted = self
            .conn
            .execute(
                "DELETE FROM failed_civi_syncs WHERE organisation_id = ?",
                [organisation_id.as_str()],
            )
            .await?;
        Ok(deleted)
    }
}

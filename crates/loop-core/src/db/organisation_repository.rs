//! Organisation repository implementation

use libsql::{params, Connection, Row, Value};

use crate::error::{Error, Result};
use crate::models::{Organisation, OrganisationId};

/// Trait for organisation storage operations (async)
#[allow(async_fn_in_trait)]
pub trait OrganisationRepository {
    /// Persist a new organisation
    async fn create(&self, organisation: &Organisation) -> Result<()>;

    /// Get an organisation by ID
    async fn get(&self, id: &OrganisationId) -> Result<Option<Organisation>>;

    /// List organisations alphabetically
    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<Organisation>>;

    /// Overwrite the stored profile fields
    async fn update(&self, organisation: &Organisation) -> Result<()>;

    /// Record the CRM contact id assigned on first sync
    async fn set_civi_id(&self, id: &OrganisationId, civi_id: &str) -> Result<()>;

    /// Remove an organisation (its failed syncs cascade)
    async fn delete(&self, id: &OrganisationId) -> Result<()>;
}

/// libSQL implementation of `OrganisationRepository`
pub struct LibSqlOrganisationRepository<'a> {
    conn: &'a Connection,
}

const SELECT_COLUMNS: &str = "SELECT id, name, description, url, email, phone,
        address_line_1, address_line_2, address_line_3, city, county, postcode, country,
        civi_sync_enabled, civi_id, created_at, updated_at
     FROM organisations";

fn optional_text(row: &Row, idx: i32) -> Result<Option<String>> {
    match row.get_value(idx)? {
        Value::Null => Ok(None),
        Value::Text(text) => Ok(Some(text)),
        other => Err(Error::Database(format!(
            "Unexpected value in column {idx}: {other:?}"
        ))),
    }
}

fn nullable(value: Option<&String>) -> Value {
    value.map_or(Value::Null, |text| Value::Text(text.clone()))
}

impl<'a> LibSqlOrganisationRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_organisation(row: &Row) -> Result<Organisation> {
        let id: String = row.get(0)?;
        Ok(Organisation {
            id: id
                .parse()
                .map_err(|_| Error::Database(format!("Invalid organisation ID: {id}")))?,
            name: row.get(1)?,
            description: row.get(2)?,
            url: optional_text(row, 3)?,
            email: optional_text(row, 4)?,
            phone: optional_text(row, 5)?,
            address_line_1: optional_text(row, 6)?,
            address_line_2: optional_text(row, 7)?,
            address_line_3: optional_text(row, 8)?,
            city: optional_text(row, 9)?,
            county: optional_text(row, 10)?,
            postcode: optional_text(row, 11)?,
            country: optional_text(row, 12)?,
            civi_sync_enabled: row.get::<i64>(13)? != 0,
            civi_id: optional_text(row, 14)?,
            created_at: row.get(15)?,
            updated_at: row.get(16)?,
        })
    }

    fn validate(organisation: &Organisation) -> Result<()> {
        if organisation.name.trim().is_empty() {
            return Err(Error::InvalidInput(
                "Organisation name cannot be empty".into(),
            ));
        }
        if organisation.description.trim().is_empty() {
            return Err(Error::InvalidInput(
                "Organisation description cannot be empty".into(),
            ));
        }
        Ok(())
    }
}

impl OrganisationRepository for LibSqlOrganisationRepository<'_> {
    async fn create(&self, organisation: &Organisation) -> Result<()> {
        Self::validate(organisation)?;

        self.conn
            .execute(
                "INSERT INTO organisations (
                    id, name, description, url, email, phone,
                    address_line_1, address_line_2, address_line_3, city, county, postcode, country,
                    civi_sync_enabled, civi_id, created_at, updated_at
                 ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    organisation.id.as_str(),
                    organisation.name.clone(),
                    organisation.description.clone(),
                    nullable(organisation.url.as_ref()),
                    nullable(organisation.email.as_ref()),
                    nullable(organisation.phone.as_ref()),
                    nullable(organisation.address_line_1.as_ref()),
                    nullable(organisation.address_line_2.as_ref()),
                    nullable(organisation.address_line_3.as_ref()),
                    nullable(organisation.city.as_ref()),
                    nullable(organisation.county.as_ref()),
                    nullable(organisation.postcode.as_ref()),
                    nullable(organisation.country.as_ref()),
                    i64::from(organisation.civi_sync_enabled),
                    nullable(organisation.civi_id.as_ref()),
                    organisation.created_at,
                    organisation.updated_at
                ],
            )
            .await?;

        Ok(())
    }

    async fn get(&self, id: &OrganisationId) -> Result<Option<Organisation>> {
        let mut rows = self
            .conn
            .query(&format!("{SELECT_COLUMNS} WHERE id = ?"), [id.as_str()])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_organisation(&row)?)),
            None => Ok(None),
        }
    }

    #[allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT/OFFSET
    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<Organisation>> {
        let mut rows = self
            .conn
            .query(
                &format!("{SELECT_COLUMNS} ORDER BY name COLLATE NOCASE ASC, id ASC LIMIT ? OFFSET ?"),
                params![limit as i64, offset as i64],
            )
            .await?;

        let mut organisations = Vec::new();
        while let Some(row) = rows.next().await? {
            organisations.push(Self::parse_organisation(&row)?);
        }
        Ok(organisations)
    }

    async fn update(&self, organisation: &Organisation) -> Result<()> {
        Self::validate(organisation)?;

        let updated = self
            .conn
            .execute(
                "UPDATE organisations SET
                    name = ?, description = ?, url = ?, email = ?, phone = ?,
                    address_line_1 = ?, address_line_2 = ?, address_line_3 = ?,
                    city = ?, county = ?, postcode = ?, country = ?,
                    civi_sync_enabled = ?, updated_at = ?
                 WHERE id = ?",
                params![
                    organisation.name.clone(),
                    organisation.description.clone(),
                    nullable(organisation.url.as_ref()),
                    nullable(organisation.email.as_ref()),
                    nullable(organisation.phone.as_ref()),
                    nullable(organisation.address_line_1.as_ref()),
                    nullable(organisation.address_line_2.as_ref()),
                    nullable(organisation.address_line_3.as_ref()),
                    nullable(organisation.city.as_ref()),
                    nullable(organisation.county.as_ref()),
                    nullable(organisation.postcode.as_ref()),
                    nullable(organisation.country.as_ref()),
                    i64::from(organisation.civi_sync_enabled),
                    organisation.updated_at,
                    organisation.id.as_str()
                ],
            )
            .await?;

        if updated == 0 {
            return Err(Error::NotFound(organisation.id.to_string()));
        }
        Ok(())
    }

    async fn set_civi_id(&self, id: &OrganisationId, civi_id: &str) -> Result<()> {
        let updated = self
            .conn
            .execute(
                "UPDATE organisations SET civi_id = ? WHERE id = ?",
                params![civi_id, id.as_str()],
            )
            .await?;

        if updated == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn delete(&self, id: &OrganisationId) -> Result<()> {
        let deleted = self
            .conn
            .execute("DELETE FROM organisations WHERE id = ?", [id.as_str()])
            .await?;

        if deleted == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::OrganisationDraft;
    use pretty_assertions::assert_eq;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn acme() -> Organisation {
        Organisation::new(OrganisationDraft {
            name: "Acme Org".to_string(),
            description: "Lorem ipsum".to_string(),
            url: Some("https://acme.example".to_string()),
            email: Some("info@acme.example".to_string()),
            city: Some("Leeds".to_string()),
            country: Some("United Kingdom".to_string()),
            civi_sync_enabled: true,
            ..OrganisationDraft::default()
        })
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_create_and_get() {
        let db = setup().await;
        let repo = LibSqlOrganisationRepository::new(db.connection());

        let organisation = acme();
        repo.create(&organisation).await.unwrap();

        let fetched = repo.get(&organisation.id).await.unwrap().unwrap();
        assert_eq!(fetched, organisation);
        assert_eq!(fetched.phone, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_create_requires_name_and_description() {
        let db = setup().await;
        let repo = LibSqlOrganisationRepository::new(db.connection());

        let mut organisation = acme();
        organisation.description = "  ".to_string();
        assert!(matches!(
            repo.create(&organisation).await,
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_update_and_set_civi_id() {
        let db = setup().await;
        let repo = LibSqlOrganisationRepository::new(db.connection());

        let mut organisation = acme();
        repo.create(&organisation).await.unwrap();

        organisation.name = "Acme Renamed".to_string();
        organisation.url = None;
        repo.update(&organisation).await.unwrap();
        repo.set_civi_id(&organisation.id, "42").await.unwrap();

        let fetched = repo.get(&organisation.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Acme Renamed");
        assert_eq!(fetched.url, None);
        assert_eq!(fetched.civi_id.as_deref(), Some("42"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_is_alphabetical_and_paginated() {
        let db = setup().await;
        let repo = LibSqlOrganisationRepository::new(db.connection());

        for name in ["Charlie", "alpha", "Bravo"] {
            let mut organisation = acme();
            organisation.name = name.to_string();
            repo.create(&organisation).await.unwrap();
        }

        let names: Vec<String> = repo
            .list(10, 0)
            .await
            .unwrap()
            .into_iter()
            .map(|organisation| organisation.name)
            .collect();
        assert_eq!(names, vec!["alpha", "Bravo", "Charlie"]);

        let page = repo.list(1, 1).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].name, "Bravo");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_delete_missing_is_not_found() {
        let db = setup().await;
        let repo = LibSqlOrganisationRepository::new(db.connection());

        let organisation = acme();
        repo.create(&organisation).await.unwrap();
        repo.delete(&organisation.id).await.unwrap();

        assert!(repo.get(&organisation.id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(&organisation.id).await,
            Err(Error::NotFound(_))
        ));
    }
}

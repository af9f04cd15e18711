//! Organisation -> CiviCRM contact payloads.

use chrono::NaiveDate;
use serde_json::{json, Map, Value};

use crate::error::{Error, Result};
use crate::models::Organisation;

/// The only country value CiviCRM accepts from us; anything else is sent blank.
const ALLOWED_COUNTRY: &str = "United Kingdom";

/// Builds contact payloads, keyed with the configured custom field ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganisationTransformer {
    description_field_id: String,
    deleted_at_field_id: String,
}

impl OrganisationTransformer {
    pub fn new(description_field_id: impl Into<String>, deleted_at_field_id: impl Into<String>) -> Self {
        Self {
            description_field_id: description_field_id.into(),
            deleted_at_field_id: deleted_at_field_id.into(),
        }
    }

    pub fn transform_create(&self, organisation: &Organisation) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("contact_type".into(), json!("Organization"));
        payload.insert("organization_name".into(), json!(organisation.name));
        payload.insert(
            format!("custom_{}", self.description_field_id),
            json!(organisation.description),
        );
        payload.insert("email".into(), json!(organisation.email));
        payload.insert("website".into(), json!([{ "url": organisation.url }]));
        payload.insert("phone".into(), json!(organisation.phone));
        // Every address key must be present, even when blank.
        payload.insert(
            "street_address".into(),
            blank_if_missing(organisation.address_line_1.as_deref()),
        );
        payload.insert(
            "supplemental_address_1".into(),
            blank_if_missing(organisation.address_line_2.as_deref()),
        );
        payload.insert(
            "supplemental_address_2".into(),
            blank_if_missing(organisation.address_line_3.as_deref()),
        );
        payload.insert("city".into(), blank_if_missing(organisation.city.as_deref()));
        payload.insert(
            "postal_code".into(),
            blank_if_missing(organisation.postcode.as_deref()),
        );
        payload.insert("country".into(), json!(allowed_country(organisation)));
        payload
    }

    /// Create payload plus the CRM contact id.
    pub fn transform_update(&self, organisation: &Organisation) -> Result<Map<String, Value>> {
        let civi_id = organisation
            .civi_id
            .as_deref()
            .ok_or(Error::MissingExternalId(organisation.id))?;

        let mut payload = self.transform_create(organisation);
        payload.insert("id".into(), json!(civi_id));
        Ok(payload)
    }

    /// Update payload stamped with today's (UTC) deletion date.
    pub fn transform_delete(&self, organisation: &Organisation) -> Result<Map<String, Value>> {
        self.transform_delete_on(organisation, chrono::Utc::now().date_naive())
    }

    pub fn transform_delete_on(
        &self,
        organisation: &Organisation,
        date: NaiveDate,
    ) -> Result<Map<String, Value>> {
        let mut payload = self.transform_update(organisation)?;
        payload.insert(
            format!("custom_{}", self.deleted_at_field_id),
            json!(date.format("%Y-%m-%d").to_string()),
        );
        Ok(payload)
    }
}

fn blank_if_missing(value: Option<&str>) -> Value {
    json!(value.unwrap_or_default())
}

fn allowed_country(organisation: &Organisation) -> &str {
    match organisation.country.as_deref() {
        Some(ALLOWED_COUNTRY) => ALLOWED_COUNTRY,
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrganisationDraft;
    use pretty_assertions::assert_eq;

    fn transformer() -> OrganisationTransformer {
        OrganisationTransformer::new("12", "13")
    }

    fn acme() -> Organisation {
        Organisation::new(OrganisationDraft {
            name: "Acme Org".to_string(),
            description: "Lorem ipsum".to_string(),
            email: Some("acme.org@example.com".to_string()),
            url: Some("acme.example.com".to_string()),
            phone: Some("01130000000".to_string()),
            address_line_1: Some("1 Fake Street".to_string()),
            city: Some("Leeds".to_string()),
            postcode: Some("LS1 2AB".to_string()),
            civi_sync_enabled: true,
            ..OrganisationDraft::default()
        })
    }

    fn expected_create() -> Value {
        json!({
            "contact_type": "Organization",
            "organization_name": "Acme Org",
            "custom_12": "Lorem ipsum",
            "email": "acme.org@example.com",
            "website": [{ "url": "acme.example.com" }],
            "phone": "01130000000",
            "street_address": "1 Fake Street",
            "supplemental_address_1": "",
            "supplemental_address_2": "",
            "city": "Leeds",
            "postal_code": "LS1 2AB",
            "country": ""
        })
    }

    #[test]
    fn create_payload_blanks_missing_address_fields() {
        let payload = transformer().transform_create(&acme());
        assert_eq!(Value::Object(payload), expected_create());
    }

    #[test]
    fn country_is_allow_listed() {
        let mut organisation = acme();

        organisation.country = Some("United Kingdom".to_string());
        let payload = transformer().transform_create(&organisation);
        assert_eq!(payload["country"], json!("United Kingdom"));

        organisation.country = Some("united kingdom".to_string());
        let payload = transformer().transform_create(&organisation);
        assert_eq!(payload["country"], json!(""));

        organisation.country = Some("France".to_string());
        let payload = transformer().transform_create(&organisation);
        assert_eq!(payload["country"], json!(""));
    }

    #[test]
    fn missing_email_and_phone_are_null() {
        let mut organisation = acme();
        organisation.email = None;
        organisation.phone = None;

        let payload = transformer().transform_create(&organisation);
        assert_eq!(payload["email"], Value::Null);
        assert_eq!(payload["phone"], Value::Null);
    }

    #[test]
    fn update_payload_adds_contact_id() {
        let mut organisation = acme();
        organisation.civi_id = Some("test-id".to_string());

        let payload = transformer().transform_update(&organisation).unwrap();

        let mut expected = expected_create();
        expected["id"] = json!("test-id");
        assert_eq!(Value::Object(payload), expected);
    }

    #[test]
    fn update_without_contact_id_is_rejected() {
        let organisation = acme();
        assert!(matches!(
            transformer().transform_update(&organisation),
            Err(Error::MissingExternalId(id)) if id == organisation.id
        ));
    }

    #[test]
    fn delete_payload_adds_deletion_date() {
        let mut organisation = acme();
        organisation.civi_id = Some("test-id".to_string());
        let date = NaiveDate::from_ymd_opt(2020, 2, 3).unwrap();

        let payload = transformer()
            .transform_delete_on(&organisation, date)
            .unwrap();

        let mut expected = expected_create();
        expected["id"] = json!("test-id");
        expected["custom_13"] = json!("2020-02-03");
        assert_eq!(Value::Object(payload), expected);
    }

    #[test]
    fn delete_payload_uses_today() {
        let mut organisation = acme();
        organisation.civi_id = Some("test-id".to_string());

        let payload = transformer().transform_delete(&organisation).unwrap();
        let today = chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string();
        assert_eq!(payload["custom_13"], json!(today));
    }
}

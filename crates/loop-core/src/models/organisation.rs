//! Organisation model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A unique identifier for an organisation, using UUID v7
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrganisationId(Uuid);

impl OrganisationId {
    /// Create a new unique organisation ID using UUID v7
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

impl Default for OrganisationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrganisationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OrganisationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Editable profile fields of an organisation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganisationDraft {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address_line_1: Option<String>,
    #[serde(default)]
    pub address_line_2: Option<String>,
    #[serde(default)]
    pub address_line_3: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub county: Option<String>,
    #[serde(default)]
    pub postcode: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub civi_sync_enabled: bool,
}

/// An organisation publishing services in the directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organisation {
    pub id: OrganisationId,
    pub name: String,
    pub description: String,
    pub url: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address_line_1: Option<String>,
    pub address_line_2: Option<String>,
    pub address_line_3: Option<String>,
    pub city: Option<String>,
    pub county: Option<String>,
    pub postcode: Option<String>,
    pub country: Option<String>,
    /// Whether lifecycle changes are mirrored to CiviCRM
    pub civi_sync_enabled: bool,
    /// CiviCRM contact id, set once the first sync succeeded
    pub civi_id: Option<String>,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
}

/// CRM sync state derived from an organisation and its failed syncs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Disabled,
    PendingFirstSync,
    Synced,
    Failed,
}

impl Organisation {
    /// Create a new organisation from a draft
    #[must_use]
    pub fn new(draft: OrganisationDraft) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        let mut organisation = Self {
            id: OrganisationId::new(),
            name: String::new(),
            description: String::new(),
            url: None,
            email: None,
            phone: None,
            address_line_1: None,
            address_line_2: None,
            address_line_3: None,
            city: None,
            county: None,
            postcode: None,
            country: None,
            civi_sync_enabled: false,
            civi_id: None,
            created_at: now,
            updated_at: now,
        };
        organisation.apply(draft);
        organisation
    }

    /// Overwrite the profile fields with the draft's values
    pub fn apply(&mut self, draft: OrganisationDraft) {
        self.name = draft.name;
        self.description = draft.description;
        self.url = draft.url;
        self.email = draft.email;
        self.phone = draft.phone;
        self.address_line_1 = draft.address_line_1;
        self.address_line_2 = draft.address_line_2;
        self.address_line_3 = draft.address_line_3;
        self.city = draft.city;
        self.county = draft.county;
        self.postcode = draft.postcode;
        self.country = draft.country;
        self.civi_sync_enabled = draft.civi_sync_enabled;
    }

    /// Current profile as an editable draft
    #[must_use]
    pub fn to_draft(&self) -> OrganisationDraft {
        OrganisationDraft {
            name: self.name.clone(),
            description: self.description.clone(),
            url: self.url.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            address_line_1: self.address_line_1.clone(),
            address_line_2: self.address_line_2.clone(),
            address_line_3: self.address_line_3.clone(),
            city: self.city.clone(),
            county: self.county.clone(),
            postcode: self.postcode.clone(),
            country: self.country.clone(),
            civi_sync_enabled: self.civi_sync_enabled,
        }
    }

    /// Sync state given the number of outstanding failed syncs
    #[must_use]
    pub const fn sync_state(&self, failed_syncs: usize) -> SyncState {
        if failed_syncs > 0 {
            SyncState::Failed
        } else if !self.civi_sync_enabled {
            SyncState::Disabled
        } else if self.civi_id.is_some() {
            SyncState::Synced
        } else {
            SyncState::PendingFirstSync
        }
    }
}

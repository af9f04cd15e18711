use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use loop_core::util::normalize_text_option;
use loop_core::{
    CrmConfig, CrmSyncGateway, DatabaseService, FailedSync, OrderedItem, Organisation,
    OrganisationDraft, SyncState,
};

use crate::cli::ProfileArgs;
use crate::error::CliError;

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("LOOP_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("loop")
        .join("loop.db")
}

pub async fn open_database(path: &Path) -> Result<DatabaseService, CliError> {
    Ok(DatabaseService::open_path(path.to_path_buf()).await?)
}

/// CRM driver configured from the environment (`CRM_DRIVER`, `CIVI_*`).
pub fn crm_gateway() -> Result<CrmSyncGateway, CliError> {
    let config = CrmConfig::from_env()?;
    Ok(CrmSyncGateway::from_config(&config)?)
}

pub fn parse_id<T: FromStr>(kind: &'static str, value: &str) -> Result<T, CliError> {
    value.trim().parse().map_err(|_| CliError::InvalidId {
        kind,
        value: value.to_string(),
    })
}

pub fn require_text(field: &'static str, value: &str) -> Result<String, CliError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyField(field))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Overlay the provided profile fields on `draft`; an empty value clears.
pub fn apply_profile(draft: &mut OrganisationDraft, profile: ProfileArgs) {
    let fields = [
        (&mut draft.url, profile.url),
        (&mut draft.email, profile.email),
        (&mut draft.phone, profile.phone),
        (&mut draft.address_line_1, profile.address_line_1),
        (&mut draft.address_line_2, profile.address_line_2),
        (&mut draft.address_line_3, profile.address_line_3),
        (&mut draft.city, profile.city),
        (&mut draft.county, profile.county),
        (&mut draft.postcode, profile.postcode),
        (&mut draft.country, profile.country),
    ];

    for (slot, value) in fields {
        if value.is_some() {
            *slot = normalize_text_option(value);
        }
    }
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub const fn sync_state_label(state: SyncState) -> &'static str {
    match state {
        SyncState::Disabled => "disabled",
        SyncState::PendingFirstSync => "pending first sync",
        SyncState::Synced => "synced",
        SyncState::Failed => "failed",
    }
}

pub fn format_collection_lines(items: &[OrderedItem]) -> Vec<String> {
    items
        .iter()
        .map(|item| format!("{:>4}. {}  [{}]", item.order, item.name, item.id))
        .collect()
}

pub fn format_organisation_lines(organisations: &[Organisation]) -> Vec<String> {
    organisations
        .iter()
        .map(|organisation| {
            let civi = organisation.civi_id.as_deref().unwrap_or("-");
            let sync = if organisation.civi_sync_enabled {
                "sync"
            } else {
                "no-sync"
            };
            format!(
                "{}  {}  ({sync}, civi={civi})",
                organisation.id, organisation.name
            )
        })
        .collect()
}

pub fn format_organisation_detail(organisation: &Organisation, state: SyncState) -> Vec<String> {
    let optional = |label: &str, value: Option<&String>| {
        value.map(|value| format!("{label:<14}{value}"))
    };

    let mut lines = vec![
        format!("{:<14}{}", "id", organisation.id),
        format!("{:<14}{}", "name", organisation.name),
        format!("{:<14}{}", "description", organisation.description),
    ];
    lines.extend(
        [
            optional("url", organisation.url.as_ref()),
            optional("email", organisation.email.as_ref()),
            optional("phone", organisation.phone.as_ref()),
            optional("address 1", organisation.address_line_1.as_ref()),
            optional("address 2", organisation.address_line_2.as_ref()),
            optional("address 3", organisation.address_line_3.as_ref()),
            optional("city", organisation.city.as_ref()),
            optional("county", organisation.county.as_ref()),
            optional("postcode", organisation.postcode.as_ref()),
            optional("country", organisation.country.as_ref()),
            optional("civi id", organisation.civi_id.as_ref()),
        ]
        .into_iter()
        .flatten(),
    );
    lines.push(format!("{:<14}{}", "sync state", sync_state_label(state)));
    lines.push(format!(
        "{:<14}{}",
        "updated",
        format_timestamp(organisation.updated_at)
    ));
    lines
}

pub fn format_failed_sync_lines(failed_syncs: &[FailedSync]) -> Vec<String> {
    failed_syncs
        .iter()
        .map(|failed_sync| {
            format!(
                "{} | status={} | organisation={} | {}",
                failed_sync.id,
                failed_sync.status_code,
                failed_sync.organisation_id,
                format_timestamp(failed_sync.created_at)
            )
        })
        .collect()
}

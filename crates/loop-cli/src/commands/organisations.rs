use std::path::Path;

use loop_core::{
    CrmClient, Organisation, OrganisationDraft, OrganisationId, OrganisationService, SyncState,
};
use serde::Serialize;

use crate::cli::{OrganisationCommands, ProfileArgs};
use crate::commands::common::{
    apply_profile, crm_gateway, format_organisation_detail, format_organisation_lines,
    open_database, parse_id, require_text,
};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct OrganisationView {
    #[serde(flatten)]
    pub organisation: Organisation,
    pub sync_state: SyncState,
}

pub async fn run_organisations(
    command: OrganisationCommands,
    db_path: &Path,
) -> Result<(), CliError> {
    let service = OrganisationService::new(open_database(db_path).await?, crm_gateway()?);

    match command {
        OrganisationCommands::List {
            limit,
            offset,
            json,
        } => run_list(&service, limit, offset, json).await,
        OrganisationCommands::Show { id, json } => run_show(&service, &id, json).await,
        OrganisationCommands::Create {
            name,
            description,
            profile,
            civi_sync,
        } => run_create(&service, &name, &description, profile, civi_sync)
            .await
            .map(|_| ()),
        OrganisationCommands::Update {
            id,
            name,
            description,
            profile,
            civi_sync,
        } => {
            let changes = OrganisationChanges {
                name,
                description,
                profile,
                civi_sync,
            };
            run_update(&service, &id, changes).await.map(|_| ())
        }
        OrganisationCommands::Delete { id } => run_delete(&service, &id).await,
    }
}

pub async fn run_list<C: CrmClient>(
    service: &OrganisationService<C>,
    limit: usize,
    offset: usize,
    as_json: bool,
) -> Result<(), CliError> {
    let organisations = service.list(limit, offset).await?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&organisations)?);
    } else {
        for line in format_organisation_lines(&organisations) {
            println!("{line}");
        }
    }
    Ok(())
}

pub async fn run_show<C: CrmClient>(
    service: &OrganisationService<C>,
    id: &str,
    as_json: bool,
) -> Result<(), CliError> {
    let id: OrganisationId = parse_id("organisation", id)?;
    let (organisation, sync_state) = service.get_with_state(&id).await?;

    if as_json {
        let view = OrganisationView {
            organisation,
            sync_state,
        };
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        for line in format_organisation_detail(&organisation, sync_state) {
            println!("{line}");
        }
    }
    Ok(())
}

pub async fn run_create<C: CrmClient>(
    service: &OrganisationService<C>,
    name: &str,
    description: &str,
    profile: ProfileArgs,
    civi_sync: bool,
) -> Result<Organisation, CliError> {
    let mut draft = OrganisationDraft {
        name: require_text("Organisation name", name)?,
        description: require_text("Organisation description", description)?,
        civi_sync_enabled: civi_sync,
        ..OrganisationDraft::default()
    };
    apply_profile(&mut draft, profile);

    let organisation = service.create(draft).await?;
    println!("Created organisation {} ({})", organisation.name, organisation.id);
    Ok(organisation)
}

pub struct OrganisationChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub profile: ProfileArgs,
    pub civi_sync: Option<bool>,
}

pub async fn run_update<C: CrmClient>(
    service: &OrganisationService<C>,
    id: &str,
    changes: OrganisationChanges,
) -> Result<Organisation, CliError> {
    let id: OrganisationId = parse_id("organisation", id)?;
    let mut draft = service.get(&id).await?.to_draft();

    if let Some(name) = changes.name {
        draft.name = require_text("Organisation name", &name)?;
    }
    if let Some(description) = changes.description {
        draft.description = require_text("Organisation description", &description)?;
    }
    if let Some(civi_sync) = changes.civi_sync {
        draft.civi_sync_enabled = civi_sync;
    }
    apply_profile(&mut draft, changes.profile);

    let organisation = service.update(&id, draft).await?;
    println!("Updated organisation {} ({})", organisation.name, organisation.id);
    Ok(organisation)
}

pub async fn run_delete<C: CrmClient>(
    service: &OrganisationService<C>,
    id: &str,
) -> Result<(), CliError> {
    let id: OrganisationId = parse_id("organisation", id)?;
    service.delete(&id).await?;
    println!("Deleted organisation {id}");
    Ok(())
}

use std::path::Path;

use loop_core::{CrmClient, FailedSyncId, RetryCoordinator};

use crate::cli::FailedSyncCommands;
use crate::commands::common::{
    crm_gateway, format_failed_sync_lines, format_timestamp, open_database, parse_id,
};
use crate::error::CliError;

pub async fn run_failed_syncs(command: FailedSyncCommands, db_path: &Path) -> Result<(), CliError> {
    let coordinator = RetryCoordinator::new(open_database(db_path).await?, crm_gateway()?);

    match command {
        FailedSyncCommands::List {
            limit,
            offset,
            json,
        } => run_list(&coordinator, limit, offset, json).await,
        FailedSyncCommands::Show { id, json } => run_show(&coordinator, &id, json).await,
        FailedSyncCommands::Retry { id } => run_retry(&coordinator, &id).await,
    }
}

pub async fn run_list<C: CrmClient>(
    coordinator: &RetryCoordinator<C>,
    limit: usize,
    offset: usize,
    as_json: bool,
) -> Result<(), CliError> {
    let failed_syncs = coordinator.list_failed_syncs(limit, offset).await?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&failed_syncs)?);
    } else if failed_syncs.is_empty() {
        println!("No failed syncs");
    } else {
        for line in format_failed_sync_lines(&failed_syncs) {
            println!("{line}");
        }
    }
    Ok(())
}

pub async fn run_show<C: CrmClient>(
    coordinator: &RetryCoordinator<C>,
    id: &str,
    as_json: bool,
) -> Result<(), CliError> {
    let id: FailedSyncId = parse_id("failed sync", id)?;
    let failed_sync = coordinator.get_failed_sync(&id).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&failed_sync)?);
    } else {
        println!("id            {}", failed_sync.id);
        println!("organisation  {}", failed_sync.organisation_id);
        println!("status        {}", failed_sync.status_code);
        println!("created       {}", format_timestamp(failed_sync.created_at));
    }
    Ok(())
}

pub async fn run_retry<C: CrmClient>(
    coordinator: &RetryCoordinator<C>,
    id: &str,
) -> Result<(), CliError> {
    let id: FailedSyncId = parse_id("failed sync", id)?;
    let organisation = coordinator.retry(&id).await?;
    println!(
        "Synced organisation {} ({}); failed syncs cleared",
        organisation.name, organisation.id
    );
    Ok(())
}

use std::path::Path;

use loop_core::{import, ItemId, PartitionKey};

use crate::cli::CollectionCommands;
use crate::commands::common::{format_collection_lines, open_database, parse_id, require_text};
use crate::error::CliError;

pub async fn run_collections(command: CollectionCommands, db_path: &Path) -> Result<(), CliError> {
    match command {
        CollectionCommands::List { partition, json } => run_list(&partition, json, db_path).await,
        CollectionCommands::Add {
            partition,
            name,
            order,
        } => run_add(&partition, &name, order, db_path).await,
        CollectionCommands::Move { id, order } => run_move(&id, order, db_path).await,
        CollectionCommands::Rename { id, name, order } => {
            run_rename(&id, &name, order, db_path).await
        }
        CollectionCommands::Remove { id } => run_remove(&id, db_path).await,
        CollectionCommands::Import { partition, file } => {
            run_import(&partition, &file, db_path).await
        }
    }
}

pub async fn run_list(partition: &str, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let partition = PartitionKey::new(partition)?;
    let db = open_database(db_path).await?;
    let items = db.list_collections(&partition).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else if items.is_empty() {
        println!("No items in '{partition}'");
    } else {
        for line in format_collection_lines(&items) {
            println!("{line}");
        }
    }
    Ok(())
}

pub async fn run_add(
    partition: &str,
    name: &str,
    order: Option<i64>,
    db_path: &Path,
) -> Result<(), CliError> {
    let partition = PartitionKey::new(partition)?;
    let name = require_text("Collection name", name)?;
    let db = open_database(db_path).await?;

    let order = match order {
        Some(order) => order,
        None => db.count_collections(&partition).await? + 1,
    };
    let item = db.create_collection(&partition, &name, order).await?;
    println!("Added '{}' at position {} ({})", item.name, item.order, item.id);
    Ok(())
}

pub async fn run_move(id: &str, order: i64, db_path: &Path) -> Result<(), CliError> {
    let id: ItemId = parse_id("collection", id)?;
    let db = open_database(db_path).await?;
    let item = db.reorder_collection(&id, order).await?;
    println!("Moved '{}' to position {}", item.name, item.order);
    Ok(())
}

pub async fn run_rename(
    id: &str,
    name: &str,
    order: Option<i64>,
    db_path: &Path,
) -> Result<(), CliError> {
    let id: ItemId = parse_id("collection", id)?;
    let name = require_text("Collection name", name)?;
    let db = open_database(db_path).await?;

    let order = match order {
        Some(order) => order,
        None => {
            db.get_collection(&id)
                .await?
                .ok_or_else(|| loop_core::Error::NotFound(id.to_string()))?
                .order
        }
    };
    let item = db.update_collection(&id, &name, order).await?;
    println!("Renamed to '{}' at position {}", item.name, item.order);
    Ok(())
}

pub async fn run_remove(id: &str, db_path: &Path) -> Result<(), CliError> {
    let id: ItemId = parse_id("collection", id)?;
    let db = open_database(db_path).await?;
    db.delete_collection(&id).await?;
    println!("Removed {id}");
    Ok(())
}

pub async fn run_import(partition: &str, file: &Path, db_path: &Path) -> Result<(), CliError> {
    let partition = PartitionKey::new(partition)?;
    let db = open_database(db_path).await?;
    let items = import::import_file(&db, &partition, file).await?;
    println!("Imported {} item(s) into '{partition}'", items.len());
    Ok(())
}

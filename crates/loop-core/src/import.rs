//! Batch import of ordered collections.
//!
//! Input is a JSON array of `{ "name": ... }` rows. Importing replaces the
//! whole partition: existing items are removed and rows are inserted in file
//! order, the first row at position 1.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::{OrderedItem, PartitionKey};
use crate::services::DatabaseService;

#[derive(Debug, Deserialize)]
struct ImportRow {
    name: String,
}

/// Parse import rows, rejecting blank names.
pub fn parse_rows(json: &str) -> Result<Vec<String>> {
    let rows: Vec<ImportRow> = serde_json::from_str(json)?;

    rows.into_iter()
        .enumerate()
        .map(|(index, row)| {
            let name = row.name.trim();
            if name.is_empty() {
                Err(Error::InvalidInput(format!(
                    "Import row {} has an empty name",
                    index + 1
                )))
            } else {
                Ok(name.to_string())
            }
        })
        .collect()
}

/// Replace `partition` with the rows in `json`.
pub async fn import_json(
    db: &DatabaseService,
    partition: &PartitionKey,
    json: &str,
) -> Result<Vec<OrderedItem>> {
    let names = parse_rows(json)?;
    let items = db.replace_collections(partition, &names).await?;
    tracing::info!("Imported {} item(s) into partition '{}'", items.len(), partition);
    Ok(items)
}

/// Replace `partition` with the rows of a JSON file.
pub async fn import_file(
    db: &DatabaseService,
    partition: &PartitionKey,
    path: impl AsRef<Path>,
) -> Result<Vec<OrderedItem>> {
    let json = std::fs::read_to_string(path.as_ref())?;
    import_json(db, partition, &json).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn parse_rows_trims_names() {
        let names = parse_rows(r#"[{"name":" 001 "},{"name":"002","extra":true}]"#).unwrap();
        assert_eq!(names, vec!["001".to_string(), "002".to_string()]);
    }

    #[test]
    fn parse_rows_rejects_blank_name_and_bad_json() {
        let err = parse_rows(r#"[{"name":"ok"},{"name":"  "}]"#).unwrap_err();
        assert!(err.to_string().contains("row 2"));

        assert!(matches!(
            parse_rows(r#"{"name":"not an array"}"#),
            Err(Error::Serialization(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn import_replaces_partition_in_file_order() {
        let db = DatabaseService::open_in_memory().await.unwrap();
        let snomed = PartitionKey::snomed();
        let persona = PartitionKey::persona();
        db.create_collection(&snomed, "stale", 1).await.unwrap();
        db.create_collection(&persona, "kept", 1).await.unwrap();

        let tmp = tempdir().unwrap();
        let path = tmp.path().join("snomed.json");
        std::fs::write(&path, r#"[{"name":"003"},{"name":"001"},{"name":"002"}]"#).unwrap();

        import_file(&db, &snomed, &path).await.unwrap();

        let items: Vec<(String, i64)> = db
            .list_collections(&snomed)
            .await
            .unwrap()
            .into_iter()
            .map(|item| (item.name, item.order))
            .collect();
        assert_eq!(
            items,
            vec![
                ("003".to_string(), 1),
                ("001".to_string(), 2),
                ("002".to_string(), 3),
            ]
        );
        assert_eq!(db.count_collections(&persona).await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn invalid_import_leaves_partition_untouched() {
        let db = DatabaseService::open_in_memory().await.unwrap();
        let category = PartitionKey::category();
        db.create_collection(&category, "existing", 1).await.unwrap();

        assert!(import_json(&db, &category, r#"[{"name":""}]"#).await.is_err());
        assert_eq!(db.count_collections(&category).await.unwrap(), 1);
    }
}
